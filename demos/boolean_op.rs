use std::path::PathBuf;

use clap::{Args, Parser};
use kurbo::{Affine, BezPath, Shape};
use svg::{node::element::Path, Document};
use tracing_subscriber::EnvFilter;

use fatsweep::{generators, BinaryOp, FillRule, Topology};

#[derive(Copy, Clone, Debug, clap::ValueEnum)]
enum Example {
    Checkerboard,
    SlantedCheckerboard,
    Slanties,
}

#[derive(Parser)]
struct Cli {
    #[arg(long)]
    output: PathBuf,

    #[command(flatten)]
    input: Input,

    #[arg(long)]
    non_zero: bool,

    #[arg(long)]
    epsilon: Option<f64>,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct Input {
    /// A file with two lines, each containing SVG path data.
    input: Option<PathBuf>,

    #[arg(long)]
    example: Option<Example>,
}

fn get_paths(input: &Input) -> anyhow::Result<(BezPath, BezPath)> {
    match (&input.input, &input.example) {
        (Some(path), None) => {
            let input = std::fs::read_to_string(path)?;
            let mut lines = input.lines().filter(|l| !l.trim().is_empty());
            let a = BezPath::from_svg(lines.next().unwrap_or_default())?;
            let b = BezPath::from_svg(lines.next().unwrap_or_default())?;
            Ok((a, b))
        }
        (None, Some(example)) => match example {
            Example::Checkerboard => Ok(generators::checkerboard(10)),
            Example::SlantedCheckerboard => Ok(generators::slanted_checkerboard(10)),
            Example::Slanties => Ok(generators::slanties(10)),
        },
        _ => unreachable!(),
    }
}

pub fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Cli::parse();
    let (shape_a, shape_b) = get_paths(&args.input)?;
    let fill_rule = if args.non_zero {
        FillRule::NonZero
    } else {
        FillRule::EvenOdd
    };

    let eps = args.epsilon.unwrap_or(0.1);
    let mut top = Topology::new([&shape_a, &shape_b], eps)?;
    // Open inputs leave edges that don't separate anything.
    let trimmed = top.trim_whiskers();
    tracing::debug!(?trimmed, "built topology");

    let bbox = shape_a.bounding_box().union(shape_b.bounding_box());
    let pad = 1.0 + eps;
    let one_width = bbox.width() + 2.0 * pad;
    let one_height = bbox.height() + 2.0 * pad;
    let stroke_width = bbox.width().max(bbox.height()) / 512.0;
    let mut document = Document::new().set(
        "viewBox",
        (bbox.x0 - pad, -bbox.y1 - pad, one_width * 3.0, one_height * 2.0),
    );

    // SVG's y axis points down.
    let flip = Affine::FLIP_Y;

    // Draw the original paths.
    for p in [&shape_a, &shape_b] {
        let path = Path::new()
            .set("stroke", "black")
            .set("stroke-width", stroke_width)
            .set("stroke-linecap", "round")
            .set("stroke-linejoin", "round")
            .set("opacity", 0.2)
            .set("fill", "none")
            .set("d", (flip * p.clone()).to_svg());
        document = document.add(path);
    }

    let placements = [
        (BinaryOp::Union, one_width, 0.0),
        (BinaryOp::Intersection, one_width * 2.0, 0.0),
        (BinaryOp::Xor, 0.0, one_height),
        (BinaryOp::Difference, one_width, one_height),
        (BinaryOp::ReverseDifference, one_width * 2.0, one_height),
    ];
    for (op, x_off, y_off) in placements {
        let transform = Affine::translate((x_off, y_off)) * flip;
        document = add_op(document, op, fill_rule, &top, transform, stroke_width);
    }

    svg::save(&args.output, &document)?;

    Ok(())
}

fn add_op(
    mut doc: Document,
    op: BinaryOp,
    fill_rule: FillRule,
    top: &Topology,
    transform: Affine,
    stroke_width: f64,
) -> Document {
    let contours = top.contours(|w| op.apply(fill_rule.is_inside(w[0]), fill_rule.is_inside(w[1])));
    tracing::info!(?op, contours = contours.len(), "computed contours");

    let colors = [
        "#005F73", "#0A9396", "#94D2BD", "#E9D8A6", "#EE9B00", "#CA6702", "#BB3E03", "#AE2012",
        "#9B2226",
    ];

    for (color_idx, group) in contours.grouped().into_iter().enumerate() {
        let mut data = BezPath::new();
        for contour_idx in group {
            data.extend(contours[contour_idx].path.iter());
        }
        let path = Path::new()
            .set("d", (transform * data).to_svg())
            .set("stroke", "black")
            .set("stroke-width", stroke_width)
            .set("stroke-linecap", "round")
            .set("stroke-linejoin", "round")
            .set("fill", colors[color_idx % colors.len()]);
        doc = doc.add(path);
    }
    doc
}
