use kurbo::{BezPath, Circle, ParamCurveNearest, Point, Rect, Shape};
use proptest::prelude::*;

use fatsweep::{binary_op, BinaryOp, FillRule, Topology};

const OPS: [BinaryOp; 5] = [
    BinaryOp::Union,
    BinaryOp::Intersection,
    BinaryOp::Difference,
    BinaryOp::ReverseDifference,
    BinaryOp::Xor,
];

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> BezPath {
    Rect::new(x0, y0, x1, y1).to_path(0.0)
}

fn clockwise_rect(x0: f64, y0: f64, x1: f64, y1: f64) -> BezPath {
    let mut ret = BezPath::new();
    ret.move_to((x0, y0));
    ret.line_to((x0, y1));
    ret.line_to((x1, y1));
    ret.line_to((x1, y0));
    ret.close_path();
    ret
}

#[test]
fn disjoint_rects() {
    let a = rect(0.0, 0.0, 5.0, 8.0);
    let b = rect(10.0, 0.0, 12.0, 3.0);

    let union = binary_op(&a, &b, FillRule::NonZero, BinaryOp::Union).unwrap();
    assert_eq!(union.len(), 2);
    assert_eq!(union.grouped().len(), 2);
    assert_eq!(union.contours().map(|c| c.edges.len()).sum::<usize>(), 8);

    let intersection = binary_op(&a, &b, FillRule::NonZero, BinaryOp::Intersection).unwrap();
    assert!(intersection.is_empty());

    let difference = binary_op(&a, &b, FillRule::NonZero, BinaryOp::Difference).unwrap();
    assert_eq!(difference.len(), 1);
    assert!((difference.to_path().area() - 40.0).abs() < 1e-6);
}

#[test]
fn union_with_nothing() {
    let a = rect(0.0, 0.0, 5.0, 8.0);
    let out = binary_op(&a, &BezPath::new(), FillRule::EvenOdd, BinaryOp::Union).unwrap();
    assert_eq!(out.len(), 1);
    let c = out.contours().next().unwrap();
    assert!(c.outer);
    assert_eq!(c.edges.len(), 4);
    assert!((c.path.area() - 40.0).abs() < 1e-6);
}

#[test]
fn clockwise_inputs() {
    // Orientation doesn't matter to either fill rule; the output is always
    // counter-clockwise.
    let a = clockwise_rect(0.0, 0.0, 2.0, 2.0);
    let b = clockwise_rect(1.0, 1.0, 3.0, 3.0);
    let out = binary_op(&a, &b, FillRule::NonZero, BinaryOp::Union).unwrap();
    assert_eq!(out.len(), 1);
    assert!((out.to_path().area() - 7.0).abs() < 1e-6);
}

#[test]
fn lens() {
    let a = Circle::new((0.0, 0.0), 3.0).to_path(1e-4);
    let b = Circle::new((2.0, 0.0), 3.0).to_path(1e-4);
    let out = binary_op(&a, &b, FillRule::NonZero, BinaryOp::Intersection).unwrap();
    assert_eq!(out.len(), 1);

    let r: f64 = 3.0;
    let d: f64 = 2.0;
    let expected = 2.0 * r * r * (d / (2.0 * r)).acos() - (d / 2.0) * (4.0 * r * r - d * d).sqrt();
    assert!((out.to_path().area() - expected).abs() < 0.05);
}

#[test]
fn square_with_a_hole() {
    let a = rect(0.0, 0.0, 10.0, 10.0);
    let b = rect(3.0, 3.0, 6.0, 6.0);
    let out = binary_op(&a, &b, FillRule::EvenOdd, BinaryOp::Difference).unwrap();
    assert_eq!(out.len(), 2);
    let groups = out.grouped();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
    assert!(out[groups[0][0]].outer);
    assert!(!out[groups[0][1]].outer);
    assert!((out.to_path().area() - 91.0).abs() < 1e-6);
}

#[test]
fn rebuilding_is_deterministic() {
    let a = Circle::new((0.0, 0.0), 3.0).to_path(1e-3);
    let b = rect(-1.0, -4.0, 1.0, 4.0);
    let summary = |top: &Topology| {
        let mut windings: Vec<Vec<i32>> = top.areas().values().map(|a| a.winding.clone()).collect();
        windings.sort();
        (top.vertices().len(), top.edges().len(), windings)
    };
    let first = Topology::new([&a, &b], 1e-6).unwrap();
    let second = Topology::new([&a, &b], 1e-6).unwrap();
    assert_eq!(summary(&first), summary(&second));
    // The rectangle cuts the disk in three, and the disk cuts the rectangle in three.
    assert_eq!(summary(&first).2.len(), 6);
}

// A rectangle whose coordinates are all congruent to `idx` mod `MAX_RECTS`,
// so that different rectangles never share an edge or a corner.
const MAX_RECTS: usize = 6;
const GRID: u8 = 5;

type RectParams = (u8, u8, u8, u8, bool);

fn spread_rect(idx: usize, (x, y, w, h, ccw): RectParams) -> BezPath {
    let coord = |k: u8| (k as usize * MAX_RECTS + idx) as f64;
    let (x0, y0, x1, y1) = (coord(x), coord(y), coord(x + w), coord(y + h));
    if ccw {
        rect(x0, y0, x1, y1)
    } else {
        clockwise_rect(x0, y0, x1, y1)
    }
}

fn rect_params() -> impl Strategy<Value = Vec<RectParams>> {
    prop::collection::vec(
        (0..GRID, 0..GRID, 1..GRID, 1..GRID, any::<bool>()),
        1..=(MAX_RECTS / 2),
    )
}

fn check_against_kurbo(a: Vec<RectParams>, b: Vec<RectParams>, fill_rule: FillRule) {
    let mut set_a = BezPath::new();
    let mut set_b = BezPath::new();
    for (i, &params) in a.iter().enumerate() {
        set_a.extend(spread_rect(i, params).iter());
    }
    for (i, &params) in b.iter().enumerate() {
        set_b.extend(spread_rect(a.len() + i, params).iter());
    }

    // All the input coordinates are integers, so half-integer points are
    // never on a boundary.
    let max = (2 * GRID as usize * MAX_RECTS) as i32;
    let samples: Vec<Point> = (-1..=max)
        .flat_map(|i| (-1..=max).map(move |j| Point::new(i as f64 + 0.5, j as f64 + 0.5)))
        .collect();
    assert_membership(&set_a, &set_b, fill_rule, &samples);
}

// Checks, for every op, that the output contains exactly the sample points
// that the op's predicate says it should.
fn assert_membership(set_a: &BezPath, set_b: &BezPath, fill_rule: FillRule, samples: &[Point]) {
    for op in OPS {
        let out = binary_op(set_a, set_b, fill_rule, op).unwrap();
        let out_path = out.to_path();
        for &p in samples {
            let expected = op.apply(
                fill_rule.is_inside(set_a.winding(p)),
                fill_rule.is_inside(set_b.winding(p)),
            );
            let actual = out_path.winding(p) != 0;
            assert_eq!(expected, actual, "{op:?} at {p:?}");
        }
    }
}

// Grid points in `rect` that are further than `margin` from both inputs.
fn samples_away_from(paths: [&BezPath; 2], rect: Rect, step: f64, margin: f64) -> Vec<Point> {
    let nx = (rect.width() / step) as usize;
    let ny = (rect.height() / step) as usize;
    (0..=nx)
        .flat_map(|i| (0..=ny).map(move |j| (i, j)))
        .map(|(i, j)| Point::new(rect.x0 + i as f64 * step, rect.y0 + j as f64 * step))
        .filter(|&p| {
            paths
                .iter()
                .flat_map(|path| path.segments())
                .all(|seg| seg.nearest(p, 1e-9).distance_sq > margin * margin)
        })
        .collect()
}

fn polygon(points: &[(f64, f64)]) -> BezPath {
    let mut ret = BezPath::new();
    if let Some((&first, rest)) = points.split_first() {
        ret.move_to(first);
        for &p in rest {
            ret.line_to(p);
        }
        ret.close_path();
    }
    ret
}

#[test]
fn thin_triangles() {
    // The second triangle's lowest corner opens between the first triangle's
    // sloped sides, so the sweep has to get their heights right.
    let a = polygon(&[(41.76, 11.66), (37.59, 91.91), (28.76, 16.37)]);
    let b = polygon(&[(99.54, 87.71), (37.68, 78.53), (35.48, 73.01)]);
    let samples = samples_away_from([&a, &b], Rect::new(25.0, 5.0, 100.0, 95.0), 0.5, 0.05);
    for fill_rule in [FillRule::EvenOdd, FillRule::NonZero] {
        assert_membership(&a, &b, fill_rule, &samples);
    }

    let area = |op| {
        binary_op(&a, &b, FillRule::NonZero, op)
            .unwrap()
            .to_path()
            .area()
    };
    let (union, intersection, xor) = (
        area(BinaryOp::Union),
        area(BinaryOp::Intersection),
        area(BinaryOp::Xor),
    );
    assert!(intersection > 1.0);
    assert!((xor - (union - intersection)).abs() < 1e-3);
}

#[test]
fn curves_and_polygons() {
    let mut wave = BezPath::new();
    wave.move_to((-4.0, -0.5));
    wave.curve_to((-1.0, 4.0), (1.0, -4.0), (4.0, 0.5));
    wave.quad_to((0.0, -5.0), (-4.0, -0.5));
    let mut a = Circle::new((0.0, 0.0), 3.0).to_path(1e-3);
    a.extend(wave.iter());
    let b = polygon(&[(-5.0, 1.0), (2.0, -4.0), (3.5, 2.5), (-1.0, 0.2)]);

    let samples = samples_away_from([&a, &b], Rect::new(-6.0, -6.0, 6.0, 6.0), 0.1, 0.02);
    for fill_rule in [FillRule::EvenOdd, FillRule::NonZero] {
        assert_membership(&a, &b, fill_rule, &samples);
    }
}

fn polygon_points() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((0.0..100.0f64, 0.0..100.0f64), 3..=6)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn rects_match_kurbo(a in rect_params(), b in rect_params(), even_odd in any::<bool>()) {
        let fill_rule = if even_odd { FillRule::EvenOdd } else { FillRule::NonZero };
        check_against_kurbo(a, b, fill_rule);
    }

    #[test]
    fn polygons_match_kurbo(
        a in polygon_points(),
        b in polygon_points(),
        even_odd in any::<bool>(),
    ) {
        let fill_rule = if even_odd { FillRule::EvenOdd } else { FillRule::NonZero };
        let (a, b) = (polygon(&a), polygon(&b));
        let samples = samples_away_from([&a, &b], Rect::new(0.0, 0.0, 100.0, 100.0), 2.5, 0.25);
        assert_membership(&a, &b, fill_rule, &samples);
    }
}
