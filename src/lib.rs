#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

#[macro_use]
mod typed_vec;

#[cfg(any(test, feature = "arbitrary"))]
pub mod arbitrary;
pub mod cluster;
pub mod contour;
pub mod curve;
pub mod geom;
pub mod num;
pub mod sweep;
pub mod tiles;
pub mod topology;

#[cfg(feature = "generators")]
pub mod generators;

use arrayvec::ArrayVec;
use kurbo::{BezPath, PathEl, Point, Shape};

pub use contour::{Contour, ContourIdx, Contours};
use tiles::{BoxIdx, TileIdx};
use topology::{AreaIdx, EdgeIdx};
pub use topology::Topology;

/// A fill rule tells us how to decide whether a point is "inside" a path.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FillRule {
    /// The point is "inside" if its winding number is odd.
    EvenOdd,
    /// The point is "inside" if its winding number is non-zero.
    NonZero,
}

impl FillRule {
    /// Does this winding number count as inside?
    pub fn is_inside(self, winding: i32) -> bool {
        match self {
            FillRule::EvenOdd => winding % 2 != 0,
            FillRule::NonZero => winding != 0,
        }
    }
}

/// Binary operations between sets.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum BinaryOp {
    /// A point is in the union of two sets if it is in either one.
    Union,
    /// A point is in the intersection of two sets if it is in both.
    Intersection,
    /// A point is in the difference of two sets if it is in the first but not the second.
    Difference,
    /// A point is in the reverse difference of two sets if it is in the second but not the first.
    ReverseDifference,
    /// A point is in the exclusive-or of two sets if it is in one or the other, but not both.
    Xor,
}

impl BinaryOp {
    /// Combines membership in the two sets.
    pub fn apply(self, in_a: bool, in_b: bool) -> bool {
        match self {
            BinaryOp::Union => in_a || in_b,
            BinaryOp::Intersection => in_a && in_b,
            BinaryOp::Difference => in_a && !in_b,
            BinaryOp::ReverseDifference => in_b && !in_a,
            BinaryOp::Xor => in_a != in_b,
        }
    }
}

/// Something went wrong while building a topology.
///
/// These all mean that some internal invariant was violated, and the whole
/// construction has to be abandoned.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// Two vertex boxes overlap, so there's no way to draw a line between them.
    #[error("vertices {vertex} and {other} can't be separated")]
    InseparableVertices {
        /// The vertex whose rays we were sorting.
        vertex: BoxIdx,
        /// The vertex that overlaps it.
        other: BoxIdx,
    },
    /// After fusing boxes, one end of a tile wasn't in any of them.
    #[error("no vertex contains an end of {tile}")]
    MissingVertex {
        /// The tile.
        tile: TileIdx,
    },
    /// A tile closed at a vertex, but the sweep didn't know it was open.
    #[error("{tile} closed, but it isn't in the sweep line")]
    UnmatchedRay {
        /// The tile.
        tile: TileIdx,
    },
    /// After the sweep, an edge was missing an endpoint or a neighboring area.
    #[error("{0} was never fully resolved")]
    UnresolvedEdge(EdgeIdx),
    /// After the sweep, an area's boundary had a loose end.
    #[error("the boundary of {0} doesn't close up")]
    OpenBoundary(AreaIdx),
}

/// The inputs were faulty, or something went wrong while processing them.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    /// At least one of the inputs was infinite.
    #[error("one of the inputs was infinite")]
    Infinity,
    /// At least one of the inputs was not a number.
    #[error("one of the inputs had a NaN")]
    NaN,
    /// The tolerance wasn't a positive, finite number.
    #[error("bad tolerance {0}")]
    BadTolerance(f64),
    /// One of the inputs to a boolean operation had a subpath that wasn't closed.
    #[error("input path {0} isn't closed")]
    NonClosedPath(usize),
    /// The topology couldn't be built.
    #[error(transparent)]
    InvalidTopology(#[from] TopologyError),
}

fn el_points(el: PathEl) -> ArrayVec<Point, 3> {
    let mut ret = ArrayVec::new();
    match el {
        PathEl::MoveTo(p) | PathEl::LineTo(p) => ret.push(p),
        PathEl::QuadTo(p1, p2) => {
            ret.push(p1);
            ret.push(p2);
        }
        PathEl::CurveTo(p1, p2, p3) => {
            ret.push(p1);
            ret.push(p2);
            ret.push(p3);
        }
        PathEl::ClosePath => {}
    }
    ret
}

/// Checks that every point in a path is finite.
pub(crate) fn check_finite(path: &BezPath) -> Result<(), Error> {
    for p in path.iter().flat_map(el_points) {
        if p.x.is_nan() || p.y.is_nan() {
            return Err(Error::NaN);
        }
        if p.x.is_infinite() || p.y.is_infinite() {
            return Err(Error::Infinity);
        }
    }
    Ok(())
}

/// Computes a boolean operation between two sets, each of which is described as a collection of closed paths.
pub fn binary_op(
    set_a: &BezPath,
    set_b: &BezPath,
    fill_rule: FillRule,
    op: BinaryOp,
) -> Result<Contours, Error> {
    check_finite(set_a)?;
    check_finite(set_b)?;
    for (idx, set) in [set_a, set_b].into_iter().enumerate() {
        if !tiles::is_closed(set) {
            return Err(Error::NonClosedPath(idx));
        }
    }

    // Find the extremal values, to figure out how much precision we can support.
    let bbox = set_a.bounding_box().union(set_b.bounding_box());
    let m = bbox
        .min_x()
        .abs()
        .max(bbox.min_y().abs())
        .max(bbox.max_x().abs())
        .max(bbox.max_y().abs());
    let eps = (m * (f64::EPSILON * 64.0)).max(1e-6);
    debug_assert!(eps.is_finite());

    let top = Topology::new([set_a, set_b], eps)?;
    #[cfg(feature = "debug-svg")]
    {
        let doc = top.dump_svg(|path| if path == 0 { "red" } else { "blue" }.to_owned());
        if let Err(e) = svg::save("out.svg", &doc) {
            tracing::warn!(error = %e, "failed to save debug svg");
        }
    }

    let inside = |w: &[i32]| op.apply(fill_rule.is_inside(w[0]), fill_rule.is_inside(w[1]));
    Ok(top.contours(inside))
}
