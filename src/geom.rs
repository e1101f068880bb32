//! Geometric primitives: sweep order, fat points, and axis helpers.

use std::cmp::Ordering;

use kurbo::{Point, Rect};

use crate::num::CheapOrderedFloat;

/// One of the two coordinate axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Axis {
    /// The horizontal axis, which is also the sweep direction.
    X,
    /// The vertical axis, along which the sweep line extends.
    Y,
}

impl Axis {
    /// The coordinate of `p` along this axis.
    #[inline]
    pub fn coord(self, p: Point) -> f64 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
        }
    }
}

/// Compares two points in sweep order: by `x`, and then by `y`.
pub fn sweep_cmp(p: Point, q: Point) -> Ordering {
    (CheapOrderedFloat::from(p.x), CheapOrderedFloat::from(p.y))
        .cmp(&(CheapOrderedFloat::from(q.x), CheapOrderedFloat::from(q.y)))
}

/// The sweep-order key of a box, which is its minimal corner.
pub fn box_key(r: &Rect) -> (CheapOrderedFloat, CheapOrderedFloat) {
    (CheapOrderedFloat::from(r.x0), CheapOrderedFloat::from(r.y0))
}

/// A square box of half-width `radius` around `p`.
pub fn fat_point(p: Point, radius: f64) -> Rect {
    Rect::new(p.x - radius, p.y - radius, p.x + radius, p.y + radius)
}

/// Do the two boxes overlap? Boxes that only touch along their boundaries count.
pub fn overlaps(a: &Rect, b: &Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

/// Is `inner` entirely inside `outer` (boundaries included)?
pub fn contains_rect(outer: &Rect, inner: &Rect) -> bool {
    outer.x0 <= inner.x0 && inner.x1 <= outer.x1 && outer.y0 <= inner.y0 && inner.y1 <= outer.y1
}

/// The z component of the cross product of `b - a` and `c - a`.
///
/// This is positive if `c` is to the left of the directed line from `a` to `b`
/// (with the `y` axis pointing up).
pub fn orientation(a: Point, b: Point, c: Point) -> f64 {
    (b - a).cross(c - a)
}
