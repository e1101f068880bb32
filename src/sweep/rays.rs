//! Putting the rays around a fat vertex in counter-clockwise order.
//!
//! Inside a vertex box we know nothing about how the tiles are arranged: they
//! can cross one another arbitrarily, because the box stands in for a single
//! point. Outside the box, though, tiles don't cross. So we draw a rectangle
//! around the vertex that excludes every box the rays are heading to, and we
//! order the rays by where they leave that rectangle.

use kurbo::{CubicBez, ParamCurve, Point, Rect};

use crate::{
    curve::solve_t_for_coord,
    geom::Axis,
    num::CheapOrderedFloat,
    tiles::{BoxIdx, BoxVec, TileIdx},
    TopologyError,
};

/// A side of a separating rectangle, in counter-clockwise order starting from
/// the bottom.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub enum Side {
    /// The bottom side, traversed with increasing `x`.
    Bottom,
    /// The right side, traversed with increasing `y`.
    Right,
    /// The top side, traversed with decreasing `x`.
    Top,
    /// The left side, traversed with decreasing `y`.
    Left,
}

impl Side {
    /// The coordinate that says where along this side a point is.
    fn place(self, p: Point) -> f64 {
        match self {
            Side::Bottom | Side::Top => p.x,
            Side::Right | Side::Left => p.y,
        }
    }

    /// Converts a place along this side into something that increases in the
    /// counter-clockwise direction.
    fn ccw(self, place: f64) -> f64 {
        match self {
            Side::Bottom | Side::Right => place,
            Side::Top | Side::Left => -place,
        }
    }
}

/// A tile end at a vertex.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Ray {
    pub tile: TileIdx,
    /// Does the tile's parametrization point away from the vertex?
    pub centrifugal: bool,
    /// Does the sweep reach the tile at this vertex?
    pub opening: bool,
    pub side: Side,
    pub place: f64,
}

impl Ray {
    fn sort_key(&self) -> (Side, CheapOrderedFloat) {
        (self.side, CheapOrderedFloat::from(self.side.ccw(self.place)))
    }

    // When two rays leave the vertex at the same place, they're overlapping
    // copies of the same curve. Whatever order we pick at one end, the other
    // end needs to agree with it, and the other end sees the two tiles with
    // the opposite opening status.
    fn tie_key(&self) -> isize {
        let idx = self.tile.0 as isize;
        if self.opening {
            idx
        } else {
            -idx
        }
    }
}

/// Finds a rectangle containing the box `vertex` and excluding all the boxes
/// in `others`.
///
/// For every other box we find the widest of the four axis-aligned gaps
/// separating it from `vertex`, and cut the plane halfway across that gap.
/// The result is the intersection of all the cuts, so some of its sides can
/// be infinite.
pub(crate) fn separating_rect(
    vertex: BoxIdx,
    others: impl IntoIterator<Item = BoxIdx>,
    boxes: &BoxVec<Rect>,
) -> Result<Rect, TopologyError> {
    let cur = boxes[vertex];
    let mut sep = Rect::new(
        f64::NEG_INFINITY,
        f64::NEG_INFINITY,
        f64::INFINITY,
        f64::INFINITY,
    );
    for other in others {
        if other == vertex {
            continue;
        }
        let b = boxes[other];
        let gaps = [
            (Side::Bottom, cur.y0 - b.y1),
            (Side::Right, b.x0 - cur.x1),
            (Side::Top, b.y0 - cur.y1),
            (Side::Left, cur.x0 - b.x1),
        ];
        let (side, gap) = gaps
            .into_iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((Side::Bottom, f64::NAN));
        if gap.is_nan() || gap <= 0.0 {
            return Err(TopologyError::InseparableVertices { vertex, other });
        }
        let half = gap / 2.0;
        match side {
            Side::Bottom => sep.y0 = sep.y0.max(cur.y0 - half),
            Side::Right => sep.x1 = sep.x1.min(cur.x1 + half),
            Side::Top => sep.y1 = sep.y1.min(cur.y1 + half),
            Side::Left => sep.x0 = sep.x0.max(cur.x0 - half),
        }
    }
    Ok(sep)
}

/// Where a ray, oriented to point away from its vertex, first leaves the
/// separating rectangle.
pub(crate) fn exit_point(c: CubicBez, sep: &Rect) -> (Side, f64) {
    let far = c.p3;
    let lines = [
        (Side::Bottom, Axis::Y, sep.y0, far.y < sep.y0),
        (Side::Right, Axis::X, sep.x1, far.x > sep.x1),
        (Side::Top, Axis::Y, sep.y1, far.y > sep.y1),
        (Side::Left, Axis::X, sep.x0, far.x < sep.x0),
    ];

    let mut best: Option<(f64, Side)> = None;
    for (side, axis, value, beyond) in lines {
        // An infinite side is never beyond anything.
        if !beyond {
            continue;
        }
        if let Some(s) = solve_t_for_coord(c, axis, value) {
            if best.is_none_or(|(b, _)| s < b) {
                best = Some((s, side));
            }
        }
    }

    match best {
        Some((s, side)) => (side, side.place(c.eval(s))),
        None => {
            // The far end is inside the rectangle, which only happens if the
            // rectangle didn't account for it. Go by the chord direction.
            let d = far - c.p0;
            let side = if d.x.abs() >= d.y.abs() {
                if d.x > 0.0 {
                    Side::Right
                } else {
                    Side::Left
                }
            } else if d.y > 0.0 {
                Side::Top
            } else {
                Side::Bottom
            };
            (side, side.place(far))
        }
    }
}

/// Sorts rays counter-clockwise, starting from the left end of the bottom side.
///
/// Rays whose exit places are within `tie_eps` of one another are ordered by
/// their tie key, which makes the two ends of overlapping tiles agree.
pub(crate) fn sort_rays(rays: &mut [Ray], tie_eps: f64) {
    rays.sort_by_key(Ray::sort_key);

    let mut start = 0;
    while start < rays.len() {
        let mut end = start + 1;
        while end < rays.len()
            && rays[end].side == rays[start].side
            && rays[end].side.ccw(rays[end].place) - rays[end - 1].side.ccw(rays[end - 1].place)
                <= tie_eps
        {
            end += 1;
        }
        if end - start > 1 {
            rays[start..end].sort_by_key(Ray::tie_key);
        }
        start = end;
    }
}

/// Rotates the (sorted) rays so that emitting them in order makes sense.
///
/// If there's a closing ray, the first ray becomes the closing ray just
/// before the openings; in the usual case, that's the lowest of the tiles
/// arriving from behind the sweep, and the openings get inserted just after
/// it. A vertex where nothing closes keeps the order starting at the bottom,
/// so that the area containing the vertex comes first.
pub(crate) fn rotate_rays(rays: &mut [Ray]) {
    let n = rays.len();
    let start = (0..n)
        .find(|&i| rays[i].opening && !rays[(i + n - 1) % n].opening)
        .map(|i| (i + n - 1) % n)
        .or_else(|| rays.iter().position(|r| !r.opening));
    if let Some(start) = start {
        rays.rotate_left(start);
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Line, PathSeg};

    use super::*;
    use crate::curve::cubic;

    fn line(p0: (f64, f64), p1: (f64, f64)) -> CubicBez {
        cubic(&PathSeg::Line(Line::new(p0, p1)))
    }

    fn ray(tile: usize, opening: bool, side: Side, place: f64) -> Ray {
        Ray {
            tile: TileIdx(tile),
            centrifugal: opening,
            opening,
            side,
            place,
        }
    }

    fn tiles(rays: &[Ray]) -> Vec<usize> {
        rays.iter().map(|r| r.tile.0).collect()
    }

    #[test]
    fn separate_from_neighbors() {
        let boxes = BoxVec::from_vec(vec![
            Rect::new(0.0, 0.0, 1.0, 1.0),
            Rect::new(3.0, 0.0, 4.0, 1.0),
            Rect::new(0.0, 5.0, 1.0, 6.0),
        ]);
        let sep = separating_rect(BoxIdx(0), [BoxIdx(1), BoxIdx(2)], &boxes).unwrap();
        assert_eq!(sep.x1, 2.0);
        assert_eq!(sep.y1, 3.0);
        assert_eq!(sep.x0, f64::NEG_INFINITY);
        assert_eq!(sep.y0, f64::NEG_INFINITY);
    }

    #[test]
    fn overlapping_boxes_are_inseparable() {
        let boxes = BoxVec::from_vec(vec![
            Rect::new(0.0, 0.0, 2.0, 2.0),
            Rect::new(1.0, 1.0, 3.0, 3.0),
        ]);
        assert_eq!(
            separating_rect(BoxIdx(0), [BoxIdx(1)], &boxes),
            Err(TopologyError::InseparableVertices {
                vertex: BoxIdx(0),
                other: BoxIdx(1)
            })
        );
    }

    #[test]
    fn exits() {
        let sep = Rect::new(-1.0, -1.0, 1.0, 1.0);
        let c = line((0.0, 0.0), (4.0, 2.0));
        let (side, place) = exit_point(c, &sep);
        assert_eq!(side, Side::Right);
        assert!((place - 0.5).abs() < 1e-9);

        let c = line((0.0, 0.0), (-0.5, -3.0));
        let (side, place) = exit_point(c, &sep);
        assert_eq!(side, Side::Bottom);
        assert!((place + 1.0 / 6.0).abs() < 1e-9);

        // Towards the corner, it crosses both lines at the same time.
        let c = line((0.0, 0.0), (2.0, 2.0));
        let (side, _) = exit_point(c, &sep);
        assert!(side == Side::Right || side == Side::Top);
    }

    #[test]
    fn sorted_counter_clockwise() {
        let mut rays = vec![
            ray(0, false, Side::Left, 0.5),
            ray(1, true, Side::Top, 3.0),
            ray(2, true, Side::Right, 0.0),
            ray(3, false, Side::Left, -0.5),
            ray(4, true, Side::Top, -3.0),
            ray(5, false, Side::Bottom, -2.0),
        ];
        sort_rays(&mut rays, 1e-9);
        assert_eq!(tiles(&rays), vec![5, 2, 1, 4, 0, 3]);

        rotate_rays(&mut rays);
        assert_eq!(tiles(&rays), vec![5, 2, 1, 4, 0, 3]);
    }

    #[test]
    fn rotation_starts_before_openings() {
        let mut rays = vec![
            ray(0, true, Side::Right, 0.0),
            ray(1, true, Side::Top, 0.0),
            ray(2, false, Side::Left, 1.0),
            ray(3, false, Side::Left, -1.0),
        ];
        rotate_rays(&mut rays);
        assert_eq!(tiles(&rays), vec![3, 0, 1, 2]);

        // Without openings, keep the order.
        let mut rays = vec![
            ray(0, false, Side::Bottom, 0.0),
            ray(1, false, Side::Left, 0.0),
        ];
        rotate_rays(&mut rays);
        assert_eq!(tiles(&rays), vec![0, 1]);
    }

    #[test]
    fn overlapping_rays_agree_at_both_ends() {
        // Two copies of the same curve, seen from the end where they open...
        let mut start = vec![ray(7, true, Side::Top, 0.0), ray(3, true, Side::Top, 0.0)];
        sort_rays(&mut start, 1e-9);
        // ...and from the end where they close.
        let mut end = vec![
            ray(3, false, Side::Bottom, 0.0),
            ray(7, false, Side::Bottom, 0.0),
        ];
        sort_rays(&mut end, 1e-9);

        // Counter-clockwise along the top side means right to left, and
        // along the bottom side it means left to right. The tile on the right
        // at the start should still be on the right at the end.
        assert_eq!(tiles(&start), vec![3, 7]);
        assert_eq!(tiles(&end), vec![7, 3]);
    }
}
