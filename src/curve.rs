//! Curve algebra for monotonic pieces: root finding, cutting, and intersection.
//!
//! Everything in here works on segments that are monotonic in both
//! coordinates. That makes a lot of things easier: the bounding box of such a
//! segment is spanned by its endpoints, a horizontal or vertical line crosses
//! it at most once, and the set of parameters for which it's inside a box is
//! an interval.

use arrayvec::ArrayVec;
use kurbo::{
    common::solve_cubic, CubicBez, Line, ParamCurve, ParamCurveExtrema, PathSeg, Point, Rect,
};

use crate::geom::{self, Axis};

/// Parameters closer than this are considered to be the same cut.
const PARAM_EPS: f64 = 1e-12;

/// The maximum number of distinct intersections we report between two pieces.
///
/// Transversal intersections between two monotonic pieces are rare (there can
/// be at most 9 between two cubics, and usually there's at most one). Running
/// into this limit means that the pieces are overlapping or tangent.
const MAX_HITS: usize = 16;

/// The maximum number of box comparisons while intersecting two pieces.
const MAX_WORK: usize = 4096;

/// Finds the parameter at which the cubic's `axis`-coordinate equals `value`.
///
/// The cubic must be monotonic in `axis`. Returns `None` if `value` isn't
/// between the coordinates of the two endpoints.
pub fn solve_t_for_coord(c: CubicBez, axis: Axis, value: f64) -> Option<f64> {
    let p0 = axis.coord(c.p0);
    let p1 = axis.coord(c.p1);
    let p2 = axis.coord(c.p2);
    let p3 = axis.coord(c.p3);
    if value == p0 {
        return Some(0.0);
    }
    if value == p3 {
        return Some(1.0);
    }
    let (lo, hi) = if p0 <= p3 { (p0, p3) } else { (p3, p0) };
    if value < lo || value > hi {
        return None;
    }

    let c3 = p3 - 3.0 * p2 + 3.0 * p1 - p0;
    let c2 = 3.0 * (p2 - 2.0 * p1 + p0);
    let c1 = 3.0 * (p1 - p0);
    let c0 = p0 - value;

    let slop = 1e-12 * lo.abs().max(hi.abs()).max(1.0);
    for t in solve_cubic_in_unit_interval(c0, c1, c2, c3) {
        if (-1e-9..=1.0 + 1e-9).contains(&t) {
            let t = t.clamp(0.0, 1.0);
            if (axis.coord(c.eval(t)) - value).abs() <= slop {
                return Some(t);
            }
        }
    }

    // The algebraic roots were inaccurate (this happens when the cubic is
    // almost flat in `axis`), but we know there's a root in here and we know
    // that the coordinate is monotonic, so bisect.
    let increasing = p3 > p0;
    let mut a = 0.0;
    let mut b = 1.0;
    for _ in 0..64 {
        let mid = 0.5 * (a + b);
        if (axis.coord(c.eval(mid)) < value) == increasing {
            a = mid;
        } else {
            b = mid;
        }
    }
    Some(0.5 * (a + b))
}

// Tries to solve a cubic, but only looks for accurate solutions in the interval [0.0, 1.0].
//
// This doesn't actually filter out solutions outside that interval, it only
// makes some tweaks for better numerical stability inside it.
fn solve_cubic_in_unit_interval(c0: f64, c1: f64, c2: f64, c3: f64) -> ArrayVec<f64, 3> {
    // For small t, a tiny leading coefficient only perturbs the value by about
    // its own size, while keeping it makes `solve_cubic` divide by it.
    let mut new_c3 = c3;
    let mut new_c2 = c2;
    if c3.abs() < c2.abs().max(c1.abs()) / 1e7 {
        new_c3 = 0.0;
        if c2.abs() < c1.abs().max(c0.abs()) / 1e7 {
            new_c2 = 0.0;
        }
    }
    let mut roots = solve_cubic(c0, c1, new_c2, new_c3);

    // A few Newton steps on the original coefficients, to win back some of the
    // accuracy we threw away.
    for x in &mut roots {
        let mut val = c3 * *x * *x * *x + c2 * *x * *x + c1 * *x + c0;
        let mut deriv = 3.0 * c3 * *x * *x + 2.0 * c2 * *x + c1;
        for _ in 0..3 {
            if val.abs() <= 1e-14 || deriv == 0.0 {
                break;
            }
            let step = val / deriv;
            // Near a double root the Newton step can be huge, so limit it.
            let step = step.abs().min(val.abs().sqrt()).copysign(step);
            *x -= step;
            val = c3 * *x * *x * *x + c2 * *x * *x + c1 * *x + c0;
            deriv = 3.0 * c3 * *x * *x + 2.0 * c2 * *x + c1;
        }
    }
    roots
}

/// The parameters at which a segment should be cut to make it monotonic in
/// both coordinates, including the endpoints 0 and 1.
pub fn monotonic_cuts(seg: &PathSeg) -> Vec<f64> {
    let mut cuts = vec![0.0];
    if !matches!(seg, PathSeg::Line(_)) {
        let mut extrema: Vec<f64> = seg
            .extrema()
            .into_iter()
            .filter(|&t| t > PARAM_EPS && t < 1.0 - PARAM_EPS)
            .collect();
        extrema.sort_by(f64::total_cmp);
        cuts.extend(extrema);
    }
    cuts.push(1.0);
    cuts.dedup_by(|a, b| *a - *b <= PARAM_EPS);
    cuts
}

/// The bounding box of a segment that is monotonic in both coordinates.
pub fn monotonic_bbox(seg: &PathSeg) -> Rect {
    Rect::from_points(seg.start(), seg.end())
}

/// A segment as a cubic, with the same parametrization.
///
/// `PathSeg::to_cubic` puts a line's control points on its endpoints, which
/// traces the same points but at different parameters. Here, `cubic(seg).eval(t)`
/// and `seg.eval(t)` always agree.
pub fn cubic(seg: &PathSeg) -> CubicBez {
    match *seg {
        PathSeg::Line(l) => CubicBez::new(
            l.p0,
            l.p0.lerp(l.p1, 1.0 / 3.0),
            l.p0.lerp(l.p1, 2.0 / 3.0),
            l.p1,
        ),
        _ => seg.to_cubic(),
    }
}

/// Finds the intersections between two monotonic segments.
///
/// Returns pairs `(s, t)` of parameters such that `a.eval(s)` and `b.eval(t)`
/// are within `tol` of one another. Intersections near the same point are
/// reported only once.
///
/// This is a best-effort search: for pieces that overlap along a stretch, it
/// reports at most a handful of points along the overlap.
pub fn intersect_monotonic(a: &PathSeg, b: &PathSeg, tol: f64) -> Vec<(f64, f64)> {
    let mut hits = if let (PathSeg::Line(la), PathSeg::Line(lb)) = (a, b) {
        intersect_lines(*la, *lb, tol)
    } else {
        let mut search = Search {
            a,
            b,
            tol,
            leaf_size: tol / 4.0,
            budget: MAX_WORK,
            hits: Vec::new(),
            points: Vec::new(),
        };
        search.run((0.0, 1.0), (0.0, 1.0));
        search.hits
    };

    let mut deduped: Vec<(f64, f64)> = Vec::with_capacity(hits.len());
    hits.sort_by(|x, y| x.0.total_cmp(&y.0));
    for (s, t) in hits {
        let p = a.eval(s);
        if deduped.iter().all(|&(s0, _)| a.eval(s0).distance(p) > tol) {
            deduped.push((s, t));
        }
    }
    deduped
}

// A depth-first bisection search for intersections.
//
// Neighboring leaves of the recursion tend to find the same point, so a leaf
// near a point that's already been found isn't reported again, and a pair of
// boxes that's entirely within `tol` of a known point isn't explored. In
// particular, a shared endpoint only counts once towards `MAX_HITS`.
struct Search<'a> {
    a: &'a PathSeg,
    b: &'a PathSeg,
    tol: f64,
    leaf_size: f64,
    budget: usize,
    hits: Vec<(f64, f64)>,
    points: Vec<Point>,
}

impl Search<'_> {
    fn run(&mut self, (a0, a1): (f64, f64), (b0, b1): (f64, f64)) {
        if self.budget == 0 || self.hits.len() >= MAX_HITS {
            return;
        }
        self.budget -= 1;

        let box_a = monotonic_bbox(&self.a.subsegment(a0..a1));
        let box_b = monotonic_bbox(&self.b.subsegment(b0..b1));
        if !geom::overlaps(&box_a, &box_b) {
            return;
        }
        let both = box_a.union(box_b);
        if self
            .points
            .iter()
            .any(|&p| geom::contains_rect(&geom::fat_point(p, self.tol), &both))
        {
            return;
        }

        let size_a = box_a.width().max(box_a.height());
        let size_b = box_b.width().max(box_b.height());
        if size_a <= self.leaf_size && size_b <= self.leaf_size {
            let s = 0.5 * (a0 + a1);
            let p = self.a.eval(s);
            if self.points.iter().all(|q| q.distance(p) > self.tol) {
                self.hits.push((s, 0.5 * (b0 + b1)));
                self.points.push(p);
            }
            return;
        }

        if size_a >= size_b {
            let mid = 0.5 * (a0 + a1);
            self.run((a0, mid), (b0, b1));
            self.run((mid, a1), (b0, b1));
        } else {
            let mid = 0.5 * (b0 + b1);
            self.run((a0, a1), (b0, mid));
            self.run((a0, a1), (mid, b1));
        }
    }
}

fn intersect_lines(a: Line, b: Line, tol: f64) -> Vec<(f64, f64)> {
    let da = a.p1 - a.p0;
    let db = b.p1 - b.p0;
    let w = b.p0 - a.p0;
    let len_a2 = da.hypot2();
    let len_b2 = db.hypot2();
    if len_a2 == 0.0 || len_b2 == 0.0 {
        return Vec::new();
    }

    let denom = da.cross(db);
    if denom.abs() > 1e-12 * (len_a2 * len_b2).sqrt() {
        let s = w.cross(db) / denom;
        let t = w.cross(da) / denom;
        if (0.0..=1.0).contains(&s) && (0.0..=1.0).contains(&t) {
            vec![(s, t)]
        } else {
            Vec::new()
        }
    } else {
        // Parallel. If they're also collinear, the overlap starts and ends at
        // endpoints, so report the endpoints that land inside the other line.
        if w.cross(da).abs() / len_a2.sqrt() > tol {
            return Vec::new();
        }
        let mut out = Vec::new();
        for (t, p) in [(0.0, b.p0), (1.0, b.p1)] {
            let s = (p - a.p0).dot(da) / len_a2;
            if s > 0.0 && s < 1.0 {
                out.push((s, t));
            }
        }
        for (s, p) in [(0.0, a.p0), (1.0, a.p1)] {
            let t = (p - b.p0).dot(db) / len_b2;
            if t > 0.0 && t < 1.0 {
                out.push((s, t));
            }
        }
        out
    }
}

/// The parameter interval on which a monotonic cubic lies inside `rect`, if
/// it ever does.
pub fn box_interval(c: CubicBez, rect: &Rect) -> Option<(f64, f64)> {
    let (x0, x1) = coord_interval(c, Axis::X, rect.x0, rect.x1)?;
    let (y0, y1) = coord_interval(c, Axis::Y, rect.y0, rect.y1)?;
    let lo = x0.max(y0);
    let hi = x1.min(y1);
    (lo <= hi).then_some((lo, hi))
}

// The parameter interval on which a cubic that's monotonic in `axis` has
// `axis`-coordinate between `lo` and `hi`.
fn coord_interval(c: CubicBez, axis: Axis, lo: f64, hi: f64) -> Option<(f64, f64)> {
    let start = axis.coord(c.p0);
    let end = axis.coord(c.p3);
    let (min, max) = if start <= end {
        (start, end)
    } else {
        (end, start)
    };
    if max < lo || min > hi {
        return None;
    }
    let increasing = end >= start;
    let param_at = |v: f64| {
        if v <= min {
            if increasing {
                0.0
            } else {
                1.0
            }
        } else if v >= max {
            if increasing {
                1.0
            } else {
                0.0
            }
        } else {
            solve_t_for_coord(c, axis, v).unwrap_or(0.5)
        }
    };
    let t_lo = param_at(lo);
    let t_hi = param_at(hi);
    Some((t_lo.min(t_hi), t_lo.max(t_hi)))
}
