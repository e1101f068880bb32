//! Utilities for fuzz and/or property testing using `arbitrary`.

use arbitrary::Unstructured;
use kurbo::{BezPath, Point};

/// Generate an arbitrary float in some range.
pub fn float_in_range(
    start: f64,
    end: f64,
    u: &mut Unstructured<'_>,
) -> Result<f64, arbitrary::Error> {
    let num: u32 = u.arbitrary()?;
    let t = num as f64 / u32::MAX as f64;
    Ok((1.0 - t) * start + t * end)
}

/// Generate a float in some range, but give it a chance to be close to another float.
fn another_float_in_range(
    orig: f64,
    start: f64,
    end: f64,
    u: &mut Unstructured<'_>,
) -> Result<f64, arbitrary::Error> {
    let close: bool = u.arbitrary()?;
    if close {
        let ulps: i32 = u.int_in_range(-32..=32)?;
        let scale = 1.0f64 + ulps as f64 * f64::EPSILON;
        Ok((orig * scale).clamp(start, end))
    } else {
        float_in_range(start, end, u)
    }
}

fn point(size: f64, u: &mut Unstructured<'_>) -> Result<Point, arbitrary::Error> {
    Ok(Point::new(
        float_in_range(-size, size, u)?,
        float_in_range(-size, size, u)?,
    ))
}

/// Generate a point that has a chance of being close to (or equal to) one of
/// the points we've already generated.
fn another_point(
    size: f64,
    earlier: &[Point],
    u: &mut Unstructured<'_>,
) -> Result<Point, arbitrary::Error> {
    if earlier.is_empty() {
        return point(size, u);
    }
    match u.int_in_range(0u8..=3)? {
        0 => Ok(earlier[u.choose_index(earlier.len())?]),
        1 => {
            let p = earlier[u.choose_index(earlier.len())?];
            Ok(Point::new(
                another_float_in_range(p.x, -size, size, u)?,
                another_float_in_range(p.y, -size, size, u)?,
            ))
        }
        // Same x or same y, to exercise ties in the sweep order.
        2 => {
            let p = earlier[u.choose_index(earlier.len())?];
            if u.arbitrary()? {
                Ok(Point::new(p.x, float_in_range(-size, size, u)?))
            } else {
                Ok(Point::new(float_in_range(-size, size, u)?, p.y))
            }
        }
        _ => point(size, u),
    }
}

/// Generate an arbitrary closed path made of lines, quadratics and cubics.
///
/// All coordinates lie in `[-size, size]`. The path can have several
/// subpaths, and they're biased towards sharing points, directions, and
/// coordinates with one another.
pub fn closed_path(size: f64, u: &mut Unstructured<'_>) -> Result<BezPath, arbitrary::Error> {
    let mut ret = BezPath::new();
    let mut points = Vec::new();
    let subpaths = u.int_in_range(1..=3)?;
    for _ in 0..subpaths {
        let start = another_point(size, &points, u)?;
        points.push(start);
        ret.move_to(start);
        let segs = u.int_in_range(1..=6)?;
        for _ in 0..segs {
            let end = another_point(size, &points, u)?;
            match u.int_in_range(0u8..=2)? {
                0 => ret.line_to(end),
                1 => ret.quad_to(point(size, u)?, end),
                _ => ret.curve_to(point(size, u)?, point(size, u)?, end),
            }
            points.push(end);
        }
        ret.close_path();
    }
    Ok(ret)
}

/// Generate a rectangle with integer coordinates in `[0, size]`, wound
/// either way.
///
/// Rectangles like these are easy to test against: sampling at
/// half-integer points never lands on a boundary.
pub fn integer_rect(size: u16, u: &mut Unstructured<'_>) -> Result<BezPath, arbitrary::Error> {
    let x0 = u.int_in_range(0..=size.saturating_sub(1))?;
    let y0 = u.int_in_range(0..=size.saturating_sub(1))?;
    let x1 = u.int_in_range((x0 + 1)..=size.max(x0 + 1))?;
    let y1 = u.int_in_range((y0 + 1)..=size.max(y0 + 1))?;
    let (x0, y0, x1, y1) = (f64::from(x0), f64::from(y0), f64::from(x1), f64::from(y1));
    let mut corners = [(x0, y0), (x1, y0), (x1, y1), (x0, y1)];
    if u.arbitrary()? {
        corners.reverse();
    }
    let mut ret = BezPath::new();
    ret.move_to(corners[0]);
    for &p in &corners[1..] {
        ret.line_to(p);
    }
    ret.close_path();
    Ok(ret)
}

#[cfg(test)]
mod tests {
    use kurbo::Shape;

    use super::*;

    #[test]
    fn closed_and_bounded() {
        arbtest::arbtest(|u| {
            let path = closed_path(100.0, u)?;
            assert!(crate::tiles::is_closed(&path));
            let bbox = path.bounding_box();
            let lim = 100.0 + 1e-9;
            assert!(bbox.x0 >= -lim && bbox.x1 <= lim);
            assert!(bbox.y0 >= -lim && bbox.y1 <= lim);

            let rect = integer_rect(10, u)?;
            assert!(crate::tiles::is_closed(&rect));
            assert!(rect.area().abs() >= 1.0);
            Ok(())
        })
        .budget_ms(200);
    }
}
