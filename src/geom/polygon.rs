//! Planar polygon helpers working in the xy plane.
//!
//! Polygons are closed loops given by their vertices in order; the last
//! vertex connects back to the first one.

use crate::Point;

/// Signed area of the loop in the xy plane (shoelace formula).
///
/// Positive for counter-clockwise loops.
pub fn signed_area(loop_pts: &[Point]) -> f64 {
    let n = loop_pts.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let a = loop_pts[i];
        let b = loop_pts[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    0.5 * sum
}

/// Sum of edge lengths of the closed loop.
pub fn perimeter(loop_pts: &[Point]) -> f64 {
    let n = loop_pts.len();
    (0..n)
        .map(|i| loop_pts[i].distance(&loop_pts[(i + 1) % n]))
        .sum()
}

/// Even-odd test of `ptest` against the closed loop (xy only).
///
/// Points exactly on the boundary may be reported either way.
pub fn is_point_inside_polygon(ptest: Point, loop_pts: &[Point]) -> bool {
    let n = loop_pts.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let pi = loop_pts[i];
        let pj = loop_pts[j];
        if (pi.y > ptest.y) != (pj.y > ptest.y) {
            let x_cross = pj.x + (ptest.y - pj.y) / (pi.y - pj.y) * (pi.x - pj.x);
            if ptest.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Distance from `p` to the segment `a`-`b` (3D).
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.dot(&ab);
    if len_sq < 1e-30 {
        return p.distance(&a);
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    p.distance(&(a + ab * t))
}

/// Smallest distance from `p` to any edge of the closed loop.
pub fn distance_to_boundary(p: Point, loop_pts: &[Point]) -> f64 {
    let n = loop_pts.len();
    (0..n)
        .map(|i| distance_to_segment(p, loop_pts[i], loop_pts[(i + 1) % n]))
        .fold(f64::INFINITY, f64::min)
}

/// Checks whether two segments `a0-a1` and `b0-b1` cross in the xy plane.
///
/// Touching at end points does not count as crossing.
pub fn segments_cross_xy(a0: Point, a1: Point, b0: Point, b1: Point) -> bool {
    fn orient(p: Point, q: Point, r: Point) -> f64 {
        (q.x - p.x) * (r.y - p.y) - (q.y - p.y) * (r.x - p.x)
    }
    let d1 = orient(b0, b1, a0);
    let d2 = orient(b0, b1, a1);
    let d3 = orient(a0, a1, b0);
    let d4 = orient(a0, a1, b1);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

/// Checks if any two non-adjacent edges of the loop cross each other.
pub fn is_self_intersecting(loop_pts: &[Point]) -> bool {
    let n = loop_pts.len();
    for i in 0..n {
        let (a0, a1) = (loop_pts[i], loop_pts[(i + 1) % n]);
        for j in (i + 1)..n {
            // Adjacent edges share a vertex
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            let (b0, b1) = (loop_pts[j], loop_pts[(j + 1) % n]);
            if segments_cross_xy(a0, a1, b0, b1) {
                return true;
            }
        }
    }
    false
}
