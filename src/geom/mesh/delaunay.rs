//! Delaunay triangulation in the xy plane via the Bowyer-Watson incremental insertion algorithm.
//!
//! The z coordinate of the input points is ignored.

use std::collections::HashMap;

use crate::Point;
use crate::geom::bboxes::bounding_box;
use crate::geom::triangles::{TriangleIndex, signed_area_xy};

/// Internal triangle representation with cached circumcircle data.
struct BwTri {
    v: [usize; 3],
    cx: f64,
    cy: f64,
    radius_sq: f64,
}

/// Circumcircle of a triangle in xy. Returns None for collinear points.
fn circumcircle(a: Point, b: Point, c: Point) -> Option<(f64, f64, f64)> {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d.abs() < 1e-300 {
        return None;
    }
    let a2 = a.x * a.x + a.y * a.y;
    let b2 = b.x * b.x + b.y * b.y;
    let c2 = c.x * c.x + c.y * c.y;
    let ux = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
    let uy = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;
    let r2 = (a.x - ux).powi(2) + (a.y - uy).powi(2);
    Some((ux, uy, r2))
}

/// Creates a super-triangle enclosing all given points.
fn super_triangle(points: &[Point]) -> Option<[Point; 3]> {
    let (pmin, pmax) = bounding_box(points)?;

    let cx = (pmin.x + pmax.x) * 0.5;
    let cy = (pmin.y + pmax.y) * 0.5;
    let dx = (pmax.x - pmin.x).max(1e-6);
    let dy = (pmax.y - pmin.y).max(1e-6);

    // Large enough that every circumcircle of real points stays away from it
    let scale = 20.0 * dx.max(dy);

    Some([
        Point::xy(cx - scale, cy - scale),
        Point::xy(cx + scale, cy - scale),
        Point::xy(cx, cy + scale),
    ])
}

/// Bowyer-Watson incremental Delaunay triangulation.
///
/// Returns `None` if fewer than 3 points are provided or all points are collinear.
/// The returned triangles reference indices into `points` and are oriented
/// counter-clockwise.
pub fn bowyer_watson(points: &[Point]) -> Option<Vec<TriangleIndex>> {
    let n = points.len();
    if n < 3 {
        return None;
    }

    let super_pts = super_triangle(points)?;
    let mut all_points: Vec<Point> = points.iter().map(|p| Point::xy(p.x, p.y)).collect();
    all_points.extend_from_slice(&super_pts);
    let si = [n, n + 1, n + 2];

    let (cx, cy, radius_sq) = circumcircle(
        all_points[si[0]],
        all_points[si[1]],
        all_points[si[2]],
    )?;
    let mut tris: Vec<BwTri> = vec![BwTri {
        v: si,
        cx,
        cy,
        radius_sq,
    }];

    // Insert points one at a time
    for i in 0..n {
        let pt = all_points[i];

        // Find bad triangles: those whose circumcircle contains the new point
        let mut bad_indices: Vec<usize> = Vec::new();
        for (ti, tri) in tris.iter().enumerate() {
            let dist_sq = (tri.cx - pt.x).powi(2) + (tri.cy - pt.y).powi(2);
            if dist_sq < tri.radius_sq * (1.0 + 1e-12) {
                bad_indices.push(ti);
            }
        }

        if bad_indices.is_empty() {
            continue;
        }

        // Cavity boundary: edges shared by exactly one bad triangle
        let mut edge_count: HashMap<(usize, usize), (usize, (usize, usize))> = HashMap::new();
        for &bi in &bad_indices {
            let v = tris[bi].v;
            for (a, b) in [(v[0], v[1]), (v[1], v[2]), (v[2], v[0])] {
                let key = if a < b { (a, b) } else { (b, a) };
                edge_count
                    .entry(key)
                    .and_modify(|(count, _)| *count += 1)
                    .or_insert((1, (a, b)));
            }
        }
        let boundary_edges: Vec<(usize, usize)> = edge_count
            .into_values()
            .filter(|(count, _)| *count == 1)
            .map(|(_, edge)| edge)
            .collect();

        // Remove bad triangles (in reverse order to preserve indices)
        bad_indices.sort_unstable();
        for &bi in bad_indices.iter().rev() {
            tris.swap_remove(bi);
        }

        // Fan the cavity from the new point
        for (a, b) in boundary_edges {
            let (pa, pb) = (all_points[a], all_points[b]);
            let v = if signed_area_xy(pa, pb, pt) > 0.0 {
                [a, b, i]
            } else {
                [b, a, i]
            };
            if let Some((cx, cy, radius_sq)) =
                circumcircle(all_points[v[0]], all_points[v[1]], all_points[v[2]])
            {
                tris.push(BwTri {
                    v,
                    cx,
                    cy,
                    radius_sq,
                });
            }
        }
    }

    // Remove triangles referencing super-triangle vertices and slivers
    let result: Vec<TriangleIndex> = tris
        .into_iter()
        .filter(|t| t.v.iter().all(|&vi| vi < n))
        .filter(|t| {
            signed_area_xy(all_points[t.v[0]], all_points[t.v[1]], all_points[t.v[2]]) > 1e-15
        })
        .map(|t| TriangleIndex(t.v[0], t.v[1], t.v[2]))
        .collect();

    if result.is_empty() {
        None
    } else {
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_triangle() {
        let points = vec![Point::xy(0., 0.), Point::xy(1., 0.), Point::xy(0., 1.)];
        let tris = bowyer_watson(&points).unwrap();
        assert_eq!(tris.len(), 1);
    }

    #[test]
    fn test_square_with_center() {
        let points = vec![
            Point::xy(0., 0.),
            Point::xy(1., 0.),
            Point::xy(1., 1.),
            Point::xy(0., 1.),
            Point::xy(0.5, 0.5),
        ];
        let tris = bowyer_watson(&points).unwrap();
        assert_eq!(tris.len(), 4);
        let area: f64 = tris
            .iter()
            .map(|t| signed_area_xy(points[t.0], points[t.1], points[t.2]))
            .sum();
        assert!((area - 1.0).abs() < 1e-12, "area = {area}");
    }

    #[test]
    fn test_delaunay_property() {
        let points = vec![
            Point::xy(0., 0.),
            Point::xy(2., 0.1),
            Point::xy(1.1, 1.7),
            Point::xy(-0.5, 1.2),
            Point::xy(0.9, 0.6),
            Point::xy(2.3, 1.4),
        ];
        let tris = bowyer_watson(&points).unwrap();
        for t in &tris {
            let (cx, cy, r2) = circumcircle(points[t.0], points[t.1], points[t.2]).unwrap();
            for (pi, p) in points.iter().enumerate() {
                if t.as_array().contains(&pi) {
                    continue;
                }
                let d2 = (p.x - cx).powi(2) + (p.y - cy).powi(2);
                assert!(d2 >= r2 - 1e-9, "Point {pi} is inside circumcircle of {:?}", t);
            }
        }
    }

    #[test]
    fn test_all_triangles_ccw() {
        let points: Vec<Point> = (0..5)
            .flat_map(|i| (0..5).map(move |j| Point::xy(i as f64 * 0.3, j as f64 * 0.25)))
            .collect();
        let tris = bowyer_watson(&points).unwrap();
        // Regular 5x5 grid splits into 32 triangles
        assert_eq!(tris.len(), 32);
        for t in &tris {
            assert!(signed_area_xy(points[t.0], points[t.1], points[t.2]) > 0.0);
        }
    }

    #[test]
    fn test_collinear_returns_none() {
        let points = vec![Point::xy(0., 0.), Point::xy(1., 0.), Point::xy(2., 0.)];
        assert!(bowyer_watson(&points).is_none());
    }
}
