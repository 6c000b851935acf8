//! Triangle mesher for a single closed polygon.
//!
//! The boundary is resampled at the target edge length, the interior is
//! filled with a hexagonal point lattice, the point set is Delaunay
//! triangulated and triangles outside the polygon are dropped. A few
//! Laplacian smoothing passes then relax the interior vertices.

use crate::geom::mesh::delaunay::bowyer_watson;
use crate::geom::mesh::quality::{analyze_mesh, find_poor_quality_triangles};
use crate::geom::polygon::{distance_to_boundary, is_point_inside_polygon, signed_area};
use crate::geom::triangles::{TriangleIndex, signed_area_xy, triangle_centroid};
use crate::{Mesh, Point};
use anyhow::{Result, anyhow, bail};
use tracing::{debug, info, warn};

/// Interior points closer than this fraction of the edge length to the boundary are dropped.
const BOUNDARY_CLEARANCE: f64 = 0.5;

/// Number of Laplacian smoothing passes over the interior vertices.
const SMOOTHING_ITERATIONS: usize = 3;

/// Triangles with a smaller angle (degrees) are reported after meshing.
const POOR_ANGLE_DEG: f64 = 15.0;

/// Upper bound on the number of generated points.
const MAX_POINTS: f64 = 2.0e6;

/// Meshes the closed loop `loop_pts` (xy plane) with target edge length `elen`.
pub fn mesh_polygon(loop_pts: &[Point], elen: f64) -> Result<Mesh> {
    if !(elen.is_finite() && elen > 0.0) {
        bail!("Target edge length must be positive and finite, got {elen}");
    }
    if loop_pts.len() < 3 {
        bail!("Polygon needs at least 3 vertices, got {}", loop_pts.len());
    }
    let area = signed_area(loop_pts).abs();
    let estimated_points = area / (elen * elen * 3.0_f64.sqrt() * 0.5);
    if estimated_points > MAX_POINTS {
        bail!("Target edge length {elen} is too small for a polygon of area {area}");
    }

    let boundary = resample_boundary(loop_pts, elen);
    let interior = fill_interior(loop_pts, elen);
    let num_boundary = boundary.len();
    debug!(
        "Mesher input: {} boundary points, {} interior points",
        num_boundary,
        interior.len()
    );

    let mut points = boundary;
    points.extend(interior);

    let triangles = bowyer_watson(&points)
        .ok_or_else(|| anyhow!("Delaunay triangulation failed for {} points", points.len()))?;

    // Keep triangles inside the polygon
    let triangles: Vec<TriangleIndex> = triangles
        .into_iter()
        .filter(|t| {
            let c = triangle_centroid(points[t.0], points[t.1], points[t.2]);
            is_point_inside_polygon(c, loop_pts)
        })
        .collect();
    if triangles.is_empty() {
        bail!("No triangle left inside the polygon");
    }

    smooth_interior(&mut points, &triangles, num_boundary, SMOOTHING_ITERATIONS);

    let mesh = compact(points, triangles)?;
    let quality = analyze_mesh(&mesh);
    info!(
        "Meshed polygon: {} vertices, {} triangles, min angle {:.1} deg, mean edge {:.4}",
        mesh.vertex_count(),
        mesh.face_count(),
        quality.min_angle_deg,
        quality.mean_edge_length
    );
    let poor = find_poor_quality_triangles(&mesh, POOR_ANGLE_DEG);
    if !poor.is_empty() {
        warn!(
            "{} triangles have an angle below {} deg",
            poor.len(),
            POOR_ANGLE_DEG
        );
    }
    Ok(mesh)
}

/// Splits every polygon edge into `ceil(len / elen)` equal segments.
///
/// Each polygon vertex appears once, at the start of its outgoing edge.
pub fn resample_boundary(loop_pts: &[Point], elen: f64) -> Vec<Point> {
    let n = loop_pts.len();
    let mut pts = Vec::new();
    for i in 0..n {
        let a = loop_pts[i];
        let b = loop_pts[(i + 1) % n];
        let nseg = num_segments(a.distance(&b), elen);
        for k in 0..nseg {
            pts.push(Point::new_between_2_points(a, b, k as f64 / nseg as f64));
        }
    }
    pts
}

/// Number of segments an edge of length `len` is split into.
pub fn num_segments(len: f64, elen: f64) -> usize {
    // Tolerance keeps exact multiples such as 2.0 / 0.05 from rounding up
    ((len / elen - 1e-9).ceil() as usize).max(1)
}

/// Hexagonal lattice points strictly inside the polygon and away from its boundary.
fn fill_interior(loop_pts: &[Point], elen: f64) -> Vec<Point> {
    let (xmin, xmax, ymin, ymax) = loop_pts.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(x0, x1, y0, y1), p| (x0.min(p.x), x1.max(p.x), y0.min(p.y), y1.max(p.y)),
    );
    let row_height = elen * 3.0_f64.sqrt() * 0.5;
    let min_dist = BOUNDARY_CLEARANCE * elen;

    let mut pts = Vec::new();
    let mut row = 0usize;
    loop {
        let y = ymin + row_height * row as f64;
        if y > ymax {
            break;
        }
        let offset = if row % 2 == 1 { 0.5 * elen } else { 0.0 };
        let mut col = 0usize;
        loop {
            let x = xmin + offset + elen * col as f64;
            if x > xmax {
                break;
            }
            let p = Point::xy(x, y);
            if is_point_inside_polygon(p, loop_pts) && distance_to_boundary(p, loop_pts) > min_dist
            {
                pts.push(p);
            }
            col += 1;
        }
        row += 1;
    }
    pts
}

/// Moves every vertex with index `>= first_free` to the mean of its neighbors.
///
/// A move is rejected when it would flip or collapse any incident triangle.
fn smooth_interior(
    points: &mut [Point],
    triangles: &[TriangleIndex],
    first_free: usize,
    iterations: usize,
) {
    let n = points.len();
    let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut incident: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (it, t) in triangles.iter().enumerate() {
        for (a, b) in t.edges() {
            if !neighbors[a].contains(&b) {
                neighbors[a].push(b);
            }
            if !neighbors[b].contains(&a) {
                neighbors[b].push(a);
            }
        }
        for v in t.as_array() {
            incident[v].push(it);
        }
    }

    for _ in 0..iterations {
        let mut moved = 0usize;
        for v in first_free..n {
            if neighbors[v].is_empty() {
                continue;
            }
            let inv = 1.0 / neighbors[v].len() as f64;
            let (sx, sy) = neighbors[v]
                .iter()
                .fold((0.0, 0.0), |(sx, sy), &j| (sx + points[j].x, sy + points[j].y));
            let old = points[v];
            points[v] = Point::xy(sx * inv, sy * inv);
            let valid = incident[v].iter().all(|&it| {
                let t = triangles[it];
                signed_area_xy(points[t.0], points[t.1], points[t.2]) > 1e-14
            });
            if valid {
                moved += 1;
            } else {
                points[v] = old;
            }
        }
        debug!("Smoothing pass moved {moved} vertices");
    }
}

/// Drops vertices not used by any triangle and renumbers the rest.
fn compact(points: Vec<Point>, triangles: Vec<TriangleIndex>) -> Result<Mesh> {
    let mut used = vec![false; points.len()];
    for t in &triangles {
        for v in t.as_array() {
            used[v] = true;
        }
    }
    // Keep original ordering so boundary vertices stay first
    let mut remap = vec![usize::MAX; points.len()];
    let mut vertices = Vec::with_capacity(points.len());
    for (old, p) in points.into_iter().enumerate() {
        if used[old] {
            remap[old] = vertices.len();
            vertices.push(p);
        }
    }
    let faces = triangles
        .iter()
        .map(|t| TriangleIndex(remap[t.0], remap[t.1], remap[t.2]))
        .collect();
    Mesh::new(vertices, faces)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::xy(-1., -1.),
            Point::xy(1., -1.),
            Point::xy(1., 1.),
            Point::xy(-1., 1.),
        ]
    }

    #[test]
    fn test_num_segments() {
        assert_eq!(num_segments(2.0, 0.05), 40);
        assert_eq!(num_segments(2.01, 0.05), 41);
        assert_eq!(num_segments(0.01, 0.05), 1);
    }

    #[test]
    fn test_resample_boundary() {
        let pts = resample_boundary(&square(), 0.5);
        assert_eq!(pts.len(), 16);
        assert!(pts[0].is_close(&Point::xy(-1., -1.)));
        assert!(pts[4].is_close(&Point::xy(1., -1.)));
    }

    #[test]
    fn test_mesh_square() -> Result<()> {
        let mesh = mesh_polygon(&square(), 0.1)?;
        // Area is preserved and every triangle is CCW
        let mut area = 0.0;
        for t in mesh.faces() {
            let a = signed_area_xy(mesh.vertices[t.0], mesh.vertices[t.1], mesh.vertices[t.2]);
            assert!(a > 0.0);
            area += a;
        }
        assert!((area - 4.0).abs() < 1e-9, "area = {area}");
        // Boundary is the resampled outline
        assert_eq!(mesh.boundary_edges().len(), 80);
        for p in mesh.vertices() {
            assert!(p.x.abs() <= 1.0 + 1e-12 && p.y.abs() <= 1.0 + 1e-12);
            assert_eq!(p.z, 0.0);
        }
        let quality = analyze_mesh(&mesh);
        assert_eq!(quality.degenerate_count, 0);
        assert!(quality.mean_edge_length > 0.05 && quality.mean_edge_length < 0.15);
        Ok(())
    }

    #[test]
    fn test_mesh_l_shape() -> Result<()> {
        let l_shape = vec![
            Point::xy(0., 0.),
            Point::xy(2., 0.),
            Point::xy(2., 1.),
            Point::xy(1., 1.),
            Point::xy(1., 2.),
            Point::xy(0., 2.),
        ];
        let mesh = mesh_polygon(&l_shape, 0.2)?;
        let area: f64 = mesh
            .faces()
            .iter()
            .map(|t| signed_area_xy(mesh.vertices[t.0], mesh.vertices[t.1], mesh.vertices[t.2]))
            .sum();
        assert!((area - 3.0).abs() < 1e-9, "area = {area}");
        for t in mesh.faces() {
            let c = triangle_centroid(mesh.vertices[t.0], mesh.vertices[t.1], mesh.vertices[t.2]);
            assert!(is_point_inside_polygon(c, &l_shape));
        }
        Ok(())
    }

    #[test]
    fn test_clockwise_input() -> Result<()> {
        let mut pts = square();
        pts.reverse();
        let mesh = mesh_polygon(&pts, 0.25)?;
        for t in mesh.faces() {
            assert!(signed_area_xy(mesh.vertices[t.0], mesh.vertices[t.1], mesh.vertices[t.2]) > 0.0);
        }
        Ok(())
    }

    #[test]
    fn test_bad_edge_length() {
        assert!(mesh_polygon(&square(), 0.0).is_err());
        assert!(mesh_polygon(&square(), -1.0).is_err());
        assert!(mesh_polygon(&square(), f64::NAN).is_err());
        assert!(mesh_polygon(&square(), 1e-6).is_err());
    }
}
