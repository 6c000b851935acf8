//! Triangle quality metrics used to check the output of the mesher.

use crate::{Mesh, Point, Vector};

/// Quality metrics for a single triangle.
#[derive(Debug, Clone, Copy)]
pub struct TriangleQuality {
    /// Longest edge / shortest edge. Ideal is 1.0.
    pub aspect_ratio: f64,
    /// Minimum interior angle in degrees. 60° for equilateral.
    pub min_angle: f64,
    /// Maximum interior angle in degrees.
    pub max_angle: f64,
    pub area: f64,
}

/// Summary over all triangles of a mesh.
#[derive(Debug, Clone)]
pub struct MeshQuality {
    pub triangle_count: usize,
    /// Smallest angle found in any triangle.
    pub min_angle_deg: f64,
    /// Mean over triangles of their smallest angle.
    pub mean_min_angle_deg: f64,
    pub max_aspect_ratio: f64,
    /// Mean length of unique edges.
    pub mean_edge_length: f64,
    /// Number of triangles with (near) zero area.
    pub degenerate_count: usize,
}

impl Default for MeshQuality {
    fn default() -> Self {
        Self {
            triangle_count: 0,
            min_angle_deg: f64::INFINITY,
            mean_min_angle_deg: 0.0,
            max_aspect_ratio: 0.0,
            mean_edge_length: 0.0,
            degenerate_count: 0,
        }
    }
}

/// Analyzes the quality of a single triangle.
pub fn analyze_triangle(p0: Point, p1: Point, p2: Point) -> TriangleQuality {
    let e0 = p1 - p0;
    let e1 = p2 - p1;
    let e2 = p0 - p2;

    let len0 = e0.length();
    let len1 = e1.length();
    let len2 = e2.length();
    let min_edge = len0.min(len1).min(len2);
    let max_edge = len0.max(len1).max(len2);

    let aspect_ratio = if min_edge > 1e-10 {
        max_edge / min_edge
    } else {
        f64::INFINITY
    };

    // Angle at p0 lies between e0 and -e2, and so on around the triangle
    let angle0 = angle_between_vectors(&e0, &(-e2));
    let angle1 = angle_between_vectors(&e1, &(-e0));
    let angle2 = angle_between_vectors(&e2, &(-e1));

    TriangleQuality {
        aspect_ratio,
        min_angle: angle0.min(angle1).min(angle2),
        max_angle: angle0.max(angle1).max(angle2),
        area: e0.cross(&(-e2)).length() / 2.0,
    }
}

/// Angle between two vectors in degrees (0 for zero-length input).
fn angle_between_vectors(v1: &Vector, v2: &Vector) -> f64 {
    let len1 = v1.length();
    let len2 = v2.length();
    if len1 < 1e-10 || len2 < 1e-10 {
        return 0.0;
    }
    let cos_angle = (v1.dot(v2) / (len1 * len2)).clamp(-1.0, 1.0);
    cos_angle.acos().to_degrees()
}

/// Analyzes the quality of a mesh.
pub fn analyze_mesh(mesh: &Mesh) -> MeshQuality {
    let vertices = mesh.vertices();
    let mut quality = MeshQuality::default();
    let mut sum_min_angle = 0.0;

    for face in mesh.faces() {
        let tq = analyze_triangle(vertices[face.0], vertices[face.1], vertices[face.2]);
        quality.triangle_count += 1;
        quality.min_angle_deg = quality.min_angle_deg.min(tq.min_angle);
        quality.max_aspect_ratio = quality.max_aspect_ratio.max(tq.aspect_ratio);
        sum_min_angle += tq.min_angle;
        if tq.area < 1e-14 {
            quality.degenerate_count += 1;
        }
    }

    if quality.triangle_count > 0 {
        quality.mean_min_angle_deg = sum_min_angle / quality.triangle_count as f64;
    }

    let edges = mesh.edges();
    if !edges.is_empty() {
        let total: f64 = edges
            .iter()
            .map(|&(a, b)| vertices[a].distance(&vertices[b]))
            .sum();
        quality.mean_edge_length = total / edges.len() as f64;
    }

    quality
}

/// Indices of triangles whose smallest angle is below `min_angle` degrees.
pub fn find_poor_quality_triangles(mesh: &Mesh, min_angle: f64) -> Vec<usize> {
    let vertices = mesh.vertices();
    mesh.faces()
        .iter()
        .enumerate()
        .filter(|(_, f)| analyze_triangle(vertices[f.0], vertices[f.1], vertices[f.2]).min_angle < min_angle)
        .map(|(idx, _)| idx)
        .collect()
}
