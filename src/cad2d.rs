//! Two-dimensional CAD shape: a single closed polygon with numbered edges.
//!
//! Edge `i` runs from vertex `i` to vertex `(i + 1) % n`. The shape lives in
//! the `z = 0` plane and can be meshed with triangles of a target edge length.

pub mod mesher;

use crate::geom::EPS;
use crate::geom::polygon::{
    distance_to_segment, is_self_intersecting, perimeter, signed_area,
};
use crate::{Mesh, Point};
use anyhow::{Result, anyhow, bail};

#[derive(Debug, Clone, PartialEq)]
pub struct Cad2D {
    vertices: Vec<Point>,
}

impl Cad2D {
    /// Creates a polygon from a flat coordinate list `[x0, y0, x1, y1, ...]`.
    pub fn from_flat_xy(list_xy: &[f64]) -> Result<Self> {
        if list_xy.len() % 2 != 0 {
            bail!(
                "Coordinate list must hold (x, y) pairs, got {} values",
                list_xy.len()
            );
        }
        let pts = list_xy
            .chunks_exact(2)
            .map(|xy| Point::xy(xy[0], xy[1]))
            .collect();
        Self::from_points(pts)
    }

    /// Creates a polygon from points; the z coordinate is dropped.
    pub fn from_points(pts: Vec<Point>) -> Result<Self> {
        let vertices: Vec<Point> = pts.into_iter().map(|p| Point::xy(p.x, p.y)).collect();
        let n = vertices.len();
        if n < 3 {
            bail!("Polygon needs at least 3 vertices, got {n}");
        }
        if vertices.iter().any(|p| !p.is_finite()) {
            bail!("Polygon coordinates must be finite");
        }
        for i in 0..n {
            if vertices[i].distance(&vertices[(i + 1) % n]) < EPS {
                bail!("Vertices {i} and {} coincide", (i + 1) % n);
            }
        }
        if signed_area(&vertices).abs() < EPS {
            bail!("Polygon has zero area");
        }
        if is_self_intersecting(&vertices) {
            bail!("Polygon edges intersect each other");
        }
        Ok(Self { vertices })
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_edges(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn vertex(&self, i: usize) -> Result<Point> {
        self.vertices
            .get(i)
            .copied()
            .ok_or_else(|| anyhow!("Vertex {i} out of range ({} vertices)", self.num_vertices()))
    }

    /// Start and end point of edge `i`.
    pub fn edge(&self, i: usize) -> Result<(Point, Point)> {
        if i >= self.num_edges() {
            bail!("Edge {i} out of range ({} edges)", self.num_edges());
        }
        Ok((self.vertices[i], self.vertices[(i + 1) % self.num_edges()]))
    }

    /// Enclosed area (always positive).
    pub fn area(&self) -> f64 {
        signed_area(&self.vertices).abs()
    }

    pub fn perimeter(&self) -> f64 {
        perimeter(&self.vertices)
    }

    pub fn is_ccw(&self) -> bool {
        signed_area(&self.vertices) > 0.0
    }

    /// Meshes the polygon with triangles of roughly `target_edge_length`.
    pub fn mesh(&self, target_edge_length: f64) -> Result<Mesh> {
        mesher::mesh_polygon(&self.vertices, target_edge_length)
    }

    /// Indices of `positions` lying on any of the edges `edge_ids`.
    ///
    /// Only x and y are compared. The result is sorted and free of duplicates.
    pub fn points_edge(&self, edge_ids: &[usize], positions: &[Point]) -> Result<Vec<usize>> {
        let segments = edge_ids
            .iter()
            .map(|&ie| self.edge(ie))
            .collect::<Result<Vec<_>>>()?;
        let tol = 1e-9 * (1.0 + self.perimeter());
        let ids = positions
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                let q = Point::xy(p.x, p.y);
                segments
                    .iter()
                    .any(|&(a, b)| distance_to_segment(q, a, b) < tol)
            })
            .map(|(i, _)| i)
            .collect();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Cad2D {
        Cad2D::from_flat_xy(&[-1., -1., 1., -1., 1., 1., -1., 1.]).unwrap()
    }

    #[test]
    fn test_from_flat_xy() {
        let cad = square();
        assert_eq!(cad.num_vertices(), 4);
        assert_eq!(cad.num_edges(), 4);
        assert!((cad.area() - 4.0).abs() < 1e-12);
        assert!((cad.perimeter() - 8.0).abs() < 1e-12);
        assert!(cad.is_ccw());
    }

    #[test]
    fn test_invalid_polygons() {
        // Odd number of coordinates
        assert!(Cad2D::from_flat_xy(&[0., 0., 1., 0., 1.]).is_err());
        // Too few points
        assert!(Cad2D::from_flat_xy(&[0., 0., 1., 0.]).is_err());
        // Repeated point
        assert!(Cad2D::from_flat_xy(&[0., 0., 1., 0., 1., 0., 0., 1.]).is_err());
        // Collinear, zero area
        assert!(Cad2D::from_flat_xy(&[0., 0., 1., 0., 2., 0.]).is_err());
        // Bow-tie
        assert!(Cad2D::from_flat_xy(&[0., 0., 1., 1., 1., 0., 0., 1.]).is_err());
        // Non-finite
        assert!(Cad2D::from_flat_xy(&[0., 0., 1., f64::NAN, 0., 1.]).is_err());
    }

    #[test]
    fn test_edge() -> Result<()> {
        let cad = square();
        let (a, b) = cad.edge(2)?;
        assert!(a.is_close(&Point::xy(1., 1.)));
        assert!(b.is_close(&Point::xy(-1., 1.)));
        let (_, b) = cad.edge(3)?;
        assert!(b.is_close(&Point::xy(-1., -1.)));
        assert!(cad.edge(4).is_err());
        assert!(cad.vertex(9).is_err());
        Ok(())
    }

    #[test]
    fn test_points_edge() -> Result<()> {
        let cad = square();
        let pts = vec![
            Point::xy(0., 1.),
            Point::xy(0., 0.),
            Point::xy(-1., 1.),
            Point::xy(1., 0.5),
            Point::new(0.3, 1.0, 0.7),
        ];
        assert_eq!(cad.points_edge(&[2], &pts)?, vec![0, 2, 4]);
        assert_eq!(cad.points_edge(&[1, 2], &pts)?, vec![0, 2, 3, 4]);
        assert!(cad.points_edge(&[7], &pts).is_err());
        Ok(())
    }

    #[test]
    fn test_points_edge_on_mesh() -> Result<()> {
        let cad = square();
        let mesh = cad.mesh(0.05)?;
        let ids = cad.points_edge(&[2], mesh.vertices())?;
        assert_eq!(ids.len(), 41);
        for i in ids {
            assert!((mesh.vertices()[i].y - 1.0).abs() < 1e-12);
        }
        Ok(())
    }
}
