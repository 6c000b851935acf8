//! Triangle mesh representation, 2D Delaunay triangulation and quality analysis.

pub mod delaunay;
pub mod quality;

use crate::geom::bboxes::bounding_box;
use crate::geom::triangles::{triangle_area, triangle_normal};
use crate::{Point, TriangleIndex, Vector};
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A triangle mesh defined by vertices and face indices.
///
/// A mesh without faces represents a point cloud.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Point>,
    pub faces: Vec<TriangleIndex>,
}

impl Mesh {
    /// Creates a new mesh and checks that every face index refers to a vertex.
    pub fn new(vertices: Vec<Point>, faces: Vec<TriangleIndex>) -> Result<Self> {
        let n = vertices.len();
        for (i, f) in faces.iter().enumerate() {
            if f.0 >= n || f.1 >= n || f.2 >= n {
                bail!("Face {i} {:?} refers to a vertex out of range ({n} vertices)", f);
            }
        }
        Ok(Self { vertices, faces })
    }

    /// Creates a mesh from (simulated) vertex positions sharing the topology of `topology`.
    pub fn from_positions(positions: &[Point], topology: &Mesh) -> Result<Self> {
        if positions.len() != topology.vertex_count() {
            bail!(
                "Got {} positions for a mesh with {} vertices",
                positions.len(),
                topology.vertex_count()
            );
        }
        Ok(Self {
            vertices: positions.to_vec(),
            faces: topology.faces.clone(),
        })
    }

    /// Returns a reference to the vertices.
    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// Returns a reference to the faces.
    pub fn faces(&self) -> &[TriangleIndex] {
        &self.faces
    }

    /// Returns the number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of faces (triangles).
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Uniformly scales all vertices about the origin.
    pub fn scale_xyz(&mut self, factor: f64) {
        for p in self.vertices.iter_mut() {
            *p = p.scale(factor);
        }
    }

    /// Moves all vertices by `v`.
    pub fn translate(&mut self, v: Vector) {
        for p in self.vertices.iter_mut() {
            *p = *p + v;
        }
    }

    pub fn bounding_box(&self) -> Option<(Point, Point)> {
        bounding_box(&self.vertices)
    }

    /// Center of the bounding box.
    pub fn center(&self) -> Option<Point> {
        self.bounding_box()
            .map(|(pmin, pmax)| Point::new_between_2_points(pmin, pmax, 0.5))
    }

    /// Total surface area.
    pub fn area(&self) -> f64 {
        self.faces
            .iter()
            .map(|t| triangle_area(self.vertices[t.0], self.vertices[t.1], self.vertices[t.2]))
            .sum()
    }

    /// Unique undirected edges, each as `(min, max)` vertex indices, sorted.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let set: BTreeSet<(usize, usize)> = self
            .faces
            .iter()
            .flat_map(|t| t.edges())
            .map(|(a, b)| if a < b { (a, b) } else { (b, a) })
            .collect();
        set.into_iter().collect()
    }

    /// Edges used by exactly one face.
    pub fn boundary_edges(&self) -> Vec<(usize, usize)> {
        let mut edge_counts: HashMap<(usize, usize), usize> = HashMap::new();
        for t in &self.faces {
            for (a, b) in t.edges() {
                let key = if a < b { (a, b) } else { (b, a) };
                *edge_counts.entry(key).or_insert(0) += 1;
            }
        }
        let mut edges: Vec<(usize, usize)> = edge_counts
            .into_iter()
            .filter_map(|(e, count)| if count == 1 { Some(e) } else { None })
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Unit normal per face (zero vector for degenerate faces).
    pub fn face_normals(&self) -> Vec<Vector> {
        self.faces
            .iter()
            .map(|t| {
                triangle_normal(self.vertices[t.0], self.vertices[t.1], self.vertices[t.2])
                    .unwrap_or(Vector::zero())
            })
            .collect()
    }

    /// Area-weighted vertex normals.
    pub fn vertex_normals(&self) -> Vec<Vector> {
        let mut normals = vec![Vector::zero(); self.vertices.len()];
        for t in &self.faces {
            let (p0, p1, p2) = (self.vertices[t.0], self.vertices[t.1], self.vertices[t.2]);
            // Cross product length is twice the area, which is the weight we want
            let n = (p1 - p0).cross(&(p2 - p0));
            for i in t.as_array() {
                normals[i] = normals[i] + n;
            }
        }
        normals
            .into_iter()
            .map(|n| n.normalize().unwrap_or(Vector::zero()))
            .collect()
    }

    /// Returns a new mesh with duplicate vertices merged.
    ///
    /// Vertices are considered identical when they quantize to the same
    /// `(i64, i64, i64)` key at 1e9 scale. Face indices are remapped accordingly.
    pub fn deduplicate_vertices(self) -> Self {
        const SCALE: f64 = 1e9;

        let mut key_map: HashMap<(i64, i64, i64), usize> = HashMap::new();
        let mut new_vertices: Vec<Point> = Vec::new();
        let mut old_to_new: Vec<usize> = Vec::with_capacity(self.vertices.len());

        for p in &self.vertices {
            let key = (
                (p.x * SCALE).round() as i64,
                (p.y * SCALE).round() as i64,
                (p.z * SCALE).round() as i64,
            );
            let new_idx = *key_map.entry(key).or_insert_with(|| {
                new_vertices.push(*p);
                new_vertices.len() - 1
            });
            old_to_new.push(new_idx);
        }

        let faces = self
            .faces
            .iter()
            .map(|t| TriangleIndex(old_to_new[t.0], old_to_new[t.1], old_to_new[t.2]))
            .collect();

        Self {
            vertices: new_vertices,
            faces,
        }
    }
}

/// Trait for types that can produce a triangulated [`Mesh`].
pub trait HasMesh {
    /// Returns a deep copy of the mesh for this entity.
    fn copy_mesh(&self) -> Mesh;
}

impl HasMesh for Mesh {
    fn copy_mesh(&self) -> Mesh {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit square made of two triangles with duplicated diagonal corners.
    fn split_square() -> Mesh {
        Mesh::new(
            vec![
                Point::xy(0., 0.),
                Point::xy(1., 0.),
                Point::xy(1., 1.),
                Point::xy(0., 0.),
                Point::xy(1., 1.),
                Point::xy(0., 1.),
            ],
            vec![TriangleIndex(0, 1, 2), TriangleIndex(3, 4, 5)],
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_bad_index() {
        let res = Mesh::new(vec![Point::origin()], vec![TriangleIndex(0, 1, 2)]);
        assert!(res.is_err());
    }

    #[test]
    fn test_dedup() {
        let mesh = split_square();
        assert_eq!(mesh.vertex_count(), 6);
        let deduped = mesh.deduplicate_vertices();
        assert_eq!(deduped.vertex_count(), 4);
        assert_eq!(deduped.face_count(), 2);
        for tri in deduped.faces() {
            assert!(tri.as_array().iter().all(|&i| i < 4));
        }
    }

    #[test]
    fn test_edges_and_boundary() {
        let mesh = split_square().deduplicate_vertices();
        assert_eq!(mesh.edges().len(), 5);
        assert_eq!(mesh.boundary_edges().len(), 4);
    }

    #[test]
    fn test_scale_xyz() {
        let mut mesh = split_square();
        mesh.scale_xyz(0.03);
        let (_, pmax) = mesh.bounding_box().unwrap();
        assert!(pmax.is_close(&Point::new(0.03, 0.03, 0.0)));
        assert!((mesh.area() - 0.03 * 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_translate() {
        let mut mesh = split_square();
        mesh.translate(Vector::new(-0.5, -0.5, 2.0));
        assert!(mesh.center().unwrap().is_close(&Point::new(0.0, 0.0, 2.0)));
        assert!((mesh.area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_normals() {
        let mesh = split_square().deduplicate_vertices();
        for n in mesh.vertex_normals() {
            assert!(n.is_close(&Vector::new(0., 0., 1.)));
        }
        assert_eq!(mesh.face_normals().len(), 2);
    }

    #[test]
    fn test_from_positions() -> Result<()> {
        let mesh = split_square();
        let moved: Vec<Point> = mesh
            .vertices()
            .iter()
            .map(|p| *p + Vector::new(0., 0., 1.))
            .collect();
        let m2 = Mesh::from_positions(&moved, &mesh)?;
        assert_eq!(m2.faces(), mesh.faces());
        assert!(m2.center().unwrap().is_close(&Point::new(0.5, 0.5, 1.0)));
        assert!(Mesh::from_positions(&moved[..2], &mesh).is_err());
        Ok(())
    }
}
