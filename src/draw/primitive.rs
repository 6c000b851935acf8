//! Renderer-independent description of what a scene item looks like.

use crate::draw::config::Rgba;
use crate::fem::ClothFem;
use crate::geom::bboxes::bounding_box;
use crate::sdf::{Sdf, SdfCollection, SdfPlane, SdfSphere};
use crate::{Mesh, Point, TriangleIndex, Vector};
use anyhow::Result;
use std::cell::RefCell;
use std::rc::Rc;

const CLOTH_EDGE_COLOR: Rgba = (0.0, 0.0, 0.0, 1.0);
const CLOTH_FACE_COLOR: Rgba = (1.0, 0.6, 0.2, 1.0);
const COLLIDER_COLOR: Rgba = (0.3, 0.3, 1.0, 0.4);

/// Half size of the square patch drawn for a plane collider.
const PLANE_HALF_SIZE: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Triangles {
        positions: Vec<Point>,
        indices: Vec<TriangleIndex>,
        color: Rgba,
    },
    Lines {
        segments: Vec<(Point, Point)>,
        color: Rgba,
    },
    Sphere {
        center: Point,
        radius: f64,
        color: Rgba,
    },
}

impl Primitive {
    /// Points spanning the primitive, used to frame the camera.
    pub fn extent(&self) -> Vec<Point> {
        match self {
            Primitive::Triangles { positions, .. } => positions.clone(),
            Primitive::Lines { segments, .. } => {
                segments.iter().flat_map(|&(a, b)| [a, b]).collect()
            }
            Primitive::Sphere { center, radius, .. } => {
                let r = Vector::new(*radius, *radius, *radius);
                vec![*center + (-r), *center + r]
            }
        }
    }
}

/// Bounding box over all primitives.
pub fn scene_bounds(primitives: &[Primitive]) -> Option<(Point, Point)> {
    let pts: Vec<Point> = primitives.iter().flat_map(|p| p.extent()).collect();
    bounding_box(&pts)
}

/// Something the viewer can show and, optionally, advance every frame.
pub trait Drawable {
    fn primitives(&self) -> Vec<Primitive>;

    fn animate(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: Drawable> Drawable for Rc<RefCell<T>> {
    fn primitives(&self) -> Vec<Primitive> {
        self.borrow().primitives()
    }

    fn animate(&mut self) -> Result<()> {
        self.borrow_mut().animate()
    }
}

/// A mesh with its display color.
#[derive(Debug, Clone)]
pub struct MeshView {
    pub mesh: Mesh,
    pub color: Rgba,
}

impl MeshView {
    pub fn new(mesh: Mesh, color: Rgba) -> Self {
        Self { mesh, color }
    }
}

impl Drawable for MeshView {
    fn primitives(&self) -> Vec<Primitive> {
        vec![Primitive::Triangles {
            positions: self.mesh.vertices.clone(),
            indices: self.mesh.faces.clone(),
            color: self.color,
        }]
    }
}

impl Drawable for Mesh {
    fn primitives(&self) -> Vec<Primitive> {
        MeshView::new(self.clone(), (0.8, 0.8, 0.8, 1.0)).primitives()
    }
}

/// The cloth draws its edges and steps the simulation once per frame.
impl Drawable for ClothFem {
    fn primitives(&self) -> Vec<Primitive> {
        let x = self.positions();
        let mut edges: Vec<(usize, usize)> = self
            .triangles()
            .iter()
            .flat_map(|t| t.edges())
            .map(|(a, b)| (a.min(b), a.max(b)))
            .collect();
        edges.sort_unstable();
        edges.dedup();
        vec![Primitive::Lines {
            segments: edges.into_iter().map(|(a, b)| (x[a], x[b])).collect(),
            color: CLOTH_EDGE_COLOR,
        }]
    }

    fn animate(&mut self) -> Result<()> {
        self.step()?;
        Ok(())
    }
}

/// Surface of a cloth that is simulated elsewhere.
#[derive(Debug, Clone)]
pub struct ClothSurface {
    cloth: Rc<RefCell<ClothFem>>,
    pub color: Rgba,
}

impl ClothSurface {
    pub fn new(cloth: Rc<RefCell<ClothFem>>) -> Self {
        Self {
            cloth,
            color: CLOTH_FACE_COLOR,
        }
    }

    pub fn with_color(mut self, color: Rgba) -> Self {
        self.color = color;
        self
    }
}

impl Drawable for ClothSurface {
    fn primitives(&self) -> Vec<Primitive> {
        let cloth = self.cloth.borrow();
        vec![Primitive::Triangles {
            positions: cloth.positions(),
            indices: cloth.triangles().to_vec(),
            color: self.color,
        }]
    }
}

impl Drawable for SdfSphere {
    fn primitives(&self) -> Vec<Primitive> {
        vec![Primitive::Sphere {
            center: self.center,
            radius: self.radius,
            color: COLLIDER_COLOR,
        }]
    }
}

impl Drawable for SdfPlane {
    fn primitives(&self) -> Vec<Primitive> {
        let n = self.normal();
        // Any vector not parallel to the normal spans the patch
        let helper = if n.dx.abs() < 0.9 {
            Vector::new(1.0, 0.0, 0.0)
        } else {
            Vector::new(0.0, 1.0, 0.0)
        };
        let Some(u) = n.cross(&helper).normalize() else {
            return Vec::new();
        };
        let v = n.cross(&u);
        let h = PLANE_HALF_SIZE;
        let o = self.origin;
        let positions = vec![
            o + u * (-h) + v * (-h),
            o + u * h + v * (-h),
            o + u * h + v * h,
            o + u * (-h) + v * h,
        ];
        vec![Primitive::Triangles {
            positions,
            indices: vec![TriangleIndex(0, 1, 2), TriangleIndex(0, 2, 3)],
            color: COLLIDER_COLOR,
        }]
    }
}

impl Drawable for SdfCollection {
    fn primitives(&self) -> Vec<Primitive> {
        self.iter().flat_map(sdf_primitives).collect()
    }
}

fn sdf_primitives(sdf: &dyn Sdf) -> Vec<Primitive> {
    if let Some(s) = sdf.as_sphere() {
        s.primitives()
    } else if let Some(p) = sdf.as_plane() {
        p.primitives()
    } else if let Some(c) = sdf.as_collection() {
        c.primitives()
    } else {
        Vec::new()
    }
}

/// Coordinate axes: x red, y green, z blue.
#[derive(Debug, Clone, Copy)]
pub struct AxisXyz {
    pub length: f64,
}

impl AxisXyz {
    pub fn new(length: f64) -> Self {
        Self { length }
    }
}

impl Drawable for AxisXyz {
    fn primitives(&self) -> Vec<Primitive> {
        let o = Point::origin();
        let l = self.length;
        [
            (Point::new(l, 0., 0.), (1.0, 0.0, 0.0, 1.0)),
            (Point::new(0., l, 0.), (0.0, 0.8, 0.0, 1.0)),
            (Point::new(0., 0., l), (0.0, 0.0, 1.0, 1.0)),
        ]
        .into_iter()
        .map(|(tip, color)| Primitive::Lines {
            segments: vec![(o, tip)],
            color,
        })
        .collect()
    }
}
