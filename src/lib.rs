//! Cloth simulation and mesh viewing toolkit.
//!
//! A closed 2D polygon ([`Cad2D`]) is meshed into triangles, the mesh is
//! simulated as cloth ([`ClothFem`]) colliding with signed distance fields,
//! and everything can be shown in an interactive window ([`draw::Viewer`]).
//! Triangle meshes can also be read from PLY, STL and OBJ files.

pub mod cad2d;
pub mod draw;
pub mod fem;
pub mod geom;
pub mod io;
pub mod sdf;

// Prelude
pub use cad2d::Cad2D;
pub use draw::{AxisXyz, ClothSurface, Drawable, MeshView, Viewer, ViewerConfig};
pub use fem::{ClothConfig, ClothFem, StepReport};
pub use geom::mesh::{HasMesh, Mesh};
pub use geom::point::Point;
pub use geom::triangles::TriangleIndex;
pub use geom::vector::Vector;
pub use io::read_mesh;
pub use sdf::{Sdf, SdfCollection, SdfPlane, SdfSphere};
