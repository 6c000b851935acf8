//! Mesh file I/O.
//!
//! Supported formats are PLY, STL and Wavefront OBJ. The format is picked
//! from the file extension.

pub mod obj;
pub mod ply;
pub mod stl;

pub use obj::{read_obj, write_obj};
pub use ply::{read_ply, write_ply};
pub use stl::{StlFormat, read_stl, write_stl};

use crate::Mesh;
use anyhow::{Result, anyhow};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Ply,
    Stl,
    Obj,
}

impl MeshFormat {
    /// Detects the format from the (case-insensitive) file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "ply" => Some(Self::Ply),
            "stl" => Some(Self::Stl),
            "obj" => Some(Self::Obj),
            _ => None,
        }
    }

    fn require(path: &Path) -> Result<Self> {
        Self::from_path(path).ok_or_else(|| {
            anyhow!(
                "Unsupported mesh file type: {} (expected .ply, .stl or .obj)",
                path.display()
            )
        })
    }
}

/// Reads a triangle mesh, choosing the reader by file extension.
pub fn read_mesh(path: &Path) -> Result<Mesh> {
    let mesh = match MeshFormat::require(path)? {
        MeshFormat::Ply => read_ply(path)?,
        MeshFormat::Stl => read_stl(path)?,
        MeshFormat::Obj => read_obj(path)?,
    };
    tracing::info!(
        "Loaded {}: {} vertices, {} faces",
        path.display(),
        mesh.vertex_count(),
        mesh.face_count()
    );
    Ok(mesh)
}

/// Writes a triangle mesh, choosing the writer by file extension.
///
/// PLY and STL are written in binary form.
pub fn write_mesh(path: &Path, mesh: &Mesh) -> Result<()> {
    match MeshFormat::require(path)? {
        MeshFormat::Ply => write_ply(path, mesh, true),
        MeshFormat::Stl => write_stl(path, mesh, "mesh", StlFormat::Binary),
        MeshFormat::Obj => write_obj(path, mesh),
    }
}
