//! Wavefront OBJ I/O, geometry only.
//!
//! `v` and `f` records are read; texture coordinates, normals, groups and
//! materials are ignored.

use crate::{Mesh, Point, TriangleIndex};
use anyhow::{Context, Result, anyhow, bail};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Reads an OBJ file. Polygonal faces are split into triangle fans.
pub fn read_obj(path: &Path) -> Result<Mesh> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    parse_obj(BufReader::new(file)).with_context(|| format!("Invalid OBJ file: {}", path.display()))
}

fn parse_obj<R: BufRead>(reader: R) -> Result<Mesh> {
    let mut vertices = Vec::new();
    let mut faces = Vec::new();
    for (num, line) in reader.lines().enumerate() {
        let line = line?;
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let coords = tokens
                    .take(3)
                    .map(str::parse::<f64>)
                    .collect::<Result<Vec<_>, _>>()
                    .with_context(|| format!("Invalid vertex on line {}", num + 1))?;
                if coords.len() != 3 {
                    bail!("Vertex on line {} needs 3 coordinates", num + 1);
                }
                vertices.push(Point::new(coords[0], coords[1], coords[2]));
            }
            Some("f") => {
                let ids = tokens
                    .map(|t| resolve_index(t, vertices.len()))
                    .collect::<Result<Vec<_>>>()
                    .with_context(|| format!("Invalid face on line {}", num + 1))?;
                if ids.len() < 3 {
                    bail!("Face on line {} has fewer than 3 vertices", num + 1);
                }
                for k in 1..ids.len() - 1 {
                    faces.push(TriangleIndex(ids[0], ids[k], ids[k + 1]));
                }
            }
            _ => {}
        }
    }
    Mesh::new(vertices, faces)
}

/// Turns a face token (`7`, `7/1`, `7//3`, `-1`) into a 0-based vertex index.
///
/// Negative indices count back from the last vertex read so far.
fn resolve_index(token: &str, num_vertices: usize) -> Result<usize> {
    let head = token.split('/').next().unwrap_or(token);
    let idx: i64 = head
        .parse()
        .with_context(|| format!("Bad face index '{token}'"))?;
    let resolved = match idx {
        0 => None,
        i if i > 0 => Some(i as usize - 1),
        i => num_vertices.checked_sub(i.unsigned_abs() as usize),
    };
    resolved
        .filter(|&i| i < num_vertices)
        .ok_or_else(|| anyhow!("Face index {idx} out of range ({num_vertices} vertices)"))
}

/// Writes the mesh with 1-based face indices.
pub fn write_obj(path: &Path, mesh: &Mesh) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut w = BufWriter::new(file);
    writeln!(w, "# {} vertices, {} faces", mesh.vertex_count(), mesh.face_count())?;
    for p in mesh.vertices() {
        writeln!(w, "v {} {} {}", p.x, p.y, p.z)?;
    }
    for t in mesh.faces() {
        writeln!(w, "f {} {} {}", t.0 + 1, t.1 + 1, t.2 + 1)?;
    }
    w.flush()
        .with_context(|| format!("Failed to write file: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_roundtrip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("tri.obj");
        let mesh = Mesh::new(
            vec![
                Point::new(0.0, 0.0, 0.0),
                Point::new(1.5, 0.0, 0.0),
                Point::new(0.0, 1.0, -0.25),
            ],
            vec![TriangleIndex(0, 1, 2)],
        )?;
        write_obj(&path, &mesh)?;
        assert_eq!(read_obj(&path)?, mesh);
        Ok(())
    }

    #[test]
    fn test_index_forms() -> Result<()> {
        let text = "# quad\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvn 0 0 1\n\
                    f 1/1/1 2/2/1 3//1 4\nf -4 -2 -1\n";
        let mesh = parse_obj(text.as_bytes())?;
        assert_eq!(
            mesh.faces(),
            &[
                TriangleIndex(0, 1, 2),
                TriangleIndex(0, 2, 3),
                TriangleIndex(0, 2, 3),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_bad_indices() {
        assert!(parse_obj("v 0 0 0\nv 1 0 0\nf 1 2 3\n".as_bytes()).is_err());
        assert!(parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n".as_bytes()).is_err());
        assert!(parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -4 1 2\n".as_bytes()).is_err());
        assert!(parse_obj("v 0 0\n".as_bytes()).is_err());
        assert!(parse_obj("v 0 0 0\nf 1 1\n".as_bytes()).is_err());
    }
}
