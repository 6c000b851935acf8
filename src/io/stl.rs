//! STL file format I/O.
//!
//! STL stores unconnected triangles, so shared vertices are merged on read.

use crate::{Mesh, Point, TriangleIndex, Vector};
use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// STL file format variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StlFormat {
    Ascii,
    Binary,
}

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// Writes a mesh to an STL file.
///
/// `name` goes to the `solid` line of ASCII files and to the binary header.
pub fn write_stl(path: &Path, mesh: &Mesh, name: &str, format: StlFormat) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    match format {
        StlFormat::Ascii => write_ascii(&mut writer, mesh, name)?,
        StlFormat::Binary => write_binary(&mut writer, mesh, name)?,
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write file: {}", path.display()))?;
    Ok(())
}

fn facets(mesh: &Mesh) -> impl Iterator<Item = (Vector, [Point; 3])> + '_ {
    mesh.faces().iter().map(|t| {
        let pts = [mesh.vertices[t.0], mesh.vertices[t.1], mesh.vertices[t.2]];
        let n = Vector::normal(pts[0], pts[1], pts[2]).unwrap_or(Vector::new(0.0, 0.0, 1.0));
        (n, pts)
    })
}

fn write_ascii<W: Write>(writer: &mut W, mesh: &Mesh, name: &str) -> Result<()> {
    writeln!(writer, "solid {name}")?;
    for (n, pts) in facets(mesh) {
        writeln!(writer, "  facet normal {} {} {}", n.dx, n.dy, n.dz)?;
        writeln!(writer, "    outer loop")?;
        for p in pts {
            writeln!(writer, "      vertex {} {} {}", p.x, p.y, p.z)?;
        }
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }
    writeln!(writer, "endsolid {name}")?;
    Ok(())
}

fn write_binary<W: Write>(writer: &mut W, mesh: &Mesh, name: &str) -> Result<()> {
    // The header must not start with "solid", which marks ASCII files
    let mut header = [0u8; HEADER_LEN];
    let text = format!("binary STL {name}");
    let len = text.len().min(HEADER_LEN);
    header[..len].copy_from_slice(&text.as_bytes()[..len]);
    writer.write_all(&header)?;

    let count = u32::try_from(mesh.face_count())?;
    writer.write_all(&count.to_le_bytes())?;
    for (n, pts) in facets(mesh) {
        for c in [n.dx, n.dy, n.dz] {
            writer.write_all(&(c as f32).to_le_bytes())?;
        }
        for p in pts {
            for c in [p.x, p.y, p.z] {
                writer.write_all(&(c as f32).to_le_bytes())?;
            }
        }
        writer.write_all(&0u16.to_le_bytes())?;
    }
    Ok(())
}

/// Reads an ASCII or binary STL file.
pub fn read_stl(path: &Path) -> Result<Mesh> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let parsed = if is_binary(&bytes) {
        parse_binary(&bytes)
    } else {
        parse_ascii(&bytes)
    };
    let triangles = parsed.with_context(|| format!("Invalid STL file: {}", path.display()))?;
    Ok(merge_vertices(&triangles))
}

/// A file is binary when its size matches the facet count in the header.
///
/// Some exporters write binary files whose header starts with "solid", so the
/// keyword alone does not decide.
fn is_binary(bytes: &[u8]) -> bool {
    if bytes.len() < HEADER_LEN + 4 {
        return false;
    }
    let mut count = [0u8; 4];
    count.copy_from_slice(&bytes[HEADER_LEN..HEADER_LEN + 4]);
    let count = u32::from_le_bytes(count) as usize;
    let expected = count
        .checked_mul(FACET_LEN)
        .and_then(|n| n.checked_add(HEADER_LEN + 4));
    expected == Some(bytes.len()) || !bytes.trim_ascii_start().starts_with(b"solid")
}

fn parse_binary(bytes: &[u8]) -> Result<Vec<[Point; 3]>> {
    let body = &bytes[HEADER_LEN + 4..];
    if body.len() % FACET_LEN != 0 {
        bail!("Binary STL body of {} bytes is not a whole number of facets", body.len());
    }
    let read_f32 = |chunk: &[u8], at: usize| {
        f32::from_le_bytes([chunk[at], chunk[at + 1], chunk[at + 2], chunk[at + 3]]) as f64
    };
    let triangles = body
        .chunks_exact(FACET_LEN)
        .map(|facet| {
            // Skip the normal, it is recomputed when needed
            let vertex = |k: usize| {
                let at = 12 + 12 * k;
                Point::new(
                    read_f32(facet, at),
                    read_f32(facet, at + 4),
                    read_f32(facet, at + 8),
                )
            };
            [vertex(0), vertex(1), vertex(2)]
        })
        .collect();
    Ok(triangles)
}

fn parse_ascii(bytes: &[u8]) -> Result<Vec<[Point; 3]>> {
    let text = std::str::from_utf8(bytes)?;
    let mut triangles = Vec::new();
    let mut current = Vec::with_capacity(3);
    for (num, line) in text.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("vertex") => {
                let coords = tokens
                    .map(|t| t.parse::<f64>())
                    .collect::<Result<Vec<_>, _>>()
                    .with_context(|| format!("Invalid vertex on line {}", num + 1))?;
                if coords.len() != 3 {
                    bail!("Vertex on line {} needs 3 coordinates", num + 1);
                }
                current.push(Point::new(coords[0], coords[1], coords[2]));
            }
            Some("endloop") => {
                if current.len() != 3 {
                    bail!(
                        "Facet ending on line {} has {} vertices",
                        num + 1,
                        current.len()
                    );
                }
                triangles.push([current[0], current[1], current[2]]);
                current.clear();
            }
            _ => {}
        }
    }
    Ok(triangles)
}

fn merge_vertices(triangles: &[[Point; 3]]) -> Mesh {
    const SCALE: f64 = 1e9;
    let mut index: HashMap<(i64, i64, i64), usize> = HashMap::new();
    let mut vertices = Vec::new();
    let mut faces = Vec::with_capacity(triangles.len());
    for tri in triangles {
        let ids = tri.map(|p| {
            let key = (
                (p.x * SCALE).round() as i64,
                (p.y * SCALE).round() as i64,
                (p.z * SCALE).round() as i64,
            );
            *index.entry(key).or_insert_with(|| {
                vertices.push(p);
                vertices.len() - 1
            })
        });
        faces.push(TriangleIndex::from(ids));
    }
    Mesh { vertices, faces }
}
