//! PLY (Polygon File Format) I/O.
//!
//! Reading goes through `ply-rs` and accepts ASCII as well as binary files.
//! Polygonal faces are split into triangle fans. Binary output is written by
//! hand because `ply-rs` writes the wrong list length for binary lists.

use crate::{Mesh, Point, TriangleIndex};
use anyhow::{Context, Result, anyhow};
use ply_rs::parser::Parser;
use ply_rs::ply::{
    Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
    ScalarType,
};
use ply_rs::writer::Writer;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Reads a PLY file into a triangle mesh.
pub fn read_ply(path: &Path) -> Result<Mesh> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut reader = BufReader::new(file);

    let parser = Parser::<DefaultElement>::new();
    let header = parser
        .read_header(&mut reader)
        .with_context(|| format!("Failed to parse PLY header: {}", path.display()))?;
    let payload = parser
        .read_payload(&mut reader, &header)
        .with_context(|| format!("Failed to read PLY payload: {}", path.display()))?;

    let vertex_elements = payload
        .get("vertex")
        .ok_or_else(|| anyhow!("PLY file has no vertex element: {}", path.display()))?;
    let vertices = vertex_elements
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let coord = |key: &str| {
                scalar_property(e, key)
                    .ok_or_else(|| anyhow!("Vertex {i} has no numeric '{key}' property"))
            };
            Ok(Point::new(coord("x")?, coord("y")?, coord("z")?))
        })
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("Invalid PLY vertex data: {}", path.display()))?;

    let mut faces = Vec::new();
    if let Some(face_elements) = payload.get("face") {
        faces.reserve(face_elements.len());
        for e in face_elements {
            let indices = index_list(e);
            for k in 1..indices.len().saturating_sub(1) {
                faces.push(TriangleIndex(indices[0], indices[k], indices[k + 1]));
            }
        }
    }

    Mesh::new(vertices, faces).with_context(|| format!("Invalid PLY mesh: {}", path.display()))
}

fn scalar_property(element: &DefaultElement, key: &str) -> Option<f64> {
    match element.get(key)? {
        Property::Float(v) => Some(f64::from(*v)),
        Property::Double(v) => Some(*v),
        Property::Int(v) => Some(f64::from(*v)),
        Property::UInt(v) => Some(f64::from(*v)),
        Property::Short(v) => Some(f64::from(*v)),
        Property::UShort(v) => Some(f64::from(*v)),
        Property::Char(v) => Some(f64::from(*v)),
        Property::UChar(v) => Some(f64::from(*v)),
        _ => None,
    }
}

fn index_list(element: &DefaultElement) -> Vec<usize> {
    for key in ["vertex_indices", "vertex_index"] {
        let Some(prop) = element.get(key) else {
            continue;
        };
        return match prop {
            Property::ListInt(v) => v.iter().map(|&i| i as usize).collect(),
            Property::ListUInt(v) => v.iter().map(|&i| i as usize).collect(),
            Property::ListShort(v) => v.iter().map(|&i| i as usize).collect(),
            Property::ListUShort(v) => v.iter().map(|&i| i as usize).collect(),
            Property::ListChar(v) => v.iter().map(|&i| i as usize).collect(),
            Property::ListUChar(v) => v.iter().map(|&i| i as usize).collect(),
            _ => Vec::new(),
        };
    }
    Vec::new()
}

/// Writes a mesh as PLY, binary little-endian or ASCII.
pub fn write_ply(path: &Path, mesh: &Mesh, binary: bool) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let written = if binary {
        write_ply_binary(&mut writer, mesh)
    } else {
        write_ply_ascii(&mut writer, mesh)
    };
    written.with_context(|| format!("Failed to write PLY file: {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

fn write_ply_binary<W: Write>(writer: &mut W, mesh: &Mesh) -> Result<()> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format binary_little_endian 1.0")?;
    writeln!(writer, "element vertex {}", mesh.vertex_count())?;
    for axis in ["x", "y", "z"] {
        writeln!(writer, "property float {axis}")?;
    }
    writeln!(writer, "element face {}", mesh.face_count())?;
    writeln!(writer, "property list uchar int vertex_indices")?;
    writeln!(writer, "end_header")?;

    for p in mesh.vertices() {
        for c in [p.x, p.y, p.z] {
            writer.write_all(&(c as f32).to_le_bytes())?;
        }
    }
    for t in mesh.faces() {
        writer.write_all(&[3u8])?;
        for i in t.as_array() {
            let i = i32::try_from(i).map_err(|_| anyhow!("Vertex index {i} too large for PLY"))?;
            writer.write_all(&i.to_le_bytes())?;
        }
    }
    Ok(())
}

fn write_ply_ascii<W: Write>(writer: &mut W, mesh: &Mesh) -> Result<()> {
    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = Encoding::Ascii;

    let mut vertex_def = ElementDef::new("vertex".to_string());
    for axis in ["x", "y", "z"] {
        vertex_def.properties.add(PropertyDef::new(
            axis.to_string(),
            PropertyType::Scalar(ScalarType::Double),
        ));
    }
    vertex_def.count = mesh.vertex_count();
    ply.header.elements.add(vertex_def);

    let mut face_def = ElementDef::new("face".to_string());
    face_def.properties.add(PropertyDef::new(
        "vertex_indices".to_string(),
        PropertyType::List(ScalarType::UChar, ScalarType::Int),
    ));
    face_def.count = mesh.face_count();
    ply.header.elements.add(face_def);

    let vertices = mesh
        .vertices()
        .iter()
        .map(|p| {
            let mut e = DefaultElement::new();
            e.insert("x".to_string(), Property::Double(p.x));
            e.insert("y".to_string(), Property::Double(p.y));
            e.insert("z".to_string(), Property::Double(p.z));
            e
        })
        .collect();
    ply.payload.insert("vertex".to_string(), vertices);

    let mut faces = Vec::with_capacity(mesh.face_count());
    for t in mesh.faces() {
        let indices = t
            .as_array()
            .iter()
            .map(|&i| i32::try_from(i).map_err(|_| anyhow!("Vertex index {i} too large for PLY")))
            .collect::<Result<Vec<i32>>>()?;
        let mut e = DefaultElement::new();
        e.insert("vertex_indices".to_string(), Property::ListInt(indices));
        faces.push(e);
    }
    ply.payload.insert("face".to_string(), faces);

    Writer::new().write_ply(writer, &mut ply)?;
    Ok(())
}
