use crate::Mesh;
use crate::Point;
use crate::draw::config::{RerunConfig, Rgba};
use crate::draw::primitive::{Drawable, Primitive};
use crate::fem::ClothFem;
use crate::geom::triangles::TriangleIndex;
use crate::sdf::SdfCollection;
use anyhow::Result;
use rerun as rr;

fn position(p: &Point) -> [f32; 3] {
    [p.x as f32, p.y as f32, p.z as f32]
}

fn triangle(t: &TriangleIndex) -> [u32; 3] {
    [t.0 as u32, t.1 as u32, t.2 as u32]
}

fn color(rgba: Rgba) -> rr::Color {
    let (r, g, b, a) = rgba;
    rr::Color(rr::Rgba32::from_linear_unmultiplied_rgba_f32(r, g, b, a))
}

/// Spawns a Rerun viewer and returns the stream to log into.
pub fn start_session(config: &RerunConfig) -> Result<rr::RecordingStream> {
    let session = rr::RecordingStreamBuilder::new(config.session_name.as_str()).spawn()?;
    Ok(session)
}

fn mesh_archetype(positions: &[Point], faces: &[TriangleIndex], rgba: Rgba) -> rr::Mesh3D {
    let (r, g, b, a) = rgba;
    rr::Mesh3D::new(positions.iter().map(position))
        .with_triangle_indices(faces.iter().map(triangle))
        .with_albedo_factor(rr::Rgba32::from_linear_unmultiplied_rgba_f32(r, g, b, a))
}

/// Logs a static mesh under `<prefix>/<name>`.
pub fn log_mesh(
    session: &rr::RecordingStream,
    config: &RerunConfig,
    name: &str,
    mesh: &Mesh,
) -> Result<()> {
    let path = format!("{}/{}", config.entity_prefix, name);
    session.log_static(
        path,
        &mesh_archetype(mesh.vertices(), mesh.faces(), config.face_color),
    )?;
    Ok(())
}

/// Logs the colliders of a collection as static entities.
///
/// Spheres become points with a radius, planes a square mesh patch.
pub fn log_colliders(
    session: &rr::RecordingStream,
    config: &RerunConfig,
    sdf: &SdfCollection,
) -> Result<()> {
    for (i, prim) in sdf.primitives().iter().enumerate() {
        let path = format!("{}/colliders/{}", config.entity_prefix, i);
        match prim {
            Primitive::Sphere { center, radius, .. } => session.log_static(
                path,
                &rr::Points3D::new([position(center)])
                    .with_radii([*radius as f32])
                    .with_colors([color(config.collider_color)]),
            )?,
            Primitive::Triangles {
                positions, indices, ..
            } => session.log_static(
                path,
                &mesh_archetype(positions, indices, config.collider_color),
            )?,
            Primitive::Lines { segments, .. } => session.log_static(
                path,
                &rr::LineStrips3D::new(
                    segments
                        .iter()
                        .map(|(a, b)| vec![rr::Vec3D(position(a)), rr::Vec3D(position(b))])
                        .collect::<Vec<_>>(),
                )
                .with_colors([color(config.collider_color)]),
            )?,
        }
    }
    Ok(())
}

/// Logs the cloth surface and its edges at the current step on the `step` timeline.
pub fn log_cloth_frame(
    session: &rr::RecordingStream,
    config: &RerunConfig,
    cloth: &ClothFem,
) -> Result<()> {
    session.set_time_sequence("step", cloth.step_count() as i64);
    let positions = cloth.positions();
    let path = format!("{}/cloth", config.entity_prefix);
    session.log(
        path.as_str(),
        &mesh_archetype(&positions, cloth.triangles(), config.face_color),
    )?;

    let strips: Vec<Vec<rr::Vec3D>> = cloth
        .triangles()
        .iter()
        .map(|t| {
            [t.0, t.1, t.2, t.0]
                .into_iter()
                .map(|i| rr::Vec3D(position(&positions[i])))
                .collect()
        })
        .collect();
    let n = strips.len();
    session.log(
        format!("{path}/edges"),
        &rr::LineStrips3D::new(strips)
            .with_radii(vec![config.edge_radius; n])
            .with_colors(vec![color(config.edge_color); n]),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(position(&Point::new(1.0, -2.0, 0.5)), [1.0, -2.0, 0.5]);
        assert_eq!(triangle(&TriangleIndex(3, 1, 2)), [3, 1, 2]);
    }

    #[test]
    fn test_log_to_memory_sink() -> Result<()> {
        let (session, _storage) =
            rr::RecordingStreamBuilder::new("clothview_test").memory()?;
        let config = RerunConfig::default();
        let mesh = Mesh::new(
            vec![Point::new(0., 0., 0.), Point::new(1., 0., 0.), Point::new(0., 1., 0.)],
            vec![TriangleIndex(0, 1, 2)],
        )?;
        log_mesh(&session, &config, "triangle", &mesh)?;
        let mut cloth = ClothFem::new(&mesh, Default::default())?;
        cloth
            .sdf_mut()
            .push(crate::sdf::SdfSphere::new(0.5, [0.0, 0.0, -1.0], true));
        cloth.sdf_mut().push(
            crate::sdf::SdfPlane::new(Point::new(0., 0., -2.), crate::Vector::new(0., 0., 1.))
                .ok_or_else(|| anyhow::anyhow!("zero plane normal"))?,
        );
        log_colliders(&session, &config, cloth.sdf())?;
        cloth.step()?;
        log_cloth_frame(&session, &config, &cloth)?;
        Ok(())
    }
}
