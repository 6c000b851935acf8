use anyhow::Result;
use three_d::control::OrbitControl;
use three_d::{
    Blend, Camera, ClearState, ColorMaterial, Context, CpuMesh, DepthTest, FrameOutput, Gm,
    Indices, InnerSpace, InstancedMesh, Instances, Mat4, Mesh, Object, Positions, Quat,
    RenderStates, Srgba, Vec3, Window, WindowSettings, WriteMask, degrees, vec3,
};
use tracing::{error, info};

use crate::Point;
use crate::draw::config::{Rgba, ViewerConfig};
use crate::draw::primitive::{Drawable, Primitive, scene_bounds};
use crate::geom::triangles::TriangleIndex;

const MAX_DISTANCE: f32 = 1000.0;

/// Interactive window showing a list of scene items.
pub struct Viewer {
    config: ViewerConfig,
}

fn to_vec3(p: Point) -> Vec3 {
    vec3(p.x as f32, p.y as f32, p.z as f32)
}

fn to_srgba(c: Rgba) -> Srgba {
    let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Srgba::new(byte(c.0), byte(c.1), byte(c.2), byte(c.3))
}

fn material(color: Rgba) -> ColorMaterial {
    if color.3 < 1.0 {
        ColorMaterial {
            color: to_srgba(color),
            render_states: RenderStates {
                write_mask: WriteMask::COLOR,
                blend: Blend::TRANSPARENCY,
                ..Default::default()
            },
            is_transparent: true,
            ..Default::default()
        }
    } else {
        ColorMaterial {
            color: to_srgba(color),
            ..Default::default()
        }
    }
}

/// Transform mapping the unit x cylinder onto the segment `p1 -> p2`.
fn edge_transform(p1: Vec3, p2: Vec3) -> Mat4 {
    Mat4::from_translation(p1)
        * Into::<Mat4>::into(Quat::from_arc(vec3(1.0, 0.0, 0.0), (p2 - p1).normalize(), None))
        * Mat4::from_nonuniform_scale((p2 - p1).magnitude(), 1.0, 1.0)
}

fn triangle_edges(positions: &[Point], indices: &[TriangleIndex]) -> Vec<(Point, Point)> {
    let mut edges: Vec<(usize, usize)> = indices
        .iter()
        .flat_map(|t| t.edges())
        .map(|(a, b)| (a.min(b), a.max(b)))
        .collect();
    edges.sort_unstable();
    edges.dedup();
    edges
        .into_iter()
        .map(|(a, b)| (positions[a], positions[b]))
        .collect()
}

/// GPU objects for one frame.
struct FrameObjects {
    meshes: Vec<Gm<Mesh, ColorMaterial>>,
    instanced: Vec<Gm<InstancedMesh, ColorMaterial>>,
}

impl FrameObjects {
    fn objects(&self) -> Vec<&dyn Object> {
        // Opaque first so translucent surfaces blend over them
        let mut out: Vec<&dyn Object> = Vec::new();
        for gm in &self.instanced {
            out.extend(gm);
        }
        for gm in &self.meshes {
            out.extend(gm);
        }
        out
    }
}

struct SceneBuilder<'a> {
    context: &'a Context,
    config: &'a ViewerConfig,
    edge_radius: f32,
}

impl SceneBuilder<'_> {
    fn build(&self, primitives: &[Primitive]) -> Result<FrameObjects> {
        let mut frame = FrameObjects {
            meshes: Vec::new(),
            instanced: Vec::new(),
        };
        for prim in primitives {
            match prim {
                Primitive::Triangles {
                    positions,
                    indices,
                    color,
                } => {
                    if indices.is_empty() {
                        continue;
                    }
                    let mut cpu = CpuMesh {
                        positions: Positions::F32(positions.iter().map(|&p| to_vec3(p)).collect()),
                        indices: Indices::U32(
                            indices
                                .iter()
                                .flat_map(|t| [t.0 as u32, t.1 as u32, t.2 as u32])
                                .collect(),
                        ),
                        ..Default::default()
                    };
                    cpu.compute_normals();
                    frame
                        .meshes
                        .push(Gm::new(Mesh::new(self.context, &cpu), material(*color)));
                    if let Some(edge_color) = self.config.edge_color {
                        let edges = triangle_edges(positions, indices);
                        frame.instanced.push(self.cylinders(&edges, edge_color)?);
                    }
                }
                Primitive::Lines { segments, color } => {
                    frame.instanced.push(self.cylinders(segments, *color)?);
                }
                Primitive::Sphere {
                    center,
                    radius,
                    color,
                } => {
                    let mut cpu = CpuMesh::sphere(32);
                    cpu.transform(
                        Mat4::from_translation(to_vec3(*center)) * Mat4::from_scale(*radius as f32),
                    )?;
                    frame
                        .meshes
                        .push(Gm::new(Mesh::new(self.context, &cpu), material(*color)));
                }
            }
        }
        Ok(frame)
    }

    fn cylinders(
        &self,
        segments: &[(Point, Point)],
        color: Rgba,
    ) -> Result<Gm<InstancedMesh, ColorMaterial>> {
        let mut cylinder = CpuMesh::cylinder(8);
        cylinder.transform(Mat4::from_nonuniform_scale(
            1.0,
            self.edge_radius,
            self.edge_radius,
        ))?;
        let transformations = segments
            .iter()
            .map(|&(a, b)| (to_vec3(a), to_vec3(b)))
            .filter(|(a, b)| (b - a).magnitude() > 1e-9)
            .map(|(a, b)| edge_transform(a, b))
            .collect::<Vec<Mat4>>();
        let instances = Instances {
            transformations,
            ..Default::default()
        };
        Ok(Gm::new(
            InstancedMesh::new(self.context, &instances, &cylinder),
            ColorMaterial {
                color: to_srgba(color),
                render_states: RenderStates {
                    depth_test: DepthTest::LessOrEqual,
                    ..Default::default()
                },
                ..Default::default()
            },
        ))
    }
}

impl Viewer {
    pub fn new(config: ViewerConfig) -> Self {
        Self { config }
    }

    /// Opens the window and runs until it is closed.
    ///
    /// Every frame each item is animated and then drawn. The first animation
    /// error is logged and animation stops while drawing continues.
    pub fn run(self, mut items: Vec<Box<dyn Drawable>>) -> Result<()> {
        let window = Window::new(WindowSettings {
            title: self.config.title.clone(),
            max_size: self.config.window_size,
            ..Default::default()
        })?;
        let context = window.gl();

        let initial: Vec<Primitive> = items.iter().flat_map(|it| it.primitives()).collect();
        let (center, radius) = match scene_bounds(&initial) {
            Some((lo, hi)) => {
                let center = to_vec3(Point::new_between_2_points(lo, hi, 0.5));
                let radius = (to_vec3(hi) - to_vec3(lo)).magnitude() * 0.5;
                (center, radius.max(1e-3))
            }
            None => (vec3(0.0, 0.0, 0.0), 1.0),
        };
        info!(
            "Viewer: {} items, scene radius {:.3}",
            items.len(),
            radius
        );

        let mut camera = Camera::new_perspective(
            window.viewport(),
            center + vec3(1.0, -1.5, 1.0).normalize() * (radius * 3.0),
            center,
            vec3(0.0, 0.0, 1.0),
            degrees(45.0),
            radius * 0.01,
            radius * MAX_DISTANCE,
        );
        let mut control = OrbitControl::new(center, radius * 0.5, radius * MAX_DISTANCE);

        let config = self.config;
        let background = config.background;
        let edge_radius = radius * config.edge_radius_factor;
        let mut animating = true;

        window.render_loop(move |mut frame_input| {
            camera.set_viewport(frame_input.viewport);
            control.handle_events(&mut camera, &mut frame_input.events);

            if animating {
                for item in items.iter_mut() {
                    if let Err(e) = item.animate() {
                        error!("Animation stopped: {e:#}");
                        animating = false;
                        break;
                    }
                }
            }

            let primitives: Vec<Primitive> = items.iter().flat_map(|it| it.primitives()).collect();
            let builder = SceneBuilder {
                context: &context,
                config: &config,
                edge_radius,
            };
            let screen = frame_input.screen();
            screen.clear(ClearState::color_and_depth(
                background.0,
                background.1,
                background.2,
                background.3,
                1.0,
            ));
            match builder.build(&primitives) {
                Ok(frame) => {
                    screen.render(&camera, frame.objects(), &[]);
                }
                Err(e) => error!("Failed to build frame: {e:#}"),
            }

            FrameOutput::default()
        });
        Ok(())
    }
}
