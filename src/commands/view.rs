use anyhow::{Result, bail};
use clap::Args;
use clothview::draw::{MeshView, Viewer, ViewerConfig};
use clothview::io::read_mesh;
use std::path::PathBuf;
use tracing::info;

const MESH_COLOR: (f32, f32, f32, f32) = (0.8, 0.8, 0.8, 1.0);

#[derive(Args)]
pub struct ViewArgs {
    /// Mesh file (.ply, .stl or .obj)
    pub path: PathBuf,

    /// Uniform scale applied about the origin
    #[arg(short, long, default_value = "1.0")]
    pub scale: f64,

    /// Window width in pixels
    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    /// Window height in pixels
    #[arg(long, requires = "width")]
    pub height: Option<u32>,
}

pub fn execute(args: ViewArgs) -> Result<()> {
    if !(args.scale.is_finite() && args.scale != 0.0) {
        bail!("Scale must be finite and non-zero, got {}", args.scale);
    }
    let mut mesh = read_mesh(&args.path)?;
    mesh.scale_xyz(args.scale);
    if let Some((lo, hi)) = mesh.bounding_box() {
        info!("Bounding box after scaling: {:.3} .. {:.3}", lo, hi);
    }

    let config = ViewerConfig {
        title: args.path.display().to_string(),
        window_size: args.width.zip(args.height),
        ..Default::default()
    };
    Viewer::new(config).run(vec![Box::new(MeshView::new(mesh, MESH_COLOR))])
}
