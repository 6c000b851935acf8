//! Opens a PLY mesh scaled down to fit a small window.

use anyhow::Result;
use clothview::draw::{MeshView, Viewer, ViewerConfig};
use clothview::io::read_mesh;
use std::path::Path;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut mesh = read_mesh(Path::new("bunny_2k.ply"))?;
    mesh.scale_xyz(0.03);

    let config = ViewerConfig {
        window_size: Some((400, 300)),
        ..Default::default()
    };
    Viewer::new(config).run(vec![Box::new(MeshView::new(mesh, (0.8, 0.8, 0.8, 1.0)))])
}
