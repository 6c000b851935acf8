//! Square cloth pinned along its top edge falling onto a sphere.

use anyhow::Result;
use clothview::draw::{AxisXyz, ClothSurface, Drawable, Viewer, ViewerConfig};
use clothview::{Cad2D, ClothConfig, ClothFem, SdfSphere};
use std::cell::RefCell;
use std::rc::Rc;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cad = Cad2D::from_flat_xy(&[-1., -1., 1., -1., 1., 1., -1., 1.])?;
    let mesh = cad.mesh(0.05)?;
    let mut fem = ClothFem::new(&mesh, ClothConfig::default())?;

    let pinned = cad.points_edge(&[2], mesh.vertices())?;
    fem.fix_points(&pinned)?;

    fem.sdf_mut().push(SdfSphere::new(0.55, [0., 0.5, -1.], true));
    let sdf = fem.sdf().clone();

    let fem = Rc::new(RefCell::new(fem));
    let surface = ClothSurface::new(fem.clone());

    let items: Vec<Box<dyn Drawable>> = vec![
        Box::new(fem),
        Box::new(surface),
        Box::new(AxisXyz::new(1.0)),
        Box::new(sdf),
    ];
    let config = ViewerConfig {
        edge_color: None,
        ..Default::default()
    };
    Viewer::new(config).run(items)
}
