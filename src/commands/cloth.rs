use anyhow::{Result, bail};
use clap::Args;
use clothview::draw::rerun::{log_cloth_frame, log_colliders, start_session};
use clothview::draw::{AxisXyz, ClothSurface, Drawable, RerunConfig, Viewer, ViewerConfig};
use clothview::io::write_mesh;
use clothview::{Cad2D, ClothConfig, ClothFem, SdfSphere};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::info;

/// Unit square centred at the origin, counter-clockwise.
const SQUARE_XY: [f64; 8] = [-1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, 1.0];

/// Edge `y = 1` of the square.
const PINNED_EDGE: usize = 2;

#[derive(Args)]
pub struct ClothArgs {
    /// Cloth parameters as JSON; missing fields take defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Target triangle edge length
    #[arg(short, long, default_value = "0.05")]
    pub edge_length: f64,

    /// Number of steps to run in headless mode
    #[arg(short, long, default_value = "100")]
    pub frames: usize,

    /// Run without a window
    #[arg(long)]
    pub headless: bool,

    /// Write the final cloth mesh here (headless mode only)
    #[arg(short, long, requires = "headless")]
    pub output: Option<PathBuf>,

    /// Stream every step to a Rerun viewer (headless mode only)
    #[arg(long, requires = "headless")]
    pub rerun: bool,
}

/// Meshes the square, pins one edge and places the sphere under the cloth.
fn build_cloth(config: ClothConfig, edge_length: f64) -> Result<ClothFem> {
    let cad = Cad2D::from_flat_xy(&SQUARE_XY)?;
    let mesh = cad.mesh(edge_length)?;
    let mut fem = ClothFem::new(&mesh, config)?;
    let pinned = cad.points_edge(&[PINNED_EDGE], mesh.vertices())?;
    info!("Pinning {} points on edge {}", pinned.len(), PINNED_EDGE);
    fem.fix_points(&pinned)?;
    fem.sdf_mut()
        .push(SdfSphere::new(0.55, [0.0, 0.5, -1.0], true));
    Ok(fem)
}

pub fn execute(args: ClothArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => ClothConfig::from_json_file(path)?,
        None => ClothConfig::default(),
    };
    let mut fem = build_cloth(config, args.edge_length)?;

    if args.headless {
        return run_headless(&mut fem, &args);
    }

    let sdf = fem.sdf().clone();
    let fem = Rc::new(RefCell::new(fem));
    let items: Vec<Box<dyn Drawable>> = vec![
        Box::new(fem.clone()),
        Box::new(ClothSurface::new(fem)),
        Box::new(AxisXyz::new(1.0)),
        Box::new(sdf),
    ];
    let config = ViewerConfig {
        title: "cloth contact".to_string(),
        edge_color: None,
        ..Default::default()
    };
    Viewer::new(config).run(items)
}

fn run_headless(fem: &mut ClothFem, args: &ClothArgs) -> Result<()> {
    if args.frames == 0 {
        bail!("Headless mode needs at least one frame");
    }
    let rerun_config = RerunConfig::default();
    let session = if args.rerun {
        let session = start_session(&rerun_config)?;
        log_colliders(&session, &rerun_config, fem.sdf())?;
        log_cloth_frame(&session, &rerun_config, fem)?;
        Some(session)
    } else {
        None
    };

    for _ in 0..args.frames {
        fem.step()?;
        if let Some(session) = &session {
            log_cloth_frame(session, &rerun_config, fem)?;
        }
    }
    info!(
        "Finished {} steps, t = {:.3} s, energy = {:.6}",
        fem.step_count(),
        fem.time(),
        fem.energy()
    );

    if let Some(path) = &args.output {
        write_mesh(path, &fem.to_mesh()?)?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}
