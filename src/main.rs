//! Command line entry point: cloth contact demo and mesh viewer.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "clothview")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cloth simulation with SDF contact and a triangle mesh viewer", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drop a square cloth pinned on one side onto a sphere
    Cloth(commands::cloth::ClothArgs),
    /// Show a PLY, STL or OBJ mesh
    View(commands::view::ViewArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Cloth(args) => commands::cloth::execute(args),
        Commands::View(args) => commands::view::execute(args),
    }
}
