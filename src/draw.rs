//! Visualization: an interactive `three_d` window and an optional Rerun sink.
//!
//! Scene items implement [`Drawable`] and describe themselves with
//! renderer-independent [`Primitive`]s.

pub mod config;
pub mod primitive;
pub mod rerun;
pub mod viewer;

pub use config::{RerunConfig, Rgba, ViewerConfig};
pub use primitive::{AxisXyz, ClothSurface, Drawable, MeshView, Primitive};
pub use viewer::Viewer;
