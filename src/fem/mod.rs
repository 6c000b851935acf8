//! Cloth finite element simulation.
//!
//! A triangle mesh is simulated as a St. Venant-Kirchhoff membrane with
//! quadratic hinge bending, penalty contact against signed distance fields
//! and gravity. Time integration is backward Euler with one Newton iteration
//! per step; the linear system is solved with Jacobi-preconditioned CG.

pub mod bend;
pub mod cloth;
pub mod config;
pub mod contact;
pub mod cst;
pub mod sparse;

pub use cloth::{ClothFem, StepReport};
pub use config::ClothConfig;

use crate::Point;
use nalgebra::Vector3;

pub(crate) fn to_na(p: Point) -> Vector3<f64> {
    Vector3::new(p.x, p.y, p.z)
}

pub(crate) fn from_na(v: &Vector3<f64>) -> Point {
    Point::new(v.x, v.y, v.z)
}
