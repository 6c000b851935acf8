//! Penalty contact of a vertex against a signed distance field.

use crate::fem::from_na;
use crate::sdf::Sdf;
use nalgebra::{Matrix3, Vector3};

/// Energy, gradient and Hessian of the contact penalty at `p`.
///
/// Returns None when the vertex is farther than `clearance` from the collider.
pub fn penalty(
    p: &Vector3<f64>,
    sdf: &dyn Sdf,
    stiff: f64,
    clearance: f64,
) -> Option<(f64, Vector3<f64>, Matrix3<f64>)> {
    let (d, n) = sdf.projection(from_na(p));
    if d >= clearance {
        return None;
    }
    let n = Vector3::new(n.dx, n.dy, n.dz);
    let gap = clearance - d;
    let w = 0.5 * stiff * gap * gap;
    let grad = n * (-stiff * gap);
    let hess = n * n.transpose() * stiff;
    Some((w, grad, hess))
}

/// Smallest signed distance of `positions` to `sdf`.
pub fn min_distance(positions: &[Vector3<f64>], sdf: &dyn Sdf) -> f64 {
    positions
        .iter()
        .map(|p| sdf.signed_distance(from_na(p)))
        .fold(f64::INFINITY, f64::min)
}
