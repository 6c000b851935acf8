//! Quadratic isometric bending on interior edges.
//!
//! Each hinge is `[x0, x1, x2, x3]` where `x0-x1` is the shared edge, `x2` is
//! the opposite vertex of the first triangle and `x3` the opposite vertex of
//! the second one. The energy is `k/2 Σ Q_ij x_i·x_j` with a constant matrix
//! built from the rest cotangents, so the Hessian is `k Q_ij I`.

use crate::Point;
use crate::geom::triangles::{TriangleIndex, cot_angle, triangle_area};
use nalgebra::Vector3;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct BendElement {
    pub nodes: [usize; 4],
    q: [[f64; 4]; 4],
}

impl BendElement {
    /// Returns None when both triangles of the hinge are degenerate.
    pub fn new(nodes: [usize; 4], rest: [Point; 4]) -> Option<Self> {
        let [x0, x1, x2, x3] = rest;
        let cot_a0 = cot_angle(x0, x1, x2);
        let cot_a1 = cot_angle(x1, x0, x2);
        let cot_b0 = cot_angle(x0, x1, x3);
        let cot_b1 = cot_angle(x1, x0, x3);
        let k = [
            cot_a1 + cot_b1,
            cot_a0 + cot_b0,
            -(cot_a0 + cot_a1),
            -(cot_b0 + cot_b1),
        ];
        let area = triangle_area(x0, x1, x2) + triangle_area(x0, x1, x3);
        if area < 1e-30 {
            return None;
        }
        let mut q = [[0.0; 4]; 4];
        for i in 0..4 {
            for j in 0..4 {
                q[i][j] = 3.0 / area * k[i] * k[j];
            }
        }
        Some(Self { nodes, q })
    }

    pub fn coefficient(&self, i: usize, j: usize) -> f64 {
        self.q[i][j]
    }

    pub fn energy_grad(&self, x: &[Vector3<f64>; 4], stiff: f64) -> (f64, [Vector3<f64>; 4]) {
        let mut w = 0.0;
        let mut grad = [Vector3::zeros(); 4];
        for i in 0..4 {
            for j in 0..4 {
                w += 0.5 * stiff * self.q[i][j] * x[i].dot(&x[j]);
                grad[i] += x[j] * (stiff * self.q[i][j]);
            }
        }
        (w, grad)
    }
}

/// Finds every edge shared by exactly two triangles.
///
/// Edges with more than two incident triangles are skipped.
pub fn find_hinges(faces: &[TriangleIndex]) -> Vec<[usize; 4]> {
    let mut opposite: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();
    for t in faces {
        let [a, b, c] = t.as_array();
        for (i, j, o) in [(a, b, c), (b, c, a), (c, a, b)] {
            opposite.entry((i.min(j), i.max(j))).or_default().push(o);
        }
    }
    opposite
        .into_iter()
        .filter(|(_, opp)| opp.len() == 2)
        .map(|((i, j), opp)| [i, j, opp[0], opp[1]])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fem::to_na;

    fn hinge() -> [Point; 4] {
        [
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(0.3, 0.8, 0.0),
            Point::new(0.6, -0.7, 0.0),
        ]
    }

    #[test]
    fn test_flat_rest_has_zero_energy() {
        let b = BendElement::new([0, 1, 2, 3], hinge()).unwrap();
        let x = hinge().map(to_na);
        let (w, g) = b.energy_grad(&x, 1.0);
        assert!(w.abs() < 1e-12);
        for gi in g {
            assert!(gi.norm() < 1e-12);
        }
    }

    #[test]
    fn test_rigid_motion_has_zero_energy() {
        let b = BendElement::new([0, 1, 2, 3], hinge()).unwrap();
        let (s, c) = (0.7f64.sin(), 0.7f64.cos());
        let x = hinge().map(|p| Vector3::new(p.x + 3.0, c * p.y - s * p.z - 1.0, s * p.y + c * p.z));
        let (w, _) = b.energy_grad(&x, 1.0);
        assert!(w.abs() < 1e-12);
    }

    #[test]
    fn test_folding_costs_energy() {
        let b = BendElement::new([0, 1, 2, 3], hinge()).unwrap();
        let mut x = hinge().map(to_na);
        x[3].z = 0.3;
        let (w, g) = b.energy_grad(&x, 1.0);
        assert!(w > 0.0);
        // Gradient matches finite differences
        let h = 1e-6;
        for i in 0..4 {
            for a in 0..3 {
                let mut xp = x;
                let mut xm = x;
                xp[i][a] += h;
                xm[i][a] -= h;
                let fd = (b.energy_grad(&xp, 1.0).0 - b.energy_grad(&xm, 1.0).0) / (2.0 * h);
                assert!((fd - g[i][a]).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_find_hinges() {
        let faces = vec![TriangleIndex(0, 1, 2), TriangleIndex(1, 0, 3), TriangleIndex(1, 3, 4)];
        let hinges = find_hinges(&faces);
        assert_eq!(hinges, vec![[0, 1, 2, 3], [1, 3, 0, 4]]);
    }
}
