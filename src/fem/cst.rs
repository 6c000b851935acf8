//! Constant strain triangle with the St. Venant-Kirchhoff material.
//!
//! Energy density `W = A (λ/2 tr(E)² + μ E:E)` with the Green strain
//! `E = (FᵀF - I) / 2` and `F` the 3x2 deformation gradient of the triangle.

use nalgebra::{Matrix2, Matrix3, Matrix3x2, Vector2, Vector3};

/// Rest state of one triangle.
#[derive(Debug, Clone)]
pub struct CstElement {
    pub area: f64,
    /// Gradients of the linear shape functions in the rest frame.
    grads: [Vector2<f64>; 3],
}

/// Energy, gradient and Hessian blocks of one element.
pub type ElementEval = (f64, [Vector3<f64>; 3], [[Matrix3<f64>; 3]; 3]);

impl CstElement {
    /// Builds the element from its rest positions. Returns None for a degenerate triangle.
    pub fn new(rest: [Vector3<f64>; 3]) -> Option<Self> {
        let d1 = rest[1] - rest[0];
        let d2 = rest[2] - rest[0];
        let n = d1.cross(&d2);
        if n.norm() < 1e-20 || d1.norm() < 1e-20 {
            return None;
        }
        let e1 = d1.normalize();
        let e2 = n.normalize().cross(&e1);

        // Columns are the two edges expressed in the in-plane frame
        let dm = Matrix2::new(d1.dot(&e1), d2.dot(&e1), d1.dot(&e2), d2.dot(&e2));
        let area = 0.5 * dm.determinant().abs();
        let b = dm.try_inverse()?;

        let g1 = b.row(0).transpose();
        let g2 = b.row(1).transpose();
        let g0 = -(g1 + g2);
        Some(Self {
            area,
            grads: [g0, g1, g2],
        })
    }

    pub fn deformation_gradient(&self, x: &[Vector3<f64>; 3]) -> Matrix3x2<f64> {
        x[0] * self.grads[0].transpose()
            + x[1] * self.grads[1].transpose()
            + x[2] * self.grads[2].transpose()
    }

    fn green_strain(f: &Matrix3x2<f64>) -> Matrix2<f64> {
        (f.transpose() * f - Matrix2::identity()) * 0.5
    }

    /// Strain energy only.
    pub fn energy(&self, x: &[Vector3<f64>; 3], lambda: f64, myu: f64) -> f64 {
        let e = Self::green_strain(&self.deformation_gradient(x));
        let tr = e.trace();
        self.area * (0.5 * lambda * tr * tr + myu * (e * e).trace())
    }

    /// Energy, its gradient per vertex and the 3x3 Hessian blocks `[k][l]`.
    pub fn energy_grad_hessian(&self, x: &[Vector3<f64>; 3], lambda: f64, myu: f64) -> ElementEval {
        let f = self.deformation_gradient(x);
        let e = Self::green_strain(&f);
        let tr = e.trace();
        let w = self.area * (0.5 * lambda * tr * tr + myu * (e * e).trace());

        // Second Piola-Kirchhoff and first Piola-Kirchhoff stresses
        let s = Matrix2::identity() * (lambda * tr) + e * (2.0 * myu);
        let p = f * s;

        let grad = [
            p * self.grads[0] * self.area,
            p * self.grads[1] * self.area,
            p * self.grads[2] * self.area,
        ];

        let mut hess = [[Matrix3::zeros(); 3]; 3];
        for l in 0..3 {
            for c in 0..3 {
                let df = Vector3::ith(c, 1.0) * self.grads[l].transpose();
                let de = (df.transpose() * f + f.transpose() * df) * 0.5;
                let ds = Matrix2::identity() * (lambda * de.trace()) + de * (2.0 * myu);
                let dp = df * s + f * ds;
                for k in 0..3 {
                    let col = dp * self.grads[k] * self.area;
                    hess[k][l].set_column(c, &col);
                }
            }
        }
        (w, grad, hess)
    }
}
