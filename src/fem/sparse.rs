use anyhow::{Result, anyhow};
use nalgebra::{Matrix3, Vector3};

/// Settings for the conjugate gradient solver.
#[derive(Debug, Clone, Copy)]
pub struct CgConfig {
    /// Maximum number of PCG iterations per solve.
    pub max_iterations: usize,
    /// Relative residual tolerance.
    pub rel_tolerance: f64,
    /// Absolute residual tolerance.
    pub abs_tolerance: f64,
}

impl Default for CgConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            rel_tolerance: 1e-6,
            abs_tolerance: 1e-14,
        }
    }
}

/// Result of a linear solve.
#[derive(Debug, Clone)]
pub struct CgSolution {
    pub x: Vec<Vector3<f64>>,
    pub iterations: usize,
    /// Final residual norm relative to the right-hand side.
    pub residual: f64,
    /// False when the iteration limit was hit or the input was not finite.
    pub converged: bool,
}

/// Symmetric matrix made of 3x3 blocks with a fixed sparsity pattern.
///
/// Diagonal blocks are stored apart from the off-diagonal ones, which are
/// kept in CSR order with sorted column indices per row.
#[derive(Debug, Clone)]
pub struct BlockSparseMatrix {
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    diag: Vec<Matrix3<f64>>,
    off: Vec<Matrix3<f64>>,
}

impl BlockSparseMatrix {
    /// Builds the pattern coupling every pair of nodes that share an element.
    pub fn from_elements<'a, I>(num_nodes: usize, elements: I) -> Self
    where
        I: IntoIterator<Item = &'a [usize]>,
    {
        let mut rows: Vec<Vec<usize>> = vec![Vec::new(); num_nodes];
        for nodes in elements {
            for &i in nodes {
                for &j in nodes {
                    if i != j {
                        rows[i].push(j);
                    }
                }
            }
        }
        let mut row_ptr = Vec::with_capacity(num_nodes + 1);
        let mut col_idx = Vec::new();
        row_ptr.push(0);
        for mut row in rows {
            row.sort_unstable();
            row.dedup();
            col_idx.extend(row);
            row_ptr.push(col_idx.len());
        }
        let nnz = col_idx.len();
        Self {
            row_ptr,
            col_idx,
            diag: vec![Matrix3::zeros(); num_nodes],
            off: vec![Matrix3::zeros(); nnz],
        }
    }

    pub fn num_rows(&self) -> usize {
        self.diag.len()
    }

    /// Number of stored off-diagonal blocks.
    pub fn num_off_diagonal(&self) -> usize {
        self.off.len()
    }

    pub fn set_zero(&mut self) {
        self.diag.iter_mut().for_each(|m| *m = Matrix3::zeros());
        self.off.iter_mut().for_each(|m| *m = Matrix3::zeros());
    }

    /// Adds `scale * values[i] * I` to every diagonal block.
    pub fn add_diag_scalar(&mut self, values: &[f64], scale: f64) {
        for (d, v) in self.diag.iter_mut().zip(values) {
            *d += Matrix3::identity() * (v * scale);
        }
    }

    fn position(&self, i: usize, j: usize) -> Option<usize> {
        let beg = self.row_ptr[i];
        let end = self.row_ptr[i + 1];
        self.col_idx[beg..end]
            .binary_search(&j)
            .ok()
            .map(|k| beg + k)
    }

    /// Adds `block` at block position `(i, j)`.
    pub fn merge(&mut self, i: usize, j: usize, block: &Matrix3<f64>) -> Result<()> {
        if i >= self.num_rows() || j >= self.num_rows() {
            return Err(anyhow!(
                "Block ({i}, {j}) out of range ({} rows)",
                self.num_rows()
            ));
        }
        if i == j {
            self.diag[i] += block;
            return Ok(());
        }
        let k = self
            .position(i, j)
            .ok_or_else(|| anyhow!("Block ({i}, {j}) is not in the sparsity pattern"))?;
        self.off[k] += block;
        Ok(())
    }

    /// Block at `(i, j)`, zero outside the pattern.
    pub fn block(&self, i: usize, j: usize) -> Matrix3<f64> {
        if i == j {
            return self.diag[i];
        }
        self.position(i, j)
            .map(|k| self.off[k])
            .unwrap_or_else(Matrix3::zeros)
    }

    /// Replaces the rows and columns of fixed DOFs by the identity.
    pub fn apply_fixed_dofs(&mut self, fixed: &[[bool; 3]]) {
        for i in 0..self.num_rows() {
            for c in 0..3 {
                if fixed[i][c] {
                    self.diag[i].row_mut(c).fill(0.0);
                    self.diag[i].column_mut(c).fill(0.0);
                    self.diag[i][(c, c)] = 1.0;
                }
            }
            for k in self.row_ptr[i]..self.row_ptr[i + 1] {
                let j = self.col_idx[k];
                for c in 0..3 {
                    if fixed[i][c] {
                        self.off[k].row_mut(c).fill(0.0);
                    }
                    if fixed[j][c] {
                        self.off[k].column_mut(c).fill(0.0);
                    }
                }
            }
        }
    }

    /// `y = A x`
    pub fn mul_vec(&self, x: &[Vector3<f64>], y: &mut [Vector3<f64>]) {
        for i in 0..self.num_rows() {
            let mut sum = self.diag[i] * x[i];
            for k in self.row_ptr[i]..self.row_ptr[i + 1] {
                sum += self.off[k] * x[self.col_idx[k]];
            }
            y[i] = sum;
        }
    }

    /// Solves `A x = b` with conjugate gradients and a Jacobi preconditioner.
    ///
    /// The initial guess is zero.
    pub fn pcg_solve(&self, b: &[Vector3<f64>], config: CgConfig) -> CgSolution {
        let n = b.len();
        let mut x = vec![Vector3::zeros(); n];
        if n == 0 {
            return CgSolution {
                x,
                iterations: 0,
                residual: 0.0,
                converged: true,
            };
        }

        let inv_diag: Vec<Vector3<f64>> = self
            .diag
            .iter()
            .map(|d| {
                Vector3::from_fn(|c, _| {
                    if d[(c, c)].abs() > 1e-30 {
                        1.0 / d[(c, c)]
                    } else {
                        1.0
                    }
                })
            })
            .collect();

        let mut r = b.to_vec();
        let b_norm = l2_norm(b);
        if !b_norm.is_finite() {
            return CgSolution {
                x,
                iterations: 0,
                residual: f64::INFINITY,
                converged: false,
            };
        }
        let tol = config.abs_tolerance.max(config.rel_tolerance * b_norm);
        let relative = |r_norm: f64| if b_norm > 0.0 { r_norm / b_norm } else { r_norm };

        let r_norm = l2_norm(&r);
        if r_norm <= tol {
            return CgSolution {
                x,
                iterations: 0,
                residual: relative(r_norm),
                converged: true,
            };
        }

        let mut z: Vec<Vector3<f64>> = r.iter().zip(&inv_diag).map(|(ri, di)| ri.component_mul(di)).collect();
        let mut p = z.clone();
        let mut rz_old = dot(&r, &z);
        let mut ap = vec![Vector3::zeros(); n];
        let mut iterations = 0;
        let mut r_norm = r_norm;

        while iterations < config.max_iterations {
            iterations += 1;
            self.mul_vec(&p, &mut ap);
            let denom = dot(&p, &ap);
            if denom.abs() < 1e-30 {
                break;
            }

            let alpha = rz_old / denom;
            for i in 0..n {
                x[i] += p[i] * alpha;
                r[i] -= ap[i] * alpha;
            }

            r_norm = l2_norm(&r);
            if r_norm <= tol {
                break;
            }

            for i in 0..n {
                z[i] = r[i].component_mul(&inv_diag[i]);
            }
            let rz_new = dot(&r, &z);
            if rz_old.abs() < 1e-30 {
                break;
            }
            let beta = rz_new / rz_old;
            for i in 0..n {
                p[i] = z[i] + p[i] * beta;
            }
            rz_old = rz_new;
        }

        CgSolution {
            x,
            iterations,
            residual: relative(r_norm),
            converged: r_norm <= tol,
        }
    }
}

pub fn dot(a: &[Vector3<f64>], b: &[Vector3<f64>]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x.dot(y)).sum()
}

fn l2_norm(a: &[Vector3<f64>]) -> f64 {
    dot(a, a).sqrt()
}
