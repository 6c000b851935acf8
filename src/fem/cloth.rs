use crate::fem::bend::{BendElement, find_hinges};
use crate::fem::config::ClothConfig;
use crate::fem::contact::penalty;
use crate::fem::cst::{CstElement, ElementEval};
use crate::fem::sparse::{BlockSparseMatrix, CgSolution};
use crate::fem::{from_na, to_na};
use crate::geom::triangles::TriangleIndex;
use crate::sdf::SdfCollection;
use crate::{Mesh, Point};
use anyhow::{Context, Result, anyhow, bail};
use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Upper bound on re-solves for vertices that enter a collider during a step.
const MAX_CONTACT_PASSES: usize = 3;

/// Summary of one time step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Simulation time after the step.
    pub time: f64,
    /// Potential energy at the start of the step.
    pub energy: f64,
    pub cg_iterations: usize,
    pub residual: f64,
}

/// Cloth simulation over a triangle mesh.
#[derive(Debug, Clone)]
pub struct ClothFem {
    config: ClothConfig,
    triangles: Vec<TriangleIndex>,
    rest: Vec<Vector3<f64>>,
    positions: Vec<Vector3<f64>>,
    velocities: Vec<Vector3<f64>>,
    masses: Vec<f64>,
    cst: Vec<CstElement>,
    bend: Vec<BendElement>,
    fixed: Vec<[bool; 3]>,
    sdf: SdfCollection,
    matrix: BlockSparseMatrix,
    time: f64,
    step_count: usize,
}

impl ClothFem {
    pub fn new(mesh: &Mesh, config: ClothConfig) -> Result<Self> {
        config.validate()?;
        if mesh.face_count() == 0 {
            bail!("Cannot simulate a mesh without triangles");
        }
        let rest: Vec<Vector3<f64>> = mesh.vertices().iter().map(|&p| to_na(p)).collect();
        let triangles = mesh.faces().to_vec();
        let n = rest.len();

        let mut cst = Vec::with_capacity(triangles.len());
        let mut masses = vec![0.0; n];
        for (it, t) in triangles.iter().enumerate() {
            let element = CstElement::new([rest[t.0], rest[t.1], rest[t.2]])
                .ok_or_else(|| anyhow!("Triangle {it} is degenerate in the rest shape"))?;
            let m = config.areal_density * element.area / 3.0;
            for v in t.as_array() {
                masses[v] += m;
            }
            cst.push(element);
        }

        let bend: Vec<BendElement> = find_hinges(&triangles)
            .into_iter()
            .filter_map(|nodes| {
                let pts = nodes.map(|i| mesh.vertices()[i]);
                BendElement::new(nodes, pts)
            })
            .collect();

        let mut elements: Vec<Vec<usize>> =
            triangles.iter().map(|t| t.as_array().to_vec()).collect();
        elements.extend(bend.iter().map(|b| b.nodes.to_vec()));
        let matrix = BlockSparseMatrix::from_elements(n, elements.iter().map(|e| e.as_slice()));

        info!(
            "Cloth created: {} vertices, {} triangles, {} hinges",
            n,
            triangles.len(),
            bend.len()
        );

        Ok(Self {
            config,
            triangles,
            positions: rest.clone(),
            velocities: vec![Vector3::zeros(); n],
            rest,
            masses,
            cst,
            bend,
            fixed: vec![[false; 3]; n],
            sdf: SdfCollection::new(),
            matrix,
            time: 0.0,
            step_count: 0,
        })
    }

    pub fn config(&self) -> &ClothConfig {
        &self.config
    }

    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Fixes all three coordinates of the given vertices.
    pub fn fix_points(&mut self, ids: &[usize]) -> Result<()> {
        self.check_indices(ids)?;
        for &i in ids {
            self.fixed[i] = [true; 3];
        }
        debug!("Fixed {} vertices", ids.len());
        Ok(())
    }

    /// Fixes a single coordinate (`axis` 0, 1 or 2) of vertex `i`.
    pub fn fix_dof(&mut self, i: usize, axis: usize) -> Result<()> {
        self.check_indices(&[i])?;
        if axis > 2 {
            bail!("Axis must be 0, 1 or 2, got {axis}");
        }
        self.fixed[i][axis] = true;
        Ok(())
    }

    fn check_indices(&self, ids: &[usize]) -> Result<()> {
        if let Some(&bad) = ids.iter().find(|&&i| i >= self.num_vertices()) {
            bail!(
                "Vertex index {bad} out of range ({} vertices)",
                self.num_vertices()
            );
        }
        Ok(())
    }

    pub fn is_fixed(&self, i: usize) -> [bool; 3] {
        self.fixed[i]
    }

    pub fn sdf(&self) -> &SdfCollection {
        &self.sdf
    }

    pub fn sdf_mut(&mut self) -> &mut SdfCollection {
        &mut self.sdf
    }

    pub fn positions(&self) -> Vec<Point> {
        self.positions.iter().map(from_na).collect()
    }

    pub fn position(&self, i: usize) -> Point {
        from_na(&self.positions[i])
    }

    pub fn velocities(&self) -> Vec<Point> {
        self.velocities.iter().map(from_na).collect()
    }

    pub fn rest_positions(&self) -> Vec<Point> {
        self.rest.iter().map(from_na).collect()
    }

    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    pub fn triangles(&self) -> &[TriangleIndex] {
        &self.triangles
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Mesh with the current positions.
    pub fn to_mesh(&self) -> Result<Mesh> {
        Mesh::new(self.positions(), self.triangles.clone())
    }

    fn corners(&self, t: &TriangleIndex) -> [Vector3<f64>; 3] {
        [self.positions[t.0], self.positions[t.1], self.positions[t.2]]
    }

    fn hinge_corners(&self, b: &BendElement) -> [Vector3<f64>; 4] {
        b.nodes.map(|i| self.positions[i])
    }

    /// Solves the assembled system with the fixed coordinates pinned to zero.
    fn solve_pinned(&self, rhs: &mut [Vector3<f64>]) -> Result<CgSolution> {
        for (r, fixed) in rhs.iter_mut().zip(&self.fixed) {
            for c in 0..3 {
                if fixed[c] {
                    r[c] = 0.0;
                }
            }
        }
        let solution = self.matrix.pcg_solve(rhs, self.config.cg_config());
        let finite = solution.residual.is_finite()
            && solution.x.iter().all(|dx| dx.iter().all(|v| v.is_finite()));
        if !finite {
            bail!("Linear solve is not finite (residual {})", solution.residual);
        }
        if !solution.converged {
            warn!(
                "CG stopped after {} iterations with relative residual {:.2e}",
                solution.iterations, solution.residual
            );
        }
        Ok(solution)
    }

    /// Total potential energy: membrane, bending, contact and gravity.
    pub fn energy(&self) -> f64 {
        let cfg = &self.config;
        let membrane: f64 = self
            .cst
            .par_iter()
            .zip(self.triangles.par_iter())
            .map(|(e, t)| e.energy(&self.corners(t), cfg.lambda, cfg.myu))
            .sum();
        let bending: f64 = self
            .bend
            .iter()
            .map(|b| b.energy_grad(&self.hinge_corners(b), cfg.stiff_bend).0)
            .sum();
        let g = Vector3::from(cfg.gravity);
        let mut rest = 0.0;
        for (p, m) in self.positions.iter().zip(&self.masses) {
            rest -= m * g.dot(p);
            if let Some((w, _, _)) = penalty(p, &self.sdf, cfg.stiff_contact, cfg.contact_clearance) {
                rest += w;
            }
        }
        membrane + bending + rest
    }

    /// Advances the simulation by one time step.
    ///
    /// On error the state is left unchanged.
    pub fn step(&mut self) -> Result<StepReport> {
        let cfg = self.config.clone();
        let dt = cfg.dt;
        let n = self.num_vertices();
        let g = Vector3::from(cfg.gravity);

        let local: Vec<ElementEval> = self
            .cst
            .par_iter()
            .zip(self.triangles.par_iter())
            .map(|(e, t)| e.energy_grad_hessian(&self.corners(t), cfg.lambda, cfg.myu))
            .collect();

        self.matrix.set_zero();
        let mut grad = vec![Vector3::zeros(); n];
        let mut energy = 0.0;

        for (t, (w, dw, ddw)) in self.triangles.iter().zip(&local) {
            energy += w;
            let nodes = t.as_array();
            for (k, &ik) in nodes.iter().enumerate() {
                grad[ik] += dw[k];
                for (l, &il) in nodes.iter().enumerate() {
                    self.matrix.merge(ik, il, &ddw[k][l])?;
                }
            }
        }

        for b in &self.bend {
            let (w, dw) = b.energy_grad(&self.hinge_corners(b), cfg.stiff_bend);
            energy += w;
            for (k, &ik) in b.nodes.iter().enumerate() {
                grad[ik] += dw[k];
                for (l, &il) in b.nodes.iter().enumerate() {
                    let block = Matrix3::identity() * (cfg.stiff_bend * b.coefficient(k, l));
                    self.matrix.merge(ik, il, &block)?;
                }
            }
        }

        let mut num_contacts = 0usize;
        let mut in_contact = vec![false; n];
        if !self.sdf.is_empty() {
            for i in 0..n {
                if let Some((w, dw, ddw)) = penalty(
                    &self.positions[i],
                    &self.sdf,
                    cfg.stiff_contact,
                    cfg.contact_clearance,
                ) {
                    energy += w;
                    grad[i] += dw;
                    self.matrix.merge(i, i, &ddw)?;
                    in_contact[i] = true;
                    num_contacts += 1;
                }
            }
        }

        for i in 0..n {
            energy -= self.masses[i] * g.dot(&self.positions[i]);
            grad[i] -= g * self.masses[i];
        }

        if !energy.is_finite() {
            bail!(
                "Step {} diverged: potential energy is {energy}",
                self.step_count + 1
            );
        }

        self.matrix.add_diag_scalar(&self.masses, 1.0 / (dt * dt));
        let mut rhs: Vec<Vector3<f64>> = (0..n)
            .map(|i| -grad[i] + self.velocities[i] * (self.masses[i] / dt))
            .collect();
        self.matrix.apply_fixed_dofs(&self.fixed);
        let mut solution = self
            .solve_pinned(&mut rhs)
            .with_context(|| format!("Step {} diverged", self.step_count + 1))?;

        // Vertices that would end up inside a collider get their penalty
        // linearised about the predicted position, then the system is solved again.
        for _ in 0..MAX_CONTACT_PASSES {
            let mut added = 0usize;
            for i in 0..n {
                if in_contact[i] {
                    continue;
                }
                let predicted = self.positions[i] + solution.x[i];
                if let Some((_, dw, ddw)) =
                    penalty(&predicted, &self.sdf, cfg.stiff_contact, cfg.contact_clearance)
                {
                    rhs[i] += ddw * solution.x[i] - dw;
                    self.matrix.merge(i, i, &ddw)?;
                    in_contact[i] = true;
                    added += 1;
                }
            }
            if added == 0 {
                break;
            }
            num_contacts += added;
            self.matrix.apply_fixed_dofs(&self.fixed);
            solution = self
                .solve_pinned(&mut rhs)
                .with_context(|| format!("Step {} diverged", self.step_count + 1))?;
        }

        for i in 0..n {
            self.positions[i] += solution.x[i];
            self.velocities[i] = solution.x[i] / dt;
        }
        self.time += dt;
        self.step_count += 1;

        let report = StepReport {
            time: self.time,
            energy,
            cg_iterations: solution.iterations,
            residual: solution.residual,
        };
        debug!(
            "Step {}: t={:.3}, energy={:.6e}, cg_iterations={}, residual={:.2e}, contacts={}",
            self.step_count,
            report.time,
            report.energy,
            report.cg_iterations,
            report.residual,
            num_contacts
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fem::contact::min_distance;
    use crate::sdf::{SdfPlane, SdfSphere};
    use crate::{Cad2D, Vector};

    fn square_cloth(elen: f64) -> Result<(Cad2D, ClothFem)> {
        let cad = Cad2D::from_flat_xy(&[-1., -1., 1., -1., 1., 1., -1., 1.])?;
        let mesh = cad.mesh(elen)?;
        let fem = ClothFem::new(&mesh, ClothConfig::default())?;
        Ok((cad, fem))
    }

    #[test]
    fn test_new() -> Result<()> {
        let (_, fem) = square_cloth(0.25)?;
        let total_mass: f64 = fem.masses().iter().sum();
        assert!((total_mass - 4.0).abs() < 1e-9);
        assert_eq!(fem.positions(), fem.rest_positions());
        assert_eq!(fem.time(), 0.0);
        // Flat rest state with no gravity work done yet
        assert!(fem.energy().abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_rejects_bad_input() -> Result<()> {
        let empty = Mesh::new(vec![], vec![])?;
        assert!(ClothFem::new(&empty, ClothConfig::default()).is_err());

        let degenerate = Mesh::new(
            vec![Point::new(0., 0., 0.), Point::new(1., 0., 0.), Point::new(2., 0., 0.)],
            vec![TriangleIndex(0, 1, 2)],
        )?;
        assert!(ClothFem::new(&degenerate, ClothConfig::default()).is_err());

        let (_, mut fem) = square_cloth(0.5)?;
        assert!(fem.fix_points(&[0, 10_000]).is_err());
        assert!(fem.fix_dof(0, 3).is_err());
        let bad = ClothConfig {
            dt: -1.0,
            ..Default::default()
        };
        let mesh = fem.to_mesh()?;
        assert!(ClothFem::new(&mesh, bad).is_err());
        Ok(())
    }

    #[test]
    fn test_free_fall() -> Result<()> {
        let (_, mut fem) = square_cloth(0.25)?;
        let steps = 5;
        for _ in 0..steps {
            fem.step()?;
        }
        // Backward Euler on a rigid translation: z_n = -g dt² n(n+1)/2
        let dt = fem.config().dt;
        let expected = -10.0 * dt * dt * (steps * (steps + 1)) as f64 / 2.0;
        for p in fem.positions() {
            assert!((p.z - expected).abs() < 1e-4, "z = {}", p.z);
        }
        assert_eq!(fem.step_count(), steps);
        assert!((fem.time() - steps as f64 * dt).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_fixed_points_do_not_move() -> Result<()> {
        let (cad, mut fem) = square_cloth(0.25)?;
        let ids = cad.points_edge(&[2], &fem.positions())?;
        assert_eq!(ids.len(), 9);
        fem.fix_points(&ids)?;
        fem.fix_dof(0, 2)?;
        assert_eq!(fem.is_fixed(ids[0]), [true; 3]);
        assert_eq!(fem.is_fixed(0), [false, false, true]);
        let before = fem.positions();
        for _ in 0..20 {
            fem.step()?;
        }
        let after = fem.positions();
        for &i in &ids {
            assert_eq!(before[i], after[i]);
        }
        assert_eq!(before[0].z, after[0].z);
        // The rest of the cloth hangs down
        assert!(after.iter().any(|p| p.z < -0.1));
        Ok(())
    }

    #[test]
    fn test_contact_with_sphere() -> Result<()> {
        let (cad, mut fem) = square_cloth(0.2)?;
        let ids = cad.points_edge(&[2], &fem.positions())?;
        fem.fix_points(&ids)?;
        fem.sdf_mut().push(SdfSphere::new(0.55, [0.0, 0.5, -1.0], true));
        let mut touched = false;
        for _ in 0..100 {
            let report = fem.step()?;
            assert!(report.energy.is_finite());
            let min_d = min_distance(&fem.positions, fem.sdf());
            assert!(min_d > -0.04, "penetration {min_d} at t={}", report.time);
            touched |= min_d < 0.01;
        }
        assert!(touched);
        Ok(())
    }

    #[test]
    fn test_fast_vertex_is_stopped_at_collider() -> Result<()> {
        let (_, mut fem) = square_cloth(0.5)?;
        fem.sdf_mut()
            .push(SdfPlane::new(Point::new(0., 0., -0.1), Vector::new(0., 0., 1.)).unwrap());
        // Starting clear of the plane, a plain step would end about 0.1 below it
        fem.velocities = vec![Vector3::new(0.0, 0.0, -10.0); fem.num_vertices()];
        fem.step()?;
        let min_d = min_distance(&fem.positions, fem.sdf());
        assert!(min_d > -0.06, "penetration {min_d}");
        assert!(min_d < 0.0);
        Ok(())
    }

    #[test]
    fn test_overflow_is_an_error() -> Result<()> {
        let cad = Cad2D::from_flat_xy(&[-1., -1., 1., -1., 1., 1., -1., 1.])?;
        let mesh = cad.mesh(0.25)?;
        let config = ClothConfig {
            gravity: [0.0, 0.0, -1e300],
            ..Default::default()
        };
        let mut fem = ClothFem::new(&mesh, config)?;
        let before = fem.positions();
        let err = fem.step().unwrap_err();
        assert!(format!("{err:#}").contains("diverged"));
        assert_eq!(fem.positions(), before);
        assert_eq!(fem.step_count(), 0);
        assert_eq!(fem.time(), 0.0);
        Ok(())
    }

    #[test]
    fn test_to_mesh() -> Result<()> {
        let (_, mut fem) = square_cloth(0.5)?;
        fem.step()?;
        let mesh = fem.to_mesh()?;
        assert_eq!(mesh.vertex_count(), fem.num_vertices());
        assert_eq!(mesh.faces(), fem.triangles());
        assert_eq!(mesh.vertices()[0], fem.position(0));
        Ok(())
    }
}
