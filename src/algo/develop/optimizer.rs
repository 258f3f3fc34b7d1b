//! Gradient descent on vertex positions.
//!
//! An [`Optimizer`] borrows the mesh for its whole lifetime and owns every
//! derived table: vertex stars, face normals and areas, the gradient and a
//! snapshot of the last accepted positions. All of them are rebuilt by
//! [`Optimizer::reset`], which must follow any topology change.

use log::{debug, warn};
use nalgebra::{Point3, Vector3};

use crate::algo::remesh::{remove_small_angles, RemeshOptions};
use crate::error::MeshError;
use crate::mesh::{HalfEdgeMesh, MeshIndex};

use super::energy::{total_energy, EnergyPolicy};
use super::gradient::total_energy_gradient;
use super::stars::{update_face_stars, update_normals_and_areas, FaceGeometry, VertexStars};
use super::DevelopOptions;

/// Step-length strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum OptMethod {
    /// Move every vertex by `step_size` times its negative gradient.
    FixedStep = 0,
    /// Armijo backtracking line search starting from `step_size`.
    #[default]
    Backtracking = 1,
}

impl TryFrom<u32> for OptMethod {
    type Error = MeshError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(OptMethod::FixedStep),
            1 => Ok(OptMethod::Backtracking),
            _ => Err(MeshError::invalid_param("method", value, "must be 0 or 1")),
        }
    }
}

/// Developability optimizer over a borrowed mesh.
pub struct Optimizer<'m, I: MeshIndex = u32> {
    mesh: &'m mut HalfEdgeMesh<I>,
    method: OptMethod,
    policy: EnergyPolicy,
    max_fun_evals: usize,
    eps: f64,
    step_size: f64,
    min_step_size: f64,
    tau: f64,
    m1: f64,

    stars: VertexStars<I>,
    geometry: FaceGeometry,
    gradient: Vec<Vector3<f64>>,
    snapshot: Vec<Point3<f64>>,
    energy: f64,
    grad_sq_norm: f64,
    num_fun_evals: usize,
    stopped: bool,
}

impl<'m, I: MeshIndex> Optimizer<'m, I> {
    /// Create an optimizer and evaluate the starting state.
    ///
    /// Options are taken as given; [`DevelopOptions::validate`] is the
    /// caller's responsibility.
    pub fn new(mesh: &'m mut HalfEdgeMesh<I>, options: &DevelopOptions) -> Self {
        let mut optimizer = Self {
            mesh,
            method: options.method,
            policy: options.policy,
            max_fun_evals: options.max_fun_evals,
            eps: options.eps,
            step_size: options.step_size,
            min_step_size: options.min_step_size,
            tau: options.tau,
            m1: options.m1,
            stars: VertexStars::new(),
            geometry: FaceGeometry::new(),
            gradient: Vec::new(),
            snapshot: Vec::new(),
            energy: 0.0,
            grad_sq_norm: 0.0,
            num_fun_evals: 0,
            stopped: false,
        };
        optimizer.reset();
        optimizer
    }

    /// Rebuild stars, geometry, energy, gradient and the position snapshot
    /// for the current mesh.
    ///
    /// Does not count as a function evaluation. Clears a previous line
    /// search failure, since the state it refers to is gone.
    pub fn reset(&mut self) {
        update_face_stars(self.mesh, &mut self.stars);
        self.evaluate();
        self.snapshot = self.mesh.positions();
        self.stopped = false;
    }

    /// Take one optimization step.
    ///
    /// Returns `false` without touching the mesh once the evaluation budget
    /// is used up, the squared gradient norm is at most `eps`, or a line
    /// search has failed. A failing line search restores the positions of
    /// the last accepted step and also returns `false`.
    pub fn step(&mut self) -> bool {
        if self.num_fun_evals >= self.max_fun_evals
            || self.grad_sq_norm <= self.eps
            || self.stopped
        {
            return false;
        }

        match self.method {
            OptMethod::FixedStep => self.fixed_step(),
            OptMethod::Backtracking => self.backtracking_step(),
        }
    }

    /// Run one remeshing pass, resetting if the topology changed.
    pub fn remesh(&mut self, options: &RemeshOptions) -> bool {
        let changed = remove_small_angles(self.mesh, options);
        if changed {
            self.reset();
        }
        changed
    }

    /// Energy at the current positions.
    #[inline]
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Gradient at the current positions, indexed by vertex id.
    #[inline]
    pub fn gradient(&self) -> &[Vector3<f64>] {
        &self.gradient
    }

    /// Squared Euclidean norm of the full gradient.
    #[inline]
    pub fn grad_sq_norm(&self) -> f64 {
        self.grad_sq_norm
    }

    /// Number of function evaluations spent so far.
    #[inline]
    pub fn num_fun_evals(&self) -> usize {
        self.num_fun_evals
    }

    /// Whether a line search has failed since the last reset.
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// The step-length strategy in use.
    #[inline]
    pub fn method(&self) -> OptMethod {
        self.method
    }

    /// The mesh being optimized.
    #[inline]
    pub fn mesh(&self) -> &HalfEdgeMesh<I> {
        &*self.mesh
    }

    /// Recompute geometry, energy and gradient at the current positions.
    fn evaluate(&mut self) {
        update_normals_and_areas(self.mesh, &mut self.geometry);
        self.energy = total_energy_gradient(
            self.mesh,
            &self.stars,
            &self.geometry,
            self.policy,
            &mut self.gradient,
        );
        self.grad_sq_norm = self.gradient.iter().map(|g| g.norm_squared()).sum();
    }

    /// Move every vertex from the snapshot by `-t` times its gradient.
    fn move_from_snapshot(&mut self, t: f64) {
        let positions: Vec<Point3<f64>> = self
            .snapshot
            .iter()
            .zip(&self.gradient)
            .map(|(p, g)| p - g * t)
            .collect();
        self.mesh.set_positions(&positions);
    }

    fn fixed_step(&mut self) -> bool {
        self.move_from_snapshot(self.step_size);
        self.evaluate();
        self.snapshot = self.mesh.positions();
        self.num_fun_evals += 1;

        debug!(
            "fixed step {}: E = {:.6e}, |g|² = {:.3e}",
            self.num_fun_evals, self.energy, self.grad_sq_norm
        );
        true
    }

    fn backtracking_step(&mut self) -> bool {
        let energy = self.energy;
        let slope = self.grad_sq_norm;
        let mut t = self.step_size;

        loop {
            if t < self.min_step_size || self.num_fun_evals >= self.max_fun_evals {
                break;
            }

            self.move_from_snapshot(t);
            update_normals_and_areas(self.mesh, &mut self.geometry);
            let trial = total_energy(self.mesh, &self.stars, &self.geometry, self.policy);
            self.num_fun_evals += 1;

            if trial <= energy - self.m1 * t * slope {
                self.snapshot = self.mesh.positions();
                self.evaluate();
                self.num_fun_evals += 1;

                debug!(
                    "line search accepted t = {:.3e}: E = {:.6e}, |g|² = {:.3e}",
                    t, self.energy, self.grad_sq_norm
                );
                return true;
            }
            t *= self.tau;
        }

        self.mesh.set_positions(&self.snapshot);
        update_normals_and_areas(self.mesh, &mut self.geometry);
        self.stopped = true;

        warn!(
            "line search failed at t = {:.3e} after {} evaluations",
            t, self.num_fun_evals
        );
        false
    }
}

impl<I: MeshIndex> std::fmt::Debug for Optimizer<'_, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Optimizer")
            .field("method", &self.method)
            .field("policy", &self.policy)
            .field("energy", &self.energy)
            .field("grad_sq_norm", &self.grad_sq_norm)
            .field("num_fun_evals", &self.num_fun_evals)
            .field("stopped", &self.stopped)
            .finish_non_exhaustive()
    }
}
