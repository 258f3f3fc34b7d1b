//! Developability optimization.
//!
//! [`develop`] deforms a triangle mesh toward a piecewise developable
//! surface: one that could be folded from a flat sheet along a set of
//! hinges. The mesh is first moved into a unit-size frame so step sizes mean
//! the same thing for every input, then optimized, then moved back.
//!
//! # Example
//!
//! ```
//! use crease::prelude::*;
//! use crease::mesh::shapes;
//!
//! let mut mesh: HalfEdgeMesh = shapes::bumpy_sheet(6, 0.1).unwrap();
//! let options = DevelopOptions::default()
//!     .with_max_fun_evals(100)
//!     .with_policy(EnergyPolicy::Max);
//!
//! let report = develop(&mut mesh, &options).unwrap();
//! assert!(report.final_energy <= report.initial_energy);
//! ```

pub mod energy;
pub mod gradient;
pub mod optimizer;
pub mod stars;

pub use energy::{
    local_energy, region_deviation, total_energy, EnergyPolicy, LocalEnergy, Region,
    StarPartition,
};
pub use gradient::{face_normal_jacobian, total_energy_gradient};
pub use optimizer::{OptMethod, Optimizer};
pub use stars::{update_face_stars, update_normals_and_areas, FaceGeometry, VertexStars};

use log::{info, warn};
use nalgebra::Point3;

use crate::algo::remesh::{remove_small_angles, RemeshOptions};
use crate::algo::Progress;
use crate::error::{MeshError, Result};
use crate::mesh::{HalfEdgeMesh, MeshIndex};

/// Options for developability optimization.
#[derive(Debug, Clone)]
pub struct DevelopOptions {
    /// Step-length strategy.
    pub method: OptMethod,

    /// Budget of energy evaluations.
    pub max_fun_evals: usize,

    /// Stop once the squared gradient norm is at most this value.
    pub eps: f64,

    /// Fixed step length, or the first trial step of the line search.
    ///
    /// Measured in the normalized frame, where the bounding box diagonal has
    /// unit length.
    pub step_size: f64,

    /// The line search gives up below this step length.
    pub min_step_size: f64,

    /// Line search shrink factor, in (0, 1).
    pub tau: f64,

    /// Armijo sufficient-decrease constant.
    pub m1: f64,

    /// How normal deviation is measured.
    pub policy: EnergyPolicy,

    /// Wedge-angle remeshing settings.
    pub remesh: RemeshOptions,

    /// Run a remeshing pass before optimizing.
    pub initial_remesh: bool,

    /// Run a remeshing pass after every successful step.
    pub remesh_during_optimization: bool,
}

impl Default for DevelopOptions {
    fn default() -> Self {
        Self {
            method: OptMethod::Backtracking,
            max_fun_evals: 5000,
            eps: 1e-6,
            step_size: 0.01,
            min_step_size: 1e-12,
            tau: 0.8,
            m1: 1e-4,
            policy: EnergyPolicy::Max,
            remesh: RemeshOptions::default(),
            initial_remesh: true,
            remesh_during_optimization: true,
        }
    }
}

impl DevelopOptions {
    /// Set the step-length strategy.
    pub fn with_method(mut self, method: OptMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the evaluation budget.
    pub fn with_max_fun_evals(mut self, max_fun_evals: usize) -> Self {
        self.max_fun_evals = max_fun_evals;
        self
    }

    /// Set the convergence threshold on the squared gradient norm.
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Set the (initial) step length.
    pub fn with_step_size(mut self, step_size: f64) -> Self {
        self.step_size = step_size;
        self
    }

    /// Set the smallest step the line search will try.
    pub fn with_min_step_size(mut self, min_step_size: f64) -> Self {
        self.min_step_size = min_step_size;
        self
    }

    /// Set the line search shrink factor.
    pub fn with_tau(mut self, tau: f64) -> Self {
        self.tau = tau;
        self
    }

    /// Set the Armijo constant.
    pub fn with_m1(mut self, m1: f64) -> Self {
        self.m1 = m1;
        self
    }

    /// Set the energy policy.
    pub fn with_policy(mut self, policy: EnergyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the remeshing options.
    pub fn with_remesh(mut self, remesh: RemeshOptions) -> Self {
        self.remesh = remesh;
        self
    }

    /// Enable or disable the initial remeshing pass.
    pub fn with_initial_remesh(mut self, enabled: bool) -> Self {
        self.initial_remesh = enabled;
        self
    }

    /// Enable or disable remeshing between steps.
    pub fn with_remesh_during_optimization(mut self, enabled: bool) -> Self {
        self.remesh_during_optimization = enabled;
        self
    }

    /// Disable remeshing entirely.
    pub fn without_remeshing(self) -> Self {
        self.with_initial_remesh(false)
            .with_remesh_during_optimization(false)
    }

    /// Check every numeric option.
    pub fn validate(&self) -> Result<()> {
        if self.max_fun_evals == 0 {
            return Err(MeshError::invalid_param("max_fun_evals", 0, "must be positive"));
        }
        let positive = [
            ("eps", self.eps),
            ("step_size", self.step_size),
            ("min_step_size", self.min_step_size),
            ("m1", self.m1),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(MeshError::invalid_param(name, value, "must be positive"));
            }
        }
        if !(self.tau > 0.0 && self.tau < 1.0) {
            return Err(MeshError::invalid_param("tau", self.tau, "must be in (0, 1)"));
        }
        self.remesh.validate()
    }
}

/// Why an optimization run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The squared gradient norm fell to `eps`.
    Converged,
    /// The evaluation budget ran out.
    BudgetExhausted,
    /// No step length down to `min_step_size` decreased the energy enough.
    LineSearchFailed,
}

/// Outcome of a [`develop`] run.
#[derive(Debug, Clone)]
pub struct DevelopReport {
    /// Energy before the first step (after the initial remesh).
    pub initial_energy: f64,
    /// Energy of the returned mesh.
    pub final_energy: f64,
    /// Energy evaluations spent.
    pub num_fun_evals: usize,
    /// Squared gradient norm at the end.
    pub grad_sq_norm: f64,
    /// Remeshing passes that changed the topology.
    pub remesh_passes: usize,
    /// Why the run ended.
    pub termination: Termination,
}

/// Similarity transform into the unit frame: bounding box centered at the
/// origin with unit diagonal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    /// Center of the original bounding box.
    pub center: Point3<f64>,
    /// Diagonal length of the original bounding box.
    pub scale: f64,
}

impl Normalization {
    /// Measure the bounding box of `mesh`.
    ///
    /// # Errors
    ///
    /// [`MeshError::InvalidState`] if the mesh has no vertices or all
    /// vertices coincide.
    pub fn from_mesh<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> Result<Self> {
        let (min, max) = mesh
            .bounding_box()
            .ok_or_else(|| MeshError::InvalidState("mesh has no vertices".into()))?;
        let scale = (max - min).norm();
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(MeshError::InvalidState(format!(
                "degenerate bounding box (diagonal {scale})"
            )));
        }
        Ok(Self {
            center: nalgebra::center(&min, &max),
            scale,
        })
    }

    /// Move `mesh` into the unit frame.
    pub fn apply<I: MeshIndex>(&self, mesh: &mut HalfEdgeMesh<I>) {
        mesh.map_positions(|p| Point3::from((p - self.center) / self.scale));
    }

    /// Move `mesh` back out of the unit frame.
    pub fn revert<I: MeshIndex>(&self, mesh: &mut HalfEdgeMesh<I>) {
        mesh.map_positions(|p| self.center + p.coords * self.scale);
    }
}

/// Optimize `mesh` in place for developability.
///
/// # Errors
///
/// Invalid options, an empty or non-manifold mesh, or a degenerate bounding
/// box. The mesh is not modified when an error is returned. Line search
/// failure and budget exhaustion are not errors; see
/// [`DevelopReport::termination`].
pub fn develop<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, options: &DevelopOptions) -> Result<DevelopReport> {
    develop_internal(mesh, options, None)
}

/// Optimize `mesh` in place, reporting evaluations spent after each step.
///
/// See [`develop`] for details.
pub fn develop_with_progress<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    options: &DevelopOptions,
    progress: &Progress,
) -> Result<DevelopReport> {
    develop_internal(mesh, options, Some(progress))
}

fn develop_internal<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    options: &DevelopOptions,
    progress: Option<&Progress>,
) -> Result<DevelopReport> {
    options.validate()?;
    if mesh.num_faces() == 0 {
        return Err(MeshError::EmptyMesh);
    }
    mesh.check_manifold()?;
    let mut normalization = Normalization::from_mesh(mesh)?;

    let degenerate = mesh.face_ids().filter(|&f| mesh.face_area(f) == 0.0).count();
    if degenerate > 0 {
        warn!("{} faces have zero area; their normals are undefined", degenerate);
    }

    info!(
        "developing mesh with {} vertices, {} faces ({:?}, {:?} policy)",
        mesh.num_vertices(),
        mesh.num_faces(),
        options.method,
        options.policy
    );

    let mut remesh_passes = 0;
    if options.initial_remesh && remove_small_angles(mesh, &options.remesh) {
        remesh_passes += 1;
        normalization = Normalization::from_mesh(mesh)?;
    }

    normalization.apply(mesh);

    let mut optimizer = Optimizer::new(mesh, options);
    let initial_energy = optimizer.energy();

    while optimizer.step() {
        if options.remesh_during_optimization && optimizer.remesh(&options.remesh) {
            remesh_passes += 1;
        }
        if let Some(p) = progress {
            p.report(
                optimizer.num_fun_evals(),
                options.max_fun_evals,
                &format!("E = {:.6e}", optimizer.energy()),
            );
        }
    }

    let termination = if optimizer.grad_sq_norm() <= options.eps {
        Termination::Converged
    } else if optimizer.num_fun_evals() >= options.max_fun_evals {
        Termination::BudgetExhausted
    } else {
        Termination::LineSearchFailed
    };

    let report = DevelopReport {
        initial_energy,
        final_energy: optimizer.energy(),
        num_fun_evals: optimizer.num_fun_evals(),
        grad_sq_norm: optimizer.grad_sq_norm(),
        remesh_passes,
        termination,
    };
    drop(optimizer);

    normalization.revert(mesh);

    info!(
        "finished after {} evaluations: E {:.6e} -> {:.6e} ({:?})",
        report.num_fun_evals, report.initial_energy, report.final_energy, report.termination
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_triangles, shapes};
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_default_options_are_valid() {
        let options = DevelopOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.method, OptMethod::Backtracking);
        assert_eq!(options.max_fun_evals, 5000);
        assert_eq!(options.policy, EnergyPolicy::Max);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let bad = [
            DevelopOptions::default().with_tau(1.5),
            DevelopOptions::default().with_tau(0.0),
            DevelopOptions::default().with_step_size(-1.0),
            DevelopOptions::default().with_eps(f64::NAN),
            DevelopOptions::default().with_max_fun_evals(0),
            DevelopOptions::default().with_remesh(RemeshOptions::default().with_angle_threshold(90.0)),
        ];
        for options in &bad {
            assert!(matches!(
                options.validate(),
                Err(MeshError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn test_normalization_round_trip() {
        let mut mesh: HalfEdgeMesh = shapes::bumpy_sheet(5, 0.3).unwrap();
        mesh.map_positions(|p| Point3::new(3.0 * p.x + 10.0, 3.0 * p.y - 4.0, 3.0 * p.z));
        let original = mesh.positions();

        let normalization = Normalization::from_mesh(&mesh).unwrap();
        normalization.apply(&mut mesh);
        let (min, max) = mesh.bounding_box().unwrap();
        assert_relative_eq!((max - min).norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(nalgebra::center(&min, &max), Point3::origin(), epsilon = 1e-12);

        normalization.revert(&mut mesh);
        for (p, q) in original.iter().zip(mesh.positions()) {
            assert_relative_eq!(*p, q, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_degenerate_bounding_box_rejected() {
        let mut mesh: HalfEdgeMesh = shapes::grid(2, 1.0).unwrap();
        mesh.map_positions(|_| Point3::new(1.0, 1.0, 1.0));
        assert!(matches!(
            develop(&mut mesh, &DevelopOptions::default()),
            Err(MeshError::InvalidState(_))
        ));
    }

    #[test]
    fn test_non_manifold_input_left_untouched() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(-1.0, -1.0, 0.2),
        ];
        let mut mesh: HalfEdgeMesh =
            build_from_triangles(&vertices, &[[0, 1, 2], [0, 3, 4]]).unwrap();

        let err = develop(&mut mesh, &DevelopOptions::default()).unwrap_err();
        assert!(err.is_non_manifold());
        assert_eq!(mesh.positions(), vertices);
    }

    #[test]
    fn test_folded_sheet_converges_immediately() {
        let mut mesh: HalfEdgeMesh = shapes::folded_sheet(6, 0.9).unwrap();
        let options = DevelopOptions::default()
            .with_method(OptMethod::FixedStep)
            .with_max_fun_evals(200)
            .with_eps(1e-8)
            .with_step_size(0.01);

        let report = develop(&mut mesh, &options).unwrap();
        assert_eq!(report.termination, Termination::Converged);
        assert_eq!(report.num_fun_evals, 0);
        assert!(report.final_energy < 1e-4);
        assert_eq!(report.remesh_passes, 0);
    }

    #[test]
    fn test_fixed_step_flattens_perturbed_fold() {
        let mut mesh: HalfEdgeMesh = shapes::folded_sheet(6, 0.9).unwrap();
        mesh.map_positions(|p| {
            Point3::new(p.x, p.y, p.z + 0.01 * (3.0 * p.x).sin() * (2.0 * p.y).cos())
        });
        let options = DevelopOptions::default()
            .with_method(OptMethod::FixedStep)
            .with_max_fun_evals(200)
            .with_eps(1e-8)
            .with_step_size(1e-4)
            .without_remeshing();

        let report = develop(&mut mesh, &options).unwrap();
        assert!(report.num_fun_evals > 0);
        assert!(report.final_energy < report.initial_energy);
        assert!(report.num_fun_evals <= 200);
    }

    #[test]
    fn test_remeshing_during_optimization() {
        let mut mesh: HalfEdgeMesh = shapes::bumpy_sheet(8, 0.3).unwrap();
        mesh.map_positions(|p| {
            Point3::new(
                p.x + 0.1 * (11.0 * p.y).sin(),
                p.y + 0.1 * (13.0 * p.x).cos(),
                p.z,
            )
        });
        let options = DevelopOptions::default()
            .with_max_fun_evals(300)
            .with_initial_remesh(false)
            .with_remesh(RemeshOptions::default().with_angle_threshold(25.0));

        let report = develop(&mut mesh, &options).unwrap();
        assert!(report.remesh_passes > 0);
        assert!(mesh.check_manifold().is_ok());
        assert!(report.final_energy < report.initial_energy);
        assert!(report.num_fun_evals <= 301);
    }

    #[test]
    fn test_failed_line_search_keeps_geometry() {
        let mut mesh: HalfEdgeMesh = shapes::bumpy_sheet(6, 0.2).unwrap();
        let original = mesh.positions();
        let options = DevelopOptions::default()
            .with_step_size(1e-3)
            .with_min_step_size(1e-2)
            .without_remeshing();

        let report = develop(&mut mesh, &options).unwrap();
        assert_eq!(report.termination, Termination::LineSearchFailed);
        assert_eq!(report.final_energy, report.initial_energy);
        for (p, q) in original.iter().zip(mesh.positions()) {
            assert_relative_eq!(*p, q, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_backtracking_reduces_energy() {
        let mut mesh: HalfEdgeMesh = shapes::bumpy_sheet(6, 0.2).unwrap();
        let options = DevelopOptions::default()
            .with_max_fun_evals(200)
            .without_remeshing();

        let report = develop(&mut mesh, &options).unwrap();
        assert!(report.final_energy < report.initial_energy);
        assert!(report.num_fun_evals <= 200);
        assert_eq!(mesh.num_faces(), 72);
    }

    #[test]
    fn test_fixed_step_budget_exhausted() {
        let mut mesh: HalfEdgeMesh = shapes::bumpy_sheet(6, 0.2).unwrap();
        let options = DevelopOptions::default()
            .with_method(OptMethod::FixedStep)
            .with_max_fun_evals(7)
            .with_eps(1e-12)
            .with_step_size(1e-4)
            .without_remeshing();

        let report = develop(&mut mesh, &options).unwrap();
        assert_eq!(report.termination, Termination::BudgetExhausted);
        assert_eq!(report.num_fun_evals, 7);
    }

    #[test]
    fn test_progress_reports_each_step() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&calls);
        let progress = Progress::new(move |current, total, _| {
            assert!(current <= total);
            sink.fetch_add(1, Ordering::SeqCst);
        });

        let mut mesh: HalfEdgeMesh = shapes::bumpy_sheet(4, 0.2).unwrap();
        let options = DevelopOptions::default()
            .with_method(OptMethod::FixedStep)
            .with_max_fun_evals(4)
            .with_eps(1e-12)
            .with_step_size(1e-4);
        develop_with_progress(&mut mesh, &options, &progress).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
