//! # Crease
//!
//! Developability optimization for triangle meshes.
//!
//! A surface is developable when it can be flattened onto the plane without
//! stretching. Crease measures how far a mesh is from that with a
//! combinatorial energy: around each interior vertex the star of incident
//! faces is split into two contiguous fans, and the energy is the spread of
//! face normals inside the worse fan under the best possible split. Gradient
//! descent on vertex positions drives every star toward two flat pieces
//! meeting along a hinge, while a wedge-angle remeshing pass removes the
//! slivers the flow tends to create.
//!
//! ## Features
//!
//! - **Half-edge data structure**: O(1) adjacency queries with type-safe indices
//! - **Flexible indexing**: Support for 16-bit, 32-bit, and 64-bit indices
//! - **Two energy policies**: max-deviation (default) and averaged pairwise deviation
//! - **Two optimizers**: fixed-step descent and Armijo backtracking line search
//! - **Wedge-angle remeshing**: edge flips and edge collapses for sliver triangles
//!
//! ## Quick Start
//!
//! ```
//! use crease::prelude::*;
//!
//! let mut mesh: HalfEdgeMesh = crease::mesh::shapes::bumpy_sheet(8, 0.05).unwrap();
//!
//! let options = DevelopOptions::default().with_max_fun_evals(50);
//! let report = develop(&mut mesh, &options).unwrap();
//!
//! assert!(report.final_energy <= report.initial_energy);
//! println!("energy {} -> {}", report.initial_energy, report.final_energy);
//! ```
//!
//! ## Stepping Manually
//!
//! The optimizer can be driven one step at a time when the caller wants to
//! interleave its own work:
//!
//! ```
//! use crease::prelude::*;
//!
//! let mut mesh: HalfEdgeMesh = crease::mesh::shapes::bumpy_sheet(6, 0.1).unwrap();
//! let options = DevelopOptions::default()
//!     .with_method(OptMethod::FixedStep)
//!     .with_max_fun_evals(10);
//!
//! let mut optimizer = Optimizer::new(&mut mesh, &options);
//! while optimizer.step() {}
//! assert_eq!(optimizer.num_fun_evals(), 10);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use crease::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::develop::{
        develop, develop_with_progress, DevelopOptions, DevelopReport, EnergyPolicy, OptMethod,
        Optimizer, Termination,
    };
    pub use crate::algo::remesh::{remove_small_angles, RemeshOptions};
    pub use crate::algo::Progress;
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::{
        build_from_triangles, to_face_vertex, FaceId, HalfEdgeId, HalfEdgeMesh, MeshIndex,
        VertexId,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;
