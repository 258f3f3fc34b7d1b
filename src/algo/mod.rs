//! Mesh processing algorithms.
//!
//! - **Develop**: developability energy, its gradient, the optimizers and
//!   the normalize / optimize / denormalize driver
//! - **Remesh**: face-list edge operations and the wedge-angle cleanup pass

pub mod develop;
pub mod progress;
pub mod remesh;

pub use progress::Progress;
