//! Error types for crease.
//!
//! Only precondition violations are errors. Numerical outcomes of the
//! optimizer (line-search failure, exhausted evaluation budget) are reported
//! through status values, see [`crate::algo::develop::Termination`].

use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur during mesh construction and developability runs.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has duplicate vertex indices (degenerate triangle).
    #[error("face {face} is degenerate (has duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// An edge has more than two incident faces, or two faces traverse it in
    /// the same direction.
    #[error("edge ({v0}, {v1}) is non-manifold or inconsistently oriented")]
    NonManifoldEdge {
        /// First vertex of the edge.
        v0: usize,
        /// Second vertex of the edge.
        v1: usize,
    },

    /// A vertex whose incident faces form more than one fan.
    #[error("vertex {vertex} is non-manifold ({fans} face fans meet there)")]
    NonManifoldVertex {
        /// The vertex index.
        vertex: usize,
        /// Number of separate fans around the vertex.
        fans: usize,
    },

    /// Invalid mesh state for the requested operation.
    #[error("invalid mesh state: {0}")]
    InvalidState(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Whether this error reports a non-manifold input.
    pub fn is_non_manifold(&self) -> bool {
        matches!(
            self,
            MeshError::NonManifoldEdge { .. } | MeshError::NonManifoldVertex { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MeshError::NonManifoldVertex { vertex: 7, fans: 2 };
        assert_eq!(
            format!("{err}"),
            "vertex 7 is non-manifold (2 face fans meet there)"
        );
        assert!(err.is_non_manifold());
    }

    #[test]
    fn test_invalid_param() {
        let err = MeshError::invalid_param("tau", 1.5, "must be in (0, 1)");
        assert_eq!(
            format!("{err}"),
            "invalid parameter: tau = 1.5 (must be in (0, 1))"
        );
        assert!(!err.is_non_manifold());
    }
}
