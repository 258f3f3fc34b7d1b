//! Core mesh data structures.
//!
//! The primary type is [`HalfEdgeMesh`], a triangle mesh stored as a
//! half-edge (doubly-connected edge list) structure with O(1) adjacency
//! queries. The developability engine borrows it mutably while it moves
//! vertices, and the remeshing pass rebuilds it after topology edits.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe index wrappers:
//! - [`VertexId`] - Identifies a vertex
//! - [`HalfEdgeId`] - Identifies a half-edge
//! - [`FaceId`] - Identifies a face
//!
//! These indices are generic over the underlying integer type ([`MeshIndex`] trait),
//! allowing you to choose `u16`, `u32`, or `u64` based on mesh size.
//!
//! # Construction
//!
//! Meshes are built from face-vertex lists or from the generators in
//! [`shapes`]:
//!
//! ```
//! use crease::mesh::{HalfEdgeMesh, build_from_triangles};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2]];
//!
//! let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
//! ```

mod builder;
mod halfedge;
mod index;
pub mod shapes;

pub use builder::{build_from_triangles, to_face_vertex};
pub use halfedge::{Face, HalfEdge, HalfEdgeMesh, Vertex, VertexHalfEdgeIter};
pub use index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
