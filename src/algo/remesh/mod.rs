//! Topological cleanup of triangle meshes.
//!
//! Remeshing works on a [`FaceList`]: a face-vertex copy of the mesh with
//! per-vertex incident face lists and tombstones for deleted elements. Edge
//! flips and edge collapses edit the list in place; afterwards the list is
//! compacted and the half-edge mesh is rebuilt from it, renumbering vertices
//! and faces consistently.
//!
//! The [`wedge`] pass uses these operations to remove sliver triangles whose
//! corner angles have become too small during developability flow.
//!
//! # Example
//!
//! ```
//! use crease::prelude::*;
//! use crease::mesh::shapes;
//!
//! let mut mesh: HalfEdgeMesh = shapes::grid(4, 1.0).unwrap();
//! let changed = remove_small_angles(&mut mesh, &RemeshOptions::default());
//! assert!(!changed);
//! ```

pub mod wedge;

pub use wedge::{remove_small_angles, RemeshOptions};

use nalgebra::Point3;

use crate::mesh::{to_face_vertex, HalfEdgeMesh, MeshIndex};

/// Tombstoned face-vertex mesh used for topology edits.
#[derive(Debug, Clone)]
pub struct FaceList {
    positions: Vec<Point3<f64>>,
    faces: Vec<[usize; 3]>,
    face_alive: Vec<bool>,
    vertex_alive: Vec<bool>,
    /// Live faces incident to each vertex.
    vertex_faces: Vec<Vec<usize>>,
}

impl FaceList {
    /// Build from positions and counter-clockwise triangles.
    pub fn new(positions: Vec<Point3<f64>>, faces: Vec<[usize; 3]>) -> Self {
        let mut vertex_faces = vec![Vec::new(); positions.len()];
        for (fi, face) in faces.iter().enumerate() {
            for &v in face {
                vertex_faces[v].push(fi);
            }
        }

        Self {
            vertex_alive: vec![true; positions.len()],
            face_alive: vec![true; faces.len()],
            positions,
            faces,
            vertex_faces,
        }
    }

    /// Copy a half-edge mesh into a face list.
    pub fn from_mesh<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> Self {
        let (positions, faces) = to_face_vertex(mesh);
        Self::new(positions, faces)
    }

    /// Number of face slots, live or deleted.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    #[cfg(test)]
    fn num_live_faces(&self) -> usize {
        self.face_alive.iter().filter(|&&alive| alive).count()
    }

    /// Whether face `f` is still part of the mesh.
    #[inline]
    pub fn is_face_alive(&self, f: usize) -> bool {
        self.face_alive[f]
    }

    #[cfg(test)]
    fn is_vertex_alive(&self, v: usize) -> bool {
        self.vertex_alive[v]
    }

    /// Vertex indices of face `f`.
    #[inline]
    pub fn face(&self, f: usize) -> [usize; 3] {
        self.faces[f]
    }

    /// Live faces incident to vertex `v`.
    #[inline]
    pub fn vertex_faces(&self, v: usize) -> &[usize] {
        &self.vertex_faces[v]
    }

    /// Position of vertex `v`.
    #[inline]
    pub fn position(&self, v: usize) -> &Point3<f64> {
        &self.positions[v]
    }

    /// Interior angles of face `f` in radians, one per corner.
    pub fn corner_angles(&self, f: usize) -> [f64; 3] {
        let face = self.faces[f];
        let mut angles = [0.0; 3];
        for (k, angle) in angles.iter_mut().enumerate() {
            let p = self.positions[face[k]];
            let a = self.positions[face[(k + 1) % 3]] - p;
            let b = self.positions[face[(k + 2) % 3]] - p;
            *angle = a.cross(&b).norm().atan2(a.dot(&b));
        }
        angles
    }

    /// Live faces containing both `a` and `b`.
    pub fn edge_faces(&self, a: usize, b: usize) -> Vec<usize> {
        self.vertex_faces[a]
            .iter()
            .copied()
            .filter(|&f| self.faces[f].contains(&b))
            .collect()
    }

    /// Sorted distinct neighbors of `v`.
    pub fn neighbors(&self, v: usize) -> Vec<usize> {
        let mut neighbors: Vec<usize> = self.vertex_faces[v]
            .iter()
            .flat_map(|&f| self.faces[f])
            .filter(|&u| u != v)
            .collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }

    /// Whether `a`-`b` is an edge with exactly one face.
    pub fn is_boundary_edge(&self, a: usize, b: usize) -> bool {
        self.edge_faces(a, b).len() == 1
    }

    /// Whether `v` lies on a boundary edge.
    pub fn is_boundary_vertex(&self, v: usize) -> bool {
        self.neighbors(v)
            .into_iter()
            .any(|u| self.is_boundary_edge(v, u))
    }

    /// The face traversing `a -> b`, and the vertex opposite that edge.
    fn directed_face(&self, a: usize, b: usize) -> Option<(usize, usize)> {
        self.vertex_faces[a].iter().find_map(|&f| {
            let face = self.faces[f];
            (0..3)
                .find(|&k| face[k] == a && face[(k + 1) % 3] == b)
                .map(|k| (f, face[(k + 2) % 3]))
        })
    }

    /// Check that flipping edge `a`-`b` keeps the mesh a valid manifold.
    ///
    /// The edge must be interior, the new diagonal must not exist yet, and
    /// both endpoints must keep at least three neighbors (two on the border).
    pub fn can_flip(&self, a: usize, b: usize) -> bool {
        let (Some((_, c)), Some((_, d))) = (self.directed_face(a, b), self.directed_face(b, a))
        else {
            return false;
        };
        if c == d || !self.edge_faces(c, d).is_empty() {
            return false;
        }

        [a, b].iter().all(|&v| {
            let min_valence = if self.is_boundary_vertex(v) { 2 } else { 3 };
            self.neighbors(v).len() > min_valence
        })
    }

    /// Flip edge `a`-`b` to the opposite diagonal of its two faces.
    ///
    /// Returns the two faces that changed, or `None` if the flip is illegal.
    pub fn flip(&mut self, a: usize, b: usize) -> Option<[usize; 2]> {
        if !self.can_flip(a, b) {
            return None;
        }
        let (f0, c) = self.directed_face(a, b)?;
        let (f1, d) = self.directed_face(b, a)?;

        // (a, b, c) and (b, a, d) become (c, a, d) and (d, b, c).
        self.faces[f0] = [c, a, d];
        self.faces[f1] = [d, b, c];

        self.vertex_faces[b].retain(|&f| f != f0);
        self.vertex_faces[a].retain(|&f| f != f1);
        self.vertex_faces[d].push(f0);
        self.vertex_faces[c].push(f1);

        Some([f0, f1])
    }

    /// Check the link condition for collapsing edge `a`-`b`.
    ///
    /// The common neighbors of `a` and `b` must be exactly the vertices
    /// opposite the edge, an interior edge may not join two border vertices,
    /// and the opposite vertices must keep enough neighbors.
    pub fn can_collapse(&self, a: usize, b: usize) -> bool {
        let faces = self.edge_faces(a, b);
        if faces.is_empty() || faces.len() > 2 {
            return false;
        }

        let mut opposite: Vec<usize> = faces
            .iter()
            .flat_map(|&f| self.faces[f])
            .filter(|&v| v != a && v != b)
            .collect();
        opposite.sort_unstable();

        let nb = self.neighbors(b);
        let common: Vec<usize> = self
            .neighbors(a)
            .into_iter()
            .filter(|u| nb.binary_search(u).is_ok())
            .collect();
        if common != opposite {
            return false;
        }

        if faces.len() == 2 && self.is_boundary_vertex(a) && self.is_boundary_vertex(b) {
            return false;
        }

        opposite.iter().all(|&v| {
            let min_valence = if self.is_boundary_vertex(v) { 2 } else { 3 };
            self.neighbors(v).len() > min_valence
        })
    }

    /// Collapse edge `a`-`b` into a single vertex.
    ///
    /// A border endpoint keeps its position when the other endpoint is
    /// interior; otherwise the merged vertex sits at the midpoint. Returns the
    /// surviving vertex and the deleted faces, or `None` if the collapse is
    /// illegal.
    pub fn collapse(&mut self, a: usize, b: usize) -> Option<(usize, Vec<usize>)> {
        if !self.can_collapse(a, b) {
            return None;
        }

        let (keep, remove) = match (self.is_boundary_vertex(a), self.is_boundary_vertex(b)) {
            (false, true) => (b, a),
            (true, false) => (a, b),
            _ => {
                self.positions[a] = nalgebra::center(&self.positions[a], &self.positions[b]);
                (a, b)
            }
        };

        let dead = self.edge_faces(keep, remove);
        for &f in &dead {
            self.face_alive[f] = false;
            for v in self.faces[f] {
                self.vertex_faces[v].retain(|&g| g != f);
            }
        }

        let moved = std::mem::take(&mut self.vertex_faces[remove]);
        for &f in &moved {
            for v in self.faces[f].iter_mut() {
                if *v == remove {
                    *v = keep;
                }
            }
        }
        self.vertex_faces[keep].extend(moved);
        self.vertex_alive[remove] = false;

        Some((keep, dead))
    }

    /// Drop deleted faces and unreferenced vertices, renumbering the rest in
    /// their original order.
    pub fn compact(&self) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
        let mut remap: Vec<Option<usize>> = vec![None; self.positions.len()];
        let mut positions = Vec::with_capacity(self.positions.len());
        for v in 0..self.positions.len() {
            if self.vertex_alive[v] && !self.vertex_faces[v].is_empty() {
                remap[v] = Some(positions.len());
                positions.push(self.positions[v]);
            }
        }

        let faces = self
            .faces
            .iter()
            .zip(&self.face_alive)
            .filter(|(_, alive)| **alive)
            .filter_map(|(face, _)| {
                Some([remap[face[0]]?, remap[face[1]]?, remap[face[2]]?])
            })
            .collect();

        (positions, faces)
    }
}
