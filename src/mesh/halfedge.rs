//! Half-edge mesh data structure.
//!
//! Vertices, half-edges and faces are stored in flat arenas and refer to each
//! other through typed indices. Every half-edge knows its twin, the next and
//! previous half-edge around its face, its origin vertex and its face.
//!
//! # Boundary Handling
//!
//! Border half-edges carry an invalid face id. Their twins are the interior
//! half-edges of the border faces, so face-face adjacency across an edge is
//! simply `face_of(twin(he))`, invalid at the border. Boundary vertices point
//! to an outgoing border half-edge.

use nalgebra::{Point3, Vector3};

use super::index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
use crate::error::{MeshError, Result};

/// A vertex in the half-edge mesh.
#[derive(Debug, Clone)]
pub struct Vertex<I: MeshIndex = u32> {
    /// The 3D position of this vertex.
    pub position: Point3<f64>,

    /// One outgoing half-edge from this vertex.
    /// For boundary vertices this is a border half-edge.
    pub halfedge: HalfEdgeId<I>,
}

impl<I: MeshIndex> Vertex<I> {
    /// Create a new, unconnected vertex at the given position.
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            halfedge: HalfEdgeId::invalid(),
        }
    }
}

/// A half-edge in the mesh.
#[derive(Debug, Clone, Copy)]
pub struct HalfEdge<I: MeshIndex = u32> {
    /// The vertex this half-edge originates from.
    pub origin: VertexId<I>,

    /// The opposite half-edge.
    pub twin: HalfEdgeId<I>,

    /// The next half-edge around the face (counter-clockwise).
    pub next: HalfEdgeId<I>,

    /// The previous half-edge around the face.
    pub prev: HalfEdgeId<I>,

    /// The face this half-edge belongs to. Invalid on the border.
    pub face: FaceId<I>,
}

impl<I: MeshIndex> HalfEdge<I> {
    /// Create a new unconnected half-edge.
    pub fn new() -> Self {
        Self {
            origin: VertexId::invalid(),
            twin: HalfEdgeId::invalid(),
            next: HalfEdgeId::invalid(),
            prev: HalfEdgeId::invalid(),
            face: FaceId::invalid(),
        }
    }

    /// Check if this half-edge is on the border.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        !self.face.is_valid()
    }
}

impl<I: MeshIndex> Default for HalfEdge<I> {
    fn default() -> Self {
        Self::new()
    }
}

/// A triangular face in the half-edge mesh.
#[derive(Debug, Clone, Copy)]
pub struct Face<I: MeshIndex = u32> {
    /// One half-edge on the boundary of this face.
    pub halfedge: HalfEdgeId<I>,
}

impl<I: MeshIndex> Face<I> {
    /// Create a new face with the given half-edge.
    pub fn new(halfedge: HalfEdgeId<I>) -> Self {
        Self { halfedge }
    }
}

/// A half-edge triangle mesh.
///
/// Element ids are dense: they stay stable until the mesh is rebuilt, which
/// the remeshing pass does after it has compacted away deleted elements.
#[derive(Debug, Clone)]
pub struct HalfEdgeMesh<I: MeshIndex = u32> {
    pub(crate) vertices: Vec<Vertex<I>>,
    pub(crate) halfedges: Vec<HalfEdge<I>>,
    pub(crate) faces: Vec<Face<I>>,
}

impl<I: MeshIndex> Default for HalfEdgeMesh<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MeshIndex> HalfEdgeMesh<I> {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            halfedges: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(num_vertices: usize, num_faces: usize) -> Self {
        // 3 interior half-edges per face plus some border half-edges.
        let num_halfedges = num_faces * 3 + num_faces / 2;

        Self {
            vertices: Vec::with_capacity(num_vertices),
            halfedges: Vec::with_capacity(num_halfedges),
            faces: Vec::with_capacity(num_faces),
        }
    }

    // ==================== Accessors ====================

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of half-edges (including border half-edges).
    #[inline]
    pub fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    /// Get the number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Get a vertex by ID.
    #[inline]
    pub fn vertex(&self, id: VertexId<I>) -> &Vertex<I> {
        &self.vertices[id.index()]
    }

    #[inline]
    pub(crate) fn vertex_mut(&mut self, id: VertexId<I>) -> &mut Vertex<I> {
        &mut self.vertices[id.index()]
    }

    /// Get a half-edge by ID.
    #[inline]
    pub fn halfedge(&self, id: HalfEdgeId<I>) -> &HalfEdge<I> {
        &self.halfedges[id.index()]
    }

    #[inline]
    pub(crate) fn halfedge_mut(&mut self, id: HalfEdgeId<I>) -> &mut HalfEdge<I> {
        &mut self.halfedges[id.index()]
    }

    /// Get a face by ID.
    #[inline]
    pub fn face(&self, id: FaceId<I>) -> &Face<I> {
        &self.faces[id.index()]
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId<I>) -> &Point3<f64> {
        &self.vertex(v).position
    }

    /// Set the position of a vertex.
    #[inline]
    pub fn set_position(&mut self, v: VertexId<I>, pos: Point3<f64>) {
        self.vertex_mut(v).position = pos;
    }

    /// Copy out all vertex positions, indexed by vertex id.
    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.vertices.iter().map(|v| v.position).collect()
    }

    /// Overwrite all vertex positions from a slice indexed by vertex id.
    ///
    /// # Panics
    /// Panics if `positions` does not hold exactly one entry per vertex.
    pub fn set_positions(&mut self, positions: &[Point3<f64>]) {
        assert_eq!(positions.len(), self.vertices.len());
        for (v, p) in self.vertices.iter_mut().zip(positions) {
            v.position = *p;
        }
    }

    /// Apply `f` to every vertex position in place.
    pub fn map_positions<F>(&mut self, mut f: F)
    where
        F: FnMut(&Point3<f64>) -> Point3<f64>,
    {
        for v in &mut self.vertices {
            v.position = f(&v.position);
        }
    }

    // ==================== Topology Queries ====================

    /// Get the twin (opposite) half-edge.
    #[inline]
    pub fn twin(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).twin
    }

    /// Get the next half-edge around the face.
    #[inline]
    pub fn next(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).next
    }

    /// Get the previous half-edge around the face.
    #[inline]
    pub fn prev(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).prev
    }

    /// Get the origin vertex of a half-edge.
    #[inline]
    pub fn origin(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.halfedge(he).origin
    }

    /// Get the destination vertex of a half-edge.
    #[inline]
    pub fn dest(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.origin(self.twin(he))
    }

    /// Get the face of a half-edge.
    #[inline]
    pub fn face_of(&self, he: HalfEdgeId<I>) -> FaceId<I> {
        self.halfedge(he).face
    }

    /// Check if a half-edge is on the border.
    #[inline]
    pub fn is_boundary_halfedge(&self, he: HalfEdgeId<I>) -> bool {
        self.halfedge(he).is_boundary()
    }

    /// Check if a vertex is on the boundary. Isolated vertices count as
    /// boundary.
    pub fn is_boundary_vertex(&self, v: VertexId<I>) -> bool {
        if !self.vertex(v).halfedge.is_valid() {
            return true;
        }
        self.vertex_halfedges(v)
            .any(|he| self.is_boundary_halfedge(he))
    }

    // ==================== Iteration ====================

    /// Iterate over all vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId<I>> + '_ {
        (0..self.vertices.len()).map(VertexId::new)
    }

    /// Iterate over all half-edge IDs.
    pub fn halfedge_ids(&self) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        (0..self.halfedges.len()).map(HalfEdgeId::new)
    }

    /// Iterate over all face IDs.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        (0..self.faces.len()).map(FaceId::new)
    }

    /// Iterate counter-clockwise over the outgoing half-edges of a vertex.
    pub fn vertex_halfedges(&self, v: VertexId<I>) -> VertexHalfEdgeIter<'_, I> {
        VertexHalfEdgeIter::new(self, self.vertex(v).halfedge)
    }

    /// Iterate counter-clockwise over the faces around a vertex.
    ///
    /// For a boundary vertex the sequence starts right after the border, so
    /// consecutive faces always share an edge.
    pub fn vertex_faces(&self, v: VertexId<I>) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.vertex_halfedges(v).filter_map(|he| {
            let f = self.face_of(he);
            f.is_valid().then_some(f)
        })
    }

    /// Get the three vertices of a face, in counter-clockwise order.
    pub fn face_triangle(&self, f: FaceId<I>) -> [VertexId<I>; 3] {
        let he0 = self.face(f).halfedge;
        let he1 = self.next(he0);
        let he2 = self.next(he1);
        [self.origin(he0), self.origin(he1), self.origin(he2)]
    }

    /// Get the positions of the three vertices of a face.
    pub fn face_positions(&self, f: FaceId<I>) -> [Point3<f64>; 3] {
        let [v0, v1, v2] = self.face_triangle(f);
        [*self.position(v0), *self.position(v1), *self.position(v2)]
    }

    /// Iterate over the faces adjacent to `f` across its three edges.
    /// Border edges yield an invalid face id.
    pub fn face_neighbors(&self, f: FaceId<I>) -> [FaceId<I>; 3] {
        let he0 = self.face(f).halfedge;
        let he1 = self.next(he0);
        let he2 = self.next(he1);
        [
            self.face_of(self.twin(he0)),
            self.face_of(self.twin(he1)),
            self.face_of(self.twin(he2)),
        ]
    }

    // ==================== Geometry ====================

    /// Compute the unit normal of a face.
    pub fn face_normal(&self, f: FaceId<I>) -> Vector3<f64> {
        let [p0, p1, p2] = self.face_positions(f);
        (p1 - p0).cross(&(p2 - p0)).normalize()
    }

    /// Compute the area of a face.
    pub fn face_area(&self, f: FaceId<I>) -> f64 {
        let [p0, p1, p2] = self.face_positions(f);
        0.5 * (p1 - p0).cross(&(p2 - p0)).norm()
    }

    /// Compute the axis-aligned bounding box of the mesh.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.vertices.first()?.position;
        let mut min = first;
        let mut max = first;

        for v in &self.vertices {
            for i in 0..3 {
                min[i] = min[i].min(v.position[i]);
                max[i] = max[i].max(v.position[i]);
            }
        }

        Some((min, max))
    }

    /// Compute the total surface area of the mesh.
    pub fn surface_area(&self) -> f64 {
        self.face_ids().map(|f| self.face_area(f)).sum()
    }

    // ==================== Construction ====================

    /// Add a new vertex and return its ID.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> VertexId<I> {
        let id = VertexId::new(self.vertices.len());
        self.vertices.push(Vertex::new(position));
        id
    }

    // ==================== Validation ====================

    /// Check if the mesh is valid (all connectivity is consistent).
    pub fn is_valid(&self) -> bool {
        for (i, v) in self.vertices.iter().enumerate() {
            if v.halfedge.is_valid() && self.halfedge(v.halfedge).origin.index() != i {
                return false;
            }
        }

        for (i, he) in self.halfedges.iter().enumerate() {
            if he.twin.is_valid() && self.halfedge(he.twin).twin.index() != i {
                return false;
            }
            if he.next.is_valid() && self.halfedge(he.next).prev.index() != i {
                return false;
            }
            if he.prev.is_valid() && self.halfedge(he.prev).next.index() != i {
                return false;
            }
        }

        self.faces.iter().all(|f| f.halfedge.is_valid())
    }

    /// Verify that every vertex is surrounded by a single fan of faces.
    ///
    /// Non-manifold edges cannot be represented at all (the builder rejects
    /// them), so a vertex check completes the 2-manifold test.
    pub fn check_manifold(&self) -> Result<()> {
        let mut outgoing: Vec<Vec<HalfEdgeId<I>>> = vec![Vec::new(); self.vertices.len()];
        for he in self.halfedge_ids() {
            let origin = self.origin(he);
            if origin.is_valid() {
                outgoing[origin.index()].push(he);
            }
        }

        for v in self.vertex_ids() {
            let all = &outgoing[v.index()];
            if all.is_empty() {
                continue;
            }

            // Every open fan contributes one outgoing border half-edge.
            let open_fans = all
                .iter()
                .filter(|&&he| self.is_boundary_halfedge(he))
                .count();
            if open_fans <= 1 && self.vertex_halfedges(v).count() == all.len() {
                continue;
            }

            let mut visited: Vec<HalfEdgeId<I>> = Vec::with_capacity(all.len());
            let mut rings = 0;
            for &start in all {
                if visited.contains(&start) {
                    continue;
                }
                rings += 1;
                visited.extend(VertexHalfEdgeIter::new(self, start));
            }

            return Err(MeshError::NonManifoldVertex {
                vertex: v.index(),
                fans: rings.max(open_fans).max(2),
            });
        }

        Ok(())
    }
}

/// Counter-clockwise iterator over the outgoing half-edges of a vertex.
///
/// Rotation follows `twin(prev(he))`. The walk stops at a dangling link, so
/// broken connectivity around non-manifold vertices cannot loop forever.
pub struct VertexHalfEdgeIter<'a, I: MeshIndex = u32> {
    mesh: &'a HalfEdgeMesh<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    remaining: usize,
}

impl<'a, I: MeshIndex> VertexHalfEdgeIter<'a, I> {
    fn new(mesh: &'a HalfEdgeMesh<I>, start: HalfEdgeId<I>) -> Self {
        Self {
            mesh,
            start,
            current: start,
            remaining: mesh.num_halfedges(),
        }
    }
}

impl<'a, I: MeshIndex> Iterator for VertexHalfEdgeIter<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.current.is_valid() || self.remaining == 0 {
            return None;
        }

        let result = self.current;
        self.remaining -= 1;

        // prev(he) ends at the vertex; its twin leaves it through the next
        // face counter-clockwise.
        let prev = self.mesh.prev(self.current);
        self.current = if prev.is_valid() {
            self.mesh.twin(prev)
        } else {
            HalfEdgeId::invalid()
        };
        if self.current == self.start {
            self.current = HalfEdgeId::invalid();
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_triangles;

    fn fan(n: usize) -> HalfEdgeMesh {
        let mut vertices = vec![Point3::origin()];
        for i in 0..n {
            let a = std::f64::consts::TAU * i as f64 / n as f64;
            vertices.push(Point3::new(a.cos(), a.sin(), 0.0));
        }
        let faces: Vec<[usize; 3]> = (0..n).map(|i| [0, 1 + i, 1 + (i + 1) % n]).collect();
        build_from_triangles(&vertices, &faces).unwrap()
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = HalfEdgeMesh::<u32>::new();
        assert_eq!(mesh.num_vertices(), 0);
        assert_eq!(mesh.num_faces(), 0);
        assert!(mesh.is_valid());
        assert!(mesh.bounding_box().is_none());
    }

    #[test]
    fn test_vertex_faces_are_ccw_cycle() {
        let mesh = fan(6);
        let center = VertexId::new(0);
        let star: Vec<FaceId> = mesh.vertex_faces(center).collect();
        assert_eq!(star.len(), 6);
        assert!(!mesh.is_boundary_vertex(center));

        // Consecutive faces share an edge, including the wrap-around.
        for i in 0..star.len() {
            let a = star[i];
            let b = star[(i + 1) % star.len()];
            assert!(mesh.face_neighbors(a).contains(&b));
        }

        // Face i spans angles i..i+1, so CCW order visits increasing i.
        let first = star[0].index();
        for (k, f) in star.iter().enumerate() {
            assert_eq!(f.index(), (first + k) % 6);
        }
    }

    #[test]
    fn test_boundary_vertex_faces_contiguous() {
        let mesh = fan(6);
        let rim = VertexId::new(1);
        assert!(mesh.is_boundary_vertex(rim));
        let star: Vec<FaceId> = mesh.vertex_faces(rim).collect();
        assert_eq!(star.len(), 2);
        assert!(mesh.face_neighbors(star[0]).contains(&star[1]));
    }

    #[test]
    fn test_positions_roundtrip() {
        let mut mesh = fan(4);
        let mut positions = mesh.positions();
        positions[0].z = 0.5;
        mesh.set_positions(&positions);
        assert_eq!(mesh.position(VertexId::new(0)).z, 0.5);

        mesh.map_positions(|p| p * 2.0);
        assert_eq!(mesh.position(VertexId::new(0)).z, 1.0);
    }

    #[test]
    fn test_bowtie_is_non_manifold() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(-1.0, -1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2], [0, 3, 4]];
        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();

        match mesh.check_manifold() {
            Err(MeshError::NonManifoldVertex { vertex, fans }) => {
                assert_eq!(vertex, 0);
                assert!(fans >= 2);
            }
            other => panic!("expected non-manifold vertex, got {:?}", other),
        }
    }

    #[test]
    fn test_closed_fan_is_manifold() {
        assert!(fan(5).check_manifold().is_ok());
    }
}
