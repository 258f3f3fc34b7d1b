//! Mesh construction utilities.
//!
//! Converts between face-vertex lists (`[usize; 3]` per triangle) and the
//! half-edge representation. The remeshing pass relies on this round trip:
//! it edits a face list, compacts it and rebuilds the half-edge mesh.

use std::collections::HashMap;

use nalgebra::Point3;

use super::halfedge::{Face, HalfEdge, HalfEdgeMesh};
use super::index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
use crate::error::{MeshError, Result};

/// Build a half-edge mesh from vertices and counter-clockwise triangles.
///
/// # Errors
///
/// * [`MeshError::EmptyMesh`] if `faces` is empty
/// * [`MeshError::InvalidVertexIndex`] for out-of-range indices
/// * [`MeshError::DegenerateFace`] for repeated indices within a face
/// * [`MeshError::NonManifoldEdge`] if two faces traverse the same directed
///   edge, which happens for edges with more than two faces and for
///   inconsistently oriented neighbors
///
/// Non-manifold *vertices* are representable; see
/// [`HalfEdgeMesh::check_manifold`].
///
/// # Example
/// ```
/// use crease::mesh::{build_from_triangles, HalfEdgeMesh};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let faces = vec![[0, 1, 2]];
///
/// let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
/// assert_eq!(mesh.num_vertices(), 3);
/// assert_eq!(mesh.num_faces(), 1);
/// ```
pub fn build_from_triangles<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
) -> Result<HalfEdgeMesh<I>> {
    if faces.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    for (fi, face) in faces.iter().enumerate() {
        for &vi in face {
            if vi >= vertices.len() {
                return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
            }
        }
        if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
            return Err(MeshError::DegenerateFace { face: fi });
        }
    }

    let mut mesh = HalfEdgeMesh::with_capacity(vertices.len(), faces.len());
    for &pos in vertices {
        mesh.add_vertex(pos);
    }

    // Directed edge (v0, v1) -> interior half-edge.
    let mut edge_map: HashMap<(usize, usize), HalfEdgeId<I>> =
        HashMap::with_capacity(faces.len() * 3);

    for (fi, face) in faces.iter().enumerate() {
        let face_id = FaceId::<I>::new(fi);
        let base = mesh.num_halfedges();
        let ids = [
            HalfEdgeId::<I>::new(base),
            HalfEdgeId::<I>::new(base + 1),
            HalfEdgeId::<I>::new(base + 2),
        ];

        for k in 0..3 {
            let v0 = face[k];
            let v1 = face[(k + 1) % 3];
            if edge_map.insert((v0, v1), ids[k]).is_some() {
                return Err(MeshError::NonManifoldEdge { v0, v1 });
            }

            mesh.halfedges.push(HalfEdge {
                origin: VertexId::new(v0),
                twin: HalfEdgeId::invalid(),
                next: ids[(k + 1) % 3],
                prev: ids[(k + 2) % 3],
                face: face_id,
            });
            mesh.vertex_mut(VertexId::new(v0)).halfedge = ids[k];
        }

        mesh.faces.push(Face::new(ids[0]));
    }

    // Link twins in face order, creating border half-edges where an edge has
    // a single face.
    for face in faces {
        for k in 0..3 {
            let v0 = face[k];
            let v1 = face[(k + 1) % 3];
            let he = edge_map[&(v0, v1)];
            if mesh.twin(he).is_valid() {
                continue;
            }

            let twin = match edge_map.get(&(v1, v0)) {
                Some(&twin) => twin,
                None => {
                    let border = HalfEdgeId::<I>::new(mesh.num_halfedges());
                    mesh.halfedges.push(HalfEdge {
                        origin: VertexId::new(v1),
                        ..HalfEdge::new()
                    });
                    border
                }
            };
            mesh.halfedge_mut(he).twin = twin;
            mesh.halfedge_mut(twin).twin = he;
        }
    }

    link_boundary_loops(&mut mesh);
    fix_boundary_vertex_halfedges(&mut mesh);

    Ok(mesh)
}

/// Link border half-edges into loops through their `next`/`prev` fields.
fn link_boundary_loops<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) {
    let border: Vec<HalfEdgeId<I>> = mesh
        .halfedge_ids()
        .filter(|&he| mesh.is_boundary_halfedge(he))
        .collect();

    let mut outgoing: HashMap<usize, HalfEdgeId<I>> = HashMap::with_capacity(border.len());
    for &he in &border {
        outgoing.insert(mesh.origin(he).index(), he);
    }

    for &he in &border {
        let dest = mesh.dest(he).index();
        if let Some(&next) = outgoing.get(&dest) {
            mesh.halfedge_mut(he).next = next;
            mesh.halfedge_mut(next).prev = he;
        }
    }
}

/// Point every boundary vertex at its outgoing border half-edge, so vertex
/// rotation starts right after the border.
fn fix_boundary_vertex_halfedges<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) {
    for v in 0..mesh.num_vertices() {
        let vid = VertexId::<I>::new(v);
        let border = mesh
            .vertex_halfedges(vid)
            .find(|&he| mesh.is_boundary_halfedge(he));
        if let Some(he) = border {
            mesh.vertex_mut(vid).halfedge = he;
        }
    }
}

/// Convert a half-edge mesh back to a face-vertex representation.
///
/// Returns a `(vertices, faces)` tuple indexed like the mesh arenas.
pub fn to_face_vertex<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
    let vertices = mesh.positions();
    let faces = mesh
        .face_ids()
        .map(|f| {
            let [v0, v1, v2] = mesh.face_triangle(f);
            [v0.index(), v1.index(), v2.index()]
        })
        .collect();

    (vertices, faces)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron() -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];
        let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
        (vertices, faces)
    }

    #[test]
    fn test_closed_tetrahedron() {
        let (vertices, faces) = tetrahedron();
        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();

        assert_eq!(mesh.num_halfedges(), 12);
        assert!(mesh.is_valid());
        assert!(mesh.check_manifold().is_ok());
        for v in mesh.vertex_ids() {
            assert!(!mesh.is_boundary_vertex(v));
            assert_eq!(mesh.vertex_faces(v).count(), 3);
        }
    }

    #[test]
    fn test_round_trip_face_list() {
        let (vertices, faces) = tetrahedron();
        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
        let (v2, f2) = to_face_vertex(&mesh);
        assert_eq!(v2, vertices);
        assert_eq!(f2, faces);
    }

    #[test]
    fn test_single_triangle_border() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap();
        assert_eq!(mesh.num_halfedges(), 6);
        assert!(mesh.is_valid());
        for v in mesh.vertex_ids() {
            assert!(mesh.is_boundary_vertex(v));
            assert!(mesh.is_boundary_halfedge(mesh.vertex(v).halfedge));
        }
    }

    #[test]
    fn test_rejects_three_faces_on_edge() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, -1.0, 0.0),
            Point3::new(0.5, 0.0, 1.0),
        ];
        let faces = vec![[0, 1, 2], [1, 0, 3], [0, 1, 4]];
        let err = build_from_triangles::<u32>(&vertices, &faces).unwrap_err();
        assert!(matches!(err, MeshError::NonManifoldEdge { v0: 0, v1: 1 }));
    }

    #[test]
    fn test_rejects_bad_input() {
        let vertices = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        assert!(matches!(
            build_from_triangles::<u32>(&vertices, &[]),
            Err(MeshError::EmptyMesh)
        ));
        assert!(matches!(
            build_from_triangles::<u32>(&vertices, &[[0, 1, 5]]),
            Err(MeshError::InvalidVertexIndex { face: 0, vertex: 5 })
        ));
        assert!(matches!(
            build_from_triangles::<u32>(&vertices, &[[0, 1, 1]]),
            Err(MeshError::DegenerateFace { face: 0 })
        ));
    }
}
