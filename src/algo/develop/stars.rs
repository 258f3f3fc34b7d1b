//! Per-vertex face stars and per-face geometry.
//!
//! Both tables are dense and indexed by element id, so they are only valid
//! for the topology they were built from. The optimizer rebuilds them after
//! every remeshing pass.

use nalgebra::Vector3;

use crate::mesh::{FaceId, HalfEdgeMesh, MeshIndex, VertexId};

/// Counter-clockwise ordered incident faces of every vertex.
#[derive(Debug, Clone, Default)]
pub struct VertexStars<I: MeshIndex = u32> {
    stars: Vec<Vec<FaceId<I>>>,
    boundary: Vec<bool>,
}

impl<I: MeshIndex> VertexStars<I> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            stars: Vec::new(),
            boundary: Vec::new(),
        }
    }

    /// Build the stars of every vertex of `mesh`.
    pub fn from_mesh(mesh: &HalfEdgeMesh<I>) -> Self {
        let mut stars = Self::new();
        update_face_stars(mesh, &mut stars);
        stars
    }

    /// Faces around `v`, cyclic and counter-clockwise.
    #[inline]
    pub fn star(&self, v: VertexId<I>) -> &[FaceId<I>] {
        &self.stars[v.index()]
    }

    /// Whether `v` lies on the mesh border.
    #[inline]
    pub fn is_boundary(&self, v: VertexId<I>) -> bool {
        self.boundary[v.index()]
    }

    /// Number of vertices covered.
    #[inline]
    pub fn len(&self) -> usize {
        self.stars.len()
    }

    /// Whether the table covers no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }
}

/// Unit normal and area of every face.
#[derive(Debug, Clone, Default)]
pub struct FaceGeometry {
    normals: Vec<Vector3<f64>>,
    areas: Vec<f64>,
}

impl FaceGeometry {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute normals and areas for every face of `mesh`.
    pub fn from_mesh<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> Self {
        let mut geometry = Self::new();
        update_normals_and_areas(mesh, &mut geometry);
        geometry
    }

    /// Unit normal of face `f`. NaN for zero-area faces.
    #[inline]
    pub fn normal<I: MeshIndex>(&self, f: FaceId<I>) -> &Vector3<f64> {
        &self.normals[f.index()]
    }

    /// Area of face `f`.
    #[inline]
    pub fn area<I: MeshIndex>(&self, f: FaceId<I>) -> f64 {
        self.areas[f.index()]
    }

    /// All face areas, indexed by face id.
    pub fn areas(&self) -> &[f64] {
        &self.areas
    }
}

/// Rebuild the star and boundary flag of every vertex.
///
/// Stars follow the half-edge rotation around each vertex, so consecutive
/// entries share an edge. Border half-edges contribute no face, which makes
/// a boundary star an open fan starting right after the border.
pub fn update_face_stars<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, stars: &mut VertexStars<I>) {
    let n = mesh.num_vertices();
    stars.stars.resize_with(n, Vec::new);
    stars.stars.truncate(n);
    stars.boundary.resize(n, false);
    stars.boundary.truncate(n);

    for v in mesh.vertex_ids() {
        let star = &mut stars.stars[v.index()];
        star.clear();
        let mut boundary = !mesh.vertex(v).halfedge.is_valid();

        for he in mesh.vertex_halfedges(v) {
            let f = mesh.face_of(he);
            if f.is_valid() {
                star.push(f);
            } else {
                boundary = true;
            }
        }
        stars.boundary[v.index()] = boundary;
    }
}

/// Recompute unit normals and areas from current vertex positions.
///
/// The raw normal is the cross product of two edge vectors, the area half
/// its length. Degenerate faces are not guarded and yield NaN normals.
pub fn update_normals_and_areas<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, geometry: &mut FaceGeometry) {
    geometry.normals.clear();
    geometry.areas.clear();
    geometry.normals.reserve(mesh.num_faces());
    geometry.areas.reserve(mesh.num_faces());

    for f in mesh.face_ids() {
        let [p0, p1, p2] = mesh.face_positions(f);
        let raw = (p1 - p0).cross(&(p2 - p0));
        let length = raw.norm();
        geometry.normals.push(raw / length);
        geometry.areas.push(0.5 * length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_triangles, shapes};
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_interior_star_is_closed_cycle() {
        let mesh: HalfEdgeMesh = shapes::grid(4, 4.0).unwrap();
        let stars = VertexStars::from_mesh(&mesh);
        let v = VertexId::new(12);

        assert!(!stars.is_boundary(v));
        let star = stars.star(v);
        assert_eq!(star.len(), 6);
        for i in 0..star.len() {
            let next = star[(i + 1) % star.len()];
            assert!(mesh.face_neighbors(star[i]).contains(&next));
        }
    }

    #[test]
    fn test_boundary_flags() {
        let mesh: HalfEdgeMesh = shapes::grid(2, 1.0).unwrap();
        let stars = VertexStars::from_mesh(&mesh);
        let interior: Vec<bool> = mesh.vertex_ids().map(|v| !stars.is_boundary(v)).collect();
        assert_eq!(interior.iter().filter(|&&i| i).count(), 1);
        assert!(interior[4]);
        assert_eq!(stars.star(VertexId::new(0)).len(), 2);
    }

    #[test]
    fn test_stars_follow_topology_changes() {
        let coarse: HalfEdgeMesh = shapes::grid(2, 1.0).unwrap();
        let mut stars = VertexStars::from_mesh(&shapes::grid::<u32>(4, 1.0).unwrap());
        update_face_stars(&coarse, &mut stars);
        assert_eq!(stars.len(), 9);
    }

    #[test]
    fn test_normals_and_areas() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 3.0, 0.0),
        ];
        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap();
        let geometry = FaceGeometry::from_mesh(&mesh);
        let f = FaceId::<u32>::new(0);

        assert_relative_eq!(geometry.area(f), 3.0);
        assert_relative_eq!(*geometry.normal(f), Vector3::z());
    }

    #[test]
    fn test_degenerate_face_has_nan_normal() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap();
        let geometry = FaceGeometry::from_mesh(&mesh);
        let f = FaceId::<u32>::new(0);

        assert_eq!(geometry.area(f), 0.0);
        assert!(geometry.normal(f).x.is_nan());
    }
}
