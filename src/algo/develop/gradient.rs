//! Analytic gradient of the developability energy.
//!
//! The split minimizing each vertex energy is held fixed while
//! differentiating, so the gradient of a vertex term is the gradient of its
//! region deviations. Each squared normal difference `|Ni - Nj|²` pushes on
//! the three corners of face i through `2 Jᵀ (Ni - Nj)` and on the corners of
//! face j with the opposite sign, where J is the Jacobian of a unit face
//! normal with respect to one corner position.

use nalgebra::{Matrix3, Vector3};

use crate::mesh::{FaceId, HalfEdgeMesh, MeshIndex};

use super::energy::{best_partition, pair_distances, EnergyPolicy, Region, StarPartition};
use super::stars::{FaceGeometry, VertexStars};

/// Jacobian of the unit normal of face `f` with respect to corner `corner`.
///
/// With `e` the edge opposite the corner, `dN/dp = (e × N) Nᵀ / (2A)`: moving
/// a corner within the face plane leaves the normal unchanged, moving it
/// along the normal tilts the normal toward the opposite edge.
pub fn face_normal_jacobian<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    geometry: &FaceGeometry,
    f: FaceId<I>,
    corner: usize,
) -> Matrix3<f64> {
    let p = mesh.face_positions(f);
    let e = p[(corner + 2) % 3] - p[(corner + 1) % 3];
    let n = geometry.normal(f);
    (e.cross(n) * n.transpose()) / (2.0 * geometry.area(f))
}

/// Add `scale * d|Ni - Nj|²/dp` to the corners of faces i and j.
fn accumulate_pair<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    geometry: &FaceGeometry,
    fi: FaceId<I>,
    fj: FaceId<I>,
    scale: f64,
    grad: &mut [Vector3<f64>],
) {
    let diff = geometry.normal(fi) - geometry.normal(fj);
    for (face, sign) in [(fi, 1.0), (fj, -1.0)] {
        let corners = mesh.face_triangle(face);
        for (k, v) in corners.iter().enumerate() {
            let jacobian = face_normal_jacobian(mesh, geometry, face, k);
            grad[v.index()] += (sign * scale) * (jacobian.transpose() * diff);
        }
    }
}

/// Positions in `indices` of the pair with the largest squared difference.
fn arg_max_pair(d: &[f64], n: usize, indices: &[usize]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    let mut max = 0.0;
    for (a, &i) in indices.iter().enumerate() {
        for &j in &indices[a + 1..] {
            if best.is_none() || d[i * n + j] > max {
                max = d[i * n + j];
                best = Some((i, j));
            }
        }
    }
    best
}

/// Accumulate the gradient of one vertex term into `grad`.
fn vertex_gradient<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    star: &[FaceId<I>],
    partition: StarPartition,
    geometry: &FaceGeometry,
    policy: EnergyPolicy,
    grad: &mut [Vector3<f64>],
) {
    let n = star.len();
    let d = pair_distances(star, geometry);
    let a: Vec<usize> = partition.region(Region::A, n).collect();
    let b: Vec<usize> = partition.region(Region::B, n).collect();

    match policy {
        EnergyPolicy::Max => {
            // Only the region that sets the energy, and within it only the
            // pair that sets the region score, has a non-zero derivative.
            let (pair_a, pair_b) = (arg_max_pair(&d, n, &a), arg_max_pair(&d, n, &b));
            let cost = |pair: Option<(usize, usize)>| pair.map_or(0.0, |(i, j)| d[i * n + j]);
            let active = if cost(pair_b) > cost(pair_a) { pair_b } else { pair_a };
            if let Some((i, j)) = active {
                accumulate_pair(mesh, geometry, star[i], star[j], 2.0, grad);
            }
        }
        EnergyPolicy::Average => {
            for region in [&a, &b] {
                let r = region.len() as f64;
                let scale = 2.0 / (r * r);
                for (s, &i) in region.iter().enumerate() {
                    for &j in &region[s + 1..] {
                        accumulate_pair(mesh, geometry, star[i], star[j], scale, grad);
                    }
                }
            }
        }
    }
}

/// Compute the total energy and its gradient with respect to every vertex.
///
/// `grad` is resized to the vertex count and overwritten. Boundary vertices
/// contribute no energy term, but still receive gradient from the terms of
/// interior neighbors whose stars contain their faces.
pub fn total_energy_gradient<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    stars: &VertexStars<I>,
    geometry: &FaceGeometry,
    policy: EnergyPolicy,
    grad: &mut Vec<Vector3<f64>>,
) -> f64 {
    grad.clear();
    grad.resize(mesh.num_vertices(), Vector3::zeros());

    let mut energy = 0.0;
    for v in mesh.vertex_ids() {
        let star = stars.star(v);
        if stars.is_boundary(v) || star.len() <= 3 {
            continue;
        }
        let local = best_partition(star, geometry, policy);
        energy += local.energy;
        if let Some(partition) = local.partition {
            vertex_gradient(mesh, star, partition, geometry, policy, grad);
        }
    }

    energy
}
