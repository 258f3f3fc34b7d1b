//! Combinatorial developability energy.
//!
//! The star of an interior vertex is split into two contiguous fans, region
//! A covering `size` faces starting at `begin` and region B the rest. Each
//! region is scored by how much its face normals disagree, the two scores
//! are combined, and the vertex energy is the combined score of the best
//! split. A vertex whose star folds along a single hinge has zero energy.

use crate::mesh::{FaceId, HalfEdgeMesh, MeshIndex, VertexId};

use super::stars::{FaceGeometry, VertexStars};

/// How normal deviation is measured and combined across the two regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnergyPolicy {
    /// Largest squared normal difference in a region; the worse region
    /// decides.
    #[default]
    Max,
    /// Mean squared normal difference over all pairs, `1/r²` normalized;
    /// region scores are summed.
    Average,
}

impl EnergyPolicy {
    /// Combine the scores of region A and region B.
    #[inline]
    pub fn combine(self, cost_a: f64, cost_b: f64) -> f64 {
        match self {
            EnergyPolicy::Max => cost_a.max(cost_b),
            EnergyPolicy::Average => cost_a + cost_b,
        }
    }
}

/// One of the two fans of a partitioned star.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// The fan `[begin, begin + size)`.
    A,
    /// The complementary fan.
    B,
}

/// A split of a star of `n` faces into two contiguous fans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarPartition {
    /// First star position of region A.
    pub begin: usize,
    /// Number of faces in region A.
    pub size: usize,
}

impl StarPartition {
    /// Star positions of `region`, in counter-clockwise order.
    pub fn region(&self, region: Region, n: usize) -> impl Iterator<Item = usize> {
        let (start, len) = match region {
            Region::A => (self.begin, self.size),
            Region::B => (self.begin + self.size, n - self.size),
        };
        (0..len).map(move |t| (start + t) % n)
    }

    /// Every valid partition of a star of `n` faces, in search order.
    fn all(n: usize) -> impl Iterator<Item = StarPartition> {
        (0..n).flat_map(move |begin| {
            (2..=n.saturating_sub(2)).map(move |size| StarPartition { begin, size })
        })
    }
}

/// Energy of one vertex together with the split that achieves it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalEnergy {
    /// The vertex energy.
    pub energy: f64,
    /// The minimizing split, `None` for boundary vertices and stars with at
    /// most three faces.
    pub partition: Option<StarPartition>,
}

impl LocalEnergy {
    const ZERO: LocalEnergy = LocalEnergy {
        energy: 0.0,
        partition: None,
    };
}

/// Squared normal differences between every pair of star faces, row-major.
pub(crate) fn pair_distances<I: MeshIndex>(star: &[FaceId<I>], geometry: &FaceGeometry) -> Vec<f64> {
    let n = star.len();
    let mut d = vec![0.0; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let dist = (geometry.normal(star[i]) - geometry.normal(star[j])).norm_squared();
            d[i * n + j] = dist;
            d[j * n + i] = dist;
        }
    }
    d
}

/// Deviation of the faces at star positions `indices`.
pub(crate) fn deviation(d: &[f64], n: usize, indices: &[usize], policy: EnergyPolicy) -> f64 {
    match policy {
        EnergyPolicy::Max => {
            let mut max = 0.0;
            for (a, &i) in indices.iter().enumerate() {
                for &j in &indices[a + 1..] {
                    if d[i * n + j] > max {
                        max = d[i * n + j];
                    }
                }
            }
            max
        }
        EnergyPolicy::Average => {
            let mut sum = 0.0;
            for (a, &i) in indices.iter().enumerate() {
                for &j in &indices[a + 1..] {
                    sum += d[i * n + j];
                }
            }
            let r = indices.len() as f64;
            sum / (r * r)
        }
    }
}

/// Deviation of one region of a partitioned star.
pub fn region_deviation<I: MeshIndex>(
    star: &[FaceId<I>],
    partition: StarPartition,
    region: Region,
    geometry: &FaceGeometry,
    policy: EnergyPolicy,
) -> f64 {
    let n = star.len();
    let d = pair_distances(star, geometry);
    let indices: Vec<usize> = partition.region(region, n).collect();
    deviation(&d, n, &indices, policy)
}

/// Search every split of `star` for the lowest combined cost.
///
/// The first split reaching the minimum wins; later ties do not replace it.
pub(crate) fn best_partition<I: MeshIndex>(
    star: &[FaceId<I>],
    geometry: &FaceGeometry,
    policy: EnergyPolicy,
) -> LocalEnergy {
    let n = star.len();
    let d = pair_distances(star, geometry);
    let mut best = LocalEnergy::ZERO;
    let mut a: Vec<usize> = Vec::with_capacity(n);
    let mut b: Vec<usize> = Vec::with_capacity(n);

    for partition in StarPartition::all(n) {
        a.clear();
        a.extend(partition.region(Region::A, n));
        b.clear();
        b.extend(partition.region(Region::B, n));

        let cost = policy.combine(
            deviation(&d, n, &a, policy),
            deviation(&d, n, &b, policy),
        );
        if best.partition.is_none() || cost < best.energy {
            best = LocalEnergy {
                energy: cost,
                partition: Some(partition),
            };
        }
    }

    best
}

/// Energy of vertex `v` and its minimizing split.
///
/// Boundary vertices and vertices with at most three incident faces have
/// energy exactly zero.
pub fn local_energy<I: MeshIndex>(
    v: VertexId<I>,
    stars: &VertexStars<I>,
    geometry: &FaceGeometry,
    policy: EnergyPolicy,
) -> LocalEnergy {
    let star = stars.star(v);
    if stars.is_boundary(v) || star.len() <= 3 {
        return LocalEnergy::ZERO;
    }
    best_partition(star, geometry, policy)
}

/// Sum of the local energies of every vertex.
pub fn total_energy<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    stars: &VertexStars<I>,
    geometry: &FaceGeometry,
    policy: EnergyPolicy,
) -> f64 {
    mesh.vertex_ids()
        .map(|v| local_energy(v, stars, geometry, policy).energy)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_triangles, shapes};
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn evaluate(mesh: &HalfEdgeMesh, policy: EnergyPolicy) -> f64 {
        let stars = VertexStars::from_mesh(mesh);
        let geometry = FaceGeometry::from_mesh(mesh);
        total_energy(mesh, &stars, &geometry, policy)
    }

    fn hexagon_fan(center_z: f64, ring_z: [f64; 6]) -> HalfEdgeMesh {
        let mut vertices = vec![Point3::new(0.0, 0.0, center_z)];
        for (i, z) in ring_z.iter().enumerate() {
            let a = std::f64::consts::TAU * i as f64 / 6.0;
            vertices.push(Point3::new(a.cos(), a.sin(), *z));
        }
        let faces: Vec<[usize; 3]> = (0..6).map(|i| [0, 1 + i, 1 + (i + 1) % 6]).collect();
        build_from_triangles(&vertices, &faces).unwrap()
    }

    #[test]
    fn test_partition_regions_wrap() {
        let p = StarPartition { begin: 4, size: 3 };
        let a: Vec<usize> = p.region(Region::A, 6).collect();
        let b: Vec<usize> = p.region(Region::B, 6).collect();
        assert_eq!(a, vec![4, 5, 0]);
        assert_eq!(b, vec![1, 2, 3]);
    }

    #[test]
    fn test_partition_search_space() {
        assert_eq!(StarPartition::all(6).count(), 6 * 3);
        assert_eq!(StarPartition::all(4).count(), 4);
        assert_eq!(StarPartition::all(3).count(), 0);
    }

    #[test]
    fn test_flat_mesh_has_zero_energy() {
        let mesh: HalfEdgeMesh = shapes::grid(4, 1.0).unwrap();
        assert_eq!(evaluate(&mesh, EnergyPolicy::Max), 0.0);
        assert_eq!(evaluate(&mesh, EnergyPolicy::Average), 0.0);
    }

    #[test]
    fn test_boundary_vertices_have_zero_energy() {
        let mesh: HalfEdgeMesh = shapes::bumpy_sheet(4, 0.3).unwrap();
        let stars = VertexStars::from_mesh(&mesh);
        let geometry = FaceGeometry::from_mesh(&mesh);

        for v in mesh.vertex_ids() {
            let local = local_energy(v, &stars, &geometry, EnergyPolicy::Max);
            assert!(local.energy >= 0.0);
            if stars.is_boundary(v) {
                assert_eq!(local.energy, 0.0);
                assert!(local.partition.is_none());
            }
        }
    }

    #[test]
    fn test_small_star_has_zero_energy() {
        // Apex of a tetrahedron-like cap: closed star with three faces.
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];
        let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
        assert_eq!(evaluate(&mesh, EnergyPolicy::Max), 0.0);
    }

    #[test]
    fn test_octahedron_energy() {
        let mesh: HalfEdgeMesh = shapes::octahedron().unwrap();
        // Adjacent faces differ in one normal component by 2/√3.
        assert_relative_eq!(evaluate(&mesh, EnergyPolicy::Max), 8.0, epsilon = 1e-12);
        assert_relative_eq!(evaluate(&mesh, EnergyPolicy::Average), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_folded_sheet_is_developable() {
        let mesh: HalfEdgeMesh = shapes::folded_sheet(6, 0.8).unwrap();
        assert!(evaluate(&mesh, EnergyPolicy::Max) < 1e-20);

        let bumpy: HalfEdgeMesh = shapes::bumpy_sheet(6, 0.2).unwrap();
        assert!(evaluate(&bumpy, EnergyPolicy::Max) > 1e-3);
    }

    #[test]
    fn test_first_strict_minimum_wins() {
        // Every split of a flat star costs zero, so the first one is kept.
        let mesh = hexagon_fan(0.0, [0.0; 6]);
        let stars = VertexStars::from_mesh(&mesh);
        let geometry = FaceGeometry::from_mesh(&mesh);
        let local = local_energy(VertexId::new(0), &stars, &geometry, EnergyPolicy::Max);
        assert_eq!(local.partition, Some(StarPartition { begin: 0, size: 2 }));
    }

    #[test]
    fn test_region_deviation_policies() {
        let mesh = hexagon_fan(0.2, [0.0, 0.3, -0.1, 0.5, 0.2, -0.4]);
        let stars = VertexStars::from_mesh(&mesh);
        let geometry = FaceGeometry::from_mesh(&mesh);
        let star = stars.star(VertexId::new(0));
        let p = StarPartition { begin: 1, size: 3 };

        let max = region_deviation(star, p, Region::A, &geometry, EnergyPolicy::Max);
        let avg = region_deviation(star, p, Region::A, &geometry, EnergyPolicy::Average);
        // Three pairs averaged over r² = 9 can never exceed the largest pair.
        assert!(avg <= max);
        assert!(avg * 9.0 >= max);
    }
}
