//! Removal of small wedge angles.
//!
//! A triangle with two tiny corners is a flat cap: flipping the edge between
//! those corners (the edge opposite the obtuse corner) replaces it with a
//! better-shaped pair. A triangle with one tiny corner is a needle: collapsing
//! the short edge opposite that corner removes it. Developability flow
//! produces both shapes, and their normals are numerically unreliable.

use log::{debug, warn};

use crate::error::{MeshError, Result};
use crate::mesh::{build_from_triangles, HalfEdgeMesh, MeshIndex};

use super::FaceList;

/// Options for the wedge-angle remeshing pass.
#[derive(Debug, Clone)]
pub struct RemeshOptions {
    /// Corner angles below this value (in degrees) trigger an operation.
    pub angle_threshold: f64,

    /// Whether cap triangles may be fixed by edge flips.
    pub edge_flips: bool,

    /// Whether needle triangles may be fixed by edge collapses.
    pub edge_collapses: bool,
}

impl Default for RemeshOptions {
    fn default() -> Self {
        Self {
            angle_threshold: 1.0,
            edge_flips: true,
            edge_collapses: true,
        }
    }
}

impl RemeshOptions {
    /// Set the small-angle threshold in degrees.
    pub fn with_angle_threshold(mut self, degrees: f64) -> Self {
        self.angle_threshold = degrees;
        self
    }

    /// Enable or disable edge flips.
    pub fn with_edge_flips(mut self, enabled: bool) -> Self {
        self.edge_flips = enabled;
        self
    }

    /// Enable or disable edge collapses.
    pub fn with_edge_collapses(mut self, enabled: bool) -> Self {
        self.edge_collapses = enabled;
        self
    }

    /// Check that the threshold lies in (0, 60) degrees.
    ///
    /// Every triangle has a corner of at least 60 degrees, so larger
    /// thresholds would flag every face.
    pub fn validate(&self) -> Result<()> {
        if !(self.angle_threshold > 0.0 && self.angle_threshold < 60.0) {
            return Err(MeshError::invalid_param(
                "angle_threshold",
                self.angle_threshold,
                "must be in (0, 60) degrees",
            ));
        }
        Ok(())
    }
}

/// Run one pass of flips and collapses over every face.
///
/// Each face takes part in at most one operation per pass. The mesh is
/// rebuilt afterwards; if the result is not a 2-manifold the whole pass is
/// discarded and the mesh is left as it was. Returns whether the topology
/// changed, in which case element ids are renumbered and any cached
/// per-element data is stale.
pub fn remove_small_angles<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, options: &RemeshOptions) -> bool {
    if !options.edge_flips && !options.edge_collapses {
        return false;
    }

    let threshold = options.angle_threshold.to_radians();
    let mut list = FaceList::from_mesh(mesh);
    let mut touched = vec![false; list.num_faces()];
    let mut flips = 0usize;
    let mut collapses = 0usize;

    for f in 0..list.num_faces() {
        if !list.is_face_alive(f) || touched[f] {
            continue;
        }

        let face = list.face(f);
        let small = list.corner_angles(f).map(|angle| angle < threshold);
        let num_small = small.iter().filter(|&&s| s).count();

        if num_small >= 2 {
            if !options.edge_flips {
                continue;
            }
            let Some(k) = (0..3).find(|&k| small[k] && small[(k + 1) % 3]) else {
                continue;
            };
            let a = face[k];
            let b = face[(k + 1) % 3];
            if list.edge_faces(a, b).iter().any(|&g| touched[g]) {
                continue;
            }
            if let Some(changed) = list.flip(a, b) {
                for g in changed {
                    touched[g] = true;
                }
                flips += 1;
            }
        } else if num_small == 1 && options.edge_collapses {
            let Some(k) = (0..3).find(|&k| small[k]) else {
                continue;
            };
            let a = face[(k + 1) % 3];
            let b = face[(k + 2) % 3];
            if list.edge_faces(a, b).iter().any(|&g| touched[g]) {
                continue;
            }
            if let Some((keep, dead)) = list.collapse(a, b) {
                for g in dead {
                    touched[g] = true;
                }
                for &g in list.vertex_faces(keep) {
                    touched[g] = true;
                }
                collapses += 1;
            }
        }
    }

    if flips == 0 && collapses == 0 {
        return false;
    }

    let (positions, faces) = list.compact();
    let rebuilt = build_from_triangles::<I>(&positions, &faces).and_then(|m| {
        m.check_manifold()?;
        Ok(m)
    });

    match rebuilt {
        Ok(m) => {
            debug!(
                "remesh pass: {} flips, {} collapses, {} faces left",
                flips,
                collapses,
                m.num_faces()
            );
            *mesh = m;
            true
        }
        Err(err) => {
            warn!("remesh pass discarded: {}", err);
            false
        }
    }
}
