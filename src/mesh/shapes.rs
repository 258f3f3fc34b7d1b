//! Procedural test surfaces.
//!
//! Every generator triangulates a regular `n × n` grid of squares, splitting
//! each square along its rising diagonal, and then maps the planar grid into
//! 3D. Vertex `(i, j)` has index `j * (n + 1) + i`.

use std::f64::consts::PI;

use nalgebra::Point3;

use super::builder::build_from_triangles;
use super::halfedge::HalfEdgeMesh;
use super::index::MeshIndex;
use crate::error::{MeshError, Result};

/// Face list of an `n × n` grid, counter-clockwise seen from +z.
fn grid_faces(n: usize) -> Vec<[usize; 3]> {
    let mut faces = Vec::with_capacity(2 * n * n);
    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            let v10 = v00 + 1;
            let v01 = v00 + (n + 1);
            let v11 = v01 + 1;

            faces.push([v00, v10, v11]);
            faces.push([v00, v11, v01]);
        }
    }
    faces
}

/// Grid over `[-1, 1]²` with each point mapped through `f`.
fn mapped_grid<I, F>(n: usize, f: F) -> Result<HalfEdgeMesh<I>>
where
    I: MeshIndex,
    F: Fn(f64, f64) -> Point3<f64>,
{
    if n == 0 {
        return Err(MeshError::invalid_param("n", n, "must be at least 1"));
    }

    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    for j in 0..=n {
        for i in 0..=n {
            let x = 2.0 * i as f64 / n as f64 - 1.0;
            let y = 2.0 * j as f64 / n as f64 - 1.0;
            vertices.push(f(x, y));
        }
    }

    build_from_triangles(&vertices, &grid_faces(n))
}

/// A flat `n × n` grid covering `[0, size]²` in the z = 0 plane.
pub fn grid<I: MeshIndex>(n: usize, size: f64) -> Result<HalfEdgeMesh<I>> {
    mapped_grid(n, |x, y| {
        Point3::new(0.5 * (x + 1.0) * size, 0.5 * (y + 1.0) * size, 0.0)
    })
}

/// A sheet over `[-1, 1]²` folded along the line x = 0.
///
/// The half x > 0 is rotated by `fold_angle` radians about the y axis. Both
/// halves stay planar, so the surface is exactly developable. `n` must be
/// even to put the fold on a grid line.
pub fn folded_sheet<I: MeshIndex>(n: usize, fold_angle: f64) -> Result<HalfEdgeMesh<I>> {
    if n % 2 != 0 {
        return Err(MeshError::invalid_param("n", n, "must be even"));
    }
    let (sin, cos) = fold_angle.sin_cos();
    mapped_grid(n, |x, y| {
        if x > 0.0 {
            Point3::new(x * cos, y, x * sin)
        } else {
            Point3::new(x, y, 0.0)
        }
    })
}

/// A sheet over `[-1, 1]²` with height `amplitude * sin(πx) * sin(πy)`.
///
/// Doubly curved wherever the amplitude is non-zero.
pub fn bumpy_sheet<I: MeshIndex>(n: usize, amplitude: f64) -> Result<HalfEdgeMesh<I>> {
    mapped_grid(n, |x, y| {
        Point3::new(x, y, amplitude * (PI * x).sin() * (PI * y).sin())
    })
}

/// The regular octahedron with vertices on the coordinate axes.
///
/// Closed, so every vertex is interior with a star of four faces.
pub fn octahedron<I: MeshIndex>() -> Result<HalfEdgeMesh<I>> {
    let vertices = vec![
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(-1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, -1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(0.0, 0.0, -1.0),
    ];
    let faces = vec![
        [0, 2, 4],
        [2, 1, 4],
        [1, 3, 4],
        [3, 0, 4],
        [2, 0, 5],
        [1, 2, 5],
        [3, 1, 5],
        [0, 3, 5],
    ];
    build_from_triangles(&vertices, &faces)
}
