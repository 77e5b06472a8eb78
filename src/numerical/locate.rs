//! Barycentric point location: inside/outside tests via signed sub-triangle
//! areas, reference coordinates via the closed-form inverse of the affine
//! corner map, and the local neighbor-walk search used by the
//! characteristic tracing.

use crate::domain::geometry::{det, Point, Triangle};
use crate::domain::mesh2d::Mesh2d;

/// Tolerance on the signed sub-areas for points sitting on an edge.
pub const INSIDE_TOL: f64 = 1e-12;

/// Result of locating a point against one triangle.
#[derive(Debug, Clone, Copy)]
pub struct Location {
    /// The point mapped back to the reference triangle.
    pub reference: Point,
    /// Signed areas of the three sub-triangles (query point against each
    /// pair of corners); all non-negative iff the point is inside.
    pub subareas: [f64; 3],
}

impl Location {
    pub fn is_inside(&self) -> bool {
        self.subareas
            .iter()
            .all(|&a| a >= -INSIDE_TOL)
    }
}

/// Computes the signed sub-areas and reference coordinates of `p` with
/// respect to triangle `t`.
pub fn locate(t: &Triangle, p: Point) -> Location {
    let v0 = t.corner(0);
    let v1 = t.corner(1);
    let v2 = t.corner(2);

    let subareas = [
        det(p, v1, v2) * 0.5,
        det(v0, p, v2) * 0.5,
        det(v0, v1, p) * 0.5,
    ];

    // Closed-form inverse of the affine map corner -> corner.
    let d = (v1.x - v0.x) * (v2.y - v0.y) - (v1.y - v0.y) * (v2.x - v0.x);
    let reference = Point::new(
        ((v2.y - v0.y) * (p.x - v0.x) + (v0.x - v2.x) * (p.y - v0.y)) / d,
        ((v0.y - v1.y) * (p.x - v0.x) + (v1.x - v0.x) * (p.y - v0.y)) / d,
    );

    Location { reference, subareas }
}

/// Local hill-climbing search: returns the triangle containing `p` among
/// `start` and its direct neighbors, with the reference coordinates of `p`
/// in that triangle. Correct only while the per-step displacement stays
/// small relative to the element size; a miss means the caller must apply
/// its domain-boundary fallback.
pub fn find_containing(mesh: &Mesh2d, start: usize, p: Point) -> Option<(usize, Point)> {
    let here = locate(&mesh.triangles[start], p);
    if here.is_inside() {
        return Some((start, here.reference));
    }
    for &j in &mesh.neighbors[start] {
        let loc = locate(&mesh.triangles[j], p);
        if loc.is_inside() {
            return Some((j, loc.reference));
        }
    }
    None
}

/// Linear scan restricted to the precomputed outflow ("exit") triangles,
/// for points that left the domain through the outflow boundary.
pub fn find_in_exit_set(mesh: &Mesh2d, p: Point) -> Option<(usize, Point)> {
    for &j in &mesh.exit_triangles {
        let loc = locate(&mesh.triangles[j], p);
        if loc.is_inside() {
            return Some((j, loc.reference));
        }
    }
    None
}
