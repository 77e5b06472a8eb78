//! P2 field interpolation: gathering the six nodal values of a triangle
//! from a global solution vector and evaluating the quadratic interpolant
//! at reference-triangle points.

use crate::domain::geometry::{Point, Triangle};
use crate::domain::mesh2d::Mesh2d;
use crate::numerical::{lambda, phi, QUADRATURE};

/// Global dof numbers of the six P2 nodes of triangle `k`.
pub fn element_dofs(mesh: &Mesh2d, k: usize) -> [usize; 6] {
    let mut dofs = [0usize; 6];
    for (i, d) in dofs.iter_mut().enumerate() {
        *d = mesh.global_dof(k, i);
    }
    dofs
}

/// Both velocity components of a solution vector restricted to triangle
/// `k`. The vector follows the global block layout: x-velocity dofs first,
/// y-velocity dofs offset by `n`.
pub fn element_velocity(mesh: &Mesh2d, k: usize, field: &[f64], n: usize) -> ([f64; 6], [f64; 6]) {
    let dofs = element_dofs(mesh, k);
    let mut u = [0.0; 6];
    let mut v = [0.0; 6];
    for i in 0..6 {
        u[i] = field[dofs[i]];
        v[i] = field[dofs[i] + n];
    }
    (u, v)
}

/// Σ uᵢ·φᵢ at a reference-triangle point.
pub fn p2_value(coeffs: &[f64; 6], p: Point) -> f64 {
    (0..6).map(|i| coeffs[i] * phi(i, p)).sum()
}

/// The seven quadrature points mapped into physical triangle `t`.
pub fn quadrature_points(t: &Triangle) -> [Point; 7] {
    let mut points = [Point::default(); 7];
    for (ps, out) in points.iter_mut().enumerate() {
        let r = QUADRATURE.points[ps];
        let mut x = 0.0;
        let mut y = 0.0;
        for c in 0..3 {
            let l = lambda(c, r);
            x += l * t.corner(c).x;
            y += l * t.corner(c).y;
        }
        *out = Point::new(x, y);
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::Vertex;
    use crate::domain::mesh2d::tests::unit_square_mesh;
    use crate::numerical::p2_node;
    use approx::assert_relative_eq;

    #[test]
    fn test_p2_value_is_nodal() {
        let coeffs = [3.0, -1.0, 2.0, 0.5, 4.0, -2.5];
        for (i, &c) in coeffs.iter().enumerate() {
            assert_relative_eq!(p2_value(&coeffs, p2_node(i)), c, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_p2_reproduces_linear_functions() {
        // Sample f = x + 2y at the six reference nodes; the quadratic
        // interpolant must reproduce f exactly everywhere.
        let f = |p: Point| p.x + 2.0 * p.y;
        let mut coeffs = [0.0; 6];
        for (i, c) in coeffs.iter_mut().enumerate() {
            *c = f(p2_node(i));
        }
        for &(x, y) in &[(0.1, 0.2), (0.3, 0.3), (0.0, 0.9)] {
            let p = Point::new(x, y);
            assert_relative_eq!(p2_value(&coeffs, p), f(p), epsilon = 1e-14);
        }
    }

    #[test]
    fn test_element_velocity_gather() {
        let mesh = unit_square_mesh();
        let n = mesh.ndof;
        // field[d] = d for u, field[d + n] = 10 + d for v.
        let mut field = vec![0.0; 2 * n + mesh.nv];
        for d in 0..n {
            field[d] = d as f64;
            field[d + n] = 10.0 + d as f64;
        }
        let (u, v) = element_velocity(&mesh, 0, &field, n);
        let dofs = element_dofs(&mesh, 0);
        for i in 0..6 {
            assert_relative_eq!(u[i], dofs[i] as f64, epsilon = 1e-15);
            assert_relative_eq!(v[i], 10.0 + dofs[i] as f64, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_quadrature_points_on_reference_triangle() {
        let v = [
            Vertex::new(Point::new(0.0, 0.0), 0),
            Vertex::new(Point::new(1.0, 0.0), 1),
            Vertex::new(Point::new(0.0, 1.0), 2),
        ];
        let t = crate::domain::geometry::Triangle {
            index: 0,
            v,
            mid: v,
            area: 0.5,
        };
        let points = quadrature_points(&t);
        for (ps, p) in points.iter().enumerate() {
            assert_relative_eq!(p.x, QUADRATURE.points[ps].x, epsilon = 1e-15);
            assert_relative_eq!(p.y, QUADRATURE.points[ps].y, epsilon = 1e-15);
        }
    }
}
