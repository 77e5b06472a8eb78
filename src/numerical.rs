//! Reference-triangle basis functions and quadrature.
//!
//! The reference triangle has corners (0,0), (1,0), (0,1) with barycentric
//! coordinates λ0 = 1 − x − y, λ1 = x, λ2 = y. The P1 pressure basis is the
//! λ themselves; the P2 velocity basis is λi(2λi − 1) at the corners and
//! 4·λa·λb at the edge midpoints.

pub mod interpolate;
pub mod locate;

use once_cell::sync::Lazy;

use crate::domain::geometry::Point;

/// Barycentric coordinate λi of a reference-triangle point.
pub fn lambda(i: usize, p: Point) -> f64 {
    match i {
        0 => 1.0 - p.x - p.y,
        1 => p.x,
        _ => p.y,
    }
}

/// Constant gradient of λi on the reference triangle.
pub fn lambda_grad(i: usize) -> (f64, f64) {
    match i {
        0 => (-1.0, -1.0),
        1 => (1.0, 0.0),
        _ => (0.0, 1.0),
    }
}

/// P2 shape function i (0..6). Midpoint node i >= 3 sits on the edge
/// opposite corner i − 3.
pub fn phi(i: usize, p: Point) -> f64 {
    if i < 3 {
        let l = lambda(i, p);
        l * (2.0 * l - 1.0)
    } else {
        4.0 * lambda((i + 1) % 3, p) * lambda((i + 2) % 3, p)
    }
}

/// Gradient of P2 shape function i on the reference triangle.
pub fn phi_grad(i: usize, p: Point) -> (f64, f64) {
    if i < 3 {
        let c = 4.0 * lambda(i, p) - 1.0;
        let (gx, gy) = lambda_grad(i);
        (c * gx, c * gy)
    } else {
        let a = (i + 1) % 3;
        let b = (i + 2) % 3;
        let (gax, gay) = lambda_grad(a);
        let (gbx, gby) = lambda_grad(b);
        let la = lambda(a, p);
        let lb = lambda(b, p);
        (4.0 * (la * gbx + lb * gax), 4.0 * (la * gby + lb * gay))
    }
}

/// Reference position of P2 node i: the three corners, then the midpoints
/// of the edges opposite corners 0, 1, 2.
pub fn p2_node(i: usize) -> Point {
    match i {
        0 => Point::new(0.0, 0.0),
        1 => Point::new(1.0, 0.0),
        2 => Point::new(0.0, 1.0),
        3 => Point::new(0.5, 0.5),
        4 => Point::new(0.0, 0.5),
        _ => Point::new(0.5, 0.0),
    }
}

/// The fixed 7-point symmetric rule, exact for degree-5 polynomials.
/// Weights sum to 1; integrals over a physical triangle are obtained by
/// scaling the weighted sum with the triangle area.
pub struct QuadRule {
    pub points: [Point; 7],
    pub weights: [f64; 7],
}

pub static QUADRATURE: Lazy<QuadRule> = Lazy::new(|| {
    let s = 15.0_f64.sqrt();
    let a1 = (6.0 - s) / 21.0;
    let a2 = (9.0 - 2.0 * s) / 21.0;
    let a3 = (6.0 + s) / 21.0;
    let a4 = (9.0 + 2.0 * s) / 21.0;
    let w1 = (155.0 - s) / 1200.0;
    let w2 = (155.0 + s) / 1200.0;
    QuadRule {
        points: [
            Point::new(1.0 / 3.0, 1.0 / 3.0),
            Point::new(a1, a1),
            Point::new(a1, a4),
            Point::new(a4, a1),
            Point::new(a3, a3),
            Point::new(a3, a2),
            Point::new(a2, a3),
        ],
        weights: [0.225, w1, w1, w1, w2, w2, w2],
    }
});

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_partition_of_unity() {
        for &(x, y) in &[(0.2, 0.3), (0.0, 0.0), (0.7, 0.1), (1.0 / 3.0, 1.0 / 3.0)] {
            let p = Point::new(x, y);
            let sum: f64 = (0..6).map(|i| phi(i, p)).sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-14);
            let (gx, gy) = (0..6).fold((0.0, 0.0), |(ax, ay), i| {
                let (dx, dy) = phi_grad(i, p);
                (ax + dx, ay + dy)
            });
            assert_relative_eq!(gx, 0.0, epsilon = 1e-13);
            assert_relative_eq!(gy, 0.0, epsilon = 1e-13);
        }
    }

    #[test]
    fn test_nodal_kronecker_delta() {
        for i in 0..6 {
            for j in 0..6 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(phi(i, p2_node(j)), expected, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_p1_basis_at_corners() {
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(lambda(i, p2_node(j)), expected, epsilon = 1e-15);
            }
        }
    }

    #[test]
    fn test_quadrature_weights_sum_to_one() {
        let total: f64 = QUADRATURE.weights.iter().sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_quadrature_exactness() {
        let q = &*QUADRATURE;
        // Integral over the reference triangle is area * weighted sum; the
        // reference area is 1/2. ∫x = 1/6, ∫x^2 = 1/12, ∫x^2 y^2 = 1/180.
        let ix: f64 = (0..7).map(|k| q.weights[k] * q.points[k].x).sum();
        assert_relative_eq!(0.5 * ix, 1.0 / 6.0, epsilon = 1e-14);
        let ixx: f64 = (0..7).map(|k| q.weights[k] * q.points[k].x.powi(2)).sum();
        assert_relative_eq!(0.5 * ixx, 1.0 / 12.0, epsilon = 1e-14);
        let ixxyy: f64 = (0..7)
            .map(|k| q.weights[k] * q.points[k].x.powi(2) * q.points[k].y.powi(2))
            .sum();
        assert_relative_eq!(0.5 * ixxyy, 1.0 / 180.0, epsilon = 1e-14);
    }
}
