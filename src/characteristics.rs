//! Semi-Lagrangian convection: builds the right-hand side of the unsteady
//! system by tracing each quadrature point backward along the previous
//! velocity field and re-interpolating the field at the traced position.

use crate::assembly::boundary_value;
use crate::domain::geometry::{Point, LABEL_INFLOW};
use crate::domain::mesh2d::Mesh2d;
use crate::error::SolverError;
use crate::numerical::interpolate::{element_velocity, p2_value, quadrature_points};
use crate::numerical::locate::{find_containing, find_in_exit_set};
use crate::numerical::{phi, QUADRATURE};

/// Channel extents consulted when a traced point leaves the mesh: the
/// inflow boundary at `x_min` carries the prescribed profile on
/// [`inflow_lo`, `inflow_hi`], the outflow boundary sits at `x_max`, and
/// everything else is a no-slip wall.
#[derive(Debug, Clone, Copy)]
pub struct ChannelExtents {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub inflow_lo: f64,
    pub inflow_hi: f64,
}

impl Default for ChannelExtents {
    fn default() -> Self {
        Self {
            x_min: 0.0,
            x_max: 10.0,
            y_min: 0.0,
            y_max: 1.0,
            inflow_lo: 0.5,
            inflow_hi: 1.0,
        }
    }
}

/// Deterministic fallback for a traced point outside the mesh, evaluated
/// in order: left of the inflow boundary, inside the interior x-span
/// (left through a wall, no-slip), or beyond the outflow boundary (clamp
/// and search the exit triangles). The last case failing is fatal.
fn out_of_domain_velocity(
    mesh: &Mesh2d,
    extents: &ChannelExtents,
    triangle: usize,
    displaced: Point,
    prev: &[f64],
    n: usize,
) -> Result<(f64, f64), SolverError> {
    if displaced.x < extents.x_min {
        let y = displaced.y.clamp(extents.inflow_lo, extents.inflow_hi);
        let clamped = Point::new(extents.x_min, y);
        Ok((boundary_value(LABEL_INFLOW, clamped), 0.0))
    } else if displaced.x <= extents.x_max {
        Ok((0.0, 0.0))
    } else {
        let clamped = Point::new(extents.x_max, displaced.y);
        if clamped.y <= extents.y_min || clamped.y >= extents.y_max {
            return Ok((0.0, 0.0));
        }
        match find_in_exit_set(mesh, clamped) {
            Some((j, reference)) => {
                let (u, v) = element_velocity(mesh, j, prev, n);
                Ok((p2_value(&u, reference), p2_value(&v, reference)))
            }
            None => Err(SolverError::CharacteristicTrace {
                x: displaced.x,
                y: displaced.y,
                triangle,
            }),
        }
    }
}

fn traced_velocity(
    mesh: &Mesh2d,
    extents: &ChannelExtents,
    triangle: usize,
    displaced: Point,
    prev: &[f64],
    n: usize,
) -> Result<(f64, f64), SolverError> {
    if let Some((j, reference)) = find_containing(mesh, triangle, displaced) {
        let (u, v) = element_velocity(mesh, j, prev, n);
        return Ok((p2_value(&u, reference), p2_value(&v, reference)));
    }
    out_of_domain_velocity(mesh, extents, triangle, displaced, prev, n)
}

/// Computes the characteristic right-hand side from the previous-step
/// solution `prev` (block layout u | v | p). Pressure entries stay zero.
pub fn characteristic_rhs(
    mesh: &Mesh2d,
    extents: &ChannelExtents,
    alpha: f64,
    prev: &[f64],
) -> Result<Vec<f64>, SolverError> {
    if alpha <= 0.0 {
        return Err(SolverError::InvalidParameter(
            "alpha must be positive for the characteristic step".to_string(),
        ));
    }

    let n = mesh.ndof;
    let q = &*QUADRATURE;
    let mut b = vec![0.0; 2 * n + mesh.nv];

    for t in &mesh.triangles {
        let k = t.index;
        let points = quadrature_points(t);
        let (u, v) = element_velocity(mesh, k, prev, n);

        let mut traced = [(0.0, 0.0); 7];
        for ps in 0..7 {
            let r = q.points[ps];
            let u_here = p2_value(&u, r);
            let v_here = p2_value(&v, r);
            let displaced = Point::new(
                points[ps].x - u_here / alpha,
                points[ps].y - v_here / alpha,
            );
            traced[ps] = traced_velocity(mesh, extents, k, displaced, prev, n)?;
        }

        for il in 0..6 {
            let i = mesh.global_dof(k, il);
            let mut cu = 0.0;
            let mut cv = 0.0;
            for ps in 0..7 {
                let w_phi = q.weights[ps] * phi(il, q.points[ps]);
                cu += w_phi * traced[ps].0;
                cv += w_phi * traced[ps].1;
            }
            b[i] += alpha * t.area * cu;
            b[i + n] += alpha * t.area * cv;
        }
    }

    Ok(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::{LABEL_WALL, LABEL_WALL_ALT};
    use crate::domain::mesh2d::tests::{unit_square_mesh, unit_square_raw};
    use crate::domain::mesh2d::Mesh2d;
    use approx::assert_relative_eq;

    fn unit_extents() -> ChannelExtents {
        ChannelExtents {
            x_min: 0.0,
            x_max: 1.0,
            y_min: 0.0,
            y_max: 1.0,
            inflow_lo: 0.5,
            inflow_hi: 1.0,
        }
    }

    fn constant_field(mesh: &Mesh2d, u: f64, v: f64) -> Vec<f64> {
        let n = mesh.ndof;
        let mut field = vec![0.0; 2 * n + mesh.nv];
        for d in 0..n {
            field[d] = u;
            field[d + n] = v;
        }
        field
    }

    #[test]
    fn test_fallback_left_of_inflow_clamps_into_profile_span() {
        let mesh = unit_square_mesh();
        let prev = constant_field(&mesh, 0.0, 0.0);
        // y = 0.3 is below the inflow span; it clamps to 0.5 where the
        // profile vanishes.
        let (u, v) = out_of_domain_velocity(
            &mesh,
            &ChannelExtents::default(),
            0,
            Point::new(-0.2, 0.3),
            &prev,
            mesh.ndof,
        )
        .unwrap();
        assert_relative_eq!(u, 0.0, epsilon = 1e-14);
        assert_relative_eq!(v, 0.0, epsilon = 1e-14);
        // Inside the span the profile is evaluated directly.
        let (u, v) = out_of_domain_velocity(
            &mesh,
            &ChannelExtents::default(),
            0,
            Point::new(-0.2, 0.75),
            &prev,
            mesh.ndof,
        )
        .unwrap();
        assert_relative_eq!(u, 1.0, epsilon = 1e-14);
        assert_relative_eq!(v, 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_fallback_interior_span_is_no_slip() {
        let mesh = unit_square_mesh();
        let prev = constant_field(&mesh, 5.0, 5.0);
        let (u, v) = out_of_domain_velocity(
            &mesh,
            &ChannelExtents::default(),
            0,
            Point::new(5.0, -0.4),
            &prev,
            mesh.ndof,
        )
        .unwrap();
        assert_relative_eq!(u, 0.0, epsilon = 1e-14);
        assert_relative_eq!(v, 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_fallback_beyond_outflow_interpolates_exit_triangle() {
        let mesh = unit_square_mesh();
        let prev = constant_field(&mesh, 2.0, 3.0);
        let (u, v) = out_of_domain_velocity(
            &mesh,
            &unit_extents(),
            0,
            Point::new(1.5, 0.5),
            &prev,
            mesh.ndof,
        )
        .unwrap();
        assert_relative_eq!(u, 2.0, epsilon = 1e-12);
        assert_relative_eq!(v, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fallback_beyond_outflow_outside_y_range_is_zero() {
        let mesh = unit_square_mesh();
        let prev = constant_field(&mesh, 2.0, 3.0);
        let (u, v) = out_of_domain_velocity(
            &mesh,
            &unit_extents(),
            0,
            Point::new(1.5, 1.2),
            &prev,
            mesh.ndof,
        )
        .unwrap();
        assert_relative_eq!(u, 0.0, epsilon = 1e-14);
        assert_relative_eq!(v, 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_fallback_exit_set_exhausted_is_fatal() {
        // All-wall boundary: no exit triangles at all.
        let mut raw = unit_square_raw();
        for edge in &mut raw.edges {
            edge.2 = LABEL_WALL;
        }
        raw.edges[2].2 = LABEL_WALL_ALT;
        let mesh = Mesh2d::build(raw).unwrap();
        assert!(mesh.exit_triangles.is_empty());
        let prev = constant_field(&mesh, 0.0, 0.0);
        let err = out_of_domain_velocity(
            &mesh,
            &unit_extents(),
            1,
            Point::new(1.5, 0.5),
            &prev,
            mesh.ndof,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SolverError::CharacteristicTrace { triangle: 1, .. }
        ));
    }

    #[test]
    fn test_zero_field_gives_zero_rhs() {
        let mesh = unit_square_mesh();
        let prev = constant_field(&mesh, 0.0, 0.0);
        let b = characteristic_rhs(&mesh, &unit_extents(), 10.0, &prev).unwrap();
        for &v in &b {
            assert_relative_eq!(v, 0.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_constant_field_gives_mass_weighted_rhs() {
        // A small constant field traces without leaving the mesh; the RHS
        // reduces to alpha * c * (area-weighted P2 mass vector).
        let mesh = unit_square_mesh();
        let alpha = 100.0;
        let (cu, cv) = (0.05, -0.03);
        let prev = constant_field(&mesh, cu, cv);
        let b = characteristic_rhs(&mesh, &unit_extents(), alpha, &prev).unwrap();

        let q = &*QUADRATURE;
        let n = mesh.ndof;
        let mut expected = vec![0.0; n];
        for t in &mesh.triangles {
            for il in 0..6 {
                let w: f64 = (0..7)
                    .map(|ps| q.weights[ps] * phi(il, q.points[ps]))
                    .sum();
                expected[mesh.global_dof(t.index, il)] += alpha * t.area * w;
            }
        }
        for d in 0..n {
            assert_relative_eq!(b[d], cu * expected[d], epsilon = 1e-12);
            assert_relative_eq!(b[d + n], cv * expected[d], epsilon = 1e-12);
        }
        // Nothing lands on the pressure block.
        for d in 2 * n..b.len() {
            assert_relative_eq!(b[d], 0.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_nonpositive_alpha_rejected() {
        let mesh = unit_square_mesh();
        let prev = constant_field(&mesh, 0.0, 0.0);
        assert!(characteristic_rhs(&mesh, &unit_extents(), 0.0, &prev).is_err());
    }
}
