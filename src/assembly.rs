//! Element and global assembly for the P2/P1 saddle-point system.
//!
//! The local matrix is 15×15: rows/cols 0–5 are the x-velocity P2 dofs,
//! 6–11 the y-velocity P2 dofs, 12–14 the pressure P1 dofs. Globally the
//! dofs form three contiguous blocks: x-velocity (size n), y-velocity
//! (size n, offset n) and pressure (size nv, offset 2n).

use std::collections::BTreeMap;

use nalgebra::SMatrix;
use rsparse::data::Sprs;
use rsparse::lusol;

use crate::domain::geometry::{
    Point, Triangle, LABEL_INFLOW, LABEL_WALL, LABEL_WALL_ALT,
};
use crate::domain::mesh2d::Mesh2d;
use crate::error::SolverError;
use crate::numerical::{lambda, phi, phi_grad, QUADRATURE};

pub type ElementMatrix = SMatrix<f64, 15, 15>;

/// Sparse accumulation map keyed by (row, column).
pub type GlobalMatrix = BTreeMap<(usize, usize), f64>;

/// Big-penalty value for Dirichlet rows; intentionally enormous relative
/// to every other matrix entry so the solved value is forced to the
/// prescribed boundary value.
pub const PENALTY: f64 = 1e30;

/// Local contributions at or below this magnitude are not scattered into
/// the global map (a sparsity heuristic, not a correctness requirement).
pub const DROP_TOL: f64 = 1e-15;

/// Magnitude of the negative regularization on the pressure-pressure
/// diagonal that keeps the saddle-point system nonsingular.
pub const PRESSURE_EPS: f64 = 1e-7;

/// Prescribed velocity x-component on a Dirichlet boundary node: the
/// parabolic inflow profile on the inflow segment, zero on the walls.
pub fn boundary_value(label: i32, p: Point) -> f64 {
    if label == LABEL_INFLOW {
        (1.0 - p.y) * (p.y - 0.5) * 16.0
    } else {
        0.0
    }
}

/// Whether a boundary label receives a Dirichlet stamp. The outflow
/// segment is left free.
pub fn is_dirichlet(label: i32) -> bool {
    matches!(label, LABEL_INFLOW | LABEL_WALL | LABEL_WALL_ALT)
}

/// Builds the 15×15 local matrix of triangle `t`: viscous (and, for
/// `alpha > 0`, mass) velocity blocks, the −1/2-scaled pressure coupling
/// blocks B1/B2 mirrored for symmetry, and the pressure regularization.
/// `alpha = 0` gives the steady Stokes operator.
pub fn element_matrix(t: &Triangle, alpha: f64, nu: f64) -> ElementMatrix {
    let q = &*QUADRATURE;
    let mut a = ElementMatrix::zeros();

    let coeff = nu / (4.0 * t.area);
    let coeff1 = alpha * t.area;

    // Affine Jacobian rows from corner coordinate differences.
    let j00 = t.corner(2).y - t.corner(0).y;
    let j01 = t.corner(0).y - t.corner(1).y;
    let j10 = t.corner(0).x - t.corner(2).x;
    let j11 = t.corner(1).x - t.corner(0).x;

    // Bk' * Bk
    let acoef = j00 * j00 + j10 * j10;
    let bcoef = j00 * j01 + j10 * j11;
    let ccoef = j01 * j01 + j11 * j11;

    for i in 0..6 {
        for j in 0..6 {
            let mut s = 0.0;
            for k in 0..7 {
                let p = q.points[k];
                let w = q.weights[k];
                let (dxi, dyi) = phi_grad(i, p);
                let (dxj, dyj) = phi_grad(j, p);
                s += coeff1 * w * phi(j, p) * phi(i, p)
                    + coeff
                        * w
                        * (acoef * dxi * dxj
                            + bcoef * (dyi * dxj + dxi * dyj)
                            + ccoef * dyi * dyj);
            }
            a[(i, j)] = s;
            a[(i + 6, j + 6)] = s;
        }
    }

    for i in 0..6 {
        for j in 12..15 {
            let mut s = 0.0;
            for k in 0..7 {
                let p = q.points[k];
                let (dxi, dyi) = phi_grad(i, p);
                s += q.weights[k] * (j00 * dxi + j01 * dyi) * lambda(j - 12, p);
            }
            a[(i, j)] = -0.5 * s;
            a[(j, i)] = a[(i, j)];
        }
    }

    for i in 6..12 {
        for j in 12..15 {
            let mut s = 0.0;
            for k in 0..7 {
                let p = q.points[k];
                let (dxi, dyi) = phi_grad(i - 6, p);
                s += q.weights[k] * (j10 * dxi + j11 * dyi) * lambda(j - 12, p);
            }
            a[(i, j)] = -0.5 * s;
            a[(j, i)] = a[(i, j)];
        }
    }

    for i in 12..15 {
        a[(i, i)] = -PRESSURE_EPS;
    }

    a
}

/// Maps local index 0..15 of triangle `k` to the global dof number under
/// the block layout.
pub fn global_index(mesh: &Mesh2d, k: usize, il: usize, n: usize) -> usize {
    if il < 6 {
        mesh.global_dof(k, il)
    } else if il < 12 {
        mesh.global_dof(k, il - 6) + n
    } else {
        mesh.global_dof(k, il - 12) + 2 * n
    }
}

/// Total system size 2n + nv.
pub fn system_size(mesh: &Mesh2d) -> usize {
    2 * mesh.ndof + mesh.nv
}

/// Assembles the global sparse map by scattering every triangle's local
/// matrix. The map is fully rebuilt; reuse across time steps is the
/// caller's business (the unsteady operator does not change).
pub fn assemble(mesh: &Mesh2d, alpha: f64, nu: f64) -> GlobalMatrix {
    let n = mesh.ndof;
    let mut m = GlobalMatrix::new();
    for t in &mesh.triangles {
        let a = element_matrix(t, alpha, nu);
        for il in 0..15 {
            let gi = global_index(mesh, t.index, il, n);
            for jl in 0..15 {
                let val = a[(il, jl)];
                if val.abs() > DROP_TOL {
                    let gj = global_index(mesh, t.index, jl, n);
                    *m.entry((gi, gj)).or_insert(0.0) += val;
                }
            }
        }
    }
    m
}

/// Overwrites the diagonal of both velocity components of every Dirichlet
/// boundary dof with the penalty value. Idempotent.
pub fn stamp_matrix(mesh: &Mesh2d, m: &mut GlobalMatrix) {
    let n = mesh.ndof;
    for k in 0..mesh.nbt {
        for il in 0..6 {
            if is_dirichlet(mesh.node_label(k, il)) {
                let iu = mesh.global_dof(k, il);
                m.insert((iu, iu), PENALTY);
                m.insert((iu + n, iu + n), PENALTY);
            }
        }
    }
}

/// Overwrites the right-hand side at every Dirichlet boundary dof with
/// boundary_value·penalty for the x component and 0 for the y component.
/// Idempotent.
pub fn stamp_rhs(mesh: &Mesh2d, rhs: &mut [f64]) {
    let n = mesh.ndof;
    for k in 0..mesh.nbt {
        for il in 0..6 {
            let label = mesh.node_label(k, il);
            if is_dirichlet(label) {
                let iu = mesh.global_dof(k, il);
                rhs[iu] = boundary_value(label, mesh.node_point(k, il)) * PENALTY;
                rhs[iu + n] = 0.0;
            }
        }
    }
}

pub fn stamp_dirichlet(mesh: &Mesh2d, m: &mut GlobalMatrix, rhs: &mut [f64]) {
    stamp_matrix(mesh, m);
    stamp_rhs(mesh, rhs);
}

/// Converts the accumulation map to compressed-column form. The output is
/// column-major with rows sorted within each column; that ordering is part
/// of the contract with the LU solver.
pub fn to_csc(m: &GlobalMatrix, size: usize) -> Sprs<f64> {
    let mut entries: Vec<(usize, usize, f64)> =
        m.iter().map(|(&(row, col), &val)| (col, row, val)).collect();
    entries.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let nnz = entries.len();
    let mut p = vec![0isize; size + 1];
    let mut i = Vec::with_capacity(nnz);
    let mut x = Vec::with_capacity(nnz);
    for &(col, row, val) in &entries {
        p[col + 1] += 1;
        i.push(row);
        x.push(val);
    }
    for col in 0..size {
        p[col + 1] += p[col];
    }

    Sprs::<f64> {
        m: size,
        n: size,
        nzmax: nnz,
        p,
        i,
        x,
    }
}

/// Solves A·x = b with rsparse's sparse LU, consuming the right-hand side
/// buffer. A nonzero solver status is propagated as `LinearSolve`.
pub fn solve(a: &Sprs<f64>, mut rhs: Vec<f64>) -> Result<Vec<f64>, SolverError> {
    match lusol(a, &mut rhs, 1, 1e-10) {
        Ok(()) => Ok(rhs),
        Err(code) => Err(SolverError::LinearSolve(format!("{}", code))),
    }
}
