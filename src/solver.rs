//! Time-stepping driver: a Stokes start-up solve provides the initial
//! field, then every unsteady step reuses the constant operator and only
//! rebuilds the characteristic right-hand side.

use rsparse::data::Sprs;
use tracing::{info, info_span};

use crate::assembly;
use crate::characteristics::{characteristic_rhs, ChannelExtents};
use crate::domain::mesh2d::Mesh2d;
use crate::error::SolverError;

pub struct Solver {
    pub mesh: Mesh2d,
    pub nu: f64,
    pub dt: f64,
    pub alpha: f64,
    pub extents: ChannelExtents,
    pub time: f64,
    /// Solution of the latest solve, in the u | v | p block layout.
    pub previous: Vec<f64>,
    /// Stamped unsteady operator in CSC form, built on the first step and
    /// reused afterwards.
    operator: Option<Sprs<f64>>,
}

impl Solver {
    pub fn new(
        mesh: Mesh2d,
        nu: f64,
        dt: f64,
        extents: ChannelExtents,
    ) -> Result<Self, SolverError> {
        if nu <= 0.0 {
            return Err(SolverError::InvalidParameter(
                "viscosity nu must be positive".to_string(),
            ));
        }
        if dt <= 0.0 {
            return Err(SolverError::InvalidParameter(
                "time step dt must be positive".to_string(),
            ));
        }
        Ok(Self {
            mesh,
            nu,
            dt,
            alpha: 1.0 / dt,
            extents,
            time: 0.0,
            previous: Vec::new(),
            operator: None,
        })
    }

    /// Steady Stokes solve (no mass term, zero interior RHS) used as the
    /// initial state of the time loop.
    pub fn solve_stokes(&mut self) -> Result<&[f64], SolverError> {
        let _span = info_span!("stokes_startup").entered();
        let size = assembly::system_size(&self.mesh);
        info!(ndof = self.mesh.ndof, size, "assembling Stokes system");

        let mut matrix = assembly::assemble(&self.mesh, 0.0, self.nu);
        let mut rhs = vec![0.0; size];
        assembly::stamp_dirichlet(&self.mesh, &mut matrix, &mut rhs);
        info!(nnz = matrix.len(), "Stokes matrix assembled");

        let a = assembly::to_csc(&matrix, size);
        self.previous = assembly::solve(&a, rhs)?;
        info!(
            velocity_norm = self.velocity_norm(),
            "Stokes start-up solved"
        );
        Ok(&self.previous)
    }

    /// One semi-Lagrangian time step: characteristic RHS from the previous
    /// field, Dirichlet stamping, LU solve, field swap.
    pub fn step(&mut self) -> Result<(), SolverError> {
        if self.previous.is_empty() {
            return Err(SolverError::InvalidParameter(
                "solve_stokes must run before time stepping".to_string(),
            ));
        }

        let mut rhs = characteristic_rhs(&self.mesh, &self.extents, self.alpha, &self.previous)?;
        assembly::stamp_rhs(&self.mesh, &mut rhs);

        let mesh = &self.mesh;
        let (alpha, nu) = (self.alpha, self.nu);
        let a = self.operator.get_or_insert_with(|| {
            let size = assembly::system_size(mesh);
            let mut matrix = assembly::assemble(mesh, alpha, nu);
            assembly::stamp_matrix(mesh, &mut matrix);
            info!(nnz = matrix.len(), "unsteady operator assembled");
            assembly::to_csc(&matrix, size)
        });

        self.previous = assembly::solve(a, rhs)?;
        self.time += self.dt;
        Ok(())
    }

    /// Runs `num_steps` unsteady steps with per-step logging.
    pub fn run(&mut self, num_steps: usize) -> Result<(), SolverError> {
        let _span = info_span!("simulation_run", num_steps).entered();
        let start = std::time::Instant::now();
        for i in 0..num_steps {
            let _step_span = info_span!("time_step", step = i + 1).entered();
            let step_start = std::time::Instant::now();
            self.step()?;
            info!(
                step = i + 1,
                time = self.time,
                velocity_norm = self.velocity_norm(),
                elapsed_ms = step_start.elapsed().as_millis() as u64,
                "time step done"
            );
        }
        info!(
            total_s = start.elapsed().as_secs_f64(),
            "simulation finished"
        );
        Ok(())
    }

    /// 1-norm of the velocity part of the latest solution.
    pub fn velocity_norm(&self) -> f64 {
        self.previous
            .iter()
            .take(2 * self.mesh.ndof)
            .map(|x| x.abs())
            .sum()
    }
}
