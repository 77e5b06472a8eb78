#![allow(dead_code)]

use std::env;
use std::error::Error;
use std::path::Path;

use tracing::info;

mod assembly;
mod characteristics;
mod domain;
mod error;
mod io;
mod numerical;
mod solver;

use characteristics::ChannelExtents;
use domain::mesh2d::Mesh2d;
use io::{RunMetadata, SolutionWriter};
use solver::Solver;

const NU: f64 = 0.0025;
const DT: f64 = 0.1;
const NUM_STEPS: usize = 80;
const OUTPUT_DIR: &str = "plot";

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let mesh_path = env::args()
        .nth(1)
        .ok_or("usage: charflow <mesh-file>")?;

    let raw = io::load_mesh(Path::new(&mesh_path))?;
    let mesh = Mesh2d::build(raw)?;

    let mut solver = Solver::new(mesh, NU, DT, ChannelExtents::default())?;
    let writer = SolutionWriter::new(OUTPUT_DIR)?;

    // Stokes start-up solve provides the initial velocity field.
    solver.solve_stokes()?;
    writer.write_named("solution.txt", &solver.mesh, &solver.previous)?;

    for step in 0..NUM_STEPS {
        solver.step()?;
        writer.write_step(step, &solver.mesh, &solver.previous)?;
        info!(
            step,
            time = solver.time,
            velocity_norm = solver.velocity_norm(),
            "step written"
        );
    }

    writer.write_metadata(&RunMetadata {
        mesh_file: mesh_path,
        nv: solver.mesh.nv,
        nbt: solver.mesh.nbt,
        nbe: solver.mesh.nbe,
        ndof: solver.mesh.ndof,
        nu: NU,
        dt: DT,
        steps_completed: NUM_STEPS,
    })?;

    info!("normal end of execution");
    Ok(())
}
