use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeshLoadError {
    #[error("cannot read mesh file: {0}")]
    Io(#[from] std::io::Error),

    #[error("mesh file truncated: {0}")]
    Truncated(String),

    #[error("malformed mesh file at line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("edge ({0}, {1}) is shared by more than two triangles")]
    EdgeSharedByThree(usize, usize),

    #[error("triangle {0} references unknown vertex {1}")]
    BadVertexIndex(usize, usize),

    #[error("triangle {0} is degenerate (zero area)")]
    DegenerateTriangle(usize),
}

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(
        "characteristic trace failed: point ({x}, {y}) traced from triangle {triangle} \
         matches no fallback"
    )]
    CharacteristicTrace { x: f64, y: f64, triangle: usize },

    #[error("sparse LU solve failed: {0}")]
    LinearSolve(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
