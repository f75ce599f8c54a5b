use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid lid velocity: {0}")]
    InvalidLidVelocity(String),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Invalid grid size: {0}")]
    InvalidGridSize(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoissonError {
    #[error("Right-hand side is {0}x{1}, need at least 3x3")]
    FieldTooSmall(usize, usize),

    #[error("Grid spacing must be positive, got {0}")]
    InvalidSpacing(f64),

    #[error("Iteration count must be at least 1")]
    NoIterations,
}

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Unstable system: dt = {dt}, max allowed = {max_dt}")]
    Unstable { dt: f64, max_dt: f64 },

    #[error("Solver has already been run")]
    AlreadyRun,

    #[error("{field} is {found:?} but the grid expects {expected:?}")]
    ShapeMismatch {
        field: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Non-finite {field} values after step {step}")]
    NumericalDivergence { step: usize, field: &'static str },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    #[error("Poisson solver failed: {0}")]
    Poisson(#[from] PoissonError),
}
