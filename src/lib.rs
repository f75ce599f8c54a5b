//! Lid-driven cavity flow: explicit projection solver for the 2D incompressible
//! Navier-Stokes equations on a uniform co-located grid.

pub mod boundary;
pub mod config;
pub mod domain;
pub mod error;
pub mod json_io;
pub mod numerical;
pub mod poisson;
pub mod result;
pub mod solver;

pub use config::{LidVelocity, SimulationConfig};
pub use domain::grid2d::Grid2D;
pub use error::{ConfigError, GridError, PoissonError, SolverError};
pub use result::SimulationResult;
pub use solver::CavitySolver;
