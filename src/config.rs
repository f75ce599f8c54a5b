use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::poisson::DEFAULT_JACOBI_ITERATIONS;

/// Upper bound on the number of `f64` values held by the five time histories
/// (16 GiB).
pub const MAX_HISTORY_VALUES: usize = 1 << 31;

/// Horizontal velocity imposed on the moving lid as a function of time.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LidVelocity {
    Constant(f64),
    /// One value per time step, indexed by `round(t / dt)`. Past the end the last
    /// sample is held.
    Samples(Vec<f64>),
    #[serde(skip)]
    Function(Arc<dyn Fn(f64) -> f64 + Send + Sync>),
}

impl LidVelocity {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        LidVelocity::Function(Arc::new(f))
    }

    /// Lid velocity at time `t`. `dt` is only used to index `Samples`.
    pub fn at(&self, t: f64, dt: f64) -> f64 {
        match self {
            LidVelocity::Constant(value) => *value,
            LidVelocity::Samples(values) => {
                let k = (t / dt).round().max(0.0) as usize;
                values[k.min(values.len() - 1)]
            }
            LidVelocity::Function(f) => f(t),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            LidVelocity::Constant(value) if !value.is_finite() => Err(
                ConfigError::InvalidLidVelocity(format!("constant {} is not finite", value)),
            ),
            LidVelocity::Samples(values) if values.is_empty() => Err(
                ConfigError::InvalidLidVelocity("sample sequence is empty".to_string()),
            ),
            LidVelocity::Samples(values) => match values.iter().position(|v| !v.is_finite()) {
                Some(k) => Err(ConfigError::InvalidLidVelocity(format!(
                    "sample {} is not finite ({})",
                    k, values[k]
                ))),
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for LidVelocity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LidVelocity::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            LidVelocity::Samples(values) => f
                .debug_struct("Samples")
                .field("len", &values.len())
                .finish(),
            LidVelocity::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl Default for LidVelocity {
    fn default() -> Self {
        LidVelocity::Constant(1.0)
    }
}

/// Physical and numerical parameters of a cavity run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub lx: f64,
    pub ly: f64,
    pub h: f64,
    pub dt: f64,
    pub final_time: f64,
    pub rho: f64,
    pub nu: f64,
    pub lid_velocity: LidVelocity,
    pub poisson_iterations: usize,
    pub verbose: bool,
    /// Abort the run with an error as soon as a step produces NaN or Inf.
    pub check_finite: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            lx: 1.0,
            ly: 1.0,
            h: 0.05,
            dt: 0.001,
            final_time: 0.01,
            rho: 1.0,
            nu: 0.1,
            lid_velocity: LidVelocity::default(),
            poisson_iterations: DEFAULT_JACOBI_ITERATIONS,
            verbose: true,
            check_finite: true,
        }
    }
}

impl SimulationConfig {
    /// Builds and validates a configuration.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lx: f64,
        ly: f64,
        h: f64,
        dt: f64,
        final_time: f64,
        rho: f64,
        nu: f64,
        lid_velocity: LidVelocity,
        verbose: bool,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            lx,
            ly,
            h,
            dt,
            final_time,
            rho,
            nu,
            lid_velocity,
            verbose,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let scalars = [
            ("Lx", self.lx),
            ("Ly", self.ly),
            ("h", self.h),
            ("dt", self.dt),
            ("T", self.final_time),
            ("rho", self.rho),
            ("nu", self.nu),
        ];
        for (name, value) in scalars {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidParameter(format!(
                    "{} must be strictly positive, got {}",
                    name, value
                )));
            }
        }
        if self.poisson_iterations == 0 {
            return Err(ConfigError::InvalidParameter(
                "poisson_iterations must be at least 1".to_string(),
            ));
        }
        // The stencils need one interior node per axis.
        if self.nx() < 2 || self.ny() < 2 {
            return Err(ConfigError::InvalidParameter(format!(
                "h = {} leaves too few grid nodes ({} x {}), need at least 3 x 3",
                self.h,
                self.nx() + 1,
                self.ny() + 1
            )));
        }
        // Counted in f64 so huge ratios cannot overflow.
        let frames = (self.final_time / self.dt).floor() + 1.0;
        let nodes = ((self.lx / self.h).floor() + 1.0) * ((self.ly / self.h).floor() + 1.0);
        let history_values = 5.0 * frames * nodes;
        if !history_values.is_finite() || history_values > MAX_HISTORY_VALUES as f64 {
            return Err(ConfigError::InvalidParameter(format!(
                "{:e} frames of {:e} nodes exceed the history limit of {} values",
                frames, nodes, MAX_HISTORY_VALUES
            )));
        }
        self.lid_velocity.validate()
    }

    pub fn nt(&self) -> usize {
        (self.final_time / self.dt).floor() as usize
    }

    pub fn nx(&self) -> usize {
        (self.lx / self.h).floor() as usize
    }

    pub fn ny(&self) -> usize {
        (self.ly / self.h).floor() as usize
    }

    /// Largest time step for which explicit diffusion stays stable.
    pub fn max_stable_dt(&self) -> f64 {
        0.5 * self.h * self.h / self.nu
    }

    pub fn lid_velocity_at(&self, t: f64) -> f64 {
        self.lid_velocity.at(t, self.dt)
    }

    pub fn log_summary(&self) {
        info!("Simulation configuration for 2D lid-driven cavity flow:");
        info!("  Domain size: Lx = {}, Ly = {}", self.lx, self.ly);
        info!("  Grid spacing: h = {}", self.h);
        info!("  Grid nodes: nx = {}, ny = {}", self.nx() + 1, self.ny() + 1);
        info!("  Final time: T = {}", self.final_time);
        info!("  Time step: dt = {}", self.dt);
        info!("  Number of time steps: nt = {}", self.nt());
        info!("  Simulated time: {}", self.nt() as f64 * self.dt);
        info!("  Fluid density: rho = {}", self.rho);
        info!("  Kinematic viscosity: nu = {}", self.nu);
        info!("  Lid velocity: {:?}", self.lid_velocity);
    }
}
