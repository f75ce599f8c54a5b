use std::time::Instant;

use nalgebra::DMatrix;
use tracing::{debug, info, info_span, warn};

use crate::boundary::bc2d::BoundaryConditions2D;
use crate::config::SimulationConfig;
use crate::domain::grid2d::{Grid2D, GridDimensions2D};
use crate::error::{ConfigError, SolverError};
use crate::numerical::derive::{curl, magnitude};
use crate::numerical::{
    all_finite, apply_pressure_corrections, calculate_divergence_term,
    calculate_intermediate_velocity, interior_divergence_norm, VelocityDerivatives,
};
use crate::poisson::solve_poisson_jacobi;
use crate::result::SimulationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    Constructed,
    Running,
    Completed,
}

/// Intermediate and final fields of one projection step.
#[derive(Debug, Clone)]
pub struct StepFields {
    pub u_star: DMatrix<f64>,
    pub v_star: DMatrix<f64>,
    pub pressure: DMatrix<f64>,
    pub u_next: DMatrix<f64>,
    pub v_next: DMatrix<f64>,
}

/// Explicit projection solver for the lid-driven cavity.
///
/// Owns the full time history of the run. Histories are allocated once at
/// construction and filled by increasing step index; `run` hands them over to a
/// [`SimulationResult`] and may only be called once.
#[derive(Debug)]
pub struct CavitySolver {
    config: SimulationConfig,
    grid: Grid2D,
    bcs: BoundaryConditions2D,
    state: SolverState,
    u: Vec<DMatrix<f64>>,
    v: Vec<DMatrix<f64>>,
    pressure: Vec<DMatrix<f64>>,
    curl: Vec<DMatrix<f64>>,
    speed: Vec<DMatrix<f64>>,
}

impl CavitySolver {
    pub fn new(config: SimulationConfig, grid: Grid2D) -> Result<Self, SolverError> {
        config.validate()?;
        if grid.dimensions != GridDimensions2D(config.nx(), config.ny()) || grid.h != config.h {
            return Err(ConfigError::InvalidParameter(format!(
                "grid {:?} with h = {} does not match the configuration ({} x {}, h = {})",
                grid.dimensions,
                grid.h,
                config.nx(),
                config.ny(),
                config.h
            ))
            .into());
        }

        let max_dt = config.max_stable_dt();
        if config.dt > max_dt {
            return Err(SolverError::Unstable {
                dt: config.dt,
                max_dt,
            });
        }

        if config.verbose {
            config.log_summary();
        }

        let nt = config.nt();
        let zeros = grid.zeros();
        Ok(Self {
            u: vec![zeros.clone(); nt + 1],
            v: vec![zeros.clone(); nt + 1],
            pressure: vec![zeros.clone(); nt],
            curl: vec![zeros.clone(); nt + 1],
            speed: vec![zeros; nt + 1],
            bcs: BoundaryConditions2D::lid_driven_cavity(),
            state: SolverState::Constructed,
            config,
            grid,
        })
    }

    /// Builds the grid from `config` and then the solver.
    pub fn from_config(config: SimulationConfig) -> Result<Self, SolverError> {
        config.validate()?;
        let grid = Grid2D::from_config(&config)?;
        Self::new(config, grid)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid2D {
        &self.grid
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    /// Enforces the wall conditions on `u` and `v` for lid velocity `u_lid`.
    pub fn apply_boundary_conditions(&self, u: &mut DMatrix<f64>, v: &mut DMatrix<f64>, u_lid: f64) {
        self.bcs.apply_velocity(u, v, u_lid);
    }

    /// Advances `(u, v)` at step `n` by one time step.
    pub fn advance(
        &self,
        u: &DMatrix<f64>,
        v: &DMatrix<f64>,
        n: usize,
    ) -> Result<StepFields, SolverError> {
        let expected = self.grid.field_shape();
        for (field, value) in [("u", u), ("v", v)] {
            if value.shape() != expected {
                return Err(SolverError::ShapeMismatch {
                    field,
                    expected,
                    found: value.shape(),
                });
            }
        }
        let SimulationConfig { h, dt, rho, nu, .. } = self.config;

        // --- Predictor Step ---
        let derivatives = VelocityDerivatives::compute(u, v, h);
        let (mut u_star, mut v_star) = calculate_intermediate_velocity(u, v, &derivatives, dt, nu);
        // Same instant as the predictor, not the next step.
        let lid_now = self.config.lid_velocity_at(n as f64 * dt);
        self.apply_boundary_conditions(&mut u_star, &mut v_star, lid_now);

        // --- Solve Pressure Poisson Equation ---
        let rhs = calculate_divergence_term(&u_star, &v_star, h, rho, dt);
        let pressure = solve_poisson_jacobi(&rhs, h, self.config.poisson_iterations, &self.bcs.p)?;

        // --- Corrector Step ---
        let (mut u_next, mut v_next) = apply_pressure_corrections(&u_star, &v_star, &pressure, h, dt);
        let lid_next = self.config.lid_velocity_at((n + 1) as f64 * dt);
        self.apply_boundary_conditions(&mut u_next, &mut v_next, lid_next);

        Ok(StepFields {
            u_star,
            v_star,
            pressure,
            u_next,
            v_next,
        })
    }

    /// Runs all `nt` steps and returns the filled histories.
    pub fn run(&mut self) -> Result<SimulationResult, SolverError> {
        if self.state != SolverState::Constructed {
            return Err(SolverError::AlreadyRun);
        }
        self.state = SolverState::Running;

        let nt = self.config.nt();
        let h = self.config.h;
        let verbose = self.config.verbose;
        let _run_span = info_span!("simulation_run", nt).entered();
        info!("Starting simulation with {} steps", nt);
        let start_time = Instant::now();

        // --- Initial State ---
        let lid0 = self.config.lid_velocity_at(0.0);
        let (mut u0, mut v0) = (self.u[0].clone(), self.v[0].clone());
        self.apply_boundary_conditions(&mut u0, &mut v0, lid0);
        self.curl[0] = curl(&u0, &v0, h);
        self.speed[0] = magnitude(&u0, &v0);
        self.u[0] = u0;
        self.v[0] = v0;

        for n in 0..nt {
            let _step_span = info_span!("time_step", step = n + 1).entered();
            let step_start = Instant::now();

            let step = self.advance(&self.u[n], &self.v[n], n)?;
            if self.config.check_finite {
                check_finite(&step, n + 1)?;
            }

            self.pressure[n] = step.pressure;
            self.curl[n + 1] = curl(&step.u_next, &step.v_next, h);
            self.speed[n + 1] = magnitude(&step.u_next, &step.v_next);
            self.u[n + 1] = step.u_next;
            self.v[n + 1] = step.v_next;

            let time = (n + 1) as f64 * self.config.dt;
            let div = interior_divergence_norm(&self.u[n + 1], &self.v[n + 1], h);
            let elapsed_ms = step_start.elapsed().as_secs_f64() * 1e3;
            if verbose {
                info!("Step {}/{}: time={:.4}, div={:.3e}, elapsed={:.2}ms", n + 1, nt, time, div, elapsed_ms);
            } else {
                debug!("Step {}/{}: time={:.4}, div={:.3e}, elapsed={:.2}ms", n + 1, nt, time, div, elapsed_ms);
            }
        }

        info!("Simulation finished in {:.2}s", start_time.elapsed().as_secs_f64());
        self.state = SolverState::Completed;

        Ok(SimulationResult::new(
            std::mem::take(&mut self.u),
            std::mem::take(&mut self.v),
            std::mem::take(&mut self.pressure),
            std::mem::take(&mut self.curl),
            std::mem::take(&mut self.speed),
            self.config.dt,
        ))
    }
}

fn check_finite(step: &StepFields, index: usize) -> Result<(), SolverError> {
    let fields = [
        ("pressure", &step.pressure),
        ("u", &step.u_next),
        ("v", &step.v_next),
    ];
    for (name, field) in fields {
        if !all_finite(field) {
            warn!(step = index, field = name, "Non-finite values detected");
            return Err(SolverError::NumericalDivergence { step: index, field: name });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LidVelocity;
    use approx::assert_relative_eq;
    use std::sync::{Arc, Mutex};

    fn quiet_config() -> SimulationConfig {
        SimulationConfig {
            verbose: false,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_solver_new() -> Result<(), SolverError> {
        let solver = CavitySolver::from_config(quiet_config())?;
        assert_eq!(solver.state(), SolverState::Constructed);
        assert_eq!(solver.config().nt(), 10);
        assert_eq!(solver.grid().dimensions, GridDimensions2D(20, 20));
        Ok(())
    }

    #[test]
    fn test_end_to_end_scenario() -> Result<(), SolverError> {
        let config = SimulationConfig::new(
            1.0, 1.0, 0.05, 0.001, 0.01, 1.0, 0.1, LidVelocity::from_fn(|_| 1.0), false,
        )?;
        let mut solver = CavitySolver::from_config(config)?;
        let result = solver.run()?;
        assert_eq!(solver.state(), SolverState::Completed);

        assert_eq!(result.num_steps(), 10);
        assert_eq!(result.shape(), (11, 21, 21));
        assert_eq!(result.pressure_shape(), (10, 21, 21));
        for history in [result.u(), result.v(), result.curl(), result.speed()] {
            assert_eq!(history.len(), 11);
            assert!(history.iter().all(|f| f.shape() == (21, 21)));
        }
        assert!(result.pressure().iter().all(|f| f.shape() == (21, 21)));

        let u0 = &result.u()[0];
        for j in 1..20 {
            assert_eq!(u0[(20, j)], 1.0, "lid node {}", j);
        }
        // Side walls win at the lid corners.
        assert_eq!(u0[(20, 0)], 0.0);
        assert_eq!(u0[(20, 20)], 0.0);
        assert!(u0.row(0).iter().all(|&x| x == 0.0));
        assert!(result.v()[0].iter().all(|&x| x == 0.0));

        // Initial curl and speed come from the boundary-adjusted state.
        assert_relative_eq!(result.speed()[0][(20, 5)], 1.0);
        assert_relative_eq!(result.curl()[0][(19, 5)], -1.0 / (2.0 * 0.05), epsilon = 1e-12);

        // The lid drags the fluid beneath it along.
        let u_last = &result.u()[10];
        assert!(u_last[(19, 10)] > 0.0);
        assert!(u_last.iter().all(|x| x.is_finite()));
        Ok(())
    }

    #[test]
    fn test_instability_rejected() {
        let config = SimulationConfig {
            dt: 1.0,
            ..quiet_config()
        };
        match CavitySolver::from_config(config) {
            Err(SolverError::Unstable { dt, max_dt }) => {
                assert_eq!(dt, 1.0);
                assert_relative_eq!(max_dt, 0.0125, epsilon = 1e-12);
            }
            other => panic!("expected instability error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SimulationConfig {
            lx: -1.0,
            ..quiet_config()
        };
        assert!(matches!(
            CavitySolver::from_config(config),
            Err(SolverError::Config(ConfigError::InvalidParameter(_)))
        ));
    }

    #[test]
    fn test_mismatched_grid_rejected() {
        let config = quiet_config();
        let other = SimulationConfig {
            h: 0.1,
            ..quiet_config()
        };
        let grid = Grid2D::from_config(&other).unwrap();
        assert!(matches!(
            CavitySolver::new(config, grid),
            Err(SolverError::Config(_))
        ));
    }

    #[test]
    fn test_second_run_rejected() -> Result<(), SolverError> {
        let mut solver = CavitySolver::from_config(quiet_config())?;
        solver.run()?;
        assert!(matches!(solver.run(), Err(SolverError::AlreadyRun)));
        Ok(())
    }

    #[test]
    fn test_projection_reduces_divergence() -> Result<(), SolverError> {
        let solver = CavitySolver::from_config(quiet_config())?;
        let h = solver.config().h;
        let mut u = solver.grid().zeros();
        let mut v = solver.grid().zeros();
        solver.apply_boundary_conditions(&mut u, &mut v, 1.0);

        for n in 0..3 {
            let step = solver.advance(&u, &v, n)?;
            let before = interior_divergence_norm(&step.u_star, &step.v_star, h);
            let after = interior_divergence_norm(&step.u_next, &step.v_next, h);
            assert!(after < before, "step {}: {} >= {}", n, after, before);
            u = step.u_next;
            v = step.v_next;
        }
        Ok(())
    }

    #[test]
    fn test_lid_velocity_evaluation_times() -> Result<(), SolverError> {
        let times = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&times);
        let config = SimulationConfig {
            lid_velocity: LidVelocity::from_fn(move |t| {
                recorder.lock().unwrap().push(t);
                1.0
            }),
            ..quiet_config()
        };
        let (nt, dt) = (config.nt(), config.dt);
        CavitySolver::from_config(config)?.run()?;

        // Initial pass at t = 0, then per step the predictor at n dt and the
        // corrector at (n + 1) dt.
        let mut expected = vec![0.0];
        for n in 0..nt {
            expected.push(n as f64 * dt);
            expected.push((n + 1) as f64 * dt);
        }
        let recorded = times.lock().unwrap();
        assert_eq!(recorded.len(), 2 * nt + 1);
        for (k, (&got, &want)) in recorded.iter().zip(&expected).enumerate() {
            assert_relative_eq!(got, want, epsilon = 1e-15);
            assert!(got <= 0.01 + 1e-12, "call {} at t = {}", k, got);
        }
        Ok(())
    }

    #[test]
    fn test_predictor_uses_current_lid_velocity() -> Result<(), SolverError> {
        let ramp = |t: f64| 1.0 + 100.0 * t;
        let config = SimulationConfig {
            lid_velocity: LidVelocity::from_fn(ramp),
            ..quiet_config()
        };
        let dt = config.dt;
        let solver = CavitySolver::from_config(config)?;
        let mut u = solver.grid().zeros();
        let mut v = solver.grid().zeros();
        solver.apply_boundary_conditions(&mut u, &mut v, ramp(0.0));

        for n in 0..4 {
            let step = solver.advance(&u, &v, n)?;
            for j in 1..20 {
                assert_relative_eq!(step.u_star[(20, j)], ramp(n as f64 * dt), epsilon = 1e-12);
                assert_relative_eq!(step.u_next[(20, j)], ramp((n + 1) as f64 * dt), epsilon = 1e-12);
            }
            u = step.u_next;
            v = step.v_next;
        }
        Ok(())
    }

    #[test]
    fn test_oversized_run_rejected_before_allocation() {
        for final_time in [1e300, 1e9] {
            let config = SimulationConfig {
                final_time,
                ..quiet_config()
            };
            assert!(matches!(
                CavitySolver::from_config(config),
                Err(SolverError::Config(ConfigError::InvalidParameter(_)))
            ));
        }
    }

    #[test]
    fn test_advance_rejects_wrong_shape() -> Result<(), SolverError> {
        let solver = CavitySolver::from_config(quiet_config())?;
        let u = solver.grid().zeros();
        let v = DMatrix::<f64>::zeros(11, 11);
        match solver.advance(&u, &v, 0) {
            Err(SolverError::ShapeMismatch { field, expected, found }) => {
                assert_eq!(field, "v");
                assert_eq!(expected, (21, 21));
                assert_eq!(found, (11, 11));
            }
            other => panic!("expected a shape error, got {:?}", other.map(|_| ())),
        }
        let u_small = DMatrix::<f64>::zeros(21, 5);
        assert!(matches!(
            solver.advance(&u_small, &u, 0),
            Err(SolverError::ShapeMismatch { field: "u", .. })
        ));
        Ok(())
    }

    #[test]
    fn test_time_dependent_lid() -> Result<(), SolverError> {
        let samples: Vec<f64> = (0..=10).map(|k| 0.1 * k as f64).collect();
        let config = SimulationConfig {
            lid_velocity: LidVelocity::Samples(samples.clone()),
            ..quiet_config()
        };
        let result = CavitySolver::from_config(config)?.run()?;
        for (n, u) in result.u().iter().enumerate() {
            assert_eq!(u[(20, 7)], samples[n], "frame {}", n);
        }
        Ok(())
    }

    #[test]
    fn test_non_finite_detection() -> Result<(), SolverError> {
        let blow_up = LidVelocity::from_fn(|t| if t > 0.0 { f64::NAN } else { 1.0 });
        let config = SimulationConfig {
            lid_velocity: blow_up.clone(),
            ..quiet_config()
        };
        let mut solver = CavitySolver::from_config(config)?;
        assert!(matches!(
            solver.run(),
            Err(SolverError::NumericalDivergence { step: 1, field: "u" })
        ));

        // Without the check the run completes and the values simply propagate.
        let config = SimulationConfig {
            lid_velocity: blow_up,
            check_finite: false,
            ..quiet_config()
        };
        let result = CavitySolver::from_config(config)?.run()?;
        assert!(result.u()[1][(20, 3)].is_nan());
        Ok(())
    }

    #[test]
    fn test_step_zero_matches_manual_projection() -> Result<(), SolverError> {
        let mut solver = CavitySolver::from_config(quiet_config())?;
        let mut u = solver.grid().zeros();
        let mut v = solver.grid().zeros();
        solver.apply_boundary_conditions(&mut u, &mut v, 1.0);
        let expected = solver.advance(&u, &v, 0)?;

        let result = solver.run()?;
        assert_eq!(result.u()[1], expected.u_next);
        assert_eq!(result.v()[1], expected.v_next);
        assert_eq!(result.pressure()[0], expected.pressure);
        assert_eq!(result.curl()[1], curl(&expected.u_next, &expected.v_next, 0.05));
        Ok(())
    }
}
