use nalgebra::DMatrix;

/// Time histories produced by a finished cavity run.
///
/// `u`, `v`, `curl` and `speed` hold `nt + 1` frames, index 0 being the initial state.
/// `pressure` holds `nt` frames; frame `n` was solved while advancing from step `n`
/// to `n + 1`. Every frame is a `(ny + 1) x (nx + 1)` matrix.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    u: Vec<DMatrix<f64>>,
    v: Vec<DMatrix<f64>>,
    pressure: Vec<DMatrix<f64>>,
    curl: Vec<DMatrix<f64>>,
    speed: Vec<DMatrix<f64>>,
    dt: f64,
}

/// All fields of one time step. `pressure` is `None` for the final step.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub step: usize,
    pub time: f64,
    pub u: &'a DMatrix<f64>,
    pub v: &'a DMatrix<f64>,
    pub pressure: Option<&'a DMatrix<f64>>,
    pub curl: &'a DMatrix<f64>,
    pub speed: &'a DMatrix<f64>,
}

impl SimulationResult {
    pub(crate) fn new(
        u: Vec<DMatrix<f64>>,
        v: Vec<DMatrix<f64>>,
        pressure: Vec<DMatrix<f64>>,
        curl: Vec<DMatrix<f64>>,
        speed: Vec<DMatrix<f64>>,
        dt: f64,
    ) -> Self {
        debug_assert_eq!(u.len(), pressure.len() + 1);
        debug_assert!(v.len() == u.len() && curl.len() == u.len() && speed.len() == u.len());
        Self {
            u,
            v,
            pressure,
            curl,
            speed,
            dt,
        }
    }

    pub fn u(&self) -> &[DMatrix<f64>] {
        &self.u
    }

    pub fn v(&self) -> &[DMatrix<f64>] {
        &self.v
    }

    pub fn pressure(&self) -> &[DMatrix<f64>] {
        &self.pressure
    }

    pub fn curl(&self) -> &[DMatrix<f64>] {
        &self.curl
    }

    pub fn speed(&self) -> &[DMatrix<f64>] {
        &self.speed
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Number of time steps taken, `nt`.
    pub fn num_steps(&self) -> usize {
        self.pressure.len()
    }

    /// `(frames, rows, cols)` of the velocity-like histories.
    pub fn shape(&self) -> (usize, usize, usize) {
        let (rows, cols) = self.u.first().map_or((0, 0), |f| f.shape());
        (self.u.len(), rows, cols)
    }

    /// `(frames, rows, cols)` of the pressure history.
    pub fn pressure_shape(&self) -> (usize, usize, usize) {
        let (_, rows, cols) = self.shape();
        (self.pressure.len(), rows, cols)
    }

    pub fn time_of(&self, step: usize) -> f64 {
        step as f64 * self.dt
    }

    pub fn frame(&self, step: usize) -> Option<Frame<'_>> {
        Some(Frame {
            step,
            time: self.time_of(step),
            u: self.u.get(step)?,
            v: self.v.get(step)?,
            pressure: self.pressure.get(step),
            curl: self.curl.get(step)?,
            speed: self.speed.get(step)?,
        })
    }

    pub fn frames(&self) -> impl Iterator<Item = Frame<'_>> + '_ {
        (0..self.u.len()).filter_map(move |step| self.frame(step))
    }
}
