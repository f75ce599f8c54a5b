use nalgebra::{DMatrix, DVector};

use crate::config::SimulationConfig;
use crate::error::GridError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridDimensions2D(pub usize, pub usize); // nx, ny (intervals, nodes = n + 1)

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomainSize2D(pub f64, pub f64); // Lx, Ly

/// Uniform co-located grid over `[0, Lx] x [0, Ly]`.
///
/// Every field lives on the nodes and is stored as a `(ny + 1) x (nx + 1)` matrix:
/// row `i` is the node at `y = i * h`, column `j` the node at `x = j * h`. Row 0 is the
/// bottom wall and the last row is the lid.
///
/// ```text
///   y=Ly  ●───●───●───●   <- lid, row ny
///         │   │   │   │
///         ●───●───●───●
///         │   │   │   │
///   y=0   ●───●───●───●   <- row 0
///        x=0         x=Lx
/// ```
#[derive(Debug, Clone)]
pub struct Grid2D {
    pub size: DomainSize2D,
    pub dimensions: GridDimensions2D,
    pub h: f64,
    pub x: DVector<f64>,      // nx + 1
    pub y: DVector<f64>,      // ny + 1
    pub grid_x: DMatrix<f64>, // (ny + 1) x (nx + 1)
    pub grid_y: DMatrix<f64>, // (ny + 1) x (nx + 1)
}

impl Grid2D {
    pub fn new(size: DomainSize2D, h: f64) -> Result<Self, GridError> {
        let DomainSize2D(lx, ly) = size;
        if !(lx.is_finite() && lx > 0.0 && ly.is_finite() && ly > 0.0) {
            return Err(GridError::InvalidGridSize(format!(
                "Domain lengths (Lx, Ly) must be strictly positive, got ({}, {})",
                lx, ly
            )));
        }
        if !(h.is_finite() && h > 0.0) {
            return Err(GridError::InvalidGridSize(format!(
                "Grid spacing h must be strictly positive, got {}",
                h
            )));
        }
        let nx = (lx / h).floor() as usize;
        let ny = (ly / h).floor() as usize;
        if nx < 1 || ny < 1 {
            return Err(GridError::InvalidGridSize(format!(
                "Spacing h = {} is larger than the domain ({}, {})",
                h, lx, ly
            )));
        }

        let x = linspace(0.0, lx, nx + 1);
        let y = linspace(0.0, ly, ny + 1);
        let grid_x = DMatrix::from_fn(ny + 1, nx + 1, |_, j| x[j]);
        let grid_y = DMatrix::from_fn(ny + 1, nx + 1, |i, _| y[i]);

        Ok(Self {
            size,
            dimensions: GridDimensions2D(nx, ny),
            h,
            x,
            y,
            grid_x,
            grid_y,
        })
    }

    pub fn from_config(config: &SimulationConfig) -> Result<Self, GridError> {
        Self::new(DomainSize2D(config.lx, config.ly), config.h)
    }

    /// Shape of every field on this grid, `(rows, cols) = (ny + 1, nx + 1)`.
    pub fn field_shape(&self) -> (usize, usize) {
        let GridDimensions2D(nx, ny) = self.dimensions;
        (ny + 1, nx + 1)
    }

    pub fn zeros(&self) -> DMatrix<f64> {
        let (rows, cols) = self.field_shape();
        DMatrix::zeros(rows, cols)
    }
}

/// `n` evenly spaced points from `start` to `end`, both included.
fn linspace(start: f64, end: f64, n: usize) -> DVector<f64> {
    if n == 1 {
        return DVector::from_element(1, start);
    }
    let step = (end - start) / (n - 1) as f64;
    DVector::from_fn(n, |k, _| {
        if k == n - 1 {
            end
        } else {
            start + k as f64 * step
        }
    })
}
