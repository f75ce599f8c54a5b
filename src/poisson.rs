use nalgebra::DMatrix;
use tracing::trace;

use crate::boundary::bc2d::SquareBoundary;
use crate::error::PoissonError;
use crate::numerical::derive::laplacian;

pub const DEFAULT_JACOBI_ITERATIONS: usize = 100;

/// Relaxes `lap(p) = rhs` with a fixed number of Jacobi sweeps starting from `p = 0`.
///
/// Each sweep updates every interior node from the previous sweep's snapshot only,
///
/// `p[i,j] = (p[i,j-1] + p[i-1,j] + p[i,j+1] + p[i+1,j] - h^2 rhs[i,j]) / 4`,
///
/// and then imposes `bc` on the outer ring. There is no convergence test: exactly
/// `iterations` sweeps are performed.
pub fn solve_poisson_jacobi(
    rhs: &DMatrix<f64>,
    h: f64,
    iterations: usize,
    bc: &SquareBoundary,
) -> Result<DMatrix<f64>, PoissonError> {
    let (nrows, ncols) = rhs.shape();
    if nrows < 3 || ncols < 3 {
        return Err(PoissonError::FieldTooSmall(nrows, ncols));
    }
    if !(h.is_finite() && h > 0.0) {
        return Err(PoissonError::InvalidSpacing(h));
    }
    if iterations == 0 {
        return Err(PoissonError::NoIterations);
    }

    let h2 = h * h;
    let mut p_prev = DMatrix::<f64>::zeros(nrows, ncols);
    let mut p_next = DMatrix::<f64>::zeros(nrows, ncols);
    for _ in 0..iterations {
        for j in 1..ncols - 1 {
            for i in 1..nrows - 1 {
                p_next[(i, j)] = 0.25
                    * (p_prev[(i, j - 1)] + p_prev[(i - 1, j)] + p_prev[(i, j + 1)]
                        + p_prev[(i + 1, j)]
                        - h2 * rhs[(i, j)]);
            }
        }
        // The ring is fully rewritten here, so the reused buffer holds nothing stale.
        bc.apply(&mut p_next, 0.0);
        std::mem::swap(&mut p_prev, &mut p_next);
    }

    trace!(
        iterations,
        residual = poisson_residual(&p_prev, rhs, h),
        "Jacobi relaxation finished"
    );
    Ok(p_prev)
}

/// L2 norm of `lap(p) - rhs` over the interior nodes.
pub fn poisson_residual(p: &DMatrix<f64>, rhs: &DMatrix<f64>, h: f64) -> f64 {
    let (nrows, ncols) = p.shape();
    if nrows < 3 || ncols < 3 {
        return 0.0;
    }
    let residual = laplacian(p, h) - rhs;
    residual.view((1, 1), (nrows - 2, ncols - 2)).norm()
}
