use nalgebra::DMatrix;

/// Specifies the direction in which to take the derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivativeDirection {
    X,
    Y,
}

/// Second-order central difference of `field` along `dir`.
///
/// Rows of `field` run along y and columns along x. Only interior nodes are computed,
/// `(f[k+1] - f[k-1]) / (2h)`; the outer ring of the result stays zero since wall
/// values are imposed by boundary conditions rather than evolved.
///
/// # Example
/// ```ignore
/// let field = DMatrix::from_fn(5, 5, |_, j| j as f64);
/// let dfdx = central_difference(&field, 1.0, DerivativeDirection::X);
/// assert_eq!(dfdx[(2, 2)], 1.0);
/// assert_eq!(dfdx[(0, 2)], 0.0);
/// ```
pub fn central_difference(field: &DMatrix<f64>, h: f64, dir: DerivativeDirection) -> DMatrix<f64> {
    let (nrows, ncols) = field.shape();
    let mut deriv = DMatrix::<f64>::zeros(nrows, ncols);
    if nrows < 3 || ncols < 3 {
        return deriv;
    }
    let two_h = 2.0 * h;
    for j in 1..ncols - 1 {
        for i in 1..nrows - 1 {
            deriv[(i, j)] = match dir {
                DerivativeDirection::X => (field[(i, j + 1)] - field[(i, j - 1)]) / two_h,
                DerivativeDirection::Y => (field[(i + 1, j)] - field[(i - 1, j)]) / two_h,
            };
        }
    }
    deriv
}

pub fn ddx(field: &DMatrix<f64>, h: f64) -> DMatrix<f64> {
    central_difference(field, h, DerivativeDirection::X)
}

pub fn ddy(field: &DMatrix<f64>, h: f64) -> DMatrix<f64> {
    central_difference(field, h, DerivativeDirection::Y)
}

/// Five-point Laplacian on the interior, zero on the outer ring.
///
/// \[
/// \nabla^2 f_{ij} = \frac{f_{i,j-1} + f_{i-1,j} - 4 f_{ij} + f_{i,j+1} + f_{i+1,j}}{h^2}
/// \]
pub fn laplacian(field: &DMatrix<f64>, h: f64) -> DMatrix<f64> {
    let (nrows, ncols) = field.shape();
    let mut lap = DMatrix::<f64>::zeros(nrows, ncols);
    if nrows < 3 || ncols < 3 {
        return lap;
    }
    let h2 = h * h;
    for j in 1..ncols - 1 {
        for i in 1..nrows - 1 {
            lap[(i, j)] = (field[(i, j - 1)] + field[(i - 1, j)] - 4.0 * field[(i, j)]
                + field[(i, j + 1)]
                + field[(i + 1, j)])
                / h2;
        }
    }
    lap
}

/// `d(fx)/dx + d(fy)/dy` of the planar vector field `(fx, fy)`.
pub fn divergence(fx: &DMatrix<f64>, fy: &DMatrix<f64>, h: f64) -> DMatrix<f64> {
    ddx(fx, h) + ddy(fy, h)
}

/// Scalar vorticity `d(fy)/dx - d(fx)/dy` of the planar vector field `(fx, fy)`.
pub fn curl(fx: &DMatrix<f64>, fy: &DMatrix<f64>, h: f64) -> DMatrix<f64> {
    ddx(fy, h) - ddy(fx, h)
}

/// Pointwise magnitude `sqrt(fx^2 + fy^2)`.
pub fn magnitude(fx: &DMatrix<f64>, fy: &DMatrix<f64>) -> DMatrix<f64> {
    fx.zip_map(fy, |a, b| (a * a + b * b).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::dmatrix;

    fn assert_ring_is_zero(field: &DMatrix<f64>) {
        let (nrows, ncols) = field.shape();
        for j in 0..ncols {
            assert_eq!(field[(0, j)], 0.0);
            assert_eq!(field[(nrows - 1, j)], 0.0);
        }
        for i in 0..nrows {
            assert_eq!(field[(i, 0)], 0.0);
            assert_eq!(field[(i, ncols - 1)], 0.0);
        }
    }

    #[test]
    fn test_central_difference_x() {
        let field = DMatrix::<f64>::from_fn(5, 6, |_, j| 3.0 * j as f64);
        let deriv = ddx(&field, 0.5);
        for i in 1..4 {
            for j in 1..5 {
                assert_relative_eq!(deriv[(i, j)], 6.0, epsilon = 1e-12);
            }
        }
        assert_ring_is_zero(&deriv);
    }

    #[test]
    fn test_central_difference_y() {
        let field = DMatrix::<f64>::from_fn(6, 5, |i, _| (i * i) as f64);
        let deriv = ddy(&field, 1.0);
        for i in 1..5 {
            for j in 1..4 {
                // (f[i+1] - f[i-1]) / 2 = 2i for f = i^2
                assert_relative_eq!(deriv[(i, j)], 2.0 * i as f64, epsilon = 1e-12);
            }
        }
        assert_ring_is_zero(&deriv);
    }

    #[test]
    fn test_central_difference_small_field() {
        let field = dmatrix![1.0, 2.0; 3.0, 4.0];
        assert_eq!(ddx(&field, 1.0), DMatrix::<f64>::zeros(2, 2));
        assert_eq!(laplacian(&field, 1.0), DMatrix::<f64>::zeros(2, 2));
    }

    #[test]
    fn test_laplacian_quadratic() {
        // For f(x,y) = x^2 + y^2, the Laplacian should be 2 + 2 = 4.
        let h = 0.1;
        let field = DMatrix::<f64>::from_fn(7, 7, |i, j| {
            let (x, y) = (j as f64 * h, i as f64 * h);
            x * x + y * y
        });
        let lap = laplacian(&field, h);
        for i in 1..6 {
            for j in 1..6 {
                assert_relative_eq!(lap[(i, j)], 4.0, epsilon = 1e-9);
            }
        }
        assert_ring_is_zero(&lap);
    }

    #[test]
    fn test_laplacian_stencil_weights() {
        let field = dmatrix![
            0.0, 2.0, 0.0;
            3.0, 1.0, 5.0;
            0.0, 7.0, 0.0
        ];
        let lap = laplacian(&field, 2.0);
        assert_relative_eq!(lap[(1, 1)], (3.0 + 2.0 - 4.0 + 5.0 + 7.0) / 4.0);
    }

    #[test]
    fn test_divergence_and_curl() {
        // Solid-body rotation (-y, x): divergence 0, curl 2.
        let h = 0.25;
        let fx = DMatrix::<f64>::from_fn(5, 5, |i, _| -(i as f64) * h);
        let fy = DMatrix::<f64>::from_fn(5, 5, |_, j| j as f64 * h);
        let div = divergence(&fx, &fy, h);
        let rot = curl(&fx, &fy, h);
        for i in 1..4 {
            for j in 1..4 {
                assert_relative_eq!(div[(i, j)], 0.0, epsilon = 1e-12);
                assert_relative_eq!(rot[(i, j)], 2.0, epsilon = 1e-12);
            }
        }
        assert_ring_is_zero(&rot);

        // Pure expansion (x, y): divergence 2, curl 0.
        let fx = DMatrix::<f64>::from_fn(5, 5, |_, j| j as f64 * h);
        let fy = DMatrix::<f64>::from_fn(5, 5, |i, _| i as f64 * h);
        let div = divergence(&fx, &fy, h);
        assert_relative_eq!(div[(2, 2)], 2.0, epsilon = 1e-12);
        assert_relative_eq!(curl(&fx, &fy, h)[(2, 2)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_magnitude() {
        let fx = dmatrix![3.0, 0.0; -5.0, 1.0];
        let fy = dmatrix![4.0, 0.0; 12.0, 0.0];
        let speed = magnitude(&fx, &fy);
        assert_eq!(speed, dmatrix![5.0, 0.0; 13.0, 1.0]);
    }
}
