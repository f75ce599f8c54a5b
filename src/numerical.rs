pub mod derive;

use nalgebra::DMatrix;

use derive::{ddx, ddy, divergence, laplacian};

/// Spatial derivatives of the velocity field at one time level.
#[derive(Debug, Clone)]
pub struct VelocityDerivatives {
    pub du_dx: DMatrix<f64>,
    pub du_dy: DMatrix<f64>,
    pub dv_dx: DMatrix<f64>,
    pub dv_dy: DMatrix<f64>,
    pub laplace_u: DMatrix<f64>,
    pub laplace_v: DMatrix<f64>,
}

impl VelocityDerivatives {
    pub fn compute(u: &DMatrix<f64>, v: &DMatrix<f64>, h: f64) -> Self {
        Self {
            du_dx: ddx(u, h),
            du_dy: ddy(u, h),
            dv_dx: ddx(v, h),
            dv_dy: ddy(v, h),
            laplace_u: laplacian(u, h),
            laplace_v: laplacian(v, h),
        }
    }
}

/// Explicit Euler advance of convection and diffusion, without pressure:
///
/// `u* = u + dt * (-(u du/dx + v du/dy) + nu lap(u))`, and the same for `v*`.
pub fn calculate_intermediate_velocity(
    u: &DMatrix<f64>,
    v: &DMatrix<f64>,
    d: &VelocityDerivatives,
    dt: f64,
    nu: f64,
) -> (DMatrix<f64>, DMatrix<f64>) {
    assert_eq!(u.shape(), v.shape(), "u and v must have the same shape");
    let (nrows, ncols) = u.shape();
    let mut u_star = DMatrix::<f64>::zeros(nrows, ncols);
    let mut v_star = DMatrix::<f64>::zeros(nrows, ncols);
    for j in 0..ncols {
        for i in 0..nrows {
            let (uu, vv) = (u[(i, j)], v[(i, j)]);
            let conv_u = uu * d.du_dx[(i, j)] + vv * d.du_dy[(i, j)];
            let conv_v = uu * d.dv_dx[(i, j)] + vv * d.dv_dy[(i, j)];
            u_star[(i, j)] = uu + dt * (-conv_u + nu * d.laplace_u[(i, j)]);
            v_star[(i, j)] = vv + dt * (-conv_v + nu * d.laplace_v[(i, j)]);
        }
    }
    (u_star, v_star)
}

/// Right-hand side of the pressure Poisson equation, `(rho / dt) * div(u*, v*)`.
pub fn calculate_divergence_term(
    u_star: &DMatrix<f64>,
    v_star: &DMatrix<f64>,
    h: f64,
    rho: f64,
    dt: f64,
) -> DMatrix<f64> {
    divergence(u_star, v_star, h) * (rho / dt)
}

/// Projects the intermediate velocity with the pressure gradient:
/// `u = u* - dt dp/dx`, `v = v* - dt dp/dy`.
pub fn apply_pressure_corrections(
    u_star: &DMatrix<f64>,
    v_star: &DMatrix<f64>,
    p: &DMatrix<f64>,
    h: f64,
    dt: f64,
) -> (DMatrix<f64>, DMatrix<f64>) {
    let u_next = u_star - ddx(p, h) * dt;
    let v_next = v_star - ddy(p, h) * dt;
    (u_next, v_next)
}

/// L2 norm of the discrete divergence over the interior nodes.
pub fn interior_divergence_norm(u: &DMatrix<f64>, v: &DMatrix<f64>, h: f64) -> f64 {
    let div = divergence(u, v, h);
    let (nrows, ncols) = div.shape();
    if nrows < 3 || ncols < 3 {
        return 0.0;
    }
    div.view((1, 1), (nrows - 2, ncols - 2)).norm()
}

pub fn all_finite(field: &DMatrix<f64>) -> bool {
    field.iter().all(|value| value.is_finite())
}
