//! inference::hessian: covariance and standard errors from observed
//! information.
//!
//! Purpose
//! -------
//! Turn the analytic θ-gradient of a fitted model into an observed
//! information matrix `J(θ̂) = −∇²ℓ(θ̂)` by finite differences, then invert
//! it with a truncated symmetric eigendecomposition.
//!
//! Conventions
//! -----------
//! - `ℓ` is the summed log-likelihood, so the covariance is on the scale of
//!   the fitted θ (free logits followed by free coefficients).
//! - Eigenvalues at or below [`EIGEN_EPS`] are dropped; directions that the
//!   data do not identify contribute nothing to the variances.
//! - No explicit inverse is formed.
use crate::optimization::{
    errors::OptResult, loglik_optimizer::finite_diff::compute_hessian,
    numerical_stability::transformations::EIGEN_EPS,
};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

/// Pseudoinverse of the observed information at `theta_hat`.
///
/// `grad` must be the gradient of the log-likelihood (not of its negative).
///
/// # Errors
/// - [`compute_hessian`] failures when the differenced gradient is not
///   finite in a neighborhood of `theta_hat`.
pub fn calc_covariance<F: Fn(&Array1<f64>) -> Array1<f64>>(
    grad: &F, theta_hat: &Array1<f64>,
) -> OptResult<Array2<f64>> {
    let hess = compute_hessian(grad, theta_hat)?;
    let obs_info = to_information(&hess);
    Ok(pseudo_inverse(obs_info))
}

/// Square roots of the diagonal of [`calc_covariance`].
///
/// # Errors
/// - Same as [`calc_covariance`].
pub fn calc_standard_errors<F: Fn(&Array1<f64>) -> Array1<f64>>(
    grad: &F, theta_hat: &Array1<f64>,
) -> OptResult<Array1<f64>> {
    let cov = calc_covariance(grad, theta_hat)?;
    Ok(cov.diag().mapv(|v| v.max(0.0).sqrt()))
}

// ---- Helper methods ----

/// `J = −H` copied into column-major storage.
fn to_information(hess: &Array2<f64>) -> DMatrix<f64> {
    let n = hess.nrows();
    DMatrix::from_fn(n, n, |i, j| -hess[[i, j]])
}

/// `J⁺ = Σ_{λ_k > EIGEN_EPS} q_k q_kᵀ / λ_k`.
fn pseudo_inverse(obs_info: DMatrix<f64>) -> Array2<f64> {
    let n = obs_info.nrows();
    let eigen = obs_info.symmetric_eigen();
    let q = eigen.eigenvectors;
    let mut cov = Array2::<f64>::zeros((n, n));
    for (k, &lambda) in eigen.eigenvalues.iter().enumerate() {
        if lambda <= EIGEN_EPS {
            continue;
        }
        for i in 0..n {
            let scaled = q[(i, k)] / lambda;
            for j in 0..n {
                cov[[i, j]] += scaled * q[(j, k)];
            }
        }
    }
    cov
}
