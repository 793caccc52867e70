//! Coefficient refit for mixture weights.
//!
//! Purpose
//! -------
//! Maximize the responsibility-weighted multinomial-logit log-likelihood
//! `Q(Γ) = Σ_n Σ_k r_nk ln w_nk(Γ)`, `w_n = softmax(X_n Γ)`, over the
//! non-baseline columns of `Γ`. This is the coefficient part of the EM
//! M-step; the score [`coefficient_score`] is also the coefficient gradient
//! of the mixture log-likelihood.
//!
//! Key behaviors
//! -------------
//! - Damped Newton–Raphson: the negated Hessian is factored with a Cholesky
//!   decomposition, falling back to an eigen pseudoinverse when it is not
//!   positive definite.
//! - The step is halved until `Q` does not decrease; a step that cannot be
//!   made non-decreasing ends the refit.
//! - Free coefficients are ordered `Γ[0..q, 1]`, `Γ[0..q, 2]`, … to match the
//!   coefficient block of the parameter layout.
//!
//! Invariants & assumptions
//! ------------------------
//! - Responsibility rows sum to one.
//! - Column 0 of `Γ` is never modified.
use crate::{
    hmm::{
        core::{model::log_softmax_rows, options::EmOptions},
        errors::HmmResult,
    },
    optimization::numerical_stability::transformations::EIGEN_EPS,
};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array2, ArrayView2, Zip};
use tracing::debug;

/// Step halvings tried before a Newton direction is abandoned.
const MAX_HALVINGS: usize = 30;

/// Result of one coefficient refit.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefRefit {
    /// Updated `q × K` coefficients with a zero baseline column.
    pub coefficients: Array2<f64>,
    /// `Q(Γ)` at the returned coefficients.
    pub objective: f64,
    /// Accepted Newton steps.
    pub iterations: usize,
}

/// `Σ_n Σ_k r_nk ln w_nk`, skipping zero responsibilities.
pub fn weighted_log_lik(responsibilities: ArrayView2<f64>, log_weights: ArrayView2<f64>) -> f64 {
    Zip::from(responsibilities)
        .and(log_weights)
        .fold(0.0, |acc, &r, &lw| if r > 0.0 { acc + r * lw } else { acc })
}

/// `Xᵀ (R − W)`, shape `q × K`.
///
/// Column `k ≥ 1` is `∂Q/∂Γ[:, k]`; column 0 belongs to the baseline.
pub fn coefficient_score(
    covariates: ArrayView2<f64>, responsibilities: ArrayView2<f64>, weights: ArrayView2<f64>,
) -> Array2<f64> {
    covariates.t().dot(&(&responsibilities - &weights))
}

/// Refit the coefficients starting from `start`.
///
/// Stops when the Newton step norm drops below `opts.coef_tol`, when the
/// change in `Q` drops below `opts.coef_tol · (1 + |Q|)`, or after
/// `opts.coef_max_iter` accepted steps.
///
/// # Errors
/// - [`HmmError::NonFiniteWeights`](crate::hmm::errors::HmmError::NonFiniteWeights)
///   when `X · start` has a non-finite entry.
pub fn refit_coefficients(
    covariates: ArrayView2<f64>, responsibilities: ArrayView2<f64>, start: ArrayView2<f64>,
    opts: &EmOptions,
) -> HmmResult<CoefRefit> {
    let (q, n_clusters) = start.dim();
    let mut coefficients = start.to_owned();
    let mut log_w = log_softmax_rows(covariates.dot(&coefficients))?;
    let mut objective = weighted_log_lik(responsibilities, log_w.view());
    if q == 0 || n_clusters < 2 {
        return Ok(CoefRefit { coefficients, objective, iterations: 0 });
    }

    let mut iterations = 0;
    while iterations < opts.coef_max_iter {
        let weights = log_w.mapv(f64::exp);
        let score = coefficient_score(covariates, responsibilities, weights.view());
        let grad = DVector::from_fn(q * (n_clusters - 1), |idx, _| score[[idx % q, idx / q + 1]]);
        let step = newton_step(neg_hessian(covariates, weights.view()), &grad);
        let step_norm = step.norm();
        if !step_norm.is_finite() || step_norm < opts.coef_tol {
            break;
        }

        let mut scale = 1.0;
        let mut accepted = None;
        for _ in 0..MAX_HALVINGS {
            let mut candidate = coefficients.clone();
            for (idx, &delta) in step.iter().enumerate() {
                candidate[[idx % q, idx / q + 1]] += scale * delta;
            }
            if let Ok(candidate_log_w) = log_softmax_rows(covariates.dot(&candidate)) {
                let candidate_obj = weighted_log_lik(responsibilities, candidate_log_w.view());
                if candidate_obj >= objective {
                    accepted = Some((candidate, candidate_log_w, candidate_obj));
                    break;
                }
            }
            scale *= 0.5;
        }
        let Some((candidate, candidate_log_w, candidate_obj)) = accepted else {
            break;
        };

        let change = candidate_obj - objective;
        coefficients = candidate;
        log_w = candidate_log_w;
        objective = candidate_obj;
        iterations += 1;
        if change.abs() < opts.coef_tol * (1.0 + objective.abs())
            || scale * step_norm < opts.coef_tol
        {
            break;
        }
    }
    debug!(iterations, objective, "coefficient refit finished");
    Ok(CoefRefit { coefficients, objective, iterations })
}

// ---- Helper methods ----

/// `−∂²Q/∂Γ∂Γ` over the free block: entry ((k, j), (l, i)) is
/// `Σ_n w_nk (δ_kl − w_nl) X_nj X_ni` for `k, l ≥ 1`.
fn neg_hessian(covariates: ArrayView2<f64>, weights: ArrayView2<f64>) -> DMatrix<f64> {
    let q = covariates.ncols();
    let n_free_clusters = weights.ncols() - 1;
    let dim = q * n_free_clusters;
    let mut out = DMatrix::<f64>::zeros(dim, dim);
    for (x, w) in covariates.rows().into_iter().zip(weights.rows()) {
        for a in 1..=n_free_clusters {
            for b in 1..=n_free_clusters {
                let kron = if a == b { 1.0 } else { 0.0 };
                let c = w[a] * (kron - w[b]);
                if c == 0.0 {
                    continue;
                }
                for j in 0..q {
                    for i in 0..q {
                        out[((a - 1) * q + j, (b - 1) * q + i)] += c * x[j] * x[i];
                    }
                }
            }
        }
    }
    out
}

/// Solve `(−H) δ = g`; eigen pseudoinverse when Cholesky fails.
fn newton_step(neg_h: DMatrix<f64>, grad: &DVector<f64>) -> DVector<f64> {
    if let Some(chol) = neg_h.clone().cholesky() {
        return chol.solve(grad);
    }
    let eigen = neg_h.symmetric_eigen();
    let mut step = DVector::<f64>::zeros(grad.len());
    for (k, &lambda) in eigen.eigenvalues.iter().enumerate() {
        if lambda > EIGEN_EPS {
            let v = eigen.eigenvectors.column(k);
            step.axpy(v.dot(grad) / lambda, &v, 1.0);
        }
    }
    step
}
