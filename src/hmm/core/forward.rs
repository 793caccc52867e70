//! Scaled forward recursion.
//!
//! Purpose
//! -------
//! Compute the scaled forward probabilities `α̂_t(i)`, the per-step scale
//! factors `c_t`, and the sequence log-likelihood `Σ_t ln c_t` for one
//! subject under one set of HMM parameters.
//!
//! Key behaviors
//! -------------
//! - `α_1(i) = π(i) b_i(o_1)`, `α_t(j) = [Σ_i α̂_{t−1}(i) A(i, j)] b_j(o_t)`;
//!   each column is divided by its sum `c_t` so it sums to one.
//! - The initial distribution is an explicit argument, so a cluster's own
//!   `π_k` or any per-subject vector can be used.
//! - A zero scale factor marks an impossible sequence: the pass stops and
//!   reports `log_lik = -∞` with the remaining columns left at zero.
//!
//! Invariants & assumptions
//! ------------------------
//! - `Π_{s ≤ t} c_s` equals the unscaled likelihood of `o_1..o_t`, so
//!   `Π_t c_t · Σ_i α̂_T(i)` is the sequence likelihood.
//! - Inputs are row-stochastic (checked in debug builds only).
//!
//! Conventions
//! -----------
//! - `alpha` is stored `m × T` (state, time).
//!
//! Testing notes
//! -------------
//! - Unit tests compare against hand computations and brute-force path
//!   enumeration, and exercise the impossible-sequence branch.
use crate::hmm::core::{
    emission::emission_matrix, params::HmmParams, validation::debug_assert_stochastic,
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Output of one scaled forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardPass {
    /// Scaled forward probabilities, `m × T`.
    pub alpha: Array2<f64>,
    /// Scale factors `c_t`, length `T`.
    pub scales: Array1<f64>,
    /// `Σ_t ln c_t`, or `-∞` when the sequence is impossible.
    pub log_lik: f64,
}

impl ForwardPass {
    pub fn is_impossible(&self) -> bool {
        self.log_lik == f64::NEG_INFINITY
    }
}

/// Run the scaled forward recursion for one subject's `T × C` observations.
pub fn forward(params: &HmmParams, initial: ArrayView1<f64>, obs: ArrayView2<usize>) -> ForwardPass {
    debug_assert_stochastic(params);
    let emissions = emission_matrix(params, obs);
    forward_from_emissions(params.transition.view(), initial, emissions.view())
}

/// Forward recursion on a precomputed `m × T` joint emission matrix.
///
/// Shared by the EM engine and the gradient evaluator, which reuse the same
/// emission matrix for the backward pass and for ξ.
pub fn forward_from_emissions(
    transition: ArrayView2<f64>, initial: ArrayView1<f64>, emissions: ArrayView2<f64>,
) -> ForwardPass {
    let (m, n_time) = emissions.dim();
    let mut alpha = Array2::<f64>::zeros((m, n_time));
    let mut scales = Array1::<f64>::zeros(n_time);
    let mut log_lik = 0.0;
    for t in 0..n_time {
        let mut column = if t == 0 {
            &initial * &emissions.column(0)
        } else {
            alpha.column(t - 1).dot(&transition) * &emissions.column(t)
        };
        let c_t = column.sum();
        if !(c_t > 0.0) {
            return ForwardPass { alpha, scales, log_lik: f64::NEG_INFINITY };
        }
        column /= c_t;
        alpha.column_mut(t).assign(&column);
        scales[t] = c_t;
        log_lik += c_t.ln();
    }
    ForwardPass { alpha, scales, log_lik }
}
