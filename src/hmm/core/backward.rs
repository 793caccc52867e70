//! Scaled backward recursion.
//!
//! `β̂_T(i) = 1` and
//! `β̂_t(i) = [Σ_j A(i, j) b_j(o_{t+1}) β̂_{t+1}(j)] / c_{t+1}`, using the scale
//! factors of the matching forward pass. With this scaling
//! `γ_t(i) = α̂_t(i) β̂_t(i)` sums to one over `i` at every `t`.
//!
//! The caller must not run the backward pass for an impossible sequence
//! (some `c_t == 0`).
use crate::hmm::core::{
    emission::emission_matrix, params::HmmParams, validation::debug_assert_stochastic,
};
use ndarray::{Array2, ArrayView1, ArrayView2};

/// Run the scaled backward recursion for one subject's `T × C` observations.
pub fn backward(params: &HmmParams, obs: ArrayView2<usize>, scales: ArrayView1<f64>) -> Array2<f64> {
    debug_assert_stochastic(params);
    let emissions = emission_matrix(params, obs);
    backward_from_emissions(params.transition.view(), emissions.view(), scales)
}

/// Backward recursion on a precomputed `m × T` joint emission matrix.
pub fn backward_from_emissions(
    transition: ArrayView2<f64>, emissions: ArrayView2<f64>, scales: ArrayView1<f64>,
) -> Array2<f64> {
    let (m, n_time) = emissions.dim();
    debug_assert!(scales.iter().all(|&c| c > 0.0));
    let mut beta = Array2::<f64>::zeros((m, n_time));
    beta.column_mut(n_time - 1).fill(1.0);
    for t in (0..n_time - 1).rev() {
        let weighted = &emissions.column(t + 1) * &beta.column(t + 1);
        let column = transition.dot(&weighted) / scales[t + 1];
        beta.column_mut(t).assign(&column);
    }
    beta
}
