//! Multichannel emission probabilities.
//!
//! At every time step the joint emission probability of state `i` is the
//! product over channels of `B_r(i, o_tr)`. A missing observation in channel
//! `r` contributes a factor of 1, so the remaining channels still carry
//! evidence. The log-domain variants sum `ln B_r(i, o_tr)` and contribute 0
//! for a missing channel.
use crate::{
    hmm::core::{data::MISSING, params::HmmParams},
    utils::safe_ln,
};
use ndarray::{Array2, ArrayView1, ArrayView2};

/// Joint emission probability `Π_r B_r(state, o_r)` for one time step.
pub fn emission_prob(params: &HmmParams, obs_t: ArrayView1<usize>, state: usize) -> f64 {
    params
        .emissions
        .iter()
        .zip(obs_t.iter())
        .filter(|(_, symbol)| **symbol != MISSING)
        .map(|(b, symbol)| b[[state, *symbol]])
        .product()
}

/// Joint emission probability with channel `skip` left out.
///
/// Used by the emission gradient, where the derivative with respect to
/// `B_skip(state, ·)` multiplies the remaining channels only.
pub fn emission_prob_except(
    params: &HmmParams, obs_t: ArrayView1<usize>, state: usize, skip: usize,
) -> f64 {
    params
        .emissions
        .iter()
        .zip(obs_t.iter())
        .enumerate()
        .filter(|(r, (_, symbol))| *r != skip && **symbol != MISSING)
        .map(|(_, (b, symbol))| b[[state, *symbol]])
        .product()
}

/// `m × T` matrix of joint emission probabilities for one subject (`T × C`).
pub fn emission_matrix(params: &HmmParams, obs: ArrayView2<usize>) -> Array2<f64> {
    let m = params.n_states();
    let n_time = obs.nrows();
    Array2::from_shape_fn((m, n_time), |(i, t)| emission_prob(params, obs.row(t), i))
}

/// `m × T` matrix of joint log-emission probabilities for one subject.
pub fn log_emission_matrix(params: &HmmParams, obs: ArrayView2<usize>) -> Array2<f64> {
    let m = params.n_states();
    let n_time = obs.nrows();
    Array2::from_shape_fn((m, n_time), |(i, t)| {
        params
            .emissions
            .iter()
            .zip(obs.row(t).iter())
            .filter(|(_, symbol)| **symbol != MISSING)
            .map(|(b, symbol)| safe_ln(b[[i, *symbol]]))
            .sum::<f64>()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The product over channels of per-channel emission probabilities.
    // - Missing observations contributing a factor of 1 (0 in log space).
    // - The leave-one-channel-out product used by the gradient.
    // -------------------------------------------------------------------------

    fn two_channel() -> HmmParams {
        HmmParams::new(
            array![[0.8, 0.2], [0.3, 0.7]],
            vec![array![[0.6, 0.4], [0.1, 0.9]], array![[0.5, 0.3, 0.2], [0.0, 0.5, 0.5]]],
            array![0.5, 0.5],
        )
        .expect("valid parameters")
    }

    #[test]
    // Purpose
    // -------
    // Verify the joint emission is the product over channels, and that a
    // missing channel is uninformative rather than zeroing the product.
    //
    // Given
    // -----
    // - Observation (1, 2) and then (1, MISSING) in state 0.
    //
    // Expect
    // ------
    // - 0.4 · 0.2 for the full observation; 0.4 when channel 1 is missing.
    fn emission_prob_multiplies_channels_and_ignores_missing() {
        // Arrange
        let params = two_channel();
        let full = array![1, 2];
        let partial = array![1, MISSING];

        // Act
        let p_full = emission_prob(&params, full.view(), 0);
        let p_partial = emission_prob(&params, partial.view(), 0);

        // Assert
        assert!((p_full - 0.08).abs() < 1e-15);
        assert!((p_partial - 0.4).abs() < 1e-15);
    }

    #[test]
    fn emission_prob_except_skips_requested_channel() {
        let params = two_channel();
        let obs = array![1, 2];
        assert!((emission_prob_except(&params, obs.view(), 1, 0) - 0.5).abs() < 1e-15);
        assert!((emission_prob_except(&params, obs.view(), 1, 1) - 0.9).abs() < 1e-15);
    }

    #[test]
    fn all_missing_time_point_has_unit_emission() {
        let params = two_channel();
        let obs = array![[MISSING, MISSING], [0, 0]];
        let e = emission_matrix(&params, obs.view());
        let le = log_emission_matrix(&params, obs.view());
        assert_eq!(e[[0, 0]], 1.0);
        assert_eq!(e[[1, 0]], 1.0);
        assert_eq!(le[[1, 0]], 0.0);
        assert_eq!(e[[1, 1]], 0.0);
        assert_eq!(le[[1, 1]], f64::NEG_INFINITY);
    }
}
