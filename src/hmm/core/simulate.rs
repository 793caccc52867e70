//! Simulation of sequences from a (mixture) hidden Markov model.
//!
//! Each subject first draws a cluster from its mixture weights (always
//! cluster 0 for a single model), then a state path from that cluster's
//! chain, and finally one symbol per channel from the state's emission rows.
//! Simulated data never contain missing entries.
use crate::hmm::{
    core::{data::SeqData, model::Model},
    errors::{HmmError, HmmResult},
};
use ndarray::{Array2, Array3, ArrayView1};
use rand::Rng;

/// Simulated observations with the latent states and clusters behind them.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulated {
    pub obs: SeqData,
    /// Cluster-local hidden states, `N × T`.
    pub states: Array2<usize>,
    /// Generating cluster of each subject.
    pub clusters: Vec<usize>,
}

/// Draw `n_subjects` sequences of length `n_time` from `model`.
///
/// # Errors
/// - [`HmmError::EmptyData`] when `n_subjects` or `n_time` is zero.
/// - [`HmmError::CovariateRowsMismatch`] when a mixture's covariates do not
///   have `n_subjects` rows.
pub fn simulate<R: Rng + ?Sized>(
    model: &Model, n_subjects: usize, n_time: usize, rng: &mut R,
) -> HmmResult<Simulated> {
    let n_channels = model.clusters()[0].n_channels();
    if n_subjects == 0 || n_time == 0 {
        return Err(HmmError::EmptyData { subjects: n_subjects, time: n_time, channels: n_channels });
    }
    let weights = model.mixture_weights(n_subjects)?;
    let mut obs = Array3::<usize>::zeros((n_subjects, n_time, n_channels));
    let mut states = Array2::<usize>::zeros((n_subjects, n_time));
    let mut clusters = Vec::with_capacity(n_subjects);

    for n in 0..n_subjects {
        let cluster = draw_categorical(weights.row(n), rng);
        let params = &model.clusters()[cluster];
        let mut state = draw_categorical(params.initial.view(), rng);
        for t in 0..n_time {
            if t > 0 {
                state = draw_categorical(params.transition.row(state), rng);
            }
            states[[n, t]] = state;
            for (r, emission) in params.emissions.iter().enumerate() {
                obs[[n, t, r]] = draw_categorical(emission.row(state), rng);
            }
        }
        clusters.push(cluster);
    }

    let obs = SeqData::new(obs, model.clusters()[0].n_symbols())?;
    Ok(Simulated { obs, states, clusters })
}

// Inverse-CDF draw; the last positive entry absorbs rounding in the sum.
fn draw_categorical<R: Rng + ?Sized>(probs: ArrayView1<f64>, rng: &mut R) -> usize {
    let u: f64 = rng.random();
    let mut cumulative = 0.0;
    let mut last_positive = 0;
    for (j, &p) in probs.iter().enumerate() {
        if p <= 0.0 {
            continue;
        }
        cumulative += p;
        last_positive = j;
        if u < cumulative {
            return j;
        }
    }
    last_positive
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmm::core::params::HmmParams;
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Structural zeros never being sampled.
    // - Cluster draws following the covariate-driven weights.
    // - Empirical symbol frequencies close to the emission probabilities.
    // -------------------------------------------------------------------------

    fn left_to_right() -> HmmParams {
        HmmParams::new(
            array![[0.8, 0.2, 0.0], [0.0, 0.8, 0.2], [0.0, 0.0, 1.0]],
            vec![array![[1.0, 0.0], [0.5, 0.5], [0.0, 1.0]]],
            array![1.0, 0.0, 0.0],
        )
        .expect("valid parameters")
    }

    #[test]
    // Purpose
    // -------
    // Ensure simulated paths respect forbidden transitions and emissions.
    //
    // Given
    // -----
    // - A left-to-right chain where state 0 only emits 0 and state 2 only 1.
    //
    // Expect
    // ------
    // - Paths start in 0, never move backwards, and every (state, symbol)
    //   pair has positive probability.
    fn simulated_paths_avoid_structural_zeros() {
        // Arrange
        let model = Model::Single(left_to_right());
        let mut rng = StdRng::seed_from_u64(17);

        // Act
        let sim = simulate(&model, 40, 12, &mut rng).expect("simulation");

        // Assert
        let params = &model.clusters()[0];
        for n in 0..40 {
            assert_eq!(sim.states[[n, 0]], 0);
            for t in 0..12 {
                let state = sim.states[[n, t]];
                assert!(params.emissions[0][[state, sim.obs.obs[[n, t, 0]]]] > 0.0);
                if t > 0 {
                    assert!(params.transition[[sim.states[[n, t - 1]], state]] > 0.0);
                }
            }
        }
        assert!(sim.clusters.iter().all(|&k| k == 0));
    }

    #[test]
    fn cluster_draws_follow_step_covariate() {
        let x = array![[1.0, 0.0], [1.0, 0.0], [1.0, 1.0], [1.0, 1.0]];
        let gamma = array![[0.0, -40.0], [0.0, 80.0]];
        let model = Model::mixture(vec![left_to_right(), left_to_right()], x, gamma)
            .expect("valid mixture");
        let mut rng = StdRng::seed_from_u64(3);
        let sim = simulate(&model, 4, 5, &mut rng).expect("simulation");
        assert_eq!(sim.clusters, vec![0, 0, 1, 1]);
    }

    #[test]
    fn empirical_frequencies_match_emission_row() {
        let params = HmmParams::new(
            array![[1.0]],
            vec![array![[0.2, 0.5, 0.3]]],
            array![1.0],
        )
        .expect("valid parameters");
        let mut rng = StdRng::seed_from_u64(11);
        let sim = simulate(&Model::Single(params), 1, 20_000, &mut rng).expect("simulation");
        let ones = sim.obs.obs.iter().filter(|&&s| s == 1).count() as f64 / 20_000.0;
        assert!((ones - 0.5).abs() < 0.02);
    }

    #[test]
    fn zero_subjects_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = simulate(&Model::Single(left_to_right()), 0, 5, &mut rng).unwrap_err();
        assert!(matches!(err, HmmError::EmptyData { subjects: 0, .. }));
    }
}
