//! Viterbi decoding in the log domain.
//!
//! Purpose
//! -------
//! Recover the single most probable hidden-state path of one subject, and in
//! a mixture, couple decoding with the choice of the subject's cluster.
//!
//! Key behaviors
//! -------------
//! - `δ_1(i) = ln π(i) + Σ_r ln B_r(i, o_1r)`;
//!   `δ_t(j) = max_i [δ_{t−1}(i) + ln A(i, j)] + Σ_r ln B_r(j, o_tr)`, with the
//!   maximizing predecessor stored in `ψ_t(j)`.
//! - `ln 0 = -∞`, so structural zeros never appear on a returned path.
//! - Candidates are scanned in ascending index order. Under
//!   [`TieBreak::LowestIndex`] a later candidate replaces the incumbent only
//!   when strictly greater; under [`TieBreak::HighestIndex`] also on equality.
//!   The same rule breaks ties between clusters.
//! - [`decode_subject`] runs the recursion once per cluster with that
//!   cluster's own parameters and reports the path of the selected cluster.
//!
//! Conventions
//! -----------
//! - A subject whose observations are impossible under every cluster yields
//!   [`HmmError::ZeroLikelihood`].
use crate::{
    hmm::{
        core::{
            emission::log_emission_matrix,
            forward::forward,
            options::{ClusterSelection, DecodeOptions, TieBreak},
            params::HmmParams,
        },
        errors::{HmmError, HmmResult},
    },
    utils::safe_ln,
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Most probable path of one HMM and its joint log-probability.
#[derive(Debug, Clone, PartialEq)]
pub struct ViterbiPath {
    pub states: Vec<usize>,
    pub log_prob: f64,
}

/// Decoded path of one subject together with the cluster it was taken from.
///
/// `log_prob` is `ln w_k + ln P(path, o | cluster k)`; for a single model the
/// weight term is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPath {
    pub cluster: usize,
    pub states: Vec<usize>,
    pub log_prob: f64,
}

/// Most probable path of `obs` (`T × C`) under `params` and `initial`.
pub fn viterbi(
    params: &HmmParams, initial: ArrayView1<f64>, obs: ArrayView2<usize>, tie_break: TieBreak,
) -> ViterbiPath {
    let m = params.n_states();
    let n_time = obs.nrows();
    let log_emission = log_emission_matrix(params, obs);
    let log_transition = params.transition.mapv(safe_ln);

    let mut delta: Array1<f64> = initial.mapv(safe_ln) + &log_emission.column(0);
    let mut psi = Array2::<usize>::zeros((m, n_time));
    for t in 1..n_time {
        let mut next = Array1::<f64>::zeros(m);
        for j in 0..m {
            let candidates = &delta + &log_transition.column(j);
            let (best_i, best) = arg_max(candidates.view(), tie_break);
            psi[[j, t]] = best_i;
            next[j] = best + log_emission[[j, t]];
        }
        delta = next;
    }

    let (last, log_prob) = arg_max(delta.view(), tie_break);
    let mut states = vec![0; n_time];
    states[n_time - 1] = last;
    for t in (1..n_time).rev() {
        states[t - 1] = psi[[states[t], t]];
    }
    ViterbiPath { states, log_prob }
}

/// Decode one subject under a list of clusters with log-weights `ln w_k`.
///
/// # Errors
/// - [`HmmError::ZeroLikelihood`] when every cluster scores `-∞`.
pub fn decode_subject(
    clusters: &[HmmParams], log_weights: ArrayView1<f64>, obs: ArrayView2<usize>, subject: usize,
    options: &DecodeOptions,
) -> HmmResult<DecodedPath> {
    let paths: Vec<ViterbiPath> = clusters
        .iter()
        .map(|params| viterbi(params, params.initial.view(), obs, options.tie_break))
        .collect();
    let scores: Array1<f64> = match options.cluster_selection {
        ClusterSelection::MaxJointPath => {
            Array1::from_iter(paths.iter().map(|path| path.log_prob)) + &log_weights
        }
        ClusterSelection::MaxPosterior => {
            Array1::from_iter(
                clusters.iter().map(|params| forward(params, params.initial.view(), obs).log_lik),
            ) + &log_weights
        }
    };
    let (cluster, best) = arg_max(scores.view(), options.tie_break);
    if best == f64::NEG_INFINITY {
        return Err(HmmError::ZeroLikelihood { subject });
    }
    let ViterbiPath { states, log_prob } = paths.into_iter().nth(cluster).ok_or(
        HmmError::ClusterMismatch { cluster, reason: "decoded cluster index out of range" },
    )?;
    Ok(DecodedPath { cluster, states, log_prob: log_weights[cluster] + log_prob })
}

// ---- Helper methods ----

/// Index and value of the maximum under the given tie rule.
pub(crate) fn arg_max(values: ArrayView1<f64>, tie_break: TieBreak) -> (usize, f64) {
    let mut best_idx = 0;
    let mut best = values[0];
    for (idx, &v) in values.iter().enumerate().skip(1) {
        let replace = match tie_break {
            TieBreak::LowestIndex => v > best,
            TieBreak::HighestIndex => v >= best,
        };
        if replace {
            best_idx = idx;
            best = v;
        }
    }
    (best_idx, best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmm::core::{
        emission::emission_prob,
        forward::tests::{column_obs, enumerate_paths, textbook_params},
    };
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The hand-worked two-state path and its log-probability.
    // - Optimality against brute-force path enumeration.
    // - Both tie-break rules on a fully symmetric chain.
    // - Structural zeros never appearing on a decoded path.
    // - Cluster selection in mixtures.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Pin the decoded path of the hand-worked example.
    //
    // Given
    // -----
    // - π = (1, 0), A = [[5/6, 1/6], [1/6, 5/6]], B = [[.5, .5], [.2, .8]].
    // - Observations (0, 0, 1).
    //
    // Expect
    // ------
    // - Path (0, 0, 0) with log-probability ln(25/288).
    fn viterbi_matches_hand_computed_path() {
        // Arrange
        let params = textbook_params();
        let obs = column_obs(&[0, 0, 1]);

        // Act
        let path = viterbi(&params, params.initial.view(), obs.view(), TieBreak::LowestIndex);

        // Assert
        assert_eq!(path.states, vec![0, 0, 0]);
        assert!((path.log_prob - (25.0_f64 / 288.0).ln()).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Verify the decoded path is at least as probable as every other path.
    //
    // Given
    // -----
    // - m = 2, T = 4, two channels.
    //
    // Expect
    // ------
    // - `log_prob` equals the maximum over all 16 enumerated paths and the
    //   returned path attains it.
    fn viterbi_path_dominates_all_enumerated_paths() {
        // Arrange
        let params = HmmParams::new(
            array![[0.6, 0.4], [0.25, 0.75]],
            vec![array![[0.7, 0.2, 0.1], [0.1, 0.3, 0.6]], array![[0.8, 0.2], [0.35, 0.65]]],
            array![0.3, 0.7],
        )
        .expect("valid parameters");
        let obs = array![[0, 0], [2, 1], [1, 1], [0, 0]];

        // Act
        let path = viterbi(&params, params.initial.view(), obs.view(), TieBreak::LowestIndex);
        let (paths, _) = enumerate_paths(&params, obs.view());

        // Assert
        let best = paths.iter().map(|(_, p)| *p).fold(0.0, f64::max);
        assert!((path.log_prob - best.ln()).abs() < 1e-12);
        let mut own = params.initial[path.states[0]]
            * emission_prob(&params, obs.row(0), path.states[0]);
        for t in 1..4 {
            own *= params.transition[[path.states[t - 1], path.states[t]]]
                * emission_prob(&params, obs.row(t), path.states[t]);
        }
        assert!((own.ln() - path.log_prob).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Exercise both tie rules on a chain where every path is equally likely.
    //
    // Given
    // -----
    // - Uniform π, A, and B with two states.
    //
    // Expect
    // ------
    // - LowestIndex decodes all zeros; HighestIndex decodes all ones.
    fn tie_break_rule_selects_extreme_index() {
        // Arrange
        let params = HmmParams::new(
            array![[0.5, 0.5], [0.5, 0.5]],
            vec![array![[0.5, 0.5], [0.5, 0.5]]],
            array![0.5, 0.5],
        )
        .expect("valid parameters");
        let obs = column_obs(&[0, 1, 1, 0]);

        // Act
        let low = viterbi(&params, params.initial.view(), obs.view(), TieBreak::LowestIndex);
        let high = viterbi(&params, params.initial.view(), obs.view(), TieBreak::HighestIndex);

        // Assert
        assert_eq!(low.states, vec![0, 0, 0, 0]);
        assert_eq!(high.states, vec![1, 1, 1, 1]);
        assert!((low.log_prob - high.log_prob).abs() < 1e-15);
    }

    #[test]
    fn forbidden_transitions_never_appear_on_path() {
        // Left-to-right chain: state 1 is absorbing and 1 -> 0 is forbidden.
        let params = HmmParams::new(
            array![[0.5, 0.5], [0.0, 1.0]],
            vec![array![[0.9, 0.1], [0.1, 0.9]]],
            array![1.0, 0.0],
        )
        .expect("valid parameters");
        let obs = column_obs(&[0, 1, 0, 0]);
        let path = viterbi(&params, params.initial.view(), obs.view(), TieBreak::LowestIndex);
        assert_eq!(path.states[0], 0);
        for t in 1..4 {
            assert!(params.transition[[path.states[t - 1], path.states[t]]] > 0.0);
        }
        assert!(path.log_prob.is_finite());
    }

    fn separated_clusters() -> Vec<HmmParams> {
        let cluster = |p: f64| {
            HmmParams::new(
                array![[0.9, 0.1], [0.1, 0.9]],
                vec![array![[p, 1.0 - p], [p, 1.0 - p]]],
                array![0.5, 0.5],
            )
            .expect("valid parameters")
        };
        vec![cluster(0.95), cluster(0.05)]
    }

    #[test]
    // Purpose
    // -------
    // Check that decoding picks the cluster that explains the subject.
    //
    // Given
    // -----
    // - Cluster 0 emits mostly 0, cluster 1 mostly 1; equal weights.
    // - A sequence of all ones.
    //
    // Expect
    // ------
    // - Cluster 1 under both selection rules, with ln w_1 folded into
    //   `log_prob`.
    fn decode_subject_selects_explaining_cluster() {
        // Arrange
        let clusters = separated_clusters();
        let log_w = array![0.5_f64.ln(), 0.5_f64.ln()];
        let obs = column_obs(&[1, 1, 1, 1, 1]);

        for selection in [ClusterSelection::MaxPosterior, ClusterSelection::MaxJointPath] {
            let options = DecodeOptions { cluster_selection: selection, ..Default::default() };

            // Act
            let decoded = decode_subject(&clusters, log_w.view(), obs.view(), 0, &options)
                .expect("possible sequence");

            // Assert
            assert_eq!(decoded.cluster, 1);
            let own = viterbi(
                &clusters[1],
                clusters[1].initial.view(),
                obs.view(),
                TieBreak::LowestIndex,
            );
            assert!((decoded.log_prob - (0.5_f64.ln() + own.log_prob)).abs() < 1e-12);
        }
    }

    #[test]
    fn decode_subject_reports_impossible_subject() {
        let params = HmmParams::new(
            array![[1.0]],
            vec![array![[1.0, 0.0]]],
            array![1.0],
        )
        .expect("valid parameters");
        let obs = column_obs(&[0, 1]);
        let err = decode_subject(
            std::slice::from_ref(&params),
            array![0.0].view(),
            obs.view(),
            7,
            &DecodeOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, HmmError::ZeroLikelihood { subject: 7 });
    }
}
