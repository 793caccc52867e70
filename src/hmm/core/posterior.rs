//! Per-subject posterior quantities and expected-count tables.
//!
//! Purpose
//! -------
//! Run the forward and backward recursions of one subject against every
//! cluster, combine them with the subject's mixture weights, and accumulate
//! the responsibility-weighted tables shared by the EM engine (expected
//! counts) and the gradient evaluator (raw likelihood derivatives).
//!
//! Key behaviors
//! -------------
//! - The subject log-likelihood is `ln Σ_k w_k L_k`, computed as a
//!   log-sum-exp over `ln w_k + ℓ_k`; responsibilities are
//!   `r_k = exp(ln w_k + ℓ_k − ℓ)` and sum to one.
//! - A cluster under which the sequence is impossible gets `r_k = 0` and no
//!   backward pass; a subject impossible under every cluster is an error.
//! - [`ClusterTables`] has the same shapes as [`HmmParams`] so one reduction
//!   type serves both expected counts and derivatives.
//!
//! Invariants & assumptions
//! ------------------------
//! - `γ_t = α̂_t ⊙ β̂_t` sums to one over states for every `t`.
//! - Structural zeros receive zero expected counts because both `ξ` and the
//!   emission counts are proportional to the zero parameter.
use crate::{
    hmm::{
        core::{
            backward::backward_from_emissions,
            data::{MISSING, SeqData},
            emission::{emission_matrix, emission_prob_except},
            forward::forward_from_emissions,
            params::HmmParams,
        },
        errors::{HmmError, HmmResult},
    },
    utils::{log_sum_exp, map_subjects},
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, s};

/// Forward/backward output of one subject under one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterPass {
    /// Scaled forward probabilities, `m × T`.
    pub alpha: Array2<f64>,
    /// Scaled backward probabilities, `m × T`; zeros when impossible.
    pub beta: Array2<f64>,
    /// Scale factors `c_t`.
    pub scales: Array1<f64>,
    /// Cluster log-likelihood `ℓ_k`.
    pub log_lik: f64,
    /// Joint emission probabilities, `m × T`.
    pub emissions: Array2<f64>,
}

impl ClusterPass {
    pub fn run(params: &HmmParams, obs: ArrayView2<usize>) -> ClusterPass {
        let emissions = emission_matrix(params, obs);
        let fwd = forward_from_emissions(
            params.transition.view(),
            params.initial.view(),
            emissions.view(),
        );
        let beta = if fwd.is_impossible() {
            Array2::zeros(fwd.alpha.dim())
        } else {
            backward_from_emissions(params.transition.view(), emissions.view(), fwd.scales.view())
        };
        ClusterPass { alpha: fwd.alpha, beta, scales: fwd.scales, log_lik: fwd.log_lik, emissions }
    }

    /// Smoothed state probabilities `γ = α̂ ⊙ β̂` (`m × T`).
    pub fn gamma(&self) -> Array2<f64> {
        &self.alpha * &self.beta
    }
}

/// All cluster passes of one subject plus mixture bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectPass {
    pub clusters: Vec<ClusterPass>,
    /// `ln w_k` for the subject.
    pub log_weights: Array1<f64>,
    /// Posterior cluster probabilities `r_k`.
    pub responsibilities: Array1<f64>,
    /// Subject log-likelihood `ln Σ_k w_k L_k`.
    pub log_lik: f64,
}

impl SubjectPass {
    /// Posterior state probabilities over the combined state space
    /// (`m_total × T`), each cluster block scaled by its responsibility.
    pub fn state_posteriors(&self) -> Array2<f64> {
        let total: usize = self.clusters.iter().map(|c| c.alpha.nrows()).sum();
        let n_time = self.clusters[0].alpha.ncols();
        let mut out = Array2::<f64>::zeros((total, n_time));
        let mut offset = 0;
        for (pass, &r) in self.clusters.iter().zip(self.responsibilities.iter()) {
            let m = pass.alpha.nrows();
            if r > 0.0 {
                out.slice_mut(s![offset..offset + m, ..]).assign(&(pass.gamma() * r));
            }
            offset += m;
        }
        out
    }
}

/// Forward/backward passes of subject `subject` under every cluster.
///
/// # Errors
/// - [`HmmError::ZeroLikelihood`] when the sequence is impossible under every
///   cluster with positive weight.
pub fn subject_pass(
    clusters: &[HmmParams], log_weights: ArrayView1<f64>, obs: ArrayView2<usize>, subject: usize,
) -> HmmResult<SubjectPass> {
    let passes: Vec<ClusterPass> =
        clusters.iter().map(|params| ClusterPass::run(params, obs)).collect();
    let joint = Array1::from_iter(passes.iter().map(|p| p.log_lik)) + &log_weights;
    let log_lik = log_sum_exp(joint.view());
    if !log_lik.is_finite() {
        return Err(HmmError::ZeroLikelihood { subject });
    }
    let responsibilities = joint.mapv(|v| (v - log_lik).exp());
    Ok(SubjectPass {
        clusters: passes,
        log_weights: log_weights.to_owned(),
        responsibilities,
        log_lik,
    })
}

/// Accumulator with the shapes of one cluster's probability tables.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterTables {
    pub transition: Array2<f64>,
    pub emissions: Vec<Array2<f64>>,
    pub initial: Array1<f64>,
}

impl ClusterTables {
    pub fn zeros_like(params: &HmmParams) -> ClusterTables {
        ClusterTables {
            transition: Array2::zeros(params.transition.dim()),
            emissions: params.emissions.iter().map(|b| Array2::zeros(b.dim())).collect(),
            initial: Array1::zeros(params.n_states()),
        }
    }

    /// One zeroed table per cluster.
    pub fn for_clusters(clusters: &[HmmParams]) -> Vec<ClusterTables> {
        clusters.iter().map(ClusterTables::zeros_like).collect()
    }

    /// Add `weight` times the expected counts of one subject.
    ///
    /// - initial: `γ_1`;
    /// - transition: `Σ_t ξ_t(i, j)`;
    /// - emission `r`: `Σ_{t: o_tr = s} γ_t(i)`, skipping missing entries.
    pub fn accumulate_counts(
        &mut self, params: &HmmParams, pass: &ClusterPass, obs: ArrayView2<usize>, weight: f64,
    ) {
        if weight <= 0.0 {
            return;
        }
        let gamma = pass.gamma() * weight;
        self.initial += &gamma.column(0);
        let scaled_trans = transition_kernel(pass) * weight;
        self.transition += &(&scaled_trans * &params.transition);
        for (t, obs_t) in obs.axis_iter(Axis(0)).enumerate() {
            for (r, &symbol) in obs_t.iter().enumerate() {
                if symbol == MISSING {
                    continue;
                }
                let mut col = self.emissions[r].column_mut(symbol);
                col += &gamma.column(t);
            }
        }
    }

    /// Add `weight` times the derivatives of `ℓ_k` with respect to the raw
    /// probabilities of one subject.
    ///
    /// - `∂ℓ/∂π_i = b_i(o_1) β̂_1(i) / c_1`;
    /// - `∂ℓ/∂A_ij = Σ_t α̂_t(i) b_j(o_{t+1}) β̂_{t+1}(j) / c_{t+1}`;
    /// - `∂ℓ/∂B_r(i, s) = Σ_{t: o_tr = s} pred_t(i) Π_{r'≠r} B_{r'}(i, o_tr')
    ///   β̂_t(i) / c_t` with `pred_1 = π` and `pred_t = α̂_{t−1}ᵀ A`.
    pub fn accumulate_derivs(
        &mut self, params: &HmmParams, pass: &ClusterPass, obs: ArrayView2<usize>, weight: f64,
    ) {
        if weight <= 0.0 {
            return;
        }
        let m = params.n_states();
        let d_initial =
            &pass.emissions.column(0) * &pass.beta.column(0) * (weight / pass.scales[0]);
        self.initial += &d_initial;
        self.transition += &(transition_kernel(pass) * weight);
        for (t, obs_t) in obs.axis_iter(Axis(0)).enumerate() {
            let pred = if t == 0 {
                params.initial.clone()
            } else {
                pass.alpha.column(t - 1).dot(&params.transition)
            };
            let factor = weight / pass.scales[t];
            for (r, &symbol) in obs_t.iter().enumerate() {
                if symbol == MISSING {
                    continue;
                }
                for i in 0..m {
                    let others = emission_prob_except(params, obs_t, i, r);
                    self.emissions[r][[i, symbol]] += pred[i] * others * pass.beta[[i, t]] * factor;
                }
            }
        }
    }

    /// Element-wise sum with another accumulator of the same shapes.
    pub fn merge(&mut self, other: &ClusterTables) {
        self.transition += &other.transition;
        self.initial += &other.initial;
        for (mine, theirs) in self.emissions.iter_mut().zip(other.emissions.iter()) {
            *mine += theirs;
        }
    }
}

// `Σ_t α̂_t(i) b_j(o_{t+1}) β̂_{t+1}(j) / c_{t+1}`; ξ is this times A(i, j).
fn transition_kernel(pass: &ClusterPass) -> Array2<f64> {
    let (m, n_time) = pass.alpha.dim();
    let mut kernel = Array2::<f64>::zeros((m, m));
    for t in 0..n_time.saturating_sub(1) {
        let right = &pass.emissions.column(t + 1) * &pass.beta.column(t + 1) / pass.scales[t + 1];
        let left = pass.alpha.column(t);
        for i in 0..m {
            let mut row = kernel.row_mut(i);
            row.scaled_add(left[i], &right);
        }
    }
    kernel
}

/// Merge per-subject tables into one set, in subject order.
pub fn reduce_tables(
    clusters: &[HmmParams], per_subject: impl IntoIterator<Item = Vec<ClusterTables>>,
) -> Vec<ClusterTables> {
    per_subject.into_iter().fold(ClusterTables::for_clusters(clusters), |mut acc, tables| {
        for (total, part) in acc.iter_mut().zip(tables.iter()) {
            total.merge(part);
        }
        acc
    })
}

/// Table a [`sweep`] accumulates per cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accumulate {
    /// Expected counts for the M-step.
    Counts,
    /// Raw probability derivatives for the analytic gradient.
    Derivatives,
}

/// Totals of one pass over every subject.
#[derive(Debug, Clone, PartialEq)]
pub struct Sweep {
    /// `Σ_n ln Σ_k w_nk L_nk`.
    pub log_lik: f64,
    /// `N × K` cluster responsibilities.
    pub responsibilities: Array2<f64>,
    /// One responsibility-weighted table per cluster.
    pub tables: Vec<ClusterTables>,
}

/// Run [`subject_pass`] for every subject and reduce the requested tables.
///
/// Subjects are processed with [`map_subjects`]; the reduction runs in
/// subject order so the totals do not depend on scheduling.
///
/// # Errors
/// - [`HmmError::ZeroLikelihood`] for the lowest-indexed impossible subject.
pub fn sweep(
    clusters: &[HmmParams], log_weights: ArrayView2<f64>, data: &SeqData, accumulate: Accumulate,
) -> HmmResult<Sweep> {
    let per_subject = map_subjects(data.n_subjects(), |n| {
        let obs = data.subject(n);
        let pass = subject_pass(clusters, log_weights.row(n), obs, n)?;
        let mut tables = ClusterTables::for_clusters(clusters);
        for (k, (table, params)) in tables.iter_mut().zip(clusters.iter()).enumerate() {
            let weight = pass.responsibilities[k];
            match accumulate {
                Accumulate::Counts => {
                    table.accumulate_counts(params, &pass.clusters[k], obs, weight)
                }
                Accumulate::Derivatives => {
                    table.accumulate_derivs(params, &pass.clusters[k], obs, weight)
                }
            }
        }
        Ok((pass.log_lik, pass.responsibilities, tables))
    });
    let per_subject = per_subject.into_iter().collect::<HmmResult<Vec<_>>>()?;

    let mut log_lik = 0.0;
    let mut responsibilities = Array2::<f64>::zeros((data.n_subjects(), clusters.len()));
    let mut parts = Vec::with_capacity(per_subject.len());
    for (n, (subject_ll, r, tables)) in per_subject.into_iter().enumerate() {
        log_lik += subject_ll;
        responsibilities.row_mut(n).assign(&r);
        parts.push(tables);
    }
    Ok(Sweep { log_lik, responsibilities, tables: reduce_tables(clusters, parts) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmm::core::forward::tests::{column_obs, enumerate_paths, textbook_params};
    use ndarray::array;
    use proptest::prelude::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Responsibilities and the mixture log-likelihood.
    // - Expected counts against brute-force path enumeration.
    // - Raw derivatives against finite differences of the forward pass.
    // - γ normalization over random models (property test).
    //
    // They intentionally DO NOT cover:
    // - The softmax Jacobian applied on top of the raw derivatives, which
    //   lives in `layout`.
    // -------------------------------------------------------------------------

    fn two_channel() -> HmmParams {
        HmmParams::new(
            array![[0.7, 0.3], [0.2, 0.8]],
            vec![array![[0.6, 0.3, 0.1], [0.1, 0.2, 0.7]], array![[0.9, 0.1], [0.4, 0.6]]],
            array![0.65, 0.35],
        )
        .expect("valid parameters")
    }

    #[test]
    // Purpose
    // -------
    // Confirm that the mixture log-likelihood is ln Σ w_k L_k and that
    // responsibilities are the normalized weighted likelihoods.
    //
    // Given
    // -----
    // - Two clusters with weights (0.3, 0.7) and one sequence.
    //
    // Expect
    // ------
    // - ℓ = ln(0.3 L_0 + 0.7 L_1); r sums to one; r_0 = 0.3 L_0 / e^ℓ.
    fn subject_pass_combines_clusters_with_weights() {
        // Arrange
        let clusters = vec![textbook_params(), other_single_channel()];
        let obs = column_obs(&[0, 1, 1]);
        let log_w = array![0.3_f64.ln(), 0.7_f64.ln()];

        // Act
        let pass = subject_pass(&clusters, log_w.view(), obs.view(), 0).expect("possible");

        // Assert
        let l0 = enumerate_paths(&clusters[0], obs.view()).1;
        let l1 = enumerate_paths(&clusters[1], obs.view()).1;
        let total = 0.3 * l0 + 0.7 * l1;
        assert!((pass.log_lik - total.ln()).abs() < 1e-12);
        assert!((pass.responsibilities.sum() - 1.0).abs() < 1e-12);
        assert!((pass.responsibilities[0] - 0.3 * l0 / total).abs() < 1e-12);
    }

    fn other_single_channel() -> HmmParams {
        HmmParams::new(
            array![[0.4, 0.6], [0.5, 0.5]],
            vec![array![[0.25, 0.75], [0.9, 0.1]]],
            array![0.2, 0.8],
        )
        .expect("valid parameters")
    }

    #[test]
    fn impossible_subject_is_rejected() {
        let params = HmmParams::new(array![[1.0]], vec![array![[1.0, 0.0]]], array![1.0])
            .expect("valid parameters");
        let obs = column_obs(&[1]);
        let err = subject_pass(std::slice::from_ref(&params), array![0.0].view(), obs.view(), 3)
            .unwrap_err();
        assert_eq!(err, HmmError::ZeroLikelihood { subject: 3 });
    }

    #[test]
    // Purpose
    // -------
    // Check expected transition counts against brute-force enumeration.
    //
    // Given
    // -----
    // - Two channels, T = 4, one missing entry.
    //
    // Expect
    // ------
    // - Σ_t ξ_t(i, j) equals Σ_paths P(path | o) · #(i → j in path).
    // - The initial counts sum to one.
    fn expected_transition_counts_match_brute_force() {
        // Arrange
        let params = two_channel();
        let obs = array![[2, 0], [0, MISSING], [1, 1], [2, 0]];

        // Act
        let pass = ClusterPass::run(&params, obs.view());
        let mut tables = ClusterTables::zeros_like(&params);
        tables.accumulate_counts(&params, &pass, obs.view(), 1.0);

        // Assert
        let (paths, total) = enumerate_paths(&params, obs.view());
        for i in 0..2 {
            for j in 0..2 {
                let brute: f64 = paths
                    .iter()
                    .map(|(path, p)| {
                        let n = path.windows(2).filter(|w| w[0] == i && w[1] == j).count();
                        n as f64 * p
                    })
                    .sum::<f64>()
                    / total;
                assert!((tables.transition[[i, j]] - brute).abs() < 1e-12, "({i}, {j})");
            }
        }
        assert!((tables.initial.sum() - 1.0).abs() < 1e-12);
        // Channel 1 is missing at t = 1, so its counts cover three time points.
        assert!((tables.emissions[1].sum() - 3.0).abs() < 1e-12);
        assert!((tables.emissions[0].sum() - 4.0).abs() < 1e-12);
    }

    fn log_lik_of(params: &HmmParams, obs: ArrayView2<usize>) -> f64 {
        ClusterPass::run(params, obs).log_lik
    }

    #[test]
    // Purpose
    // -------
    // Validate raw derivatives against central differences of ℓ with respect
    // to individual (unconstrained) probability entries.
    //
    // Given
    // -----
    // - Two channels, T = 4, one missing entry.
    //
    // Expect
    // ------
    // - Every entry of the derivative tables agrees with the finite
    //   difference to 1e-6.
    fn raw_derivatives_match_finite_differences() {
        // Arrange
        let params = two_channel();
        let obs = array![[2, 0], [0, MISSING], [1, 1], [2, 0]];
        let pass = ClusterPass::run(&params, obs.view());
        let mut tables = ClusterTables::zeros_like(&params);
        let h = 1e-6;

        // Act
        tables.accumulate_derivs(&params, &pass, obs.view(), 1.0);

        // Assert
        for ((i, j), &d) in tables.transition.indexed_iter() {
            let mut up = params.clone();
            up.transition[[i, j]] += h;
            let mut down = params.clone();
            down.transition[[i, j]] -= h;
            let fd = (log_lik_of(&up, obs.view()) - log_lik_of(&down, obs.view())) / (2.0 * h);
            assert!((d - fd).abs() < 1e-6, "A({i}, {j}): {d} vs {fd}");
        }
        for (r, table) in tables.emissions.iter().enumerate() {
            for ((i, s), &d) in table.indexed_iter() {
                let mut up = params.clone();
                up.emissions[r][[i, s]] += h;
                let mut down = params.clone();
                down.emissions[r][[i, s]] -= h;
                let fd = (log_lik_of(&up, obs.view()) - log_lik_of(&down, obs.view())) / (2.0 * h);
                assert!((d - fd).abs() < 1e-6, "B_{r}({i}, {s}): {d} vs {fd}");
            }
        }
        for (i, &d) in tables.initial.iter().enumerate() {
            let mut up = params.clone();
            up.initial[i] += h;
            let mut down = params.clone();
            down.initial[i] -= h;
            let fd = (log_lik_of(&up, obs.view()) - log_lik_of(&down, obs.view())) / (2.0 * h);
            assert!((d - fd).abs() < 1e-6, "π({i}): {d} vs {fd}");
        }
    }

    #[test]
    fn merge_adds_tables_elementwise() {
        let params = two_channel();
        let obs = array![[0, 1], [1, 0]];
        let pass = ClusterPass::run(&params, obs.view());
        let mut once = ClusterTables::zeros_like(&params);
        once.accumulate_counts(&params, &pass, obs.view(), 0.5);
        let merged = reduce_tables(std::slice::from_ref(&params), vec![vec![once.clone()]; 2]);
        let mut twice = ClusterTables::zeros_like(&params);
        twice.accumulate_counts(&params, &pass, obs.view(), 1.0);
        assert!((&merged[0].transition - &twice.transition).iter().all(|d| d.abs() < 1e-14));
        assert!((&merged[0].initial - &twice.initial).iter().all(|d| d.abs() < 1e-14));
    }

    fn stochastic_rows(rows: usize, cols: usize) -> impl Strategy<Value = Array2<f64>> {
        proptest::collection::vec(0.05..1.0f64, rows * cols).prop_map(move |raw| {
            let mut mat = Array2::from_shape_vec((rows, cols), raw).expect("shape");
            for mut row in mat.rows_mut() {
                let total = row.sum();
                row /= total;
            }
            mat
        })
    }

    fn random_model() -> impl Strategy<Value = (HmmParams, Array2<usize>)> {
        (2..=3usize, 2..=4usize, 1..=6usize).prop_flat_map(|(m, s, t)| {
            (
                stochastic_rows(m, m),
                stochastic_rows(m, s),
                stochastic_rows(1, m),
                proptest::collection::vec(0..s, t),
            )
                .prop_map(move |(a, b, pi, symbols)| {
                    let params =
                        HmmParams::new(a, vec![b], pi.row(0).to_owned()).expect("valid rows");
                    let obs = Array2::from_shape_vec((t, 1), symbols).expect("shape");
                    (params, obs)
                })
        })
    }

    proptest! {
        #[test]
        fn gamma_columns_sum_to_one((params, obs) in random_model()) {
            let pass = ClusterPass::run(&params, obs.view());
            let gamma = pass.gamma();
            for column in gamma.columns() {
                prop_assert!((column.sum() - 1.0).abs() < 1e-10);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Check that a sweep sums subject log-likelihoods and that its count
    // tables equal the sum of single-subject accumulations.
    //
    // Given
    // -----
    // - The textbook chain as a single cluster and two subjects.
    //
    // Expect
    // ------
    // - Total log-likelihood equals the sum of forward log-likelihoods.
    // - Initial counts sum to the number of subjects.
    // - Responsibilities are all one.
    fn sweep_reduces_subject_tables_in_order() {
        // Arrange
        let params = textbook_params();
        let mut obs = ndarray::Array3::<usize>::zeros((2, 3, 1));
        obs[[0, 2, 0]] = 1;
        obs[[1, 0, 0]] = 1;
        let data = SeqData::new(obs, vec![2]).expect("valid data");
        let clusters = vec![params.clone()];
        let log_weights = Array2::<f64>::zeros((2, 1));

        // Act
        let totals = sweep(&clusters, log_weights.view(), &data, Accumulate::Counts)
            .expect("possible sequences");

        // Assert
        let expected: f64 = (0..2)
            .map(|n| ClusterPass::run(&params, data.subject(n)).log_lik)
            .sum();
        assert!((totals.log_lik - expected).abs() < 1e-12);
        assert!((totals.tables[0].initial.sum() - 2.0).abs() < 1e-12);
        assert!(totals.responsibilities.iter().all(|&r| (r - 1.0).abs() < 1e-15));
    }
}
