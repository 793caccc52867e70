//! Single and mixture hidden Markov models behind one tagged type.
//!
//! Purpose
//! -------
//! Represent either one HMM or a mixture of HMMs whose cluster membership is
//! a multinomial-logit function of subject covariates, so that the forward,
//! backward, and Viterbi engines are written once against a list of
//! clusters.
//!
//! Key behaviors
//! -------------
//! - [`Model::Single`] behaves as a one-cluster mixture with weight 1 for
//!   every subject and no coefficients.
//! - [`Model::Mixture`] stores `K` clusters, covariates `X` (`N × q`), and
//!   coefficients `Γ` (`q × K`) with an all-zero baseline column.
//! - [`Model::mixture_weights`] returns `softmax(X Γ)` row by row and
//!   [`Model::log_mixture_weights`] its logarithm without leaving log space.
//!
//! Invariants & assumptions
//! ------------------------
//! - All clusters share the number of channels and the alphabet sizes; the
//!   number of hidden states may differ per cluster.
//! - `Γ[:, 0] == 0` exactly; the coefficient refit and the free-parameter
//!   layout never touch that column.
//!
//! Conventions
//! -----------
//! - Cluster 0 is the baseline cluster.
//! - Combined state spaces (posterior probabilities of a mixture) list the
//!   states of cluster 0 first, then cluster 1, and so on.
use crate::{
    hmm::{
        core::{data::SeqData, params::HmmParams},
        errors::{HmmError, HmmResult},
    },
    optimization::numerical_stability::safe_softmax,
    utils::log_sum_exp,
};
use ndarray::{Array2, ArrayView2};

#[derive(Debug, Clone, PartialEq)]
pub struct MixtureParams {
    pub clusters: Vec<HmmParams>,
    pub covariates: Array2<f64>,
    pub coefficients: Array2<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Model {
    Single(HmmParams),
    Mixture(MixtureParams),
}

impl Model {
    /// Build a validated mixture model.
    ///
    /// # Errors
    /// - [`HmmError::EmptyMixture`] for an empty cluster list.
    /// - [`HmmError::ClusterMismatch`] when clusters disagree on channels or
    ///   alphabet sizes.
    /// - [`HmmError::CoefficientShape`] unless `Γ` is `q × K`.
    /// - [`HmmError::BaselineNotZero`] when `Γ[:, 0]` has a nonzero entry.
    /// - [`HmmError::NonFiniteCovariate`] / [`HmmError::NonFiniteCoefficient`]
    ///   for NaN or infinite inputs.
    pub fn mixture(
        clusters: Vec<HmmParams>, covariates: Array2<f64>, coefficients: Array2<f64>,
    ) -> HmmResult<Model> {
        let first = clusters.first().ok_or(HmmError::EmptyMixture)?;
        let n_symbols = first.n_symbols();
        for (cluster, params) in clusters.iter().enumerate().skip(1) {
            if params.n_channels() != first.n_channels() {
                return Err(HmmError::ClusterMismatch {
                    cluster,
                    reason: "number of channels differs",
                });
            }
            if params.n_symbols() != n_symbols {
                return Err(HmmError::ClusterMismatch { cluster, reason: "alphabet sizes differ" });
            }
        }
        let expected = (covariates.ncols(), clusters.len());
        if coefficients.dim() != expected {
            return Err(HmmError::CoefficientShape { expected, found: coefficients.dim() });
        }
        for ((row, col), &value) in covariates.indexed_iter() {
            if !value.is_finite() {
                return Err(HmmError::NonFiniteCovariate { row, col, value });
            }
        }
        for ((row, col), &value) in coefficients.indexed_iter() {
            if !value.is_finite() {
                return Err(HmmError::NonFiniteCoefficient { row, col, value });
            }
            if col == 0 && value != 0.0 {
                return Err(HmmError::BaselineNotZero { row, value });
            }
        }
        Ok(Model::Mixture(MixtureParams { clusters, covariates, coefficients }))
    }

    pub fn clusters(&self) -> &[HmmParams] {
        match self {
            Model::Single(params) => std::slice::from_ref(params),
            Model::Mixture(mix) => &mix.clusters,
        }
    }

    pub fn clusters_mut(&mut self) -> &mut [HmmParams] {
        match self {
            Model::Single(params) => std::slice::from_mut(params),
            Model::Mixture(mix) => &mut mix.clusters,
        }
    }

    pub fn n_clusters(&self) -> usize {
        self.clusters().len()
    }

    /// Number of covariates `q`; zero for a single model.
    pub fn n_covariates(&self) -> usize {
        match self {
            Model::Single(_) => 0,
            Model::Mixture(mix) => mix.covariates.ncols(),
        }
    }

    /// Total number of hidden states across clusters.
    pub fn total_states(&self) -> usize {
        self.clusters().iter().map(HmmParams::n_states).sum()
    }

    /// Offset of each cluster's first state in the combined state space.
    pub fn state_offsets(&self) -> Vec<usize> {
        self.clusters()
            .iter()
            .scan(0, |acc, params| {
                let start = *acc;
                *acc += params.n_states();
                Some(start)
            })
            .collect()
    }

    /// Coefficients `Γ` for a mixture, `None` for a single model.
    pub fn coefficients(&self) -> Option<ArrayView2<'_, f64>> {
        match self {
            Model::Single(_) => None,
            Model::Mixture(mix) => Some(mix.coefficients.view()),
        }
    }

    /// Linear predictor `η = X Γ` (`N × K`); zeros (`N × 1`) for a single model.
    pub fn linear_predictor(&self, n_subjects: usize) -> HmmResult<Array2<f64>> {
        match self {
            Model::Single(_) => Ok(Array2::zeros((n_subjects, 1))),
            Model::Mixture(mix) => {
                if mix.covariates.nrows() != n_subjects {
                    return Err(HmmError::CovariateRowsMismatch {
                        expected: n_subjects,
                        actual: mix.covariates.nrows(),
                    });
                }
                Ok(mix.covariates.dot(&mix.coefficients))
            }
        }
    }

    /// Mixture weights `w[n, k] = softmax_k(X[n, :] Γ)`.
    ///
    /// # Errors
    /// - [`HmmError::CovariateRowsMismatch`] when `X` does not have
    ///   `n_subjects` rows.
    /// - [`HmmError::NonFiniteWeights`] when a row of `X Γ` is not finite.
    pub fn mixture_weights(&self, n_subjects: usize) -> HmmResult<Array2<f64>> {
        let mut eta = self.linear_predictor(n_subjects)?;
        for (subject, mut row) in eta.rows_mut().into_iter().enumerate() {
            if row.iter().any(|v| !v.is_finite()) {
                return Err(HmmError::NonFiniteWeights { subject });
            }
            let w = safe_softmax(row.view());
            row.assign(&w);
        }
        Ok(eta)
    }

    /// `ln w[n, k]`, computed as a row-wise log-softmax of `X Γ`.
    ///
    /// # Errors
    /// - Same as [`Model::mixture_weights`].
    pub fn log_mixture_weights(&self, n_subjects: usize) -> HmmResult<Array2<f64>> {
        log_softmax_rows(self.linear_predictor(n_subjects)?)
    }

    /// Check that `data` matches the channels, alphabets, and covariate rows.
    pub fn check_data(&self, data: &SeqData) -> HmmResult<()> {
        let params = &self.clusters()[0];
        if params.n_channels() != data.n_channels() {
            return Err(HmmError::ChannelMismatch {
                expected: params.n_channels(),
                actual: data.n_channels(),
            });
        }
        if params.n_symbols() != data.n_symbols {
            return Err(HmmError::ClusterMismatch {
                cluster: 0,
                reason: "alphabet sizes differ from the observations",
            });
        }
        if let Model::Mixture(mix) = self {
            if mix.covariates.nrows() != data.n_subjects() {
                return Err(HmmError::CovariateRowsMismatch {
                    expected: data.n_subjects(),
                    actual: mix.covariates.nrows(),
                });
            }
        }
        Ok(())
    }
}

/// Row-wise `η − ln Σ exp(η)`; rows are subjects.
///
/// # Errors
/// - [`HmmError::NonFiniteWeights`] for the first row with a non-finite entry.
pub fn log_softmax_rows(mut eta: Array2<f64>) -> HmmResult<Array2<f64>> {
    for (subject, mut row) in eta.rows_mut().into_iter().enumerate() {
        if row.iter().any(|v| !v.is_finite()) {
            return Err(HmmError::NonFiniteWeights { subject });
        }
        let lse = log_sum_exp(row.view());
        row.mapv_inplace(|v| v - lse);
    }
    Ok(eta)
}
