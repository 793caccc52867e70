//! Configuration for HMM estimation and decoding.
//!
//! Purpose
//! -------
//! Enumerate every recognized option with its default in one place: EM
//! stopping rules, the coefficient refit inside the M-step, Viterbi tie
//! breaking and mixture cluster selection, the fitting method, and the
//! L-BFGS options used by the gradient path.
//!
//! Key behaviors
//! -------------
//! - [`EmOptions::new`] validates iteration caps and tolerances and returns
//!   typed errors instead of panicking.
//! - [`FitMethod`] parses from case-insensitive strings.
//! - Every struct implements `Default`.
//!
//! Downstream usage
//! ----------------
//! - `SeqHmm::new` takes an [`HmmOptions`]; the EM engine reads
//!   [`EmOptions`]; decoding reads [`DecodeOptions`].
use crate::{
    hmm::errors::{HmmError, HmmResult},
    optimization::loglik_optimizer::MLEOptions,
};
use std::str::FromStr;

/// Stopping rules for the EM loop and its coefficient refit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmOptions {
    /// Maximum number of EM iterations (M-steps).
    pub max_iter: usize,
    /// Relative log-likelihood change below which EM stops.
    pub tol: f64,
    /// Relative decrease tolerated before a step is reported as non-monotone.
    pub monotone_tol: f64,
    /// Maximum Newton steps of the coefficient refit per M-step.
    pub coef_max_iter: usize,
    /// Step-size and objective-change tolerance of the coefficient refit.
    pub coef_tol: f64,
}

impl EmOptions {
    pub fn new(
        max_iter: usize, tol: f64, monotone_tol: f64, coef_max_iter: usize, coef_tol: f64,
    ) -> HmmResult<Self> {
        verify_max_iter(max_iter)?;
        verify_max_iter(coef_max_iter)?;
        verify_tol("tol", tol)?;
        verify_tol("monotone_tol", monotone_tol)?;
        verify_tol("coef_tol", coef_tol)?;
        Ok(EmOptions { max_iter, tol, monotone_tol, coef_max_iter, coef_tol })
    }
}

impl Default for EmOptions {
    fn default() -> Self {
        EmOptions {
            max_iter: 1000,
            tol: 1e-10,
            monotone_tol: 1e-8,
            coef_max_iter: 25,
            coef_tol: 1e-8,
        }
    }
}

/// Rule for equal scores in the Viterbi maximization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Keep the lowest state index among tied candidates.
    #[default]
    LowestIndex,
    /// Keep the highest state index among tied candidates.
    HighestIndex,
}

/// How a mixture picks the cluster whose Viterbi path is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClusterSelection {
    /// Cluster with the largest mixture-weighted sequence likelihood `w_k L_k`.
    #[default]
    MaxPosterior,
    /// Cluster with the largest joint probability `w_k · max_path P(path, o)`.
    MaxJointPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    pub tie_break: TieBreak,
    pub cluster_selection: ClusterSelection,
}

/// Estimation path used by `SeqHmm::fit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitMethod {
    /// EM only.
    #[default]
    Em,
    /// L-BFGS on the analytic gradient only.
    Gradient,
    /// EM, then L-BFGS refinement from the EM estimate.
    EmThenGradient,
}

impl FromStr for FitMethod {
    type Err = HmmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "em" => Ok(FitMethod::Em),
            "gradient" | "mle" => Ok(FitMethod::Gradient),
            "em_gradient" | "em+gradient" => Ok(FitMethod::EmThenGradient),
            _ => Err(HmmError::InvalidFitMethod { name: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HmmOptions {
    pub method: FitMethod,
    pub em: EmOptions,
    pub mle: MLEOptions,
    pub decode: DecodeOptions,
}

impl HmmOptions {
    pub fn new(method: FitMethod, em: EmOptions, mle: MLEOptions, decode: DecodeOptions) -> Self {
        HmmOptions { method, em, mle, decode }
    }
}

// ---- Helper methods ----

fn verify_max_iter(max_iter: usize) -> HmmResult<()> {
    if max_iter == 0 {
        return Err(HmmError::InvalidMaxIter {
            max_iter,
            reason: "Maximum iterations must be greater than zero.",
        });
    }
    Ok(())
}

fn verify_tol(name: &'static str, tol: f64) -> HmmResult<()> {
    if !tol.is_finite() {
        return Err(HmmError::InvalidTolerance { name, tol, reason: "Tolerance must be finite." });
    }
    if tol <= 0.0 {
        return Err(HmmError::InvalidTolerance {
            name,
            tol,
            reason: "Tolerance must be positive.",
        });
    }
    Ok(())
}
