//! models: estimation engines built on the HMM core.
//!
//! Purpose
//! -------
//! Turn the recursions in `hmm::core` into fitted models: EM with a
//! multinomial-logit coefficient refit, the negative log-likelihood with its
//! analytic gradient over θ, and the [`SeqHmm`] driver that ties both to
//! L-BFGS, decoding, and standard errors.
//!
//! Key behaviors
//! -------------
//! - [`run_em`] updates a [`Model`](crate::hmm::core::Model) in place and
//!   reports the log-likelihood history.
//! - [`MixtureObjective`] evaluates `−ℓ(θ)` and `−∇ℓ(θ)`, returning a
//!   sentinel pair when the mixture weights overflow.
//! - [`refit_coefficients`] maximizes the responsibility-weighted
//!   multinomial-logit likelihood by damped Newton steps.
//! - [`SeqHmm`] implements
//!   [`LogLikelihood`](crate::optimization::loglik_optimizer::LogLikelihood)
//!   so it can be passed to `maximize` directly.
//!
//! Conventions
//! -----------
//! - Engines log through `tracing`: per-iteration detail at `debug`, run
//!   summaries at `info`, recoverable anomalies at `warn`.
//!
//! Testing notes
//! -------------
//! - Unit tests compare gradients with `finitediff` central differences and
//!   check EM monotonicity on simulated data.
//! - `tests/integration_mhmm_pipeline.rs` runs simulate → fit → decode →
//!   standard errors through the public API.

pub mod em;
pub mod mixture_coef;
pub mod objective;
pub mod seq_hmm;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::em::{EmOutcome, REL_EPS, run_em};
pub use self::mixture_coef::{CoefRefit, coefficient_score, refit_coefficients, weighted_log_lik};
pub use self::objective::{MixtureObjective, ObjectiveEval, model_log_likelihood};
pub use self::seq_hmm::{HmmFit, SeqHmm};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_seqhmm::hmm::models::prelude::*;
//
// to import the main estimation surface in a single line.

pub mod prelude {
    pub use super::em::EmOutcome;
    pub use super::objective::{MixtureObjective, ObjectiveEval};
    pub use super::seq_hmm::{HmmFit, SeqHmm};
}
