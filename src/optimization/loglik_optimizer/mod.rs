//! loglik_optimizer: argmin-backed maximization of log-likelihoods.
//!
//! Purpose
//! -------
//! Fit models by maximizing `ℓ(θ)` over an unconstrained vector θ. Models
//! implement [`LogLikelihood`] and call [`maximize`], which runs L-BFGS with
//! a More–Thuente or Hager–Zhang line search.
//!
//! Key behaviors
//! -------------
//! - [`adapter::ArgMinAdapter`] turns `ℓ(θ)` into the argmin cost `−ℓ(θ)`
//!   and falls back to finite differences when a model has no gradient.
//! - [`builders`] construct the solver from [`MLEOptions`]; [`run`] drives
//!   the executor and converts the final state into an [`OptimOutcome`].
//! - [`finite_diff`] also provides the Hessian used for standard errors.
//!
//! Conventions
//! -----------
//! - Values, gradients, and [`OptimOutcome::value`] are in log-likelihood
//!   terms. Only the adapter sees the cost.
//! - Failures are [`OptError`](crate::optimization::errors::OptError)
//!   values, never panics.
//!
//! Testing notes
//! -------------
//! - Each submodule tests its own concern on small quadratic models.
//! - The HMM gradient path is exercised end to end by the mixture HMM
//!   integration tests.

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Theta};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_seqhmm::optimization::loglik_optimizer::prelude::*;
//
// to import the main optimizer surface in a single line.

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
