//! optimization: likelihood maximization, parameter transforms, and the
//! optimizer error surface.
//!
//! Purpose
//! -------
//! Hold everything the HMM layer needs to move between probability tables
//! and an unconstrained parameter vector and to maximize a likelihood over
//! that vector.
//!
//! Key behaviors
//! -------------
//! - `loglik_optimizer`: L-BFGS through argmin, with finite-difference
//!   fallbacks and Hessians.
//! - `numerical_stability`: guarded softmax, logit, and softmax-Jacobian
//!   helpers shared by the parameter layout and the coefficient refit.
//! - `errors`: [`OptError`](errors::OptError) and conversions from argmin
//!   and HMM errors.
//!
//! Conventions
//! -----------
//! - Solvers maximize `ℓ(θ)` by minimizing `c(θ) = −ℓ(θ)`; reported values
//!   are always `ℓ`.
//! - Mapping θ to model tables happens in the HMM layout, not here.

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_seqhmm::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
