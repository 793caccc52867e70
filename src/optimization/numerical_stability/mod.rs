//! numerical_stability: guarded transforms between probability rows and
//! unconstrained logits.
//!
//! Purpose
//! -------
//! Collect the small numeric primitives the HMM layout uses to map
//! row-stochastic blocks into an unconstrained parameter vector and back,
//! plus the softmax Jacobian used by analytic gradients.
//!
//! Key behaviors
//! -------------
//! - Stable softmax with exact zeros for `-∞` logits.
//! - Softmax Jacobian-vector product `(diag(p) − p pᵀ) g`.
//! - Floored log-ratios for packing probabilities into logits.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to the implementations in `transformations`.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    EIGEN_EPS, LOGIT_EPS, safe_logit, safe_softmax, safe_softmax_deriv,
};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_seqhmm::optimization::numerical_stability::prelude::*;
//
// to import the main numerical-stability surface in a single line.

pub mod prelude {
    pub use super::transformations::{
        EIGEN_EPS, LOGIT_EPS, safe_logit, safe_softmax, safe_softmax_deriv,
    };
}
