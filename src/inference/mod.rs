//! inference: uncertainty quantification for fitted models.
//!
//! Purpose
//! -------
//! Provide covariance matrices and standard errors at a fitted parameter
//! vector from the observed information, using finite-difference Hessians
//! of the analytic gradient.
//!
//! Key behaviors
//! -------------
//! - [`calc_covariance`]: eigen pseudoinverse of `−∇²ℓ(θ̂)`.
//! - [`calc_standard_errors`]: square roots of its diagonal.
//!
//! Downstream usage
//! ----------------
//! - `SeqHmm::standard_errors` and `SeqHmm::coef_standard_errors` call
//!   these with the mixture objective's gradient.

pub mod hessian;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::hessian::{calc_covariance, calc_standard_errors};

pub mod prelude {
    pub use super::hessian::{calc_covariance, calc_standard_errors};
}
