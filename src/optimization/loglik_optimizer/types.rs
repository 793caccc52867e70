//! loglik_optimizer::types: numeric aliases and pre-wired L-BFGS solvers.
//!
//! Every vector handed to or returned by the optimizer is an
//! `ndarray::Array1<f64>` of length `n_params`; for HMMs this is the free
//! logit/coefficient vector θ produced by `ParamLayout`. Keeping the aliases
//! here lets the adapter, builders, and runner name one set of types.
use argmin::solver::{
    linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
    quasinewton::LBFGS,
};
use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Unconstrained parameter vector θ.
pub type Theta = Array1<f64>;

/// Gradient with the same length as [`Theta`].
pub type Grad = Array1<f64>;

/// Dense `n × n` matrix of second derivatives.
pub type Hessian = Array2<f64>;

/// Scalar minimized by argmin, `c(θ) = −ℓ(θ)`.
pub type Cost = f64;

/// Function-evaluation counters keyed by argmin's counter names.
pub type FnEvalMap = HashMap<String, u64>;

/// L-BFGS history length used when `MLEOptions::lbfgs_mem` is `None`.
pub const DEFAULT_LBFGS_MEM: usize = 7;

pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;
pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;
pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Theta, Grad, Cost>;
pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;
