//! Optimizer error surface.
//!
//! [`OptError`] covers option validation, gradient and Hessian checks, and
//! failures reported by argmin. HMM failures that surface while the solver
//! evaluates θ are carried across with their subject index so that
//! [`HmmError`] can be rebuilt on the way out.
use argmin::core::{ArgminError, Error};

use crate::hmm::errors::HmmError;

/// Result alias for optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Gradient ----
    /// The objective has no analytic gradient; finite differences are used.
    GradientNotImplemented,

    GradientDimMismatch {
        expected: usize,
        found: usize,
    },

    InvalidGradient {
        index: usize,
        value: f64,
        reason: &'static str,
    },

    // ---- Options ----
    InvalidTolGrad {
        tol: f64,
        reason: &'static str,
    },
    InvalidTolCost {
        tol: f64,
        reason: &'static str,
    },
    InvalidMaxIter {
        max_iter: usize,
        reason: &'static str,
    },
    /// Neither a tolerance nor an iteration cap was given.
    NoTolerancesProvided,
    InvalidLineSearch {
        name: String,
        reason: &'static str,
    },
    InvalidLBFGSMem {
        mem: usize,
        reason: &'static str,
    },

    // ---- Solver ----
    NonFiniteCost {
        value: f64,
    },
    InvalidThetaHat {
        index: usize,
        value: f64,
        reason: &'static str,
    },
    /// L-BFGS stopped without a best parameter vector.
    MissingThetaHat,
    /// Failure raised inside argmin; `kind` names the argmin error class.
    Solver {
        kind: &'static str,
        text: String,
    },

    // ---- Hessian ----
    HessianDimMismatch {
        expected: usize,
        found: (usize, usize),
    },
    InvalidHessian {
        row: usize,
        col: usize,
        value: f64,
    },

    // ---- Model ----
    ZeroLikelihood {
        subject: usize,
    },
    NonFiniteWeights {
        subject: usize,
    },
    ThetaLengthMismatch {
        expected: usize,
        actual: usize,
    },
    InvalidThetaInput {
        index: usize,
        value: f64,
    },
    /// Any other HMM failure, as text.
    ModelError {
        text: String,
    },
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptError::GradientNotImplemented => write!(f, "No analytic gradient available"),
            OptError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient has {found} entries, θ has {expected}")
            }
            OptError::InvalidGradient { index, value, reason } => {
                write!(f, "Gradient entry {index} is {value}: {reason}")
            }

            OptError::InvalidTolGrad { tol, reason } => {
                write!(f, "tol_grad = {tol} rejected: {reason}")
            }
            OptError::InvalidTolCost { tol, reason } => {
                write!(f, "tol_cost = {tol} rejected: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "max_iter = {max_iter} rejected: {reason}")
            }
            OptError::NoTolerancesProvided => {
                write!(f, "At least one stopping rule must be set")
            }
            OptError::InvalidLineSearch { name, reason } => {
                write!(f, "Unknown line search '{name}': {reason}")
            }
            OptError::InvalidLBFGSMem { mem, reason } => {
                write!(f, "L-BFGS history length {mem} rejected: {reason}")
            }

            OptError::NonFiniteCost { value } => write!(f, "Objective evaluated to {value}"),
            OptError::InvalidThetaHat { index, value, reason } => {
                write!(f, "Estimate θ̂[{index}] = {value}: {reason}")
            }
            OptError::MissingThetaHat => write!(f, "L-BFGS returned no best parameter vector"),
            OptError::Solver { kind, text } => write!(f, "argmin ({kind}): {text}"),

            OptError::HessianDimMismatch { expected, found } => {
                write!(f, "Hessian has shape {found:?}, expected ({expected}, {expected})")
            }
            OptError::InvalidHessian { row, col, value } => {
                write!(f, "Hessian entry ({row}, {col}) is {value}")
            }

            OptError::ZeroLikelihood { subject } => {
                write!(f, "Subject {subject} has zero likelihood at the candidate θ")
            }
            OptError::NonFiniteWeights { subject } => {
                write!(f, "Mixture weights of subject {subject} are not finite")
            }
            OptError::ThetaLengthMismatch { expected, actual } => {
                write!(f, "θ has {actual} entries, the layout expects {expected}")
            }
            OptError::InvalidThetaInput { index, value } => {
                write!(f, "θ[{index}] = {value} is not finite")
            }
            OptError::ModelError { text } => write!(f, "{text}"),
        }
    }
}

impl From<Error> for OptError {
    fn from(err: Error) -> Self {
        let err = match err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        match err.downcast::<ArgminError>() {
            Ok(argmin_err) => {
                let kind = match &argmin_err {
                    ArgminError::InvalidParameter { .. } => "invalid parameter",
                    ArgminError::NotImplemented { .. } => "not implemented",
                    ArgminError::NotInitialized { .. } => "not initialized",
                    ArgminError::ConditionViolated { .. } => "condition violated",
                    ArgminError::CheckpointNotFound { .. } => "checkpoint not found",
                    ArgminError::PotentialBug { .. } => "potential bug",
                    ArgminError::ImpossibleError { .. } => "impossible",
                    _ => "other",
                };
                let text = match argmin_err {
                    ArgminError::InvalidParameter { text }
                    | ArgminError::NotImplemented { text }
                    | ArgminError::NotInitialized { text }
                    | ArgminError::ConditionViolated { text }
                    | ArgminError::CheckpointNotFound { text }
                    | ArgminError::PotentialBug { text }
                    | ArgminError::ImpossibleError { text } => text,
                    other => other.to_string(),
                };
                OptError::Solver { kind, text }
            }
            Err(err) => OptError::Solver { kind: "backend", text: err.to_string() },
        }
    }
}

impl From<HmmError> for OptError {
    fn from(err: HmmError) -> Self {
        match err {
            HmmError::ZeroLikelihood { subject } => OptError::ZeroLikelihood { subject },
            HmmError::NonFiniteWeights { subject } => OptError::NonFiniteWeights { subject },
            HmmError::ThetaLengthMismatch { expected, actual } => {
                OptError::ThetaLengthMismatch { expected, actual }
            }
            HmmError::InvalidThetaInput { index, value } => {
                OptError::InvalidThetaInput { index, value }
            }
            HmmError::Optimization(opt_err) => opt_err,
            other => OptError::ModelError { text: other.to_string() },
        }
    }
}
