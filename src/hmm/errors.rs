//! Errors for hidden Markov models (data validation, parameter checks,
//! engine failures, and optimizer failures).
//!
//! This module defines the model error type, [`HmmError`], used by data
//! containers, parameter constructors, the EM engine, and the fitting driver.
//! It implements `Display`/`Error` and converts to and from
//! [`OptError`](crate::optimization::errors::OptError) at the optimizer
//! boundary.
//!
//! ## Conventions
//! - **Indices are 0-based** (subject, time, channel, state, symbol).
//! - Missing observations are encoded by [`MISSING`](crate::hmm::core::data::MISSING)
//!   and are never reported as invalid symbols.
//! - Optimizer/backend errors raised while fitting are wrapped in
//!   [`HmmError::Optimization`]; model failures that crossed the optimizer
//!   come back as their own variant.
use crate::optimization::errors::OptError;

/// Crate-wide result alias for HMM operations that may produce [`HmmError`].
pub type HmmResult<T> = Result<T, HmmError>;

/// Unified error type for HMM modeling.
#[derive(Debug, Clone, PartialEq)]
pub enum HmmError {
    // ---- Input/data validation ----
    /// Observation tensor has a zero-length axis.
    EmptyData { subjects: usize, time: usize, channels: usize },

    /// Number of alphabet sizes does not match the number of channels.
    ChannelMismatch { expected: usize, actual: usize },

    /// Every channel needs at least one symbol.
    EmptyAlphabet { channel: usize },

    /// Observed code outside `[0, n_symbols)` that is not the missing sentinel.
    InvalidSymbol { subject: usize, time: usize, channel: usize, value: usize, n_symbols: usize },

    /// Covariate matrix rows do not match the number of subjects.
    CovariateRowsMismatch { expected: usize, actual: usize },

    /// Covariate entries must be finite.
    NonFiniteCovariate { row: usize, col: usize, value: f64 },

    // ---- Parameters ----
    /// A parameter block has the wrong dimensions.
    InvalidShape { name: &'static str, expected: (usize, usize), found: (usize, usize) },

    /// Probabilities must be finite and within `[0, 1]`.
    InvalidProbability { name: &'static str, row: usize, col: usize, value: f64 },

    /// Probability rows must sum to one.
    RowNotStochastic { name: &'static str, row: usize, sum: f64 },

    /// At least one state is required.
    NoStates,

    /// At least one channel is required.
    NoChannels,

    /// A mixture needs at least one cluster.
    EmptyMixture,

    /// Clusters disagree on the number of channels or alphabet sizes.
    ClusterMismatch { cluster: usize, reason: &'static str },

    /// Coefficient matrix must be `q × K`.
    CoefficientShape { expected: (usize, usize), found: (usize, usize) },

    /// Baseline column of the coefficients must be exactly zero.
    BaselineNotZero { row: usize, value: f64 },

    /// Coefficients must be finite.
    NonFiniteCoefficient { row: usize, col: usize, value: f64 },

    /// Free-parameter vector has the wrong length.
    ThetaLengthMismatch { expected: usize, actual: usize },

    /// Free-parameter vector entries must be finite.
    InvalidThetaInput { index: usize, value: f64 },

    // ---- Engine ----
    /// Observation sequence is impossible under the current parameters.
    ZeroLikelihood { subject: usize },

    /// Mixture weights overflowed for a subject.
    NonFiniteWeights { subject: usize },

    // ---- Options ----
    /// Iteration caps must be positive.
    InvalidMaxIter { max_iter: usize, reason: &'static str },

    /// Tolerances must be finite and positive.
    InvalidTolerance { name: &'static str, tol: f64, reason: &'static str },

    /// Unknown fitting method name.
    InvalidFitMethod { name: String },

    // ---- Estimation ----
    /// Model hasn't been fitted yet.
    ModelNotFitted,

    /// Optimizer failure during the gradient path.
    Optimization(OptError),
}

impl std::error::Error for HmmError {}

impl std::fmt::Display for HmmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Input/data validation ----
            HmmError::EmptyData { subjects, time, channels } => {
                write!(
                    f,
                    "Observation tensor must be non-empty, got {subjects} subjects × {time} time points × {channels} channels"
                )
            }
            HmmError::ChannelMismatch { expected, actual } => {
                write!(f, "Channel count mismatch: expected {expected}, got {actual}")
            }
            HmmError::EmptyAlphabet { channel } => {
                write!(f, "Channel {channel} must have at least one symbol")
            }
            HmmError::InvalidSymbol { subject, time, channel, value, n_symbols } => {
                write!(
                    f,
                    "Invalid symbol {value} for subject {subject}, time {time}, channel {channel}: expected a code in [0, {n_symbols}) or the missing sentinel"
                )
            }
            HmmError::CovariateRowsMismatch { expected, actual } => {
                write!(f, "Covariate rows mismatch: expected {expected}, got {actual}")
            }
            HmmError::NonFiniteCovariate { row, col, value } => {
                write!(f, "Covariate at ({row}, {col}) must be finite, got {value}")
            }

            // ---- Parameters ----
            HmmError::InvalidShape { name, expected, found } => {
                write!(f, "Invalid shape for {name}: expected {expected:?}, found {found:?}")
            }
            HmmError::InvalidProbability { name, row, col, value } => {
                write!(f, "Invalid probability in {name} at ({row}, {col}): {value}")
            }
            HmmError::RowNotStochastic { name, row, sum } => {
                write!(f, "Row {row} of {name} must sum to one, sums to {sum}")
            }
            HmmError::NoStates => write!(f, "Model must have at least one hidden state"),
            HmmError::NoChannels => write!(f, "Model must have at least one channel"),
            HmmError::EmptyMixture => write!(f, "Mixture must have at least one cluster"),
            HmmError::ClusterMismatch { cluster, reason } => {
                write!(f, "Cluster {cluster} is inconsistent with cluster 0: {reason}")
            }
            HmmError::CoefficientShape { expected, found } => {
                write!(f, "Coefficient shape mismatch: expected {expected:?}, found {found:?}")
            }
            HmmError::BaselineNotZero { row, value } => {
                write!(f, "Baseline coefficient at row {row} must be exactly zero, got {value}")
            }
            HmmError::NonFiniteCoefficient { row, col, value } => {
                write!(f, "Coefficient at ({row}, {col}) must be finite, got {value}")
            }
            HmmError::ThetaLengthMismatch { expected, actual } => {
                write!(f, "Theta length mismatch: expected {expected}, got {actual}")
            }
            HmmError::InvalidThetaInput { index, value } => {
                write!(f, "Theta input at index {index} must be finite, got {value}")
            }

            // ---- Engine ----
            HmmError::ZeroLikelihood { subject } => {
                write!(
                    f,
                    "Sequence of subject {subject} has zero likelihood under the current parameters"
                )
            }
            HmmError::NonFiniteWeights { subject } => {
                write!(f, "Mixture weights of subject {subject} are not finite")
            }

            // ---- Options ----
            HmmError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid maximum iterations {max_iter}: {reason}")
            }
            HmmError::InvalidTolerance { name, tol, reason } => {
                write!(f, "Invalid tolerance {name} = {tol}: {reason}")
            }
            HmmError::InvalidFitMethod { name } => {
                write!(
                    f,
                    "Invalid fit method '{name}': valid options are case insensitive 'em', 'gradient' or 'em_gradient'"
                )
            }

            // ---- Estimation ----
            HmmError::ModelNotFitted => write!(f, "Model hasn't been fitted yet."),
            HmmError::Optimization(err) => write!(f, "Optimization failed: {err}"),
        }
    }
}

impl From<OptError> for HmmError {
    fn from(err: OptError) -> HmmError {
        match err {
            OptError::ZeroLikelihood { subject } => HmmError::ZeroLikelihood { subject },
            OptError::NonFiniteWeights { subject } => HmmError::NonFiniteWeights { subject },
            OptError::ThetaLengthMismatch { expected, actual } => {
                HmmError::ThetaLengthMismatch { expected, actual }
            }
            OptError::InvalidThetaInput { index, value } => {
                HmmError::InvalidThetaInput { index, value }
            }
            other => HmmError::Optimization(other),
        }
    }
}
