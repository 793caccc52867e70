//! hmm: hidden Markov models and mixture HMMs for multichannel categorical
//! sequences.
//!
//! Purpose
//! -------
//! Provide the data containers, probability tables, inference recursions,
//! and estimation engines for HMMs whose hidden chain emits one categorical
//! symbol per channel and time point, optionally mixed over clusters with
//! covariate-dependent weights.
//!
//! Key behaviors
//! -------------
//! - `core`: validated inputs, scaled forward/backward, Viterbi, posterior
//!   tables, the θ layout, and simulation.
//! - `models`: EM, the analytic objective, and the [`SeqHmm`] driver.
//! - `errors`: [`HmmError`] for every failure in this module.
//!
//! Invariants & assumptions
//! ------------------------
//! - A single HMM is a mixture with one cluster and no coefficients.
//! - Missing observations carry the [`MISSING`] code and contribute a factor
//!   of 1 to emission probabilities.

pub mod core;
pub mod errors;
pub mod models;

// ---- Re-exports (primary public surface) ----------------------------------
//
// These are the types most users need. Recursions, tables, and layout
// internals remain under their submodules.

pub use self::core::{
    ClusterSelection, DecodeOptions, DecodedPath, EmOptions, FitMethod, HmmOptions, HmmParams,
    MISSING, MixtureParams, Model, ParamLayout, SeqData, Simulated, TieBreak, simulate,
};

pub use self::errors::{HmmError, HmmResult};

pub use self::models::{EmOutcome, HmmFit, MixtureObjective, ObjectiveEval, SeqHmm};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_seqhmm::hmm::prelude::*;
//
// to import the main HMM surface in a single line.

pub mod prelude {
    pub use super::{
        ClusterSelection, DecodeOptions, DecodedPath, EmOptions, EmOutcome, FitMethod, HmmError,
        HmmFit, HmmOptions, HmmParams, HmmResult, MISSING, MixtureParams, Model, SeqData, SeqHmm,
        Simulated, TieBreak, simulate,
    };
}
