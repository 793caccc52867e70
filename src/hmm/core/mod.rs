//! core: sequence data, HMM parameters, and the inference recursions.
//!
//! Purpose
//! -------
//! Collect the building blocks for (mixture) hidden Markov models over
//! multichannel categorical sequences: observation containers, probability
//! tables, the single/mixture model type, the scaled forward and backward
//! recursions, Viterbi decoding, posterior bookkeeping, the free-parameter
//! layout, and simulation. The estimation engines in `hmm::models` are
//! written entirely against these primitives.
//!
//! Key behaviors
//! -------------
//! - Hold validated observations ([`SeqData`]) with an explicit missing code
//!   ([`MISSING`]) and validated probability tables ([`HmmParams`]).
//! - Treat a single HMM as a one-cluster mixture through [`Model`], so every
//!   recursion is implemented once.
//! - Combine channels by multiplying per-channel emission probabilities
//!   ([`emission_matrix`]); a missing channel contributes a factor of 1.
//! - Run scaled forward/backward passes ([`forward`], [`backward`]) and
//!   log-domain Viterbi ([`viterbi`], [`decode_subject`]).
//! - Produce per-subject responsibilities and responsibility-weighted
//!   tables of expected counts or raw derivatives ([`subject_pass`],
//!   [`ClusterTables`]).
//! - Map models to and from the unconstrained vector θ ([`ParamLayout`]).
//!
//! Invariants & assumptions
//! ------------------------
//! - Probability rows sum to one within [`ROW_SUM_TOL`]; the recursions only
//!   re-check this in debug builds.
//! - Structural zeros are fixed by the starting values and never become
//!   positive through [`ParamLayout::apply_theta`].
//! - All clusters of a mixture share channels and alphabet sizes.
//!
//! Conventions
//! -----------
//! - Indexing is 0-based. Observations are `N × T × C`; per-subject views
//!   are `T × C`; forward/backward matrices are `m × T`.
//! - This module performs no logging; engines in `hmm::models` log.
//!
//! Downstream usage
//! ----------------
//! - `hmm::models::em` runs [`subject_pass`] per subject and normalizes the
//!   reduced [`ClusterTables`].
//! - `hmm::models::objective` uses the same passes with
//!   [`ClusterTables::accumulate_derivs`] and [`ParamLayout::gradient`].
//!
//! Testing notes
//! -------------
//! - Unit tests in each submodule compare against hand computations and
//!   brute-force enumeration over all state paths; `posterior` carries a
//!   property test over random models.

pub mod backward;
pub mod data;
pub mod emission;
pub mod forward;
pub mod layout;
pub mod model;
pub mod options;
pub mod params;
pub mod posterior;
pub mod simulate;
pub mod validation;
pub mod viterbi;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::backward::{backward, backward_from_emissions};
pub use self::data::{MISSING, SeqData};
pub use self::emission::{emission_matrix, emission_prob, log_emission_matrix};
pub use self::forward::{ForwardPass, forward, forward_from_emissions};
pub use self::layout::{BlockKind, ParamLayout, ProbBlock, RowLayout};
pub use self::model::{MixtureParams, Model, log_softmax_rows};
pub use self::options::{
    ClusterSelection, DecodeOptions, EmOptions, FitMethod, HmmOptions, TieBreak,
};
pub use self::params::HmmParams;
pub use self::posterior::{
    Accumulate, ClusterPass, ClusterTables, SubjectPass, Sweep, reduce_tables, subject_pass, sweep,
};
pub use self::simulate::{Simulated, simulate};
pub use self::validation::{ROW_SUM_TOL, validate_theta};
pub use self::viterbi::{DecodedPath, ViterbiPath, decode_subject, viterbi};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_seqhmm::hmm::core::prelude::*;
//
// to import the main HMM core surface in a single line.

pub mod prelude {
    pub use super::data::{MISSING, SeqData};
    pub use super::model::{MixtureParams, Model};
    pub use super::options::{
        ClusterSelection, DecodeOptions, EmOptions, FitMethod, HmmOptions, TieBreak,
    };
    pub use super::params::HmmParams;
    pub use super::simulate::{Simulated, simulate};
    pub use super::viterbi::{DecodedPath, ViterbiPath};
}
