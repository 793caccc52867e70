//! rust_seqhmm: hidden Markov models and mixture HMMs for multichannel
//! categorical sequences.
//!
//! Purpose
//! -------
//! Serve as the crate root. The crate fits (mixture) hidden Markov models to
//! panels of categorical sequences observed on one or more channels, with
//! cluster membership driven by subject-level covariates through a
//! multinomial logit.
//!
//! Key behaviors
//! -------------
//! - `hmm`: data containers, probability tables, scaled forward/backward
//!   passes, Viterbi decoding, EM, the analytic log-likelihood gradient, and
//!   the [`SeqHmm`](hmm::SeqHmm) driver.
//! - `optimization`: L-BFGS maximization through argmin, softmax/logit
//!   transforms, and the optimizer error type.
//! - `inference`: observed-information covariance and standard errors.
//! - `utils`: log-domain helpers and the per-subject map that runs in
//!   parallel under the `parallel` feature.
//!
//! Invariants & assumptions
//! ------------------------
//! - Probability tables are row-stochastic; zeros in the starting values are
//!   structural and stay zero through every fit.
//! - Subjects are independent given the parameters, so per-subject work can
//!   run in any order; reductions are performed in subject order.
//!
//! Conventions
//! -----------
//! - Indexing is 0-based. Observations are `N × T × C` arrays of symbol
//!   codes with [`MISSING`](hmm::MISSING) marking a missing entry.
//! - Reported objective values are log-likelihoods `ℓ`; solvers minimize
//!   `−ℓ` internally.
//! - Logging goes through `tracing`; the crate installs no subscriber.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each module; end-to-end pipelines are in
//!   `tests/integration_mhmm_pipeline.rs`.

pub mod hmm;
pub mod inference;
pub mod optimization;
pub mod utils;
