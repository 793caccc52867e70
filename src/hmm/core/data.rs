//! Observation container for multichannel categorical sequences.
//!
//! Purpose
//! -------
//! Provide a validated, read-only container for the observation tensor
//! consumed by every engine (forward, backward, Viterbi, EM, gradient).
//!
//! Key behaviors
//! -------------
//! - [`SeqData`] stores `obs[N][T][C]` as an `Array3<usize>` with axis order
//!   (subject, time, channel) together with the alphabet size of each
//!   channel.
//! - Codes are validated once at construction; engines index emission
//!   matrices without further checks.
//!
//! Invariants & assumptions
//! ------------------------
//! - `N, T, C ≥ 1`, `n_symbols.len() == C`, every `n_symbols[r] ≥ 1`.
//! - Every entry is either in `[0, n_symbols[r])` or equal to [`MISSING`].
//! - All subjects share the same length `T` (sequences are pre-padded).
//!
//! Conventions
//! -----------
//! - A missing observation contributes a factor of 1 to the joint emission
//!   probability; see `hmm::core::emission`.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the happy path, empty axes, alphabet mismatches, and
//!   out-of-range codes. Missing codes are accepted.
use crate::hmm::errors::{HmmError, HmmResult};
use ndarray::{Array3, ArrayView2};

/// Reserved code for a missing observation.
pub const MISSING: usize = usize::MAX;

#[derive(Debug, Clone, PartialEq)]
pub struct SeqData {
    pub obs: Array3<usize>,
    pub n_symbols: Vec<usize>,
}

impl SeqData {
    /// Validate and wrap an observation tensor.
    ///
    /// # Errors
    /// - [`HmmError::EmptyData`] if any axis has length zero.
    /// - [`HmmError::ChannelMismatch`] if `n_symbols.len()` differs from the
    ///   channel axis.
    /// - [`HmmError::EmptyAlphabet`] for a channel with zero symbols.
    /// - [`HmmError::InvalidSymbol`] for a code that is out of range and not
    ///   [`MISSING`].
    pub fn new(obs: Array3<usize>, n_symbols: Vec<usize>) -> HmmResult<Self> {
        let (subjects, time, channels) = obs.dim();
        if subjects == 0 || time == 0 || channels == 0 {
            return Err(HmmError::EmptyData { subjects, time, channels });
        }
        if n_symbols.len() != channels {
            return Err(HmmError::ChannelMismatch { expected: channels, actual: n_symbols.len() });
        }
        if let Some(channel) = n_symbols.iter().position(|&s| s == 0) {
            return Err(HmmError::EmptyAlphabet { channel });
        }
        for ((subject, time, channel), &value) in obs.indexed_iter() {
            if value != MISSING && value >= n_symbols[channel] {
                return Err(HmmError::InvalidSymbol {
                    subject,
                    time,
                    channel,
                    value,
                    n_symbols: n_symbols[channel],
                });
            }
        }
        Ok(SeqData { obs, n_symbols })
    }

    pub fn n_subjects(&self) -> usize {
        self.obs.dim().0
    }

    pub fn n_time(&self) -> usize {
        self.obs.dim().1
    }

    pub fn n_channels(&self) -> usize {
        self.obs.dim().2
    }

    /// `T × C` view of one subject's observations.
    pub fn subject(&self, n: usize) -> ArrayView2<'_, usize> {
        self.obs.index_axis(ndarray::Axis(0), n)
    }

    /// Number of non-missing observations across the tensor.
    pub fn n_observed(&self) -> usize {
        self.obs.iter().filter(|&&v| v != MISSING).count()
    }
}
