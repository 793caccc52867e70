//! Probability tables of a single hidden Markov model.
//!
//! [`HmmParams`] owns the transition matrix `A` (`m × m`), one emission
//! matrix `B_r` (`m × s_r`) per channel, and the initial distribution `π`
//! (length `m`). All blocks are row-stochastic. Entries that are exactly
//! zero in the values passed to [`HmmParams::new`] are structural zeros;
//! the free-parameter layout records them once and every estimation path
//! keeps them at zero.
use crate::hmm::{
    core::validation::{validate_prob_matrix, validate_prob_vector},
    errors::{HmmError, HmmResult},
};
use ndarray::{Array1, Array2};

#[derive(Debug, Clone, PartialEq)]
pub struct HmmParams {
    pub transition: Array2<f64>,
    pub emissions: Vec<Array2<f64>>,
    pub initial: Array1<f64>,
}

impl HmmParams {
    /// Validate and assemble one model's probability tables.
    ///
    /// # Errors
    /// - [`HmmError::NoStates`] / [`HmmError::NoChannels`] for empty inputs.
    /// - [`HmmError::InvalidShape`] when a block disagrees with `m`.
    /// - [`HmmError::InvalidProbability`] / [`HmmError::RowNotStochastic`]
    ///   for entries outside `[0, 1]` or rows not summing to one.
    pub fn new(
        transition: Array2<f64>, emissions: Vec<Array2<f64>>, initial: Array1<f64>,
    ) -> HmmResult<Self> {
        let m = initial.len();
        if m == 0 {
            return Err(HmmError::NoStates);
        }
        if emissions.is_empty() {
            return Err(HmmError::NoChannels);
        }
        validate_prob_vector("initial", initial.view(), m)?;
        validate_prob_matrix("transition", transition.view(), (m, m))?;
        for emission in &emissions {
            let s = emission.ncols();
            if s == 0 {
                return Err(HmmError::InvalidShape {
                    name: "emission",
                    expected: (m, 1),
                    found: emission.dim(),
                });
            }
            validate_prob_matrix("emission", emission.view(), (m, s))?;
        }
        Ok(HmmParams { transition, emissions, initial })
    }

    pub fn n_states(&self) -> usize {
        self.initial.len()
    }

    pub fn n_channels(&self) -> usize {
        self.emissions.len()
    }

    pub fn n_symbols(&self) -> Vec<usize> {
        self.emissions.iter().map(|b| b.ncols()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn hmm_params_new_accepts_structural_zeros() {
        let params = HmmParams::new(
            array![[0.9, 0.1], [0.0, 1.0]],
            vec![array![[1.0, 0.0], [0.3, 0.7]], array![[0.5, 0.25, 0.25], [0.1, 0.1, 0.8]]],
            array![1.0, 0.0],
        )
        .expect("valid parameters");
        assert_eq!(params.n_states(), 2);
        assert_eq!(params.n_channels(), 2);
        assert_eq!(params.n_symbols(), vec![2, 3]);
    }

    #[test]
    fn hmm_params_new_rejects_emission_row_mismatch() {
        let err = HmmParams::new(
            array![[0.9, 0.1], [0.2, 0.8]],
            vec![array![[1.0, 0.0]]],
            array![0.5, 0.5],
        )
        .unwrap_err();
        assert_eq!(err, HmmError::InvalidShape { name: "emission", expected: (2, 2), found: (1, 2) });
    }

    #[test]
    fn hmm_params_new_rejects_missing_channels() {
        let err = HmmParams::new(array![[1.0]], vec![], array![1.0]).unwrap_err();
        assert_eq!(err, HmmError::NoChannels);
    }
}
