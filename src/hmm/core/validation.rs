//! Validation helpers for HMM parameters and free-parameter vectors.
//!
//! - **Probability blocks**: [`validate_prob_matrix`] and
//!   [`validate_prob_vector`] check shape, entry range, and row sums.
//! - **Free-parameter vectors**: [`validate_theta`] checks length and
//!   finiteness before a θ is unpacked into a model.
//! - **Engine entry**: [`debug_assert_stochastic`] re-checks row sums in debug
//!   builds only; release builds trust the constructors.
use crate::hmm::{
    core::params::HmmParams,
    errors::{HmmError, HmmResult},
};
use ndarray::{ArrayView1, ArrayView2};

/// Tolerance on `|Σ_j p_j − 1|` for a probability row.
pub const ROW_SUM_TOL: f64 = 1e-8;

pub fn validate_prob_matrix(
    name: &'static str, mat: ArrayView2<f64>, expected: (usize, usize),
) -> HmmResult<()> {
    if mat.dim() != expected {
        return Err(HmmError::InvalidShape { name, expected, found: mat.dim() });
    }
    for (row, values) in mat.rows().into_iter().enumerate() {
        check_row(name, row, values)?;
    }
    Ok(())
}

pub fn validate_prob_vector(name: &'static str, v: ArrayView1<f64>, len: usize) -> HmmResult<()> {
    if v.len() != len {
        return Err(HmmError::InvalidShape { name, expected: (1, len), found: (1, v.len()) });
    }
    check_row(name, 0, v)
}

pub fn validate_theta(theta: ArrayView1<f64>, expected: usize) -> HmmResult<()> {
    if theta.len() != expected {
        return Err(HmmError::ThetaLengthMismatch { expected, actual: theta.len() });
    }
    for (index, &value) in theta.iter().enumerate() {
        if !value.is_finite() {
            return Err(HmmError::InvalidThetaInput { index, value });
        }
    }
    Ok(())
}

/// Debug-build check that every row of `params` is stochastic.
pub fn debug_assert_stochastic(params: &HmmParams) {
    if cfg!(debug_assertions) {
        let near_one = |s: f64| (s - 1.0).abs() <= 1e-6;
        debug_assert!(params.transition.rows().into_iter().all(|r| near_one(r.sum())));
        debug_assert!(near_one(params.initial.sum()));
        for emission in &params.emissions {
            debug_assert!(emission.rows().into_iter().all(|r| near_one(r.sum())));
        }
    }
}

// ---- Helper methods ----

fn check_row(name: &'static str, row: usize, values: ArrayView1<f64>) -> HmmResult<()> {
    for (col, &value) in values.iter().enumerate() {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(HmmError::InvalidProbability { name, row, col, value });
        }
    }
    let sum = values.sum();
    if (sum - 1.0).abs() > ROW_SUM_TOL {
        return Err(HmmError::RowNotStochastic { name, row, sum });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn validate_prob_matrix_accepts_stochastic_rows() {
        let a = array![[0.9, 0.1], [0.0, 1.0]];
        assert!(validate_prob_matrix("transition", a.view(), (2, 2)).is_ok());
    }

    #[test]
    fn validate_prob_matrix_rejects_wrong_shape() {
        let a = array![[0.9, 0.1]];
        let err = validate_prob_matrix("transition", a.view(), (2, 2)).unwrap_err();
        assert_eq!(err, HmmError::InvalidShape { name: "transition", expected: (2, 2), found: (1, 2) });
    }

    #[test]
    fn validate_prob_matrix_rejects_row_not_summing_to_one() {
        let a = array![[0.9, 0.1], [0.5, 0.4]];
        match validate_prob_matrix("transition", a.view(), (2, 2)) {
            Err(HmmError::RowNotStochastic { row: 1, .. }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn validate_prob_vector_rejects_negative_entry() {
        let p = array![1.2, -0.2];
        match validate_prob_vector("initial", p.view(), 2) {
            Err(HmmError::InvalidProbability { col: 0, .. }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn validate_theta_rejects_length_and_non_finite_inputs() {
        let theta = array![0.0, f64::NAN];
        assert_eq!(
            validate_theta(theta.view(), 3).unwrap_err(),
            HmmError::ThetaLengthMismatch { expected: 3, actual: 2 }
        );
        match validate_theta(theta.view(), 2) {
            Err(HmmError::InvalidThetaInput { index: 1, .. }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
