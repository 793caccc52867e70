//! Numerical stability utilities for simplex parameterizations.
//!
//! Probability rows (transition rows, emission rows, initial distributions)
//! are optimized in an unconstrained logit space relative to a reference
//! entry whose logit is pinned at zero. The helpers here map between the two
//! spaces without overflow and push gradients through the softmax Jacobian.
//!
//! # Provided items
//! - [`LOGIT_EPS`]: floor applied to probabilities before taking log-ratios.
//! - [`EIGEN_EPS`]: eigenvalue cutoff for pseudoinverses.
//! - [`safe_softmax`]: max-shifted softmax; `-∞` logits map to exactly 0.
//! - [`safe_softmax_deriv`]: applies `(diag(p) − p pᵀ)` to a gradient.
//! - [`safe_logit`]: log-ratio `ln(p / p_ref)` with both sides floored.

/// Floor for probabilities entering a log-ratio.
///
/// An entry that underflowed to zero during EM but is not a structural zero
/// would otherwise map to a `-∞` logit.
pub const LOGIT_EPS: f64 = 1e-12;

/// Eigenvalues at or below this value are treated as zero.
pub const EIGEN_EPS: f64 = 1e-10;

/// Numerically stable softmax over a logit vector.
///
/// Subtracts the maximum finite logit before exponentiating, so large
/// logits never overflow. Entries equal to `-∞` receive probability exactly
/// zero, which is how structural zeros are kept out of a row.
///
/// # Parameters
/// - `logits`: real inputs; at least one entry must be finite.
///
/// # Returns
/// - Probabilities summing to one.
pub fn safe_softmax(logits: ndarray::ArrayView1<f64>) -> ndarray::Array1<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut out = logits.mapv(|l| if l == f64::NEG_INFINITY { 0.0 } else { (l - max).exp() });
    let total = out.sum();
    out /= total;
    out
}

/// Chain rule through the softmax: returns `(diag(p) − p pᵀ) g`.
///
/// For `p = softmax(θ)`, `∂p_j/∂θ_l = p_j (δ_jl − p_l)`, hence
/// `∂f/∂θ_l = p_l (g_l − Σ_j p_j g_j)` where `g = ∂f/∂p`. The matrix is
/// symmetric, so no transpose is needed.
pub fn safe_softmax_deriv(
    p: ndarray::ArrayView1<f64>, g: ndarray::ArrayView1<f64>,
) -> ndarray::Array1<f64> {
    let weighted = p.dot(&g);
    ndarray::Zip::from(&p).and(&g).map_collect(|&pl, &gl| pl * (gl - weighted))
}

/// Log-ratio of a probability against the row's reference probability.
pub fn safe_logit(p: f64, p_ref: f64) -> f64 {
    p.max(LOGIT_EPS).ln() - p_ref.max(LOGIT_EPS).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Softmax normalization, overflow safety, and -∞ handling.
    // - The softmax Jacobian product against a finite-difference check.
    // - Logit/softmax round trip for a reference-pinned row.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Ensure `safe_softmax` does not overflow for very large logits and
    // assigns zero mass to -∞ entries.
    //
    // Given
    // -----
    // - Logits [1000, 1000, -∞].
    //
    // Expect
    // ------
    // - Probabilities [0.5, 0.5, 0.0].
    fn safe_softmax_handles_large_and_negative_infinite_logits() {
        // Arrange
        let logits = array![1000.0, 1000.0, f64::NEG_INFINITY];

        // Act
        let p = safe_softmax(logits.view());

        // Assert
        assert!((p[0] - 0.5).abs() < 1e-15);
        assert!((p[1] - 0.5).abs() < 1e-15);
        assert_eq!(p[2], 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Verify `safe_softmax_deriv` against central differences of a linear
    // functional f(θ) = cᵀ softmax(θ).
    //
    // Given
    // -----
    // - θ = [0.3, -1.2, 0.0], c = [2.0, -1.0, 0.5].
    //
    // Expect
    // ------
    // - Analytic and numeric gradients agree to 1e-7.
    fn safe_softmax_deriv_matches_finite_differences() {
        // Arrange
        let theta = array![0.3, -1.2, 0.0];
        let c = array![2.0, -1.0, 0.5];
        let f = |t: &ndarray::Array1<f64>| c.dot(&safe_softmax(t.view()));
        let h = 1e-6;

        // Act
        let p = safe_softmax(theta.view());
        let analytic = safe_softmax_deriv(p.view(), c.view());

        // Assert
        for l in 0..3 {
            let mut up = theta.clone();
            let mut down = theta.clone();
            up[l] += h;
            down[l] -= h;
            let numeric = (f(&up) - f(&down)) / (2.0 * h);
            assert!((analytic[l] - numeric).abs() < 1e-7, "index {l}");
        }
    }

    #[test]
    fn safe_logit_round_trips_through_softmax() {
        let p = array![0.2, 0.5, 0.3];
        let logits = p.mapv(|v| safe_logit(v, p[1]));
        assert_eq!(logits[1], 0.0);
        let back = safe_softmax(logits.view());
        for j in 0..3 {
            assert!((back[j] - p[j]).abs() < 1e-14);
        }
    }
}
