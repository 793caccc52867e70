//! Small numeric and scheduling helpers shared by the HMM engines.
//!
//! - [`log_sum_exp`]: stable `ln Σ exp(x_i)` with `-∞` entries ignored.
//! - [`safe_ln`]: natural log that maps `0` to `-∞` instead of producing NaN
//!   for tiny negative rounding noise.
//! - [`map_subjects`]: runs a per-subject closure in parallel when the
//!   `parallel` feature is enabled, serially otherwise. Output order always
//!   follows subject order, so downstream reductions are deterministic.
use ndarray::ArrayView1;

/// Stable `ln Σ_i exp(x_i)`.
///
/// Returns `-∞` when every entry is `-∞` (or the input is empty).
pub fn log_sum_exp(values: ArrayView1<f64>) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    let sum: f64 = values.iter().map(|&v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Natural log with `ln(x) = -∞` for `x <= 0`.
pub fn safe_ln(x: f64) -> f64 {
    if x > 0.0 { x.ln() } else { f64::NEG_INFINITY }
}

/// Evaluate `f(n)` for every subject `n < n_subjects`, preserving order.
pub fn map_subjects<T, F>(n_subjects: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        (0..n_subjects).into_par_iter().map(f).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        (0..n_subjects).map(f).collect()
    }
}
