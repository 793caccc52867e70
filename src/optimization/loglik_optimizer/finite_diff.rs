//! Finite-difference gradients and Hessians.
//!
//! - [`run_fd_diff`]: forward-difference gradient of a cost closure. The
//!   closure cannot return `Result`, so it parks its first error in a shared
//!   cell and returns NaN; the error is surfaced after differencing.
//! - [`compute_hessian`]: Jacobian of an analytic gradient by central
//!   differences, retried with forward differences if the central estimate
//!   is not finite, then symmetrized.
//!
//! The HMM standard errors differentiate the analytic θ-gradient with
//! [`compute_hessian`]; the adapter uses [`run_fd_diff`] for models without
//! an analytic gradient.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Grad, Theta,
        types::Hessian,
        validation::{validate_grad, validate_hessian},
    },
};
use argmin::core::Error;
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// Forward-difference gradient of `func` at `theta`.
///
/// # Errors
/// - The error parked in `closure_err` by `func`, if any.
/// - [`validate_grad`] failures (wrong length, non-finite entries).
pub fn run_fd_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err.into());
    }
    validate_grad(&fd_grad, theta.len())?;
    Ok(fd_grad)
}

/// Symmetrized finite-difference Jacobian of the gradient map `f` at `theta`.
///
/// # Errors
/// - [`OptError::InvalidHessian`](crate::optimization::errors::OptError::InvalidHessian)
///   when both the central and the forward estimates contain non-finite
///   entries.
pub fn compute_hessian<F: Fn(&Theta) -> Grad>(f: &F, theta: &Theta) -> OptResult<Hessian> {
    let dim = theta.len();
    let central = theta.central_hessian(f);
    let mut hess = match validate_hessian(&central, dim) {
        Ok(()) => central,
        Err(_) => {
            let forward = theta.forward_hessian(f);
            validate_hessian(&forward, dim)?;
            forward
        }
    };
    symmetrize_hess(&mut hess);
    Ok(hess)
}

fn symmetrize_hess(hess: &mut Hessian) {
    let n = hess.nrows();
    for i in 0..n {
        for j in 0..i {
            let avg = 0.5 * (hess[[i, j]] + hess[[j, i]]);
            hess[[i, j]] = avg;
            hess[[j, i]] = avg;
        }
    }
}
