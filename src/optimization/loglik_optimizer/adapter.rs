//! Bridge from a [`LogLikelihood`] to argmin's `CostFunction` and `Gradient`.
//!
//! argmin minimizes, so the cost is `c(θ) = −ℓ(θ)` and an analytic gradient
//! is negated on the way out. Without an analytic gradient the cost itself
//! is differenced (central first, forward on failure), so that branch needs
//! no sign flip.
use crate::optimization::{
    errors::OptError,
    loglik_optimizer::{
        finite_diff::run_fd_diff,
        traits::LogLikelihood,
        types::{Cost, Grad, Theta},
        validation::validate_grad,
    },
};
use argmin::core::{CostFunction, Error, Gradient};
use finitediff::FiniteDiff;
use std::cell::RefCell;

#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: LogLikelihood> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: LogLikelihood> ArgMinAdapter<'a, F> {
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }

    fn fd_gradient(&self, theta: &Theta) -> Result<Grad, Error> {
        let closure_err: RefCell<Option<Error>> = RefCell::new(None);
        let cost_fn = |x: &Theta| -> f64 {
            self.cost(x).unwrap_or_else(|e| {
                let mut slot = closure_err.borrow_mut();
                if slot.is_none() {
                    *slot = Some(e);
                }
                f64::NAN
            })
        };
        let central = theta.central_diff(&cost_fn);
        if closure_err.borrow().is_none() && validate_grad(&central, theta.len()).is_ok() {
            return Ok(central);
        }
        Ok(run_fd_diff(theta, &cost_fn, &closure_err)?)
    }
}

impl<F: LogLikelihood> CostFunction for ArgMinAdapter<'_, F> {
    type Param = Theta;
    type Output = Cost;

    /// `−ℓ(θ)`; a non-finite log-likelihood is an error, never a cost.
    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let value = self.f.value(theta, self.data)?;
        if !value.is_finite() {
            return Err(OptError::NonFiniteCost { value }.into());
        }
        Ok(-value)
    }
}

impl<F: LogLikelihood> Gradient for ArgMinAdapter<'_, F> {
    type Param = Theta;
    type Gradient = Grad;

    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        match self.f.grad(theta, self.data) {
            Ok(g) => {
                validate_grad(&g, theta.len())?;
                Ok(-g)
            }
            Err(OptError::GradientNotImplemented) => self.fd_gradient(theta),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptResult;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The sign flip between log-likelihood and cost.
    // - Analytic gradients negated on the way to argmin.
    // - The finite-difference fallback when no gradient is implemented.
    // - Rejection of non-finite log-likelihood values.
    // -------------------------------------------------------------------------

    /// ℓ(θ) = −Σ (θ_i − c_i)², optionally with its analytic gradient.
    struct Bowl {
        analytic: bool,
    }

    impl LogLikelihood for Bowl {
        type Data = Theta;

        fn value(&self, theta: &Theta, center: &Theta) -> OptResult<f64> {
            if theta.iter().any(|v| v.abs() > 1e3) {
                return Ok(f64::NEG_INFINITY);
            }
            Ok(-(theta - center).mapv(|d| d * d).sum())
        }

        fn check(&self, _theta: &Theta, _center: &Theta) -> OptResult<()> {
            Ok(())
        }

        fn grad(&self, theta: &Theta, center: &Theta) -> OptResult<Grad> {
            if self.analytic {
                Ok((theta - center) * -2.0)
            } else {
                Err(OptError::GradientNotImplemented)
            }
        }
    }

    #[test]
    fn cost_is_negated_log_likelihood() {
        let center = array![1.0, -1.0];
        let model = Bowl { analytic: true };
        let adapter = ArgMinAdapter::new(&model, &center);
        let cost = adapter.cost(&array![0.0, 0.0]).expect("finite cost");
        assert!((cost - 2.0).abs() < 1e-15);
    }

    #[test]
    // Purpose
    // -------
    // Check that analytic and finite-difference gradients agree and both
    // point uphill in cost.
    //
    // Given
    // -----
    // - The bowl centered at (1, −1), evaluated at the origin.
    //
    // Expect
    // ------
    // - Cost gradient (−2, 2) from both paths.
    fn analytic_and_fd_gradients_agree_in_cost_space() {
        // Arrange
        let center = array![1.0, -1.0];
        let exact = Bowl { analytic: true };
        let numeric = Bowl { analytic: false };
        let theta = array![0.0, 0.0];

        // Act
        let g_exact = ArgMinAdapter::new(&exact, &center).gradient(&theta).expect("gradient");
        let g_fd = ArgMinAdapter::new(&numeric, &center).gradient(&theta).expect("gradient");

        // Assert
        let expected = array![-2.0, 2.0];
        assert!((&g_exact - &expected).iter().all(|d| d.abs() < 1e-12));
        assert!((&g_fd - &expected).iter().all(|d| d.abs() < 1e-5));
    }

    #[test]
    fn non_finite_log_likelihood_is_an_error() {
        let center = array![0.0];
        let model = Bowl { analytic: false };
        let adapter = ArgMinAdapter::new(&model, &center);
        let err = adapter.cost(&array![5e3]).unwrap_err();
        assert!(matches!(OptError::from(err), OptError::NonFiniteCost { .. }));
    }
}
