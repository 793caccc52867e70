//! Negative log-likelihood and its analytic gradient over θ.
//!
//! [`MixtureObjective`] maps a free-parameter vector θ onto a copy of a base
//! model through the [`ParamLayout`], runs one sweep over the subjects, and
//! returns `−ℓ(θ)` with `−∇ℓ(θ)`. The gradient combines
//! responsibility-weighted raw probability derivatives, pushed through the
//! softmax Jacobian of every row, with the coefficient score
//! `Σ_n X_n (r_nk − w_nk)`.
//!
//! When `exp(X Γ)` overflows for some subject the evaluation returns the
//! sentinel pair: objective `f64::MAX` and a gradient filled with
//! `−f64::MAX`. A minimizer treats that point as infinitely bad without
//! seeing a NaN.
use crate::hmm::{
    core::{
        data::SeqData,
        forward::forward,
        layout::ParamLayout,
        model::{Model, log_softmax_rows},
        posterior::{Accumulate, sweep},
    },
    errors::{HmmError, HmmResult},
    models::mixture_coef::coefficient_score,
};
use crate::utils::{log_sum_exp, map_subjects};
use ndarray::{Array1, Array2, ArrayView1};

/// Objective value and gradient, both in minimization terms.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveEval {
    /// `−ℓ(θ)`, or `f64::MAX` for the sentinel.
    pub objective: f64,
    /// `−∇ℓ(θ)`, or all `−f64::MAX` for the sentinel.
    pub gradient: Array1<f64>,
}

impl ObjectiveEval {
    pub fn sentinel(n_params: usize) -> ObjectiveEval {
        ObjectiveEval { objective: f64::MAX, gradient: Array1::from_elem(n_params, -f64::MAX) }
    }

    pub fn is_sentinel(&self) -> bool {
        self.objective == f64::MAX
    }
}

/// Pure function of θ over a fixed model structure.
#[derive(Debug, Clone, Copy)]
pub struct MixtureObjective<'a> {
    base: &'a Model,
    layout: &'a ParamLayout,
}

impl<'a> MixtureObjective<'a> {
    /// `base` provides the covariates and the structure that θ fills in.
    pub fn new(base: &'a Model, layout: &'a ParamLayout) -> Self {
        MixtureObjective { base, layout }
    }

    pub fn n_params(&self) -> usize {
        self.layout.n_params()
    }

    /// `−ℓ(θ)` and `−∇ℓ(θ)`.
    ///
    /// # Errors
    /// - [`HmmError::ThetaLengthMismatch`] / [`HmmError::InvalidThetaInput`]
    ///   for a malformed θ.
    /// - [`HmmError::ZeroLikelihood`] for an impossible subject.
    pub fn evaluate(&self, theta: ArrayView1<f64>, data: &SeqData) -> HmmResult<ObjectiveEval> {
        let model = self.layout.model_from_theta(self.base, theta)?;
        let Some(log_weights) = guarded_log_weights(&model, data.n_subjects())? else {
            return Ok(ObjectiveEval::sentinel(self.n_params()));
        };
        let totals = sweep(model.clusters(), log_weights.view(), data, Accumulate::Derivatives)?;
        let coef_grad = match &model {
            Model::Single(_) => None,
            Model::Mixture(mix) => Some(coefficient_score(
                mix.covariates.view(),
                totals.responsibilities.view(),
                log_weights.mapv(f64::exp).view(),
            )),
        };
        let grad = self.layout.gradient(
            model.clusters(),
            &totals.tables,
            coef_grad.as_ref().map(|g| g.view()),
        );
        Ok(ObjectiveEval { objective: -totals.log_lik, gradient: -grad })
    }

    /// `ℓ(θ)` from forward passes only; `−f64::MAX` at the sentinel.
    ///
    /// # Errors
    /// - Same as [`MixtureObjective::evaluate`].
    pub fn log_likelihood(&self, theta: ArrayView1<f64>, data: &SeqData) -> HmmResult<f64> {
        let model = self.layout.model_from_theta(self.base, theta)?;
        match guarded_log_weights(&model, data.n_subjects())? {
            Some(log_weights) => forward_log_likelihood(&model, &log_weights, data),
            None => Ok(-f64::MAX),
        }
    }
}

/// Total log-likelihood of `data` under `model` from forward passes.
///
/// # Errors
/// - [`HmmError::ZeroLikelihood`] for the lowest-indexed impossible subject.
/// - Weight and covariate errors from [`Model::log_mixture_weights`].
pub fn model_log_likelihood(model: &Model, data: &SeqData) -> HmmResult<f64> {
    let log_weights = model.log_mixture_weights(data.n_subjects())?;
    forward_log_likelihood(model, &log_weights, data)
}

// ---- Helper methods ----

/// `None` when `exp(X Γ)` is not finite somewhere.
fn guarded_log_weights(model: &Model, n_subjects: usize) -> HmmResult<Option<Array2<f64>>> {
    let eta = model.linear_predictor(n_subjects)?;
    if eta.iter().any(|v| !v.is_finite() || !v.exp().is_finite()) {
        return Ok(None);
    }
    Ok(Some(log_softmax_rows(eta)?))
}

fn forward_log_likelihood(
    model: &Model, log_weights: &Array2<f64>, data: &SeqData,
) -> HmmResult<f64> {
    let clusters = model.clusters();
    let per_subject = map_subjects(data.n_subjects(), |n| {
        let obs = data.subject(n);
        let joint = Array1::from_iter(
            clusters
                .iter()
                .zip(log_weights.row(n).iter())
                .map(|(params, &lw)| lw + forward(params, params.initial.view(), obs).log_lik),
        );
        let subject_ll = log_sum_exp(joint.view());
        if subject_ll.is_finite() {
            Ok(subject_ll)
        } else {
            Err(HmmError::ZeroLikelihood { subject: n })
        }
    });
    per_subject.into_iter().sum()
}
