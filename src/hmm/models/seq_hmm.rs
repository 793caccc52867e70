//! Fitting driver for (mixture) hidden Markov models.
//!
//! [`SeqHmm`] owns a [`Model`], the [`ParamLayout`] derived from its
//! starting values, and the [`HmmOptions`] of one estimation. `fit` runs EM,
//! L-BFGS over θ, or EM followed by L-BFGS refinement, and stores an
//! [`HmmFit`]. The diagnostics (posteriors, responsibilities, decoding,
//! standard errors) use whatever parameters the estimator currently holds.
//!
//! The estimator implements [`LogLikelihood`] over θ so it plugs directly
//! into [`maximize`]; the value comes from forward passes only and the
//! gradient from [`MixtureObjective::evaluate`].
use crate::{
    hmm::{
        core::{
            data::SeqData,
            layout::ParamLayout,
            model::Model,
            options::{FitMethod, HmmOptions},
            posterior::{SubjectPass, subject_pass},
            validation::validate_theta,
            viterbi::{DecodedPath, arg_max, decode_subject},
        },
        errors::{HmmError, HmmResult},
        models::{
            em::{EmOutcome, run_em},
            objective::{MixtureObjective, model_log_likelihood},
        },
    },
    inference::hessian::calc_standard_errors,
    optimization::{
        errors::OptResult,
        loglik_optimizer::{Grad, LogLikelihood, OptimOutcome, Theta, maximize},
    },
    utils::map_subjects,
};
use ndarray::{Array1, Array2, Array3, Axis};
use tracing::info;

/// Outcome of [`SeqHmm::fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct HmmFit {
    /// Log-likelihood of the fitted parameters.
    pub log_lik: f64,
    /// Degrees of freedom, the length of θ.
    pub df: usize,
    /// Non-missing observations in the fitted data.
    pub n_observations: usize,
    /// Present when EM ran.
    pub em: Option<EmOutcome>,
    /// Present when L-BFGS ran.
    pub mle: Option<OptimOutcome>,
}

/// Hidden Markov model estimator for multichannel categorical sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct SeqHmm {
    model: Model,
    layout: ParamLayout,
    /// Estimation and decoding options.
    pub options: HmmOptions,
    /// Fit results (populated after `fit`).
    pub results: Option<HmmFit>,
}

impl SeqHmm {
    /// Build an estimator; entries that are zero in `model` become
    /// structural zeros for every later fit.
    ///
    /// # Errors
    /// - [`HmmError::InvalidThetaInput`] when the starting values do not
    ///   map to a finite θ.
    pub fn new(model: Model, options: HmmOptions) -> HmmResult<SeqHmm> {
        let layout = ParamLayout::from_model(&model);
        validate_theta(layout.to_theta(&model).view(), layout.n_params())?;
        Ok(SeqHmm { model, layout, options, results: None })
    }

    /// Estimate the parameters with `options.method`.
    ///
    /// # Errors
    /// - Data mismatches from [`Model::check_data`].
    /// - [`HmmError::ZeroLikelihood`] for a subject impossible under the
    ///   starting values.
    /// - [`HmmError::Optimization`] when L-BFGS fails.
    pub fn fit(&mut self, data: &SeqData) -> HmmResult<()> {
        self.model.check_data(data)?;
        let method = self.options.method;
        let em = match method {
            FitMethod::Em | FitMethod::EmThenGradient => {
                Some(run_em(&mut self.model, &self.layout, data, &self.options.em)?)
            }
            FitMethod::Gradient => None,
        };
        let mle = match method {
            FitMethod::Gradient | FitMethod::EmThenGradient => Some(self.refine(data)?),
            FitMethod::Em => None,
        };
        let log_lik = model_log_likelihood(&self.model, data)?;
        info!(?method, log_lik, df = self.df(), "fit finished");
        self.results = Some(HmmFit {
            log_lik,
            df: self.df(),
            n_observations: data.n_observed(),
            em,
            mle,
        });
        Ok(())
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn layout(&self) -> &ParamLayout {
        &self.layout
    }

    /// Number of free parameters.
    pub fn df(&self) -> usize {
        self.layout.n_params()
    }

    /// Current parameters as a free-parameter vector.
    pub fn theta(&self) -> Array1<f64> {
        self.layout.to_theta(&self.model)
    }

    /// Log-likelihood of `data` under the current parameters.
    pub fn log_likelihood(&self, data: &SeqData) -> HmmResult<f64> {
        self.model.check_data(data)?;
        model_log_likelihood(&self.model, data)
    }

    /// Scaled forward/backward output of every subject and cluster.
    pub fn forward_backward(&self, data: &SeqData) -> HmmResult<Vec<SubjectPass>> {
        self.model.check_data(data)?;
        let log_weights = self.model.log_mixture_weights(data.n_subjects())?;
        let clusters = self.model.clusters();
        map_subjects(data.n_subjects(), |n| {
            subject_pass(clusters, log_weights.row(n), data.subject(n), n)
        })
        .into_iter()
        .collect()
    }

    /// Posterior state probabilities, `N × T × m_total`.
    ///
    /// Mixture state spaces are concatenated in cluster order; each
    /// subject's probabilities sum to one over the combined space.
    pub fn posterior_probs(&self, data: &SeqData) -> HmmResult<Array3<f64>> {
        let passes = self.forward_backward(data)?;
        let mut out =
            Array3::<f64>::zeros((data.n_subjects(), data.n_time(), self.model.total_states()));
        for (n, pass) in passes.iter().enumerate() {
            out.index_axis_mut(Axis(0), n).assign(&pass.state_posteriors().t());
        }
        Ok(out)
    }

    /// Cluster responsibilities, `N × K`.
    pub fn cluster_probs(&self, data: &SeqData) -> HmmResult<Array2<f64>> {
        let passes = self.forward_backward(data)?;
        let mut out = Array2::<f64>::zeros((data.n_subjects(), self.model.n_clusters()));
        for (n, pass) in passes.iter().enumerate() {
            out.row_mut(n).assign(&pass.responsibilities);
        }
        Ok(out)
    }

    /// Cluster with the largest responsibility per subject; ties follow
    /// `options.decode.tie_break`, as in [`SeqHmm::decode`].
    pub fn most_probable_cluster(&self, data: &SeqData) -> HmmResult<Vec<usize>> {
        let probs = self.cluster_probs(data)?;
        let tie_break = self.options.decode.tie_break;
        Ok(probs.rows().into_iter().map(|row| arg_max(row, tie_break).0).collect())
    }

    /// Most probable hidden paths under `options.decode`.
    pub fn decode(&self, data: &SeqData) -> HmmResult<Vec<DecodedPath>> {
        self.model.check_data(data)?;
        let log_weights = self.model.log_mixture_weights(data.n_subjects())?;
        let clusters = self.model.clusters();
        let decode_opts = &self.options.decode;
        map_subjects(data.n_subjects(), |n| {
            decode_subject(clusters, log_weights.row(n), data.subject(n), n, decode_opts)
        })
        .into_iter()
        .collect()
    }

    /// Standard errors of θ at the fitted parameters.
    ///
    /// # Errors
    /// - [`HmmError::ModelNotFitted`] before `fit`.
    /// - [`HmmError::Optimization`] when the differenced gradient is not
    ///   finite around θ̂.
    pub fn standard_errors(&self, data: &SeqData) -> HmmResult<Array1<f64>> {
        self.results.as_ref().ok_or(HmmError::ModelNotFitted)?;
        self.model.check_data(data)?;
        let objective = self.objective();
        let n_params = self.df();
        let grad = |theta: &Array1<f64>| match objective.evaluate(theta.view(), data) {
            Ok(eval) if !eval.is_sentinel() => -eval.gradient,
            _ => Array1::from_elem(n_params, f64::NAN),
        };
        Ok(calc_standard_errors(&grad, &self.theta())?)
    }

    /// Standard errors of the coefficients as a `q × K` matrix with a zero
    /// baseline column; `None` for a single model.
    pub fn coef_standard_errors(&self, data: &SeqData) -> HmmResult<Option<Array2<f64>>> {
        if let Model::Single(_) = self.model {
            return Ok(None);
        }
        let se = self.standard_errors(data)?;
        Ok(Some(self.layout.coefficients_from_theta(se.view())))
    }

    // ---- Helper methods ----

    fn objective(&self) -> MixtureObjective<'_> {
        MixtureObjective::new(&self.model, &self.layout)
    }

    fn refine(&mut self, data: &SeqData) -> HmmResult<OptimOutcome> {
        let theta0 = self.theta();
        let outcome = maximize(&*self, theta0, data, &self.options.mle)?;
        self.layout.apply_theta(&mut self.model, outcome.theta_hat.view())?;
        info!(
            log_lik = outcome.value,
            iterations = outcome.iterations,
            converged = outcome.converged,
            status = %outcome.status,
            "gradient refinement finished"
        );
        Ok(outcome)
    }
}

impl LogLikelihood for SeqHmm {
    type Data = SeqData;

    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<f64> {
        Ok(self.objective().log_likelihood(theta.view(), data)?)
    }

    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()> {
        validate_theta(theta.view(), self.layout.n_params())?;
        self.model.check_data(data)?;
        Ok(())
    }

    fn grad(&self, theta: &Theta, data: &Self::Data) -> OptResult<Grad> {
        let eval = self.objective().evaluate(theta.view(), data)?;
        Ok(-eval.gradient)
    }
}
