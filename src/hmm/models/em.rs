//! EM estimation for (mixture) hidden Markov models.
//!
//! Purpose
//! -------
//! Maximize the observed-data log-likelihood by alternating an E-step
//! (forward/backward passes, expected counts, responsibilities) with an
//! M-step (normalized counts, coefficient refit).
//!
//! Key behaviors
//! -------------
//! - One E-step runs before the first iteration; each iteration is an M-step
//!   followed by the E-step that scores it.
//! - Rows are renormalized only over the support fixed by the parameter
//!   layout, so structural zeros stay exactly zero.
//! - A row with no expected mass keeps its previous values.
//! - A log-likelihood decrease larger than `monotone_tol · (1 + |ℓ|)` is
//!   logged and counted but does not stop the loop.
//!
//! Conventions
//! -----------
//! - Convergence: `|ℓ_new − ℓ_old| / (|ℓ_old| + REL_EPS) < tol`.
//! - `iterations` counts completed M-steps.
use crate::hmm::{
    core::{
        data::SeqData,
        layout::ParamLayout,
        model::Model,
        options::EmOptions,
        posterior::{Accumulate, Sweep, sweep},
        validation::debug_assert_stochastic,
    },
    errors::HmmResult,
    models::mixture_coef::refit_coefficients,
};
use tracing::{debug, info, warn};

/// Guard in the relative-change denominator.
pub const REL_EPS: f64 = 1e-12;

/// Summary of an EM run.
#[derive(Debug, Clone, PartialEq)]
pub struct EmOutcome {
    /// Log-likelihood after the last E-step.
    pub log_lik: f64,
    /// Completed M-steps.
    pub iterations: usize,
    /// Whether the relative change fell below `tol`.
    pub converged: bool,
    /// Log-likelihood of the starting values followed by one entry per
    /// iteration.
    pub history: Vec<f64>,
    /// Iterations whose log-likelihood decreased beyond `monotone_tol`.
    pub non_monotone_steps: usize,
}

/// Run EM on `model` in place.
///
/// # Errors
/// - [`HmmError::ZeroLikelihood`](crate::hmm::errors::HmmError::ZeroLikelihood)
///   when a subject's sequence is impossible under the current parameters.
/// - [`HmmError::NonFiniteWeights`](crate::hmm::errors::HmmError::NonFiniteWeights)
///   when the mixture weights overflow.
/// - Covariate and data mismatches reported by [`Model::check_data`].
pub fn run_em(
    model: &mut Model, layout: &ParamLayout, data: &SeqData, opts: &EmOptions,
) -> HmmResult<EmOutcome> {
    model.check_data(data)?;
    let mut current = e_step(model, data)?;
    let mut history = vec![current.log_lik];
    let mut non_monotone_steps = 0;
    let mut converged = false;
    let mut iterations = 0;

    while iterations < opts.max_iter {
        m_step(model, layout, &current, opts)?;
        let next = e_step(model, data)?;
        iterations += 1;

        let old = current.log_lik;
        let new = next.log_lik;
        let rel_change = (new - old).abs() / (old.abs() + REL_EPS);
        if flag_decrease(iterations, old, new, opts.monotone_tol) {
            non_monotone_steps += 1;
        }
        debug!(iteration = iterations, log_lik = new, rel_change, "EM iteration");
        history.push(new);
        current = next;
        if rel_change < opts.tol {
            converged = true;
            break;
        }
    }

    info!(iterations, log_lik = current.log_lik, converged, non_monotone_steps, "EM finished");
    Ok(EmOutcome { log_lik: current.log_lik, iterations, converged, history, non_monotone_steps })
}

// ---- Helper methods ----

/// `true` (and a `warn!`) when `new` falls below `old` by more than
/// `monotone_tol · (1 + |old|)`.
fn flag_decrease(iteration: usize, old: f64, new: f64, monotone_tol: f64) -> bool {
    let decreased = new < old - monotone_tol * (1.0 + old.abs());
    if decreased {
        warn!(iteration, old, new, "EM log-likelihood decreased");
    }
    decreased
}

fn e_step(model: &Model, data: &SeqData) -> HmmResult<Sweep> {
    let log_weights = model.log_mixture_weights(data.n_subjects())?;
    sweep(model.clusters(), log_weights.view(), data, Accumulate::Counts)
}

fn m_step(
    model: &mut Model, layout: &ParamLayout, estep: &Sweep, opts: &EmOptions,
) -> HmmResult<()> {
    let clusters = model.clusters_mut();
    for block in layout.blocks() {
        let counts = block.kind.table_row(&estep.tables);
        let mass: f64 = block.layout.support.iter().map(|&j| counts[j]).sum();
        if !(mass > 0.0 && mass.is_finite()) {
            warn!(block = ?block.kind, "no expected mass, keeping previous row");
            continue;
        }
        let mut row = block.kind.row_mut(clusters);
        row.fill(0.0);
        for &j in &block.layout.support {
            row[j] = counts[j] / mass;
        }
    }
    for params in clusters.iter() {
        debug_assert_stochastic(params);
    }

    if let Model::Mixture(mix) = model {
        let refit = refit_coefficients(
            mix.covariates.view(),
            estep.responsibilities.view(),
            mix.coefficients.view(),
            opts,
        )?;
        mix.coefficients = refit.coefficients;
    }
    Ok(())
}
