//! Shared executor for the L-BFGS variants.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Grad, LogLikelihood, MLEOptions, OptimOutcome, Theta, adapter::ArgMinAdapter,
    },
};
use argmin::core::{Executor, IterState, Solver, State};
#[cfg(feature = "obs_slog")]
use argmin::core::{CostFunction, Gradient, observers::ObserverMode};
#[cfg(feature = "obs_slog")]
use argmin_math::ArgminL2Norm;
use tracing::debug;

/// argmin state for θ-space L-BFGS with an `f64` cost.
type LbfgsState = IterState<Theta, Grad, (), (), (), f64>;

/// Minimize `problem` with `solver` from `theta0` and report the best point.
///
/// `opts.tols.max_iter` caps the iterations. With the `obs_slog` feature and
/// `opts.verbose`, the starting log-likelihood is logged once and a terminal
/// slog observer follows every iteration.
///
/// # Errors
/// - argmin failures, converted through `From<argmin::core::Error>`.
/// - [`OptimOutcome::new`] rejections of the final state.
pub fn run_lbfgs<'a, F, S>(
    theta0: Theta, opts: &MLEOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<OptimOutcome>
where
    F: LogLikelihood,
    S: Solver<ArgMinAdapter<'a, F>, LbfgsState> + Send + 'static,
{
    let n_params = theta0.len();
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        log_start(&theta0, &problem);
    }
    let max_iters = opts.tols.max_iter.map(|n| n as u64);
    #[cfg_attr(not(feature = "obs_slog"), allow(unused_mut))]
    let mut executor = Executor::new(problem, solver).configure(|state| {
        let state = state.param(theta0);
        match max_iters {
            Some(n) => state.max_iters(n),
            None => state,
        }
    });
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        executor =
            executor.add_observer(argmin_observer_slog::SlogLogger::term_noblock(), ObserverMode::Always);
    }

    let mut state = executor.run()?.state().clone();
    let best_cost = state.get_best_cost();
    let status = state.get_termination_status().clone();
    let iterations = state.get_iter();
    let evals = state.get_func_counts().clone();
    debug!(n_params, iterations, best_cost, ?status, "L-BFGS finished");
    let final_grad = state.take_gradient();
    OptimOutcome::new(state.take_best_param(), -best_cost, status, iterations, evals, final_grad)
}

#[cfg(feature = "obs_slog")]
fn log_start<F: LogLikelihood>(theta0: &Theta, problem: &ArgMinAdapter<'_, F>) {
    let log_lik = problem.cost(theta0).map(|c| -c).ok();
    let grad_norm = problem.gradient(theta0).ok().map(|g| g.l2_norm());
    tracing::info!(?log_lik, ?grad_norm, "L-BFGS start");
}
