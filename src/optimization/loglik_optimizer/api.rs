//! Entry point for maximizing a [`LogLikelihood`] with L-BFGS.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        OptimOutcome, Theta,
        adapter::ArgMinAdapter,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::run_lbfgs,
        traits::{LineSearcher, LogLikelihood, MLEOptions},
    },
};

/// Maximize `ℓ(θ)` from `theta0` with the line search named in `opts`.
///
/// The starting point is validated with `f.check` before any solver state
/// is built. The returned [`OptimOutcome`] reports `ℓ(θ̂)`, never the cost.
///
/// # Errors
/// - Whatever `f.check` returns for `theta0`.
/// - Builder errors for rejected tolerances.
/// - argmin runtime errors (line-search failures, non-finite costs) converted
///   into [`OptError`](crate::optimization::errors::OptError).
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
    }
}
