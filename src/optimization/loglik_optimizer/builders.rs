//! L-BFGS construction from [`MLEOptions`].
//!
//! The builders choose the history length and apply the optional gradient
//! and cost-change tolerances. The starting point and the iteration cap are
//! executor settings and are applied in `run_lbfgs`.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        traits::MLEOptions,
        types::{
            Cost, DEFAULT_LBFGS_MEM, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente,
            MoreThuenteLS, Theta,
        },
    },
};
use argmin::solver::quasinewton::LBFGS;

pub fn build_optimizer_hager_zhang(opts: &MLEOptions) -> OptResult<LbfgsHagerZhang> {
    let solver = LbfgsHagerZhang::new(HagerZhangLS::new(), memory(opts));
    configure_lbfgs(solver, opts)
}

pub fn build_optimizer_more_thuente(opts: &MLEOptions) -> OptResult<LbfgsMoreThuente> {
    let solver = LbfgsMoreThuente::new(MoreThuenteLS::new(), memory(opts));
    configure_lbfgs(solver, opts)
}

/// Apply `tol_grad` / `tol_cost` when present; argmin's defaults otherwise.
///
/// # Errors
/// - Converted argmin errors when a tolerance is rejected.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MLEOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(tol) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(tol)?;
    }
    if let Some(tol) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(tol)?;
    }
    Ok(solver)
}

fn memory(opts: &MLEOptions) -> usize {
    opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM)
}
