//! loglik_optimizer::builders — L-BFGS solver construction helpers.
//!
//! Purpose
//! -------
//! Build L-BFGS solvers for hyperparameter calibration with either a
//! Hager–Zhang or More–Thuente line search, applying the tolerances and
//! memory size carried by [`MLEOptions`].
//!
//! Conventions
//! -----------
//! - Builders never set the initial point or `max_iters`; both are runtime
//!   concerns applied by [`run_lbfgs`](super::run::run_lbfgs).
//! - Invalid tolerances rejected by argmin come back as [`OptError`]
//!   through `From<argmin::core::Error>`.
//!
//! [`OptError`]: crate::optimization::errors::OptError
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        traits::MLEOptions,
        types::{
            Cost, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente, MoreThuenteLS, Theta,
            DEFAULT_LBFGS_MEM,
        },
    },
};

pub fn build_optimizer_hager_zhang(opts: &MLEOptions) -> OptResult<LbfgsHagerZhang> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsHagerZhang::new(HagerZhangLS::new(), mem), opts)
}

pub fn build_optimizer_more_thuente(opts: &MLEOptions) -> OptResult<LbfgsMoreThuente> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsMoreThuente::new(MoreThuenteLS::new(), mem), opts)
}

pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MLEOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::loglik_optimizer::traits::{LineSearcher, Tolerances};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Construction of both solver flavours with default and explicit memory.
    //
    // They intentionally DO NOT cover:
    // - Executor behaviour, which is exercised through `maximize`.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Both builders succeed with default memory and full tolerances.
    //
    // Given
    // -----
    // - Tolerances with grad, cost and iteration limits; `lbfgs_mem = None`.
    //
    // Expect
    // ------
    // - Both builders return `Ok`.
    fn builders_succeed_with_default_memory() {
        // Arrange
        let tols = Tolerances::new(Some(1e-6), Some(1e-10), Some(50)).expect("valid tolerances");
        let hz = MLEOptions::new(tols, LineSearcher::HagerZhang, false, None).expect("valid");
        let mt = MLEOptions::new(tols, LineSearcher::MoreThuente, false, None).expect("valid");

        // Act & Assert
        assert!(build_optimizer_hager_zhang(&hz).is_ok());
        assert!(build_optimizer_more_thuente(&mt).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // An explicit L-BFGS memory is accepted.
    //
    // Given
    // -----
    // - `lbfgs_mem = Some(11)` with only an iteration cap.
    //
    // Expect
    // ------
    // - `build_optimizer_more_thuente` returns `Ok`.
    fn builder_respects_explicit_memory() {
        // Arrange
        let tols = Tolerances::new(None, None, Some(25)).expect("valid tolerances");
        let opts = MLEOptions::new(tols, LineSearcher::MoreThuente, false, Some(11)).expect("ok");

        // Act
        let solver = build_optimizer_more_thuente(&opts);

        // Assert
        assert!(solver.is_ok());
    }
}
