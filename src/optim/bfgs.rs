//! BFGS quasi-Newton method on argmin's `BFGS`.
//!
//! The inverse Hessian approximation starts at the identity. Gradients are
//! central differences of the objective; steps come from a backtracking
//! line search on the Armijo condition, which always terminates (an accepted
//! point is finite, and a vanishing step satisfies the condition). The run
//! converges when the gradient norm falls below `tol`.

use argmin::core::Executor;
use argmin::solver::linesearch::BacktrackingLineSearch;
use argmin::solver::linesearch::condition::ArmijoCondition;
use argmin::solver::quasinewton::BFGS;

use super::problem::{ArgminProblem, into_minimum};
use super::{Counted, LOCAL_ITERATIONS_PER_PARAM, Minimum, Objective};
use crate::error::AppError;

const ARMIJO_C1: f64 = 1e-4;
const BACKTRACK_RHO: f64 = 0.5;

pub fn bfgs(objective: &dyn Objective, x0: &[f64], tol: f64) -> Result<Minimum, AppError> {
    let f = Counted::new(objective);
    let n = x0.len();
    let max_iters = (LOCAL_ITERATIONS_PER_PARAM * n) as u64;

    // Line searches need a finite start.
    let f0 = f.eval(x0)?;
    if !f0.is_finite() {
        return Ok(Minimum {
            x: x0.to_vec(),
            fun: f0,
            iterations: 0,
            evaluations: f.evaluations(),
            converged: false,
        });
    }

    let config_err = |e: argmin::core::Error| AppError::validation(format!("Invalid BFGS configuration: {e}"));
    let condition = ArmijoCondition::new(ARMIJO_C1).map_err(config_err)?;
    let linesearch = BacktrackingLineSearch::new(condition)
        .rho(BACKTRACK_RHO)
        .map_err(config_err)?;
    let solver = BFGS::new(linesearch).with_tolerance_grad(tol).map_err(config_err)?;

    let outcome = Executor::new(ArgminProblem::new(&f), solver)
        .configure(|state| {
            state
                .param(x0.to_vec())
                .inv_hessian(identity(n))
                .max_iters(max_iters)
        })
        .run()
        .map(|res| res.state().clone());
    into_minimum(&f, x0, outcome)
}

fn identity(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect()
}
