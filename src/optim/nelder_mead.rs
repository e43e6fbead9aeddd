//! Nelder-Mead downhill simplex on argmin's `NelderMead`.
//!
//! Standard coefficients (reflection 1, expansion 2, contraction 1/2,
//! shrink 1/2). The initial simplex perturbs each coordinate of `x0` by 5%
//! (or sets it to `0.00025` when the coordinate is zero). The run converges
//! when the standard deviation of the vertex values falls below `tol`.

use argmin::core::Executor;
use argmin::solver::neldermead::NelderMead;

use super::problem::{ArgminProblem, into_minimum};
use super::{Counted, LOCAL_ITERATIONS_PER_PARAM, Minimum, Objective};
use crate::error::AppError;

const NONZERO_DELTA: f64 = 0.05;
const ZERO_DELTA: f64 = 0.00025;

pub fn nelder_mead(objective: &dyn Objective, x0: &[f64], tol: f64) -> Result<Minimum, AppError> {
    let f = Counted::new(objective);
    let max_iters = (LOCAL_ITERATIONS_PER_PARAM * x0.len()) as u64;

    let solver = NelderMead::new(initial_simplex(x0))
        .with_sd_tolerance(tol)
        .map_err(|e| AppError::validation(format!("Invalid Nelder-Mead tolerance: {e}")))?;
    let outcome = Executor::new(ArgminProblem::new(&f), solver)
        .configure(|state| state.max_iters(max_iters))
        .run()
        .map(|res| res.state().clone());
    into_minimum(&f, x0, outcome)
}

/// `x0` plus one vertex per coordinate.
fn initial_simplex(x0: &[f64]) -> Vec<Vec<f64>> {
    let mut simplex = Vec::with_capacity(x0.len() + 1);
    simplex.push(x0.to_vec());
    for i in 0..x0.len() {
        let mut v = x0.to_vec();
        v[i] = if v[i] != 0.0 {
            (1.0 + NONZERO_DELTA) * v[i]
        } else {
            ZERO_DELTA
        };
        simplex.push(v);
    }
    simplex
}
