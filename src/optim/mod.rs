//! Derivative-free and quasi-Newton minimizers.
//!
//! Nelder-Mead and BFGS run on `argmin` solvers. Powell's direction-set
//! method and the particle swarm (seeded from a given population) are
//! implemented here.
//!
//! The search orchestrator treats these as black boxes with one contract:
//!
//! - `minimize(objective, x0, method, tol)` for single-start local methods
//! - `minimize_population(objective, batch, tol, rng)` for the particle swarm
//!
//! Failure is signalled through the objective value (`+∞` for unusable
//! points). An `Err` from the objective aborts the minimizer and is returned
//! unchanged to the caller.
//!
//! Every method is iteration-capped, so a call always terminates; `converged`
//! reports whether the tolerance test (rather than the cap) ended the run.

use std::cell::{Cell, RefCell};

use rand::rngs::StdRng;

use crate::domain::Method;
use crate::error::AppError;

pub mod bfgs;
pub mod nelder_mead;
pub mod powell;
mod problem;
pub mod swarm;

/// Iteration cap for local methods, per parameter.
pub const LOCAL_ITERATIONS_PER_PARAM: usize = 200;
/// Iteration cap for the particle swarm.
pub const SWARM_MAX_ITERATIONS: usize = 1000;

/// Function to be minimized.
pub trait Objective: Sync {
    fn eval(&self, x: &[f64]) -> Result<f64, AppError>;
}

impl<F> Objective for F
where
    F: Fn(&[f64]) -> Result<f64, AppError> + Sync,
{
    fn eval(&self, x: &[f64]) -> Result<f64, AppError> {
        self(x)
    }
}

/// Outcome of one minimizer call.
#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub fun: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub converged: bool,
}

/// Objective wrapper counting evaluations and keeping the best point seen.
pub(crate) struct Counted<'a> {
    objective: &'a dyn Objective,
    evaluations: Cell<usize>,
    best: RefCell<Option<(Vec<f64>, f64)>>,
}

impl<'a> Counted<'a> {
    pub(crate) fn new(objective: &'a dyn Objective) -> Self {
        Self {
            objective,
            evaluations: Cell::new(0),
            best: RefCell::new(None),
        }
    }

    pub(crate) fn eval(&self, x: &[f64]) -> Result<f64, AppError> {
        self.evaluations.set(self.evaluations.get() + 1);
        let value = self.objective.eval(x)?;
        let mut best = self.best.borrow_mut();
        if best.as_ref().is_none_or(|(_, b)| value < *b) {
            *best = Some((x.to_vec(), value));
        }
        Ok(value)
    }

    pub(crate) fn evaluations(&self) -> usize {
        self.evaluations.get()
    }

    /// Lowest value evaluated so far; the first point on ties.
    pub(crate) fn best(&self) -> Option<(Vec<f64>, f64)> {
        self.best.borrow().clone()
    }
}

/// Run a single-start local minimizer.
pub fn minimize(
    objective: &dyn Objective,
    x0: &[f64],
    method: Method,
    tol: f64,
) -> Result<Minimum, AppError> {
    if x0.is_empty() {
        return Err(AppError::validation("Initial guess must not be empty."));
    }
    if !(tol.is_finite() && tol > 0.0) {
        return Err(AppError::validation(format!("Invalid tolerance: {tol}.")));
    }
    match method {
        Method::NelderMead => nelder_mead::nelder_mead(objective, x0, tol),
        Method::Powell => powell::powell(objective, x0, tol),
        Method::Bfgs => bfgs::bfgs(objective, x0, tol),
        Method::Pso => Err(AppError::validation(
            "PSO is population-based; use minimize_population.",
        )),
    }
}

/// Run the particle swarm seeded with `batch` as its initial population.
pub fn minimize_population(
    objective: &dyn Objective,
    batch: &[Vec<f64>],
    tol: f64,
    rng: &mut StdRng,
) -> Result<Minimum, AppError> {
    let Some(first) = batch.first() else {
        return Err(AppError::validation("Swarm population must not be empty."));
    };
    if first.is_empty() || batch.iter().any(|p| p.len() != first.len()) {
        return Err(AppError::validation(
            "Swarm particles must share one non-zero dimension.",
        ));
    }
    if !(tol.is_finite() && tol > 0.0) {
        return Err(AppError::validation(format!("Invalid tolerance: {tol}.")));
    }
    swarm::particle_swarm(objective, batch, tol, rng)
}


#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn local_methods_reject_swarm_dispatch() {
        let err = minimize(&test_functions::sphere, &[0.0, 0.0], Method::Pso, 1e-3).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }

    #[test]
    fn objective_errors_propagate() {
        let failing = |_: &[f64]| -> Result<f64, AppError> { Err(AppError::task("boom")) };
        for method in [Method::NelderMead, Method::Powell, Method::Bfgs] {
            let err = minimize(&failing, &[0.5, 0.5], method, 1e-3).unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::Task);
        }
        let mut rng = StdRng::seed_from_u64(1);
        let err = minimize_population(&failing, &[vec![0.5], vec![0.2]], 1e-3, &mut rng).unwrap_err();
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn ragged_population_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let batch = vec![vec![0.1, 0.2], vec![0.3]];
        assert!(minimize_population(&test_functions::sphere, &batch, 1e-3, &mut rng).is_err());
    }
}
