//! argmin glue.
//!
//! [`ArgminProblem`] exposes an evaluation-counted objective to argmin solvers
//! (cost plus a central-difference gradient); [`into_minimum`] maps the final
//! solver state back to a [`Minimum`].

use argmin::core::{CostFunction, Gradient, State, TerminationReason, TerminationStatus};

use super::{Counted, Minimum};
use crate::error::AppError;
use crate::math::central_gradient;

pub(crate) struct ArgminProblem<'a> {
    objective: &'a Counted<'a>,
}

impl<'a> ArgminProblem<'a> {
    pub(crate) fn new(objective: &'a Counted<'a>) -> Self {
        Self { objective }
    }
}

impl CostFunction for ArgminProblem<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, params: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        self.objective.eval(params).map_err(argmin::core::Error::new)
    }
}

impl Gradient for ArgminProblem<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, params: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
        let mut eval = |x: &[f64]| self.objective.eval(x);
        let mut g = central_gradient(&mut eval, params).map_err(argmin::core::Error::new)?;
        // A difference stencil touching an infinite region gives no usable
        // slope for that coordinate; drop it so line searches stay finite.
        for v in g.iter_mut().filter(|v| !v.is_finite()) {
            *v = 0.0;
        }
        Ok(g)
    }
}

/// Final solver state (or the error that ended the run) as a [`Minimum`].
///
/// Objective errors are returned unchanged. Any other solver error ends the
/// run at the best point evaluated so far, unconverged and with no iteration
/// count.
pub(crate) fn into_minimum<I>(
    f: &Counted<'_>,
    x0: &[f64],
    outcome: Result<I, argmin::core::Error>,
) -> Result<Minimum, AppError>
where
    I: State<Param = Vec<f64>, Float = f64>,
{
    let state = match outcome {
        Ok(state) => state,
        Err(e) => {
            let e = match e.downcast::<AppError>() {
                Ok(objective_error) => return Err(objective_error),
                Err(e) => e,
            };
            tracing::debug!(error = %e, "solver stopped early");
            let (x, fun) = f.best().unwrap_or_else(|| (x0.to_vec(), f64::INFINITY));
            return Ok(Minimum {
                x,
                fun,
                iterations: 0,
                evaluations: f.evaluations(),
                converged: false,
            });
        }
    };

    let converged = matches!(
        state.get_termination_status(),
        TerminationStatus::Terminated(TerminationReason::SolverConverged)
    );
    let (x, fun) = match state.get_best_param() {
        Some(best) => (best.clone(), state.get_best_cost()),
        None => f.best().unwrap_or_else(|| (x0.to_vec(), f64::INFINITY)),
    };
    Ok(Minimum {
        x,
        fun,
        iterations: state.get_iter() as usize,
        evaluations: f.evaluations(),
        converged,
    })
}
