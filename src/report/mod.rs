//! Reporting utilities: exported result entries and terminal output.

pub mod format;

pub use format::*;

use std::collections::BTreeMap;

use crate::domain::ResultEntry;
use crate::error::AppError;
use crate::fit::Attempt;
use crate::models::{MaterialModel, ModelInstance};

/// Root-mean-square relative deviation in percent.
pub fn deviation_percentage(fitness: f64) -> f64 {
    100.0 * fitness.sqrt()
}

/// Exported form of one ranked attempt: physical parameters keyed by label.
pub fn result_entry(model: &dyn MaterialModel, attempt: &Attempt) -> Result<ResultEntry, AppError> {
    let instance = ModelInstance::new(model, &attempt.params)?;
    let params: BTreeMap<String, f64> = instance
        .labeled()
        .into_iter()
        .map(|(label, value)| (label.to_string(), value))
        .collect();
    Ok(ResultEntry {
        params,
        fitness: attempt.fitness,
        deviation_percentage: deviation_percentage(attempt.fitness),
        method: attempt.method,
        sensitivity: None,
        goal_derivatives: None,
    })
}
