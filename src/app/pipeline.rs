//! The `fit` workflow:
//! load dataset -> multi-start search -> result entries -> optional
//! sensitivity analysis + derivatives -> results document.
//!
//! Kept separate from `app` so the whole run is testable without a terminal.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::domain::{DataRow, FitConfig, ResultEntry, ResultsFile, RunMeta, SensitivityConfig};
use crate::error::AppError;
use crate::fit::{Attempt, ModelSearch, goal_function, goal_function_derivatives, run_search};
use crate::io::{IngestedData, load_dataset, write_sensitivity_csv};
use crate::models::MaterialModel;
use crate::report::result_entry;
use crate::sensitivity::{SensitivityAnalysis, SensitivityOptions};

/// All computed outputs of a single `matfit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    pub searches: Vec<ModelSearch>,
    pub results: ResultsFile,
}

pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    let ingest = load_dataset(&config.input, config.delimiter)?;
    run_fit_on_rows(config, ingest)
}

/// Run the pipeline on an already loaded dataset.
pub fn run_fit_on_rows(config: &FitConfig, ingest: IngestedData) -> Result<RunOutput, AppError> {
    let models: Vec<&dyn MaterialModel> = config.models.iter().map(|k| k.capability()).collect();
    let searches = run_search(&models, &config.methods, &ingest.rows, &config.search)?;

    if let Some(dir) = config.sensitivity.as_ref().and_then(|s| s.log_dir.as_ref()) {
        std::fs::create_dir_all(dir).map_err(|e| {
            AppError::input(format!("Failed to create sensitivity log dir '{}': {e}", dir.display()))
        })?;
    }

    // Post-processing runs on the same bounded pool as the search.
    let pool = config.search.worker_pool()?;
    let mut results = BTreeMap::new();
    for (model, search) in models.iter().copied().zip(searches.iter()) {
        let mut by_method = BTreeMap::new();
        for ranked in &search.per_method {
            let Some(method) = ranked.method else { continue };
            let entries: Vec<ResultEntry> = pool.install(|| {
                ranked
                    .attempts
                    .par_iter()
                    .enumerate()
                    .map(|(rank, attempt)| build_entry(model, attempt, rank, &ingest.rows, config))
                    .collect::<Result<_, AppError>>()
            })?;
            by_method.insert(method.label().to_string(), entries);
        }
        results.insert(model.name().to_string(), by_method);
    }

    let results = ResultsFile {
        meta: RunMeta {
            tool: "matfit".to_string(),
            generated: chrono::Local::now(),
            input: config.input.clone(),
            rows: ingest.rows.len(),
            attempts: config.search.attempts,
            tolerance: config.search.tolerance,
            max_results: config.search.max_results,
        },
        results,
    };

    Ok(RunOutput {
        ingest,
        searches,
        results,
    })
}

fn build_entry(
    model: &dyn MaterialModel,
    attempt: &Attempt,
    rank: usize,
    rows: &[DataRow],
    config: &FitConfig,
) -> Result<ResultEntry, AppError> {
    let mut entry = result_entry(model, attempt)?;

    if let Some(sens) = &config.sensitivity {
        entry.sensitivity = analyse(model, attempt, rank, rows, sens)?;
    }
    if config.derivatives {
        let derivatives = goal_function_derivatives(&attempt.params, rows, model)?;
        entry.goal_derivatives = Some(derivatives.into_iter().collect());
    }
    Ok(entry)
}

/// Sensitivity summary for one optimum.
///
/// Optima the analysis cannot handle (a zero parameter in relative mode, an
/// infinite fitness) are reported without a summary.
fn analyse(
    model: &dyn MaterialModel,
    attempt: &Attempt,
    rank: usize,
    rows: &[DataRow],
    sens: &SensitivityConfig,
) -> Result<Option<crate::domain::SensitivitySummary>, AppError> {
    let options = SensitivityOptions {
        samples: sens.samples,
        relative_deviations: sens.relative_deviations,
        minimum_sensitivity: sens.minimum_sensitivity,
        relative_sensitivity: sens.relative_sensitivity,
        ..SensitivityOptions::uniform(sens.max_deviation, model.parameter_count())
    };

    let mut analysis = match SensitivityAnalysis::new(attempt.params.clone(), model, options) {
        Ok(a) => a,
        Err(e) => {
            tracing::warn!(model = model.name(), method = attempt.method.label(), rank, "sensitivity skipped: {e}");
            return Ok(None);
        }
    };
    if let Err(e) = analysis.run(goal_function, rows) {
        tracing::warn!(model = model.name(), method = attempt.method.label(), rank, "sensitivity skipped: {e}");
        return Ok(None);
    }

    if let Some(dir) = &sens.log_dir {
        let name = format!("{}_{}_{}.csv", model.name(), attempt.method.label(), rank + 1);
        write_sensitivity_csv(&dir.join(name), &analysis.records_by_deviation()?)?;
    }
    Ok(Some(analysis.summary()?))
}
