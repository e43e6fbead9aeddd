//! The sensitivity engine.
//!
//! Lifecycle: constructed (validated) → `run` once → read-only queries.
//! Every query before `run` and a second `run` both return a state error.
//!
//! Deviations are applied to the raw parameter vector. In relative mode the
//! deviation for parameter `i` at fraction `f` is `f · max_deviation[i] · p[i]`;
//! otherwise it is `f · max_deviation[i]`.

use crate::domain::{DataRow, SensitivitySummary};
use crate::error::AppError;
use crate::models::MaterialModel;

use super::{DeviationSteps, LinearSteps};

/// Knobs for one analysis.
#[derive(Debug, Clone)]
pub struct SensitivityOptions {
    /// Largest deviation per parameter (relative or absolute, see `relative_deviations`).
    pub max_deviation: Vec<f64>,
    pub samples: usize,
    pub relative_deviations: bool,
    /// Fitness increase that counts as significant.
    pub minimum_sensitivity: f64,
    /// Interpret `minimum_sensitivity` as a fraction of the reference fitness.
    pub relative_sensitivity: bool,
}

impl SensitivityOptions {
    /// Defaults with one `max_deviation` applied to every parameter.
    pub fn uniform(max_deviation: f64, parameter_count: usize) -> Self {
        Self {
            max_deviation: vec![max_deviation; parameter_count],
            samples: 50,
            relative_deviations: true,
            minimum_sensitivity: 1e-3,
            relative_sensitivity: true,
        }
    }
}

/// One perturbed evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct SensitivityRecord {
    pub parameter: usize,
    pub label: &'static str,
    /// Signed deviation applied to the raw parameter.
    pub deviation: f64,
    /// Perturbed fitness minus reference fitness.
    pub fitness_change: f64,
}

#[derive(Debug, Clone)]
struct Outcome {
    reference_fitness: f64,
    threshold: f64,
    success: bool,
    maximum_sensitivity: Vec<f64>,
    deviation_at_minimum_sensitivity: Vec<f64>,
    records: Vec<SensitivityRecord>,
}

#[derive(Debug, Clone)]
enum State {
    NotStarted,
    Completed(Outcome),
}

pub struct SensitivityAnalysis<'m, S: DeviationSteps = LinearSteps> {
    parameters: Vec<f64>,
    model: &'m dyn MaterialModel,
    options: SensitivityOptions,
    steps: S,
    state: State,
}

impl<'m> SensitivityAnalysis<'m, LinearSteps> {
    pub fn new(
        parameters: Vec<f64>,
        model: &'m dyn MaterialModel,
        options: SensitivityOptions,
    ) -> Result<Self, AppError> {
        Self::with_steps(parameters, model, options, LinearSteps)
    }
}

impl<'m, S: DeviationSteps> SensitivityAnalysis<'m, S> {
    pub fn with_steps(
        parameters: Vec<f64>,
        model: &'m dyn MaterialModel,
        options: SensitivityOptions,
        steps: S,
    ) -> Result<Self, AppError> {
        let n = model.parameter_count();
        if parameters.len() != n {
            return Err(AppError::validation(format!(
                "parameters' length must match the model's parameter count ({n}), got {}.",
                parameters.len()
            )));
        }
        if options.samples < 1 {
            return Err(AppError::validation("samples must be a positive value."));
        }
        if options.max_deviation.len() != n {
            return Err(AppError::validation(format!(
                "max_deviation's length must match the model's parameter count ({n}), got {}.",
                options.max_deviation.len()
            )));
        }
        if options.max_deviation.iter().any(|d| !(*d >= 0.0)) {
            return Err(AppError::validation(
                "max_deviation must consist of non-negative values.",
            ));
        }
        if !(options.minimum_sensitivity > 0.0) {
            return Err(AppError::validation("minimum_sensitivity must be a positive value."));
        }
        if options.relative_deviations && parameters.iter().any(|p| *p == 0.0) {
            return Err(AppError::validation(
                "relative_deviations cannot be enabled when any parameter is zero.",
            ));
        }

        Ok(Self {
            parameters,
            model,
            options,
            steps,
            state: State::NotStarted,
        })
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, State::Completed(_))
    }

    pub fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    pub fn options(&self) -> &SensitivityOptions {
        &self.options
    }

    /// Perturb every parameter and record the goal-function response.
    pub fn run<G>(&mut self, goal: G, rows: &[DataRow]) -> Result<(), AppError>
    where
        G: Fn(&[f64], &[DataRow], &dyn MaterialModel) -> Result<f64, AppError>,
    {
        if self.is_completed() {
            return Err(AppError::state("Analysis is already completed."));
        }

        let fractions = self.steps.fractions(self.options.samples);
        if fractions.iter().any(|f| !(*f > 0.0 && *f <= 1.0)) {
            return Err(AppError::validation(
                "Deviation steps must lie in the interval (0, 1].",
            ));
        }

        let reference = goal(&self.parameters, rows, self.model)?;
        if !reference.is_finite() {
            return Err(AppError::validation(
                "Reference fitness is not finite; nothing to analyse.",
            ));
        }
        let threshold = if self.options.relative_sensitivity {
            self.options.minimum_sensitivity * reference
        } else {
            self.options.minimum_sensitivity
        };

        let n = self.parameters.len();
        let labels = self.model.labels();
        let mut maximum = vec![0.0; n];
        let mut at_minimum: Vec<f64> = (0..n).map(|i| self.unit_deviation(i).abs()).collect();
        let mut met = vec![false; n];
        let mut records = Vec::with_capacity(n * fractions.len() * 2);
        let mut work = self.parameters.clone();

        for i in 0..n {
            let unit = self.unit_deviation(i);
            for &fraction in &fractions {
                for deviation in [fraction * unit, -fraction * unit] {
                    work[i] = self.parameters[i] + deviation;
                    let change = goal(&work, rows, self.model)? - reference;
                    work[i] = self.parameters[i];

                    records.push(SensitivityRecord {
                        parameter: i,
                        label: labels[i],
                        deviation,
                        fitness_change: change,
                    });

                    if change > maximum[i] {
                        maximum[i] = change;
                    }
                    // A zero threshold (relative mode at an exact fit) still
                    // requires some increase.
                    if change >= threshold && change > 0.0 {
                        let tighter = deviation.abs() < at_minimum[i].abs();
                        if tighter || (!met[i] && deviation.abs() <= at_minimum[i].abs()) {
                            at_minimum[i] = deviation;
                        }
                        met[i] = true;
                    }
                }
            }
        }

        let success = maximum.iter().all(|&m| m >= threshold && m > 0.0);
        tracing::debug!(
            model = self.model.name(),
            reference,
            threshold,
            success,
            evaluations = records.len() + 1,
            "sensitivity analysis completed"
        );

        self.state = State::Completed(Outcome {
            reference_fitness: reference,
            threshold,
            success,
            maximum_sensitivity: maximum,
            deviation_at_minimum_sensitivity: at_minimum,
            records,
        });
        Ok(())
    }

    /// Deviation at fraction 1 for parameter `i`.
    fn unit_deviation(&self, i: usize) -> f64 {
        if self.options.relative_deviations {
            self.options.max_deviation[i] * self.parameters[i]
        } else {
            self.options.max_deviation[i]
        }
    }

    fn outcome(&self) -> Result<&Outcome, AppError> {
        match &self.state {
            State::Completed(outcome) => Ok(outcome),
            State::NotStarted => Err(AppError::state("Analysis has not been carried out yet.")),
        }
    }

    /// Every parameter's maximum fitness increase met the threshold.
    pub fn success(&self) -> Result<bool, AppError> {
        Ok(self.outcome()?.success)
    }

    /// Largest fitness increase seen per parameter (never negative).
    pub fn maximum_sensitivity(&self) -> Result<&[f64], AppError> {
        Ok(&self.outcome()?.maximum_sensitivity)
    }

    /// Smallest signed deviation per parameter whose fitness increase met the
    /// threshold; the largest applied deviation when none did.
    pub fn deviation_at_minimum_sensitivity(&self) -> Result<&[f64], AppError> {
        Ok(&self.outcome()?.deviation_at_minimum_sensitivity)
    }

    /// Effective threshold used by the run.
    pub fn threshold(&self) -> Result<f64, AppError> {
        Ok(self.outcome()?.threshold)
    }

    pub fn reference_fitness(&self) -> Result<f64, AppError> {
        Ok(self.outcome()?.reference_fitness)
    }

    /// Records in evaluation order.
    pub fn records(&self) -> Result<&[SensitivityRecord], AppError> {
        Ok(&self.outcome()?.records)
    }

    /// Records sorted by signed deviation (stable).
    pub fn records_by_deviation(&self) -> Result<Vec<SensitivityRecord>, AppError> {
        let mut records = self.outcome()?.records.clone();
        records.sort_by(|a, b| a.deviation.total_cmp(&b.deviation));
        Ok(records)
    }

    /// Labeled summary for export.
    pub fn summary(&self) -> Result<SensitivitySummary, AppError> {
        let outcome = self.outcome()?;
        let labels = self.model.labels();
        let keyed = |values: &[f64]| {
            labels
                .iter()
                .zip(values.iter())
                .map(|(l, v)| (l.to_string(), *v))
                .collect()
        };
        Ok(SensitivitySummary {
            success: outcome.success,
            reference_fitness: outcome.reference_fitness,
            threshold: outcome.threshold,
            maximum_sensitivity: keyed(&outcome.maximum_sensitivity),
            deviation_at_minimum_sensitivity: keyed(&outcome.deviation_at_minimum_sensitivity),
        })
    }
}
