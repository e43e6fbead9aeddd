//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for comparisons

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::models::{
    JohnsonCook, KhanHuangLiang, MaterialModel, ModifiedJohnsonCook, ZerilliArmstrongBcc,
    ZerilliArmstrongFcc,
};

/// One experimental observation.
///
/// Units are SI: strain is dimensionless, strain rate in 1/s, temperature in K,
/// stress in Pa.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataRow {
    pub strain: f64,
    pub strain_rate: f64,
    pub temperature: f64,
    pub stress: f64,
}

/// Supported constitutive models.
///
/// This is the registry of model identifiers accepted on the command line; each
/// kind resolves to a stateless capability implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
pub enum ModelKind {
    #[serde(rename = "JC")]
    #[value(name = "JC")]
    Jc,
    #[serde(rename = "MJC")]
    #[value(name = "MJC")]
    Mjc,
    #[serde(rename = "ZA-FCC")]
    #[value(name = "ZA-FCC")]
    ZaFcc,
    #[serde(rename = "ZA-BCC")]
    #[value(name = "ZA-BCC")]
    ZaBcc,
    #[serde(rename = "KHL")]
    #[value(name = "KHL")]
    Khl,
}

impl ModelKind {
    pub const ALL: [ModelKind; 5] = [
        ModelKind::Jc,
        ModelKind::Mjc,
        ModelKind::ZaFcc,
        ModelKind::ZaBcc,
        ModelKind::Khl,
    ];

    /// Short identifier used on the command line and in exports.
    pub fn id(self) -> &'static str {
        match self {
            ModelKind::Jc => "JC",
            ModelKind::Mjc => "MJC",
            ModelKind::ZaFcc => "ZA-FCC",
            ModelKind::ZaBcc => "ZA-BCC",
            ModelKind::Khl => "KHL",
        }
    }

    pub fn capability(self) -> &'static dyn MaterialModel {
        match self {
            ModelKind::Jc => &JohnsonCook,
            ModelKind::Mjc => &ModifiedJohnsonCook,
            ModelKind::ZaFcc => &ZerilliArmstrongFcc,
            ModelKind::ZaBcc => &ZerilliArmstrongBcc,
            ModelKind::Khl => &KhanHuangLiang,
        }
    }
}

/// Optimization methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
pub enum Method {
    #[serde(rename = "Nelder-Mead")]
    #[value(name = "Nelder-Mead")]
    NelderMead,
    #[serde(rename = "Powell")]
    #[value(name = "Powell")]
    Powell,
    #[serde(rename = "BFGS")]
    #[value(name = "BFGS")]
    Bfgs,
    /// Particle swarm: one task per group, `attempts` is the swarm size.
    #[serde(rename = "PSO")]
    #[value(name = "PSO")]
    Pso,
}

impl Method {
    pub fn label(self) -> &'static str {
        match self {
            Method::NelderMead => "Nelder-Mead",
            Method::Powell => "Powell",
            Method::Bfgs => "BFGS",
            Method::Pso => "PSO",
        }
    }

    pub fn is_swarm(self) -> bool {
        matches!(self, Method::Pso)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Summary stats about the rows actually used for fitting.
#[derive(Debug, Clone)]
pub struct DatasetStats {
    pub n_rows: usize,
    pub strain_min: f64,
    pub strain_max: f64,
    pub stress_min: f64,
    pub stress_max: f64,
    /// Distinct strain rates, ascending.
    pub strain_rates: Vec<f64>,
    /// Distinct temperatures, ascending.
    pub temperatures: Vec<f64>,
}

impl DatasetStats {
    pub fn from_rows(rows: &[DataRow]) -> Option<Self> {
        let first = rows.first()?;
        let mut stats = DatasetStats {
            n_rows: rows.len(),
            strain_min: first.strain,
            strain_max: first.strain,
            stress_min: first.stress,
            stress_max: first.stress,
            strain_rates: Vec::new(),
            temperatures: Vec::new(),
        };
        for r in rows {
            stats.strain_min = stats.strain_min.min(r.strain);
            stats.strain_max = stats.strain_max.max(r.strain);
            stats.stress_min = stats.stress_min.min(r.stress);
            stats.stress_max = stats.stress_max.max(r.stress);
            push_distinct(&mut stats.strain_rates, r.strain_rate);
            push_distinct(&mut stats.temperatures, r.temperature);
        }
        stats
            .strain_rates
            .sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        stats
            .temperatures
            .sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Some(stats)
    }
}

fn push_distinct(values: &mut Vec<f64>, v: f64) {
    if !values.iter().any(|&x| x == v) {
        values.push(v);
    }
}

/// Sensitivity settings as given on the command line.
///
/// A single `max_deviation` is broadcast to every parameter of the analysed model.
#[derive(Debug, Clone)]
pub struct SensitivityConfig {
    pub max_deviation: f64,
    pub samples: usize,
    pub relative_deviations: bool,
    pub minimum_sensitivity: f64,
    pub relative_sensitivity: bool,
    /// Directory receiving one CSV log per analysed optimum.
    pub log_dir: Option<PathBuf>,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub delimiter: u8,
    pub models: Vec<ModelKind>,
    pub methods: Vec<Method>,
    pub search: crate::fit::SearchConfig,
    pub sensitivity: Option<SensitivityConfig>,
    /// Attach goal-function derivatives to every exported result.
    pub derivatives: bool,
}

/// Sensitivity verdict attached to an exported result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivitySummary {
    pub success: bool,
    pub reference_fitness: f64,
    pub threshold: f64,
    pub maximum_sensitivity: BTreeMap<String, f64>,
    pub deviation_at_minimum_sensitivity: BTreeMap<String, f64>,
}

/// One exported parameter set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEntry {
    /// Physical (scaled) parameter values keyed by label.
    pub params: BTreeMap<String, f64>,
    pub fitness: f64,
    /// Root-mean-square relative deviation in percent: `100 * sqrt(fitness)`.
    pub deviation_percentage: f64,
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<SensitivitySummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_derivatives: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub tool: String,
    pub generated: DateTime<Local>,
    pub input: PathBuf,
    pub rows: usize,
    pub attempts: usize,
    pub tolerance: f64,
    pub max_results: usize,
}

/// The results JSON file: model id -> method label -> ranked entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsFile {
    pub meta: RunMeta,
    pub results: BTreeMap<String, BTreeMap<String, Vec<ResultEntry>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_stats_collect_distinct_conditions() {
        let rows = [
            DataRow { strain: 0.2, strain_rate: 1.0, temperature: 293.15, stress: 3e8 },
            DataRow { strain: 0.1, strain_rate: 1e-3, temperature: 293.15, stress: 2e8 },
            DataRow { strain: 0.3, strain_rate: 1.0, temperature: 473.15, stress: 2.5e8 },
        ];
        let stats = DatasetStats::from_rows(&rows).unwrap();
        assert_eq!(stats.n_rows, 3);
        assert_eq!(stats.strain_rates, vec![1e-3, 1.0]);
        assert_eq!(stats.temperatures, vec![293.15, 473.15]);
        assert!((stats.strain_min - 0.1).abs() < 1e-12);
        assert!((stats.stress_max - 3e8).abs() < 1e-3);
    }

    #[test]
    fn dataset_stats_empty_is_none() {
        assert!(DatasetStats::from_rows(&[]).is_none());
    }

    #[test]
    fn model_kind_ids_match_capabilities() {
        for kind in ModelKind::ALL {
            let model = kind.capability();
            assert_eq!(model.name(), kind.id());
            assert_eq!(model.labels().len(), model.scaling().len());
        }
    }

    #[test]
    fn only_pso_is_a_swarm() {
        assert!(Method::Pso.is_swarm());
        assert!(!Method::NelderMead.is_swarm());
        assert!(!Method::Powell.is_swarm());
        assert!(!Method::Bfgs.is_swarm());
    }
}
