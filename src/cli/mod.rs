//! Command-line parsing.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{Method, ModelKind};
use crate::fit::{DEFAULT_TOLERANCE, MAX_RESULTS};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "matfit", version, about = "Material model parameters identification tool")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Identify model parameters from experimental data.
    Fit(FitArgs),
    /// Evaluate the goal function and its derivatives for given parameters.
    Eval(EvalArgs),
    /// Generate a synthetic dataset from a model with known parameters.
    Synth(SynthArgs),
    /// Print the tables of a previously written results JSON.
    Report(ReportArgs),
}

#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// CSV file with `strain, strain_rate, temperature, stress` columns.
    #[arg(long, value_name = "CSV")]
    pub input: PathBuf,

    /// Field delimiter. With any delimiter other than `,`, decimal commas are accepted.
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,
}

#[derive(Debug, Clone, Args)]
pub struct FitArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Material models for which the parameters will be determined.
    #[arg(long, value_enum, num_args = 1.., required = true)]
    pub models: Vec<ModelKind>,

    /// Methods which will be used for parameters identification.
    #[arg(long, value_enum, num_args = 1.., required = true)]
    pub methods: Vec<Method>,

    /// Random starts per model-method pair (the swarm size for PSO).
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u16).range(3..=100))]
    pub attempts: u16,

    /// Path to the results JSON.
    #[arg(long, value_name = "JSON")]
    pub output: Option<PathBuf>,

    /// Ranked results kept per model-method pair.
    #[arg(long, default_value_t = MAX_RESULTS)]
    pub max_results: usize,

    /// Convergence tolerance applied to every method.
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    pub tol: f64,

    /// Worker threads (default: available parallelism, or MATFIT_WORKERS).
    #[arg(long, env = "MATFIT_WORKERS")]
    pub workers: Option<usize>,

    /// Seed for the initial guesses; omit for a fresh random search.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Run a sensitivity analysis around every reported optimum.
    #[arg(long)]
    pub sensitivity: bool,

    /// Maximum relative deviation applied to each parameter.
    #[arg(long, default_value_t = 0.05, requires = "sensitivity")]
    pub max_deviation: f64,

    /// Deviation magnitudes tested per parameter and sign.
    #[arg(long, default_value_t = 50, requires = "sensitivity")]
    pub samples: usize,

    /// Significant fitness increase, as a fraction of the optimum's fitness.
    #[arg(long, default_value_t = 1e-3, requires = "sensitivity")]
    pub min_sensitivity: f64,

    /// Treat `--min-sensitivity` as an absolute fitness increase.
    #[arg(long, requires = "sensitivity")]
    pub absolute_sensitivity: bool,

    /// Directory for per-optimum sensitivity logs (CSV).
    #[arg(long, value_name = "DIR", requires = "sensitivity")]
    pub sensitivity_log: Option<PathBuf>,

    /// Attach goal-function derivatives to every result.
    #[arg(long)]
    pub derivatives: bool,
}

#[derive(Debug, Clone, Args)]
pub struct EvalArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[arg(long, value_enum)]
    pub model: ModelKind,

    /// Physical parameter values, in the model's label order.
    #[arg(long, num_args = 1.., required = true, allow_negative_numbers = true)]
    pub params: Vec<f64>,
}

#[derive(Debug, Clone, Args)]
pub struct SynthArgs {
    #[arg(long, value_enum)]
    pub model: ModelKind,

    /// Physical parameter values, in the model's label order.
    #[arg(long, num_args = 1.., required = true, allow_negative_numbers = true)]
    pub params: Vec<f64>,

    /// Output CSV.
    #[arg(long, value_name = "CSV")]
    pub output: PathBuf,

    #[arg(long, num_args = 1.., default_values_t = [1e-3, 1.0, 1e3])]
    pub strain_rates: Vec<f64>,

    #[arg(long, num_args = 1.., default_values_t = [293.15, 473.15, 673.15])]
    pub temperatures: Vec<f64>,

    #[arg(long, default_value_t = 0.02)]
    pub strain_min: f64,

    #[arg(long, default_value_t = 0.5)]
    pub strain_max: f64,

    /// Points per (strain rate, temperature) curve.
    #[arg(long, default_value_t = 25)]
    pub points: usize,

    /// Log-normal noise level.
    #[arg(long, default_value_t = 0.02)]
    pub noise: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[derive(Debug, Clone, Args)]
pub struct ReportArgs {
    /// Results JSON written by `matfit fit --output`.
    #[arg(long, value_name = "JSON")]
    pub results: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fit_command() {
        let cli = Cli::try_parse_from([
            "matfit", "fit", "--input", "data.csv", "--models", "JC", "ZA-BCC", "--methods",
            "Nelder-Mead", "PSO", "--attempts", "5", "--seed", "3",
        ])
        .unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.models, vec![ModelKind::Jc, ModelKind::ZaBcc]);
        assert_eq!(args.methods, vec![Method::NelderMead, Method::Pso]);
        assert_eq!(args.attempts, 5);
        assert_eq!(args.seed, Some(3));
        assert_eq!(args.max_results, MAX_RESULTS);
        assert!(!args.sensitivity);
    }

    #[test]
    fn attempts_outside_range_are_rejected() {
        for n in ["2", "101"] {
            let r = Cli::try_parse_from([
                "matfit", "fit", "--input", "d.csv", "--models", "JC", "--methods", "BFGS",
                "--attempts", n,
            ]);
            assert!(r.is_err(), "attempts={n}");
        }
    }

    #[test]
    fn eval_accepts_negative_parameters() {
        let cli = Cli::try_parse_from([
            "matfit", "eval", "--input", "d.csv", "--model", "ZA-FCC", "--params", "1e8", "-0.5",
            "0.01", "5e7",
        ])
        .unwrap();
        let Command::Eval(args) = cli.command else {
            panic!("expected eval");
        };
        assert_eq!(args.params, vec![1e8, -0.5, 0.01, 5e7]);
    }

    #[test]
    fn parses_report_command() {
        let cli = Cli::try_parse_from(["matfit", "report", "--results", "out.json"]).unwrap();
        let Command::Report(args) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(args.results, PathBuf::from("out.json"));
    }
}
