//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs the log subscriber
//! - parses CLI arguments
//! - runs the fit pipeline, a single evaluation, synthetic data generation,
//!   or a report over saved results
//! - prints reports and writes optional exports

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, EvalArgs, FitArgs, ReportArgs, SynthArgs};
use crate::data::{SynthOptions, generate_dataset};
use crate::domain::{FitConfig, SensitivityConfig};
use crate::error::AppError;
use crate::fit::{SearchConfig, goal_function, goal_function_derivatives};
use crate::models::{ModelInstance, unscale};

pub mod pipeline;

/// Entry point for the `matfit` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::Fit(args) => handle_fit(&args),
        Command::Eval(args) => handle_eval(&args),
        Command::Synth(args) => handle_synth(&args),
        Command::Report(args) => handle_report(&args),
    }
}

fn handle_fit(args: &FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(args)?;
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.ingest.stats, run.ingest.row_errors.len(), &config)
    );
    println!("{}", crate::report::format_results(&run.results));
    if config.sensitivity.is_some() {
        println!("{}", crate::report::format_sensitivity(&run.results));
    }

    if let Some(path) = &config.output {
        crate::io::write_results_json(path, &run.results)?;
        tracing::info!(path = %path.display(), "results written");
    }
    Ok(())
}

fn handle_eval(args: &EvalArgs) -> Result<(), AppError> {
    let model = args.model.capability();
    let raw = unscale(&args.params, model.scaling());
    let instance = ModelInstance::new(model, &raw)?;

    let ingest = crate::io::load_dataset(&args.input.input, delimiter_byte(args.input.delimiter)?)?;
    let fitness = goal_function(&raw, &ingest.rows, model)?;
    let derivatives = goal_function_derivatives(&raw, &ingest.rows, model)?;

    println!(
        "{}",
        crate::report::format_evaluation(model.name(), &instance.labeled(), fitness, &derivatives)
    );
    Ok(())
}

fn handle_synth(args: &SynthArgs) -> Result<(), AppError> {
    let model = args.model.capability();
    let opts = SynthOptions {
        strain_min: args.strain_min,
        strain_max: args.strain_max,
        points_per_curve: args.points,
        strain_rates: args.strain_rates.clone(),
        temperatures: args.temperatures.clone(),
        noise: args.noise,
        seed: args.seed,
    };
    let rows = generate_dataset(model, &args.params, &opts)?;
    crate::io::write_dataset_csv(&args.output, &rows)?;
    tracing::info!(path = %args.output.display(), rows = rows.len(), "synthetic dataset written");
    Ok(())
}

fn handle_report(args: &ReportArgs) -> Result<(), AppError> {
    let results = crate::io::read_results_json(&args.results)?;
    println!(
        "Results from {} ({} rows, generated {})",
        results.meta.input.display(),
        results.meta.rows,
        results.meta.generated.format("%Y-%m-%d %H:%M")
    );
    println!("{}", crate::report::format_results(&results));
    println!("{}", crate::report::format_sensitivity(&results));
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> Result<FitConfig, AppError> {
    let sensitivity = args.sensitivity.then(|| SensitivityConfig {
        max_deviation: args.max_deviation,
        samples: args.samples,
        relative_deviations: true,
        minimum_sensitivity: args.min_sensitivity,
        relative_sensitivity: !args.absolute_sensitivity,
        log_dir: args.sensitivity_log.clone(),
    });

    Ok(FitConfig {
        input: args.input.input.clone(),
        output: args.output.clone(),
        delimiter: delimiter_byte(args.input.delimiter)?,
        models: dedup(&args.models),
        methods: dedup(&args.methods),
        search: SearchConfig {
            attempts: usize::from(args.attempts),
            max_results: args.max_results,
            tolerance: args.tol,
            workers: args.workers,
            seed: args.seed,
        },
        sensitivity,
        derivatives: args.derivatives,
    })
}

fn delimiter_byte(c: char) -> Result<u8, AppError> {
    u8::try_from(c)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| AppError::validation(format!("Delimiter must be a single ASCII character, got '{c}'.")))
}

/// Drop repeated selections, keeping first occurrence order.
fn dedup<T: PartialEq + Copy>(items: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(items.len());
    for &item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Method, ModelKind};

    #[test]
    fn config_from_args_maps_sensitivity_and_search() {
        let cli = crate::cli::Cli::try_parse_from([
            "matfit", "fit", "--input", "d.csv", "--delimiter", ";", "--models", "JC", "JC", "KHL",
            "--methods", "Powell", "--attempts", "4", "--sensitivity", "--max-deviation", "0.1",
            "--absolute-sensitivity",
        ])
        .unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let config = fit_config_from_args(&args).unwrap();
        assert_eq!(config.delimiter, b';');
        assert_eq!(config.models, vec![ModelKind::Jc, ModelKind::Khl]);
        assert_eq!(config.methods, vec![Method::Powell]);
        assert_eq!(config.search.attempts, 4);
        let s = config.sensitivity.unwrap();
        assert!((s.max_deviation - 0.1).abs() < 1e-15);
        assert!(!s.relative_sensitivity);
        assert_eq!(s.samples, 50);
    }

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        assert!(delimiter_byte('é').is_err());
        assert_eq!(delimiter_byte('\t').unwrap(), b'\t');
    }
}
