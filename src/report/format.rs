//! Formatted terminal output.
//!
//! We keep formatting code in one place so the fitting code stays clean and
//! output changes are localized.

use std::collections::BTreeMap;

use crate::domain::{DatasetStats, FitConfig, ResultEntry, ResultsFile};

/// Dataset and run settings header.
pub fn format_run_summary(stats: &DatasetStats, skipped_rows: usize, config: &FitConfig) -> String {
    let mut out = String::new();

    out.push_str("=== matfit - material model parameter identification ===\n");
    out.push_str(&format!("Input: {}\n", config.input.display()));
    out.push_str(&format!(
        "Rows: n={} (skipped {skipped_rows}) | strain=[{:.4}, {:.4}] | stress=[{:.3e}, {:.3e}] Pa\n",
        stats.n_rows, stats.strain_min, stats.strain_max, stats.stress_min, stats.stress_max
    ));
    out.push_str(&format!("Strain rates [1/s]: {}\n", fmt_list(&stats.strain_rates, 3)));
    out.push_str(&format!("Temperatures [K]: {}\n", fmt_list(&stats.temperatures, 2)));

    let models: Vec<&str> = config.models.iter().map(|m| m.id()).collect();
    let methods: Vec<&str> = config.methods.iter().map(|m| m.label()).collect();
    out.push_str(&format!("Models: {}\n", models.join(", ")));
    out.push_str(&format!("Methods: {}\n", methods.join(", ")));
    out.push_str(&format!(
        "Attempts: {} | tol={:e} | keep top {}\n",
        config.search.attempts, config.search.tolerance, config.search.max_results
    ));
    out
}

/// Ranked tables, one per (model, method).
pub fn format_results(results: &ResultsFile) -> String {
    let mut out = String::new();
    for (model, by_method) in &results.results {
        for (method, entries) in by_method {
            out.push_str(&format!("\n{model} / {method}:\n"));
            out.push_str(&format_table(entries));
        }
    }
    out
}

fn format_table(entries: &[ResultEntry]) -> String {
    let mut out = String::new();
    let Some(first) = entries.first() else {
        out.push_str("  (no results)\n");
        return out;
    };
    let labels: Vec<&String> = first.params.keys().collect();

    let mut header = format!("{:>3} {:>12} {:>8} {:>6}", "#", "fitness", "dev%", "ident");
    for l in &labels {
        header.push_str(&format!(" {:>12}", truncate(l, 12)));
    }
    out.push_str(header.trim_end());
    out.push('\n');

    let width = header.chars().count();
    out.push_str(&"-".repeat(width));
    out.push('\n');

    for (rank, e) in entries.iter().enumerate() {
        let ident = match &e.sensitivity {
            Some(s) if s.success => "yes",
            Some(_) => "no",
            None => "-",
        };
        let mut line = format!(
            "{:>3} {:>12.4e} {:>8.3} {:>6}",
            rank + 1,
            e.fitness,
            e.deviation_percentage,
            ident
        );
        for l in &labels {
            let v = e.params.get(*l).copied().unwrap_or(f64::NAN);
            line.push_str(&format!(" {:>12.4e}", v));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Fitness and goal-function derivatives for one parameter set.
pub fn format_evaluation(
    model: &str,
    params: &[(&'static str, f64)],
    fitness: f64,
    derivatives: &[(String, f64)],
) -> String {
    let mut out = String::new();
    out.push_str(&format!("Model: {model}\n"));
    out.push_str(&format!("Parameters: {}\n", fmt_labeled(params.iter().map(|(l, v)| (*l, *v)))));
    out.push_str(&format!(
        "Fitness: {fitness:.6e} (deviation {:.3}%)\n",
        super::deviation_percentage(fitness)
    ));
    out.push_str("Goal derivatives:\n");
    for (label, value) in derivatives {
        out.push_str(&format!("  {label:<10} {value:>14.6e}\n"));
    }
    out
}

/// Per-parameter sensitivity verdicts for the best entry of each group.
pub fn format_sensitivity(results: &ResultsFile) -> String {
    let mut out = String::new();
    for (model, by_method) in &results.results {
        for (method, entries) in by_method {
            let Some(s) = entries.first().and_then(|e| e.sensitivity.as_ref()) else {
                continue;
            };
            out.push_str(&format!(
                "\n{model} / {method} best: identifiable={} threshold={:.3e}\n",
                s.success, s.threshold
            ));
            out.push_str(&format!("  max sensitivity: {}\n", fmt_map(&s.maximum_sensitivity)));
            out.push_str(&format!(
                "  deviation at threshold: {}\n",
                fmt_map(&s.deviation_at_minimum_sensitivity)
            ));
        }
    }
    out
}

fn fmt_list(v: &[f64], precision: usize) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.precision$}")).collect();
    format!("[{}]", parts.join(", "))
}

fn fmt_map(m: &BTreeMap<String, f64>) -> String {
    fmt_labeled(m.iter().map(|(k, v)| (k.as_str(), *v)))
}

fn fmt_labeled<'a>(items: impl Iterator<Item = (&'a str, f64)>) -> String {
    let parts: Vec<String> = items.map(|(k, v)| format!("{k}={v:.4e}")).collect();
    parts.join(", ")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
