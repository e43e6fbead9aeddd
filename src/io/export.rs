//! Result exports.
//!
//! - ranked results as JSON (`ResultsFile` schema)
//! - sensitivity logs as CSV, one file per analysed optimum
//! - synthetic datasets as CSV (same columns `load_dataset` expects)

use std::fs::File;
use std::path::Path;

use crate::domain::{DataRow, ResultsFile};
use crate::error::AppError;
use crate::sensitivity::SensitivityRecord;

/// Write the results JSON file.
pub fn write_results_json(path: &Path, results: &ResultsFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create results JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, results)
        .map_err(|e| AppError::input(format!("Failed to write results JSON: {e}")))?;
    Ok(())
}

/// Read a results JSON file written by [`write_results_json`].
pub fn read_results_json(path: &Path) -> Result<ResultsFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open results JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::input(format!("Invalid results JSON: {e}")))
}

/// Write a sensitivity log: `parameter,deviation,gf_change`, rows in the given order.
pub fn write_sensitivity_csv(path: &Path, records: &[SensitivityRecord]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| {
        AppError::input(format!("Failed to create sensitivity CSV '{}': {e}", path.display()))
    })?;
    let write_err = |e: csv::Error| AppError::input(format!("Failed to write sensitivity CSV: {e}"));

    writer
        .write_record(["parameter", "deviation", "gf_change"])
        .map_err(write_err)?;
    for r in records {
        writer
            .write_record([
                r.label.to_string(),
                format!("{:e}", r.deviation),
                format!("{:e}", r.fitness_change),
            ])
            .map_err(write_err)?;
    }
    writer
        .flush()
        .map_err(|e| AppError::input(format!("Failed to flush sensitivity CSV: {e}")))?;
    Ok(())
}

/// Write rows as `strain,strain_rate,temperature,stress`.
pub fn write_dataset_csv(path: &Path, rows: &[DataRow]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::input(format!("Failed to create dataset CSV '{}': {e}", path.display())))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::input(format!("Failed to write dataset CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::input(format!("Failed to flush dataset CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::load_dataset;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("matfit-{}-{name}", std::process::id()))
    }

    #[test]
    fn dataset_csv_reloads() {
        let rows = vec![
            DataRow { strain: 0.1, strain_rate: 1e-3, temperature: 293.15, stress: 3.1e8 },
            DataRow { strain: 0.2, strain_rate: 10.0, temperature: 573.15, stress: 2.9e8 },
        ];
        let path = temp_path("dataset.csv");
        write_dataset_csv(&path, &rows).unwrap();
        let back = load_dataset(&path, b',').unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(back.rows, rows);
    }

    #[test]
    fn results_json_reads_back() {
        use std::collections::BTreeMap;

        use crate::domain::{Method, ResultEntry, RunMeta};

        let entry = ResultEntry {
            params: BTreeMap::from([("A".to_string(), 3e8), ("n".to_string(), 0.4)]),
            fitness: 4e-4,
            deviation_percentage: 2.0,
            method: Method::Bfgs,
            sensitivity: None,
            goal_derivatives: Some(BTreeMap::from([("dF/dA".to_string(), -1.5e-9)])),
        };
        let results = ResultsFile {
            meta: RunMeta {
                tool: "matfit".to_string(),
                generated: chrono::Local::now(),
                input: "data.csv".into(),
                rows: 12,
                attempts: 3,
                tolerance: 2.5e-3,
                max_results: 5,
            },
            results: BTreeMap::from([(
                "JC".to_string(),
                BTreeMap::from([("BFGS".to_string(), vec![entry])]),
            )]),
        };
        let path = temp_path("results.json");
        write_results_json(&path, &results).unwrap();
        let back = read_results_json(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(back.meta.rows, 12);
        let e = &back.results["JC"]["BFGS"][0];
        assert_eq!(e.method, Method::Bfgs);
        assert_eq!(e.params["A"], 3e8);
        assert_eq!(e.goal_derivatives.as_ref().unwrap()["dF/dA"], -1.5e-9);
    }

    #[test]
    fn missing_results_json_is_an_input_error() {
        let err = read_results_json(&temp_path("absent.json")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Input);
    }

    #[test]
    fn sensitivity_csv_has_header_and_rows() {
        let records = vec![
            SensitivityRecord { parameter: 0, label: "A", deviation: -0.1, fitness_change: 0.02 },
            SensitivityRecord { parameter: 0, label: "A", deviation: 0.1, fitness_change: 0.03 },
        ];
        let path = temp_path("sens.csv");
        write_sensitivity_csv(&path, &records).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "parameter,deviation,gf_change");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("A,-1e-1,"));
    }
}
