//! CSV ingest for experimental stress–strain data.
//!
//! Required columns (case-insensitive, BOM-tolerant): `strain`, `strain_rate`,
//! `temperature`, `stress`. Extra columns are ignored.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - Numbers may use a decimal comma (`1,5e8`) when the delimiter is not a comma

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{DataRow, DatasetStats};
use crate::error::AppError;

const REQUIRED_COLUMNS: [&str; 4] = ["strain", "strain_rate", "temperature", "stress"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: usable rows + stats + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub rows: Vec<DataRow>,
    pub stats: DatasetStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load a dataset from a CSV file.
pub fn load_dataset(path: &Path, delimiter: u8) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open CSV '{}': {e}", path.display())))?;
    let data = read_dataset(file, delimiter)?;

    for err in &data.row_errors {
        tracing::warn!(line = err.line, "skipped row: {}", err.message);
    }
    tracing::info!(
        path = %path.display(),
        rows = data.rows.len(),
        skipped = data.row_errors.len(),
        "dataset loaded"
    );
    Ok(data)
}

/// Parse a dataset from any reader.
pub fn read_dataset<R: Read>(reader: R, delimiter: u8) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    ensure_required_columns_exist(&header_map)?;

    let decimal_comma = delimiter != b',';
    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: header line plus 1-based numbering.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map, decimal_comma) {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    let stats = DatasetStats::from_rows(&rows)
        .ok_or_else(|| AppError::input("No valid rows in dataset."))?;

    Ok(IngestedData {
        rows,
        stats,
        row_errors,
        rows_read,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase().replace([' ', '-'], "_")
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), AppError> {
    for name in REQUIRED_COLUMNS {
        if !header_map.contains_key(name) {
            return Err(AppError::input(format!("Missing required column: `{name}`")));
        }
    }
    Ok(())
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    decimal_comma: bool,
) -> Result<DataRow, String> {
    let value = |name: &str| -> Result<f64, String> {
        let raw = get_required(record, header_map, name)?;
        parse_f64(raw, decimal_comma).ok_or_else(|| format!("Invalid `{name}` value '{raw}'."))
    };

    let row = DataRow {
        strain: value("strain")?,
        strain_rate: value("strain_rate")?,
        temperature: value("temperature")?,
        stress: value("stress")?,
    };

    // Relative errors divide by the observed stress.
    if row.stress == 0.0 {
        return Err("`stress` must be non-zero.".to_string());
    }
    Ok(row)
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn parse_f64(s: &str, decimal_comma: bool) -> Option<f64> {
    let v = if decimal_comma && s.contains(',') && !s.contains('.') {
        s.replace(',', ".").parse::<f64>().ok()?
    } else {
        s.parse::<f64>().ok()?
    };
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_required_columns_in_any_order() {
        let csv = "\u{feff}Stress,Temperature,Strain Rate,strain,note\n\
                   3.2e8,293.15,0.001,0.1,a\n\
                   3.5e8,293.15,0.001,0.2,b\n";
        let data = read_dataset(csv.as_bytes(), b',').unwrap();
        assert_eq!(data.rows.len(), 2);
        assert_eq!(data.rows_read, 2);
        assert!(data.row_errors.is_empty());
        let r = data.rows[1];
        assert!((r.strain - 0.2).abs() < 1e-15);
        assert!((r.strain_rate - 1e-3).abs() < 1e-18);
        assert!((r.stress - 3.5e8).abs() < 1e-6);
    }

    #[test]
    fn decimal_comma_with_semicolon_delimiter() {
        let csv = "strain;strain_rate;temperature;stress\n0,15;1;473,15;2,5e8\n";
        let data = read_dataset(csv.as_bytes(), b';').unwrap();
        let r = data.rows[0];
        assert!((r.strain - 0.15).abs() < 1e-15);
        assert!((r.temperature - 473.15).abs() < 1e-12);
        assert!((r.stress - 2.5e8).abs() < 1e-6);
    }

    #[test]
    fn bad_rows_are_skipped_and_reported() {
        let csv = "strain,strain_rate,temperature,stress\n\
                   0.1,0.001,293.15,3e8\n\
                   x,0.001,293.15,3e8\n\
                   0.2,0.001,293.15,0\n\
                   0.3,0.001,293.15,\n";
        let data = read_dataset(csv.as_bytes(), b',').unwrap();
        assert_eq!(data.rows.len(), 1);
        let lines: Vec<usize> = data.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
    }

    #[test]
    fn missing_column_is_an_input_error() {
        let csv = "strain,strain_rate,stress\n0.1,0.001,3e8\n";
        let err = read_dataset(csv.as_bytes(), b',').unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Input);
        assert!(err.message().contains("temperature"));
    }

    #[test]
    fn no_usable_rows_is_an_error() {
        let csv = "strain,strain_rate,temperature,stress\nx,y,z,w\n";
        assert!(read_dataset(csv.as_bytes(), b',').is_err());
    }
}
