use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use calamine::{Data, Reader, open_workbook_auto};
use indexmap::IndexMap;

use crate::general::config::InputConfig;
use crate::general::series::{ScalingTable, SeriesSet, TimeSeries};

/// Leading columns that index hours rather than hold a series
const INDEX_COLUMNS: [&str; 3] = ["hour", "time", "h"];

fn is_index_column(header: &str) -> bool {
    INDEX_COLUMNS
        .iter()
        .any(|name| header.trim().eq_ignore_ascii_case(name))
}

/// Parses a number, accepting a decimal comma ("3,67" -> 3.67)
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().trim_matches('"');
    if cleaned.is_empty() {
        return None;
    }
    cleaned.replace(',', ".").parse::<f64>().ok()
}

/// Loads the yearly series table from a CSV file
///
/// # Arguments
/// * `file_path` - CSV with one header row naming the series and 8760 data rows
/// * `delimiter` - field separator, usually `,` or `;`
///
/// # Returns
/// * All series of the table, in column order
pub fn read_series_csv(file_path: &Path, delimiter: u8) -> Result<SeriesSet> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| format!("Failed to open file: {}", file_path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", file_path.display()))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let skip = usize::from(headers.first().is_some_and(|h| is_index_column(h)));
    let names = &headers[skip..];
    let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(8760); names.len()];

    for (line_num, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read line {}", line_num + 2))?;
        for (column, name) in names.iter().enumerate() {
            let raw = record.get(column + skip).unwrap_or("");
            let value = parse_number(raw).ok_or_else(|| {
                anyhow!(
                    "Failed to parse value of '{}' on line {}: '{}'",
                    name,
                    line_num + 2,
                    raw
                )
            })?;
            columns[column].push(value);
        }
    }

    collect_series(names, columns)
}

/// Loads the yearly series table from a worksheet of an Excel workbook
pub fn read_series_xlsx(file_path: &Path, sheet: &str) -> Result<SeriesSet> {
    let mut workbook = open_workbook_auto(file_path)
        .with_context(|| format!("Failed to open workbook: {}", file_path.display()))?;
    let range = workbook
        .worksheet_range(sheet)
        .with_context(|| format!("Sheet '{}' not found in {}", sheet, file_path.display()))?;

    let mut rows = range.rows();
    let header_row = rows
        .next()
        .ok_or_else(|| anyhow!("Sheet '{}' is empty", sheet))?;
    let headers: Vec<String> = header_row.iter().map(|cell| cell.to_string()).collect();
    let skip = usize::from(headers.first().is_some_and(|h| is_index_column(h)));
    let names = &headers[skip..];
    let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(8760); names.len()];

    for (row_num, row) in rows.enumerate() {
        for (column, name) in names.iter().enumerate() {
            let value = match row.get(column + skip) {
                Some(Data::Float(f)) => Some(*f),
                Some(Data::Int(i)) => Some(*i as f64),
                Some(Data::String(s)) => parse_number(s),
                _ => None,
            }
            .ok_or_else(|| {
                anyhow!(
                    "Missing or non-numeric value of '{}' in row {}",
                    name,
                    row_num + 2
                )
            })?;
            columns[column].push(value);
        }
    }

    collect_series(names, columns)
}

fn collect_series(names: &[String], columns: Vec<Vec<f64>>) -> Result<SeriesSet> {
    let mut set = SeriesSet::new();
    for (name, values) in names.iter().zip(columns) {
        set.insert(TimeSeries::new(name.trim(), values)?);
    }
    if set.is_empty() {
        bail!("No series found in input table");
    }
    Ok(set)
}

/// Loads a two-column `name,value` table, e.g. annual demand per end-use
/// category or installed capacity potential per technology
pub fn read_scaling_csv(file_path: &Path, delimiter: u8) -> Result<IndexMap<String, f64>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| format!("Failed to open file: {}", file_path.display()))?;

    let mut table = IndexMap::new();
    for (line_num, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read line {}", line_num + 2))?;
        let name = record
            .get(0)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| anyhow!("Missing name on line {}", line_num + 2))?;
        let raw = record.get(1).unwrap_or("");
        let value = parse_number(raw).ok_or_else(|| {
            anyhow!(
                "Failed to parse value of '{}' on line {}: '{}'",
                name,
                line_num + 2,
                raw
            )
        })?;
        table.insert(name.to_string(), value);
    }
    Ok(table)
}

/// Loads the yearly series and the scaling tables named in the configuration
pub fn load_inputs(config: &InputConfig) -> Result<(SeriesSet, ScalingTable)> {
    let delimiter = config.delimiter.unwrap_or(',');
    if !delimiter.is_ascii() {
        bail!("Delimiter must be an ASCII character, got '{}'", delimiter);
    }
    let delimiter = delimiter as u8;

    let series_path = config
        .series
        .as_deref()
        .ok_or_else(|| anyhow!("No series table configured (inputs.series)"))?;
    let is_workbook = series_path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            matches!(
                ext.to_ascii_lowercase().as_str(),
                "xlsx" | "xlsm" | "xls" | "ods"
            )
        });
    let series = if is_workbook {
        let sheet = config.sheet.as_deref().unwrap_or("Time series");
        read_series_xlsx(series_path, sheet)?
    } else {
        read_series_csv(series_path, delimiter)?
    };

    let mut scaling = ScalingTable::default();
    if let Some(path) = &config.annual_demand {
        scaling.annual_demand = read_scaling_csv(path, delimiter)?;
    }
    if let Some(path) = &config.capacity_potential {
        scaling.capacity_potential = read_scaling_csv(path, delimiter)?;
    }
    Ok((series, scaling))
}
