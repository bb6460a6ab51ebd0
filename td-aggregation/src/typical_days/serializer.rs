use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ems_model::general::{HOURS_PER_DAY, OutputBinding};
use indexmap::IndexMap;

use crate::general::error::{Result, TdError};
use crate::typical_days::correction::TdSeries;
use crate::typical_days::daily::WeightedDailyMatrix;
use crate::typical_days::reconstruction::Reconstruction;

/// Writes the input of the day selection model: the column set, the target
/// number of typical days and the weighted matrix `Ndata{DAYS, DIMENSIONS}`.
pub fn write_selection_data_to<W: Write>(
    out: &mut W,
    matrix: &WeightedDailyMatrix,
    nbr_tds: usize,
) -> std::io::Result<()> {
    let dimensions = matrix.columns().len();
    writeln!(out, "# Weighted daily data for typical day selection")?;
    writeln!(out, "# {} days x {} dimensions", matrix.rows().len(), dimensions)?;
    writeln!(out)?;

    write!(out, "set DIMENSIONS :=")?;
    for column in 1..=dimensions {
        write!(out, " {}", column)?;
    }
    writeln!(out, ";")?;
    writeln!(out)?;

    writeln!(out, "param Nbr_TD := {};", nbr_tds)?;
    writeln!(out)?;

    writeln!(out, "param Ndata :")?;
    for column in 1..=dimensions {
        write!(out, "\t{}", column)?;
    }
    writeln!(out, " :=")?;
    for (index, row) in matrix.rows().iter().enumerate() {
        write!(out, "{}", index + 1)?;
        for value in row {
            write!(out, "\t{}", value)?;
        }
        writeln!(out)?;
    }
    writeln!(out, ";")
}

pub fn render_selection_data(matrix: &WeightedDailyMatrix, nbr_tds: usize) -> Result<String> {
    let mut out = Vec::new();
    write_selection_data_to(&mut out, matrix, nbr_tds)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

pub fn write_selection_data(
    path: &Path,
    matrix: &WeightedDailyMatrix,
    nbr_tds: usize,
) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    write_selection_data_to(&mut file, matrix, nbr_tds)?;
    file.flush()?;
    Ok(())
}

/// Everything the downstream optimization needs from the aggregation
#[derive(Debug, Clone)]
pub struct ModelData<'a> {
    pub reconstruction: &'a Reconstruction,
    pub peak_sh_factor: f64,
    pub series: Vec<(OutputBinding, &'a TdSeries)>,
}

/// Series of one model parameter, with their slice keys
type ParamGroups<'a> = IndexMap<&'a str, Vec<(Option<&'a str>, &'a TdSeries)>>;

/// Groups the series by parameter. Series sharing a parameter must all
/// carry a slice key.
fn group_params<'a>(data: &'a ModelData) -> Result<ParamGroups<'a>> {
    let mut params: ParamGroups = IndexMap::new();
    for (binding, series) in &data.series {
        params
            .entry(binding.param.as_str())
            .or_default()
            .push((binding.key.as_deref(), *series));
    }
    for (param, entries) in &params {
        if entries.len() > 1 && entries.iter().any(|(key, _)| key.is_none()) {
            return Err(TdError::Config(format!(
                "parameter '{}' is shared by several series but not every series has a key",
                param
            )));
        }
    }
    Ok(params)
}

/// Writes an `hour x typical day` table body (rows 1..=24, columns 1..=N)
fn write_td_table<W: Write>(out: &mut W, series: &TdSeries, nbr_tds: usize) -> std::io::Result<()> {
    for td in 1..=nbr_tds {
        write!(out, "\t{}", td)?;
    }
    writeln!(out, " :=")?;
    for hour in 1..=HOURS_PER_DAY {
        write!(out, "{}", hour)?;
        for td in 1..=nbr_tds {
            write!(out, "\t{}", series.value(hour, td))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Writes the model data file: `nbr_tds`, `peak_sh_factor`, the `T_H_TD`
/// set and one `(hour, typical day)` table per parameter. Series sharing a
/// parameter are written as keyed slices of one statement.
fn write_model_data_to<W: Write>(
    out: &mut W,
    data: &ModelData,
    params: &ParamGroups,
) -> std::io::Result<()> {
    let nbr_tds = data.reconstruction.nbr_tds();
    writeln!(out, "# Typical day data")?;
    writeln!(out, "# {} typical days", nbr_tds)?;
    writeln!(out)?;
    writeln!(out, "param nbr_tds := {};", nbr_tds)?;
    writeln!(out)?;
    writeln!(out, "param peak_sh_factor := {};", data.peak_sh_factor)?;
    writeln!(out)?;

    writeln!(out, "set T_H_TD :=")?;
    for mapping in data.reconstruction.table() {
        writeln!(
            out,
            "({},{},{})",
            mapping.hour_of_year, mapping.hour_of_day, mapping.td
        )?;
    }
    writeln!(out, ";")?;

    for (param, entries) in params {
        writeln!(out)?;
        match entries.as_slice() {
            [(None, series)] => {
                writeln!(out, "param {} :", param)?;
                write_td_table(out, series, nbr_tds)?;
            }
            _ => {
                writeln!(out, "param {} :=", param)?;
                for (key, series) in entries {
                    let key = key.unwrap_or(series.name.as_str());
                    writeln!(out, "[\"{}\",*,*] :", key)?;
                    write_td_table(out, series, nbr_tds)?;
                }
            }
        }
        writeln!(out, ";")?;
    }
    Ok(())
}

pub fn render_model_data(data: &ModelData) -> Result<String> {
    let params = group_params(data)?;
    let mut out = Vec::new();
    write_model_data_to(&mut out, data, &params)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Writes the model data file; nothing is written if the bindings conflict
pub fn write_model_data(path: &Path, data: &ModelData) -> Result<()> {
    let params = group_params(data)?;
    let mut file = BufWriter::new(File::create(path)?);
    write_model_data_to(&mut file, data, &params)?;
    file.flush()?;
    Ok(())
}
