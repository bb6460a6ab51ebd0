use ems_model::general::{DAYS_PER_YEAR, HOURS_PER_DAY};

use crate::general::error::{Result, TdError};
use crate::general::series::{SeriesId, SeriesSet, TimeSeries};
use crate::typical_days::weights::SeriesWeights;

/// Borrowed 365x24 view of a yearly series, one row per calendar day.
#[derive(Debug, Clone, Copy)]
pub struct DailyMatrix<'a> {
    values: &'a [f64],
}

impl<'a> DailyMatrix<'a> {
    pub fn new(series: &'a TimeSeries) -> Self {
        Self {
            values: series.values(),
        }
    }

    /// Row of calendar day `day` (1..=365)
    pub fn row(&self, day: usize) -> &'a [f64] {
        let start = (day - 1) * HOURS_PER_DAY;
        &self.values[start..start + HOURS_PER_DAY]
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a [f64]> {
        self.values.chunks_exact(HOURS_PER_DAY)
    }
}

/// A column of the weighted matrix: one hour of the day of one series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixColumn {
    pub series: SeriesId,
    /// Hour of the day, 1..=24
    pub hour: usize,
}

/// The 365-row matrix handed to the day selection: every included series
/// contributes 24 columns scaled by its normalized weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedDailyMatrix {
    columns: Vec<MatrixColumn>,
    rows: Vec<Vec<f64>>,
}

impl WeightedDailyMatrix {
    /// Builds the matrix from the series that carry a normalized weight.
    /// Columns are ordered series first, then hour.
    pub fn build(series: &SeriesSet, weights: &SeriesWeights) -> Result<Self> {
        let mut included = Vec::new();
        for (id, weight) in weights.included() {
            let ts = series
                .get(id)
                .ok_or_else(|| TdError::UnknownSeries(format!("series #{}", id.0)))?;
            included.push((id, DailyMatrix::new(ts), weight));
        }

        let columns: Vec<MatrixColumn> = included
            .iter()
            .flat_map(|(id, _, _)| {
                (1..=HOURS_PER_DAY).map(move |hour| MatrixColumn { series: *id, hour })
            })
            .collect();

        let rows = (1..=DAYS_PER_YEAR)
            .map(|day| {
                let mut row = Vec::with_capacity(columns.len());
                for (_, daily, weight) in &included {
                    row.extend(daily.row(day).iter().map(|v| v * weight));
                }
                row
            })
            .collect();

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[MatrixColumn] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Row of calendar day `day` (1..=365)
    pub fn row(&self, day: usize) -> &[f64] {
        &self.rows[day - 1]
    }

    /// Squared Euclidean distance between two calendar days
    pub fn distance(&self, day_a: usize, day_b: usize) -> f64 {
        self.row(day_a)
            .iter()
            .zip(self.row(day_b))
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    pub fn contains_series(&self, series: SeriesId) -> bool {
        self.columns.iter().any(|c| c.series == series)
    }
}
