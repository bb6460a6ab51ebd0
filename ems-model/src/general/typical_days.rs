use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

/// Annual sums and correction factor of one series after aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[ts(export, export_to = "./series_correction_summary.ts")]
pub struct SeriesCorrectionSummary {
    pub name: String,
    /// Sum of the series over the 8760 hours of the year
    pub true_annual_sum: f64,
    /// Sum implied by the typical days scaled by their day counts
    pub reconstructed_annual_sum: f64,
    pub correction_factor: f64,
}

/// Outcome of a typical-day aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[ts(export, export_to = "./typical_day_summary.ts")]
pub struct TypicalDaySummary {
    /// Number of typical days
    pub nbr_tds: usize,
    /// Calendar day (1..=365) standing for each typical day
    pub representative_days: Vec<usize>,
    /// Number of calendar days each typical day stands for
    pub day_counts: Vec<usize>,
    /// Year-wide heating peak over the peak of the typical days
    pub peak_sh_factor: f64,
    pub series: Vec<SeriesCorrectionSummary>,
}
