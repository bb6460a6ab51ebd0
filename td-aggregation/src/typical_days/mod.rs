//! Selection of typical days and reconstruction of the year from them.
//!
//! Weights -> weighted daily matrix -> day selection -> reconstruction ->
//! annual correction -> model data file.

pub mod assignment;
pub mod correction;
pub mod daily;
pub mod milp;
pub mod pipeline;
pub mod reconstruction;
pub mod selection;
pub mod serializer;
pub mod weights;

pub use assignment::DayAssignment;
pub use correction::{TdSeries, correct_series, peak_factor};
pub use daily::{DailyMatrix, MatrixColumn, WeightedDailyMatrix};
pub use milp::MilpDaySelector;
pub use pipeline::Pipeline;
pub use reconstruction::{HourMapping, Reconstruction};
pub use selection::{DaySelector, ExternalDaySelector};
pub use weights::{SeriesWeight, SeriesWeights, compute_raw_weights, normalize_weights};
