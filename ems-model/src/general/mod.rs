pub mod calendar;
pub mod series;
pub mod typical_days;

pub use calendar::{DAYS_PER_YEAR, HOURS_PER_DAY, HOURS_PER_YEAR};
pub use series::{OutputBinding, SeriesBinding, SeriesRole};
pub use typical_days::{SeriesCorrectionSummary, TypicalDaySummary};
