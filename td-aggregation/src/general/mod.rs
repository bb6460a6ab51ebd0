pub mod config;
pub mod error;
pub mod input;
pub mod series;

pub use config::RunConfig;
pub use error::{Result, TdError};
pub use series::{ScalingTable, SeriesId, SeriesSet, TimeSeries};
