use thiserror::Error;

pub type Result<T> = std::result::Result<T, TdError>;

/// Fatal conditions of a typical-day aggregation run.
#[derive(Debug, Error)]
pub enum TdError {
    /// A yearly series does not hold exactly one value per hour of the year
    #[error("series '{name}' has {len} samples, expected 8760")]
    MalformedSeries { name: String, len: usize },

    /// The external day selection process failed or produced unusable output
    #[error("external day selection failed (exit code {exit_code:?}): {output}")]
    ExternalSelectionFailure {
        exit_code: Option<i32>,
        output: String,
    },

    /// The day assignment does not cover the year consistently
    #[error("day assignment does not match the year: {0}")]
    ReconstructionMismatch(String),

    /// The persisted day assignment was selected under different weights
    #[error("day assignment {} was selected under a different weighting", path.display())]
    StaleAssignment { path: std::path::PathBuf },

    #[error("unknown series: {0}")]
    UnknownSeries(String),

    /// The in-process selection model could not be solved
    #[error("day selection failed: {0}")]
    Selection(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("input error: {0}")]
    Input(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for TdError {
    fn from(e: toml::de::Error) -> Self {
        TdError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for TdError {
    fn from(e: serde_json::Error) -> Self {
        TdError::Io(std::io::Error::other(e))
    }
}
