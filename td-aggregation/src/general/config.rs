use std::path::{Path, PathBuf};

use ems_model::general::{SeriesBinding, SeriesRole};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::general::error::{Result, TdError};

/// Configuration of a typical-day aggregation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Number of typical days to select
    pub nbr_tds: usize,
    /// Directory receiving every file written by the run
    pub output_dir: PathBuf,
    /// Series whose year-wide peak is compared to the typical-day peak
    pub peak_heating_series: Option<String>,
    /// Reuse a persisted day assignment for the same number of typical days
    pub reuse_assignment: bool,
    pub weighting: WeightingConfig,
    pub selector: SelectorConfig,
    pub inputs: InputConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            nbr_tds: 12,
            output_dir: PathBuf::from("output"),
            peak_heating_series: Some("SPACE_HEATING".to_string()),
            reuse_assignment: true,
            weighting: WeightingConfig::default(),
            selector: SelectorConfig::default(),
            inputs: InputConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RunConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.nbr_tds == 0 || self.nbr_tds > ems_model::general::DAYS_PER_YEAR {
            return Err(TdError::Config(format!(
                "nbr_tds must be between 1 and 365, got {}",
                self.nbr_tds
            )));
        }
        if self.weighting.threshold < 0.0 {
            return Err(TdError::Config(
                "weighting.threshold must not be negative".to_string(),
            ));
        }
        if let Some(name) = self
            .weighting
            .demand
            .keys()
            .find(|name| self.weighting.production.contains_key(*name))
        {
            return Err(TdError::Config(format!(
                "series '{}' is bound to both roles",
                name
            )));
        }
        Ok(())
    }
}

/// Which series drive the day selection, in which role, scaled by what
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightingConfig {
    /// Raw weights below this value carry no weight
    pub threshold: f64,
    pub demand: IndexMap<String, SeriesBinding>,
    pub production: IndexMap<String, SeriesBinding>,
}

impl Default for WeightingConfig {
    fn default() -> Self {
        Self {
            threshold: 0.001,
            demand: IndexMap::new(),
            production: IndexMap::new(),
        }
    }
}

impl WeightingConfig {
    /// Role and binding of a series, if it is weighted at all
    pub fn binding(&self, name: &str) -> Option<(SeriesRole, &SeriesBinding)> {
        if let Some(binding) = self.demand.get(name) {
            return Some((SeriesRole::Demand, binding));
        }
        self.production
            .get(name)
            .map(|binding| (SeriesRole::Production, binding))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    #[default]
    External,
    Milp,
}

/// Meaning of the integers in a day assignment file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentFormat {
    /// Typical-day index 1..=N per calendar day
    #[default]
    TdIndex,
    /// Calendar day (1..=365) of the medoid standing for each calendar day
    MedoidDay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub kind: SelectorKind,
    /// Solver executable, resolved through PATH when not a path
    pub program: String,
    /// Arguments; `{data}`, `{output}` and `{nbr_tds}` are substituted
    pub args: Vec<String>,
    pub assignment_format: AssignmentFormat,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            kind: SelectorKind::External,
            program: "glpsol".to_string(),
            args: vec![
                "-m".to_string(),
                "TD_main.mod".to_string(),
                "-d".to_string(),
                "{data}".to_string(),
                "-y".to_string(),
                "{output}".to_string(),
            ],
            assignment_format: AssignmentFormat::TdIndex,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InputConfig {
    /// CSV or XLSX table with one column per yearly series
    pub series: Option<PathBuf>,
    /// Worksheet holding the series when `series` is a workbook
    pub sheet: Option<String>,
    /// Field separator of the CSV tables
    pub delimiter: Option<char>,
    /// Two-column table of annual demand per end-use category
    pub annual_demand: Option<PathBuf>,
    /// Two-column table of installed capacity potential per technology
    pub capacity_potential: Option<PathBuf>,
}
