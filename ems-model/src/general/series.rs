use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

/// Role a yearly time series plays when typical days are selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "./series_role.ts")]
pub enum SeriesRole {
    /// Energy consumed, weighted by the annual end-use demand
    Demand,
    /// Capacity factor of a resource, weighted by the installed potential
    Production,
}

impl SeriesRole {
    pub fn label(&self) -> &'static str {
        match self {
            SeriesRole::Demand => "demand",
            SeriesRole::Production => "production",
        }
    }
}

/// Where a series is written in the model data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, TS)]
#[ts(export, export_to = "./output_binding.ts")]
pub struct OutputBinding {
    /// Name of the parameter in the model data file
    pub param: String,
    /// Slice key when several series share one parameter, e.g. `PV` in `c_p_t`
    #[serde(default)]
    pub key: Option<String>,
}

/// Binds a named series to the quantities that scale its weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[ts(export, export_to = "./series_binding.ts")]
pub struct SeriesBinding {
    /// End-use categories (demand) or technologies (production) whose
    /// annual demand / capacity potential scales the series
    #[serde(default)]
    pub references: Vec<String>,
    /// Derating applied to series of lower energy quality (e.g. heat)
    #[serde(default = "default_quality_factor")]
    pub quality_factor: f64,
    /// Parameter the corrected typical-day values are written to; series
    /// without one are not written to the model data file
    #[serde(default)]
    pub output: Option<OutputBinding>,
}

fn default_quality_factor() -> f64 {
    1.0
}

impl Default for SeriesBinding {
    fn default() -> Self {
        Self {
            references: Vec::new(),
            quality_factor: default_quality_factor(),
            output: None,
        }
    }
}

impl SeriesBinding {
    pub fn new(references: Vec<String>) -> Self {
        Self {
            references,
            ..Default::default()
        }
    }

    pub fn with_quality_factor(mut self, quality_factor: f64) -> Self {
        self.quality_factor = quality_factor;
        self
    }

    pub fn with_output(mut self, param: &str, key: Option<&str>) -> Self {
        self.output = Some(OutputBinding {
            param: param.to_string(),
            key: key.map(|k| k.to_string()),
        });
        self
    }
}
