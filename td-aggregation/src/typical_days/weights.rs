use ems_model::general::SeriesRole;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::general::config::WeightingConfig;
use crate::general::series::{ScalingTable, SeriesId, SeriesSet};

/// Importance of one series in the day selection.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesWeight {
    pub series: SeriesId,
    pub role: SeriesRole,
    /// Annual sum of the series times its scaling quantity
    pub raw: f64,
    /// Share of the total weight mass, `None` when negligible
    pub normalized: Option<f64>,
}

/// Weights of all weighted series, in series order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesWeights {
    weights: IndexMap<SeriesId, SeriesWeight>,
}

impl SeriesWeights {
    pub fn get(&self, series: SeriesId) -> Option<&SeriesWeight> {
        self.weights.get(&series)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeriesWeight> {
        self.weights.values()
    }

    /// Series that carry a normalized weight, with that weight
    pub fn included(&self) -> impl Iterator<Item = (SeriesId, f64)> + '_ {
        self.weights
            .values()
            .filter_map(|w| w.normalized.map(|n| (w.series, n)))
    }

    /// Sum of the normalized weights of a role
    pub fn role_mass(&self, role: SeriesRole) -> f64 {
        self.weights
            .values()
            .filter(|w| w.role == role)
            .filter_map(|w| w.normalized)
            .sum()
    }
}

/// Computes the raw weight of every series bound to a role.
///
/// The raw weight is the annual sum of the series times the scaling quantity
/// of its references (annual end-use demand for demand series, installed
/// capacity potential for production series) times its quality factor.
/// Series bound to no role are left out.
pub fn compute_raw_weights(
    series: &SeriesSet,
    config: &WeightingConfig,
    scaling: &ScalingTable,
) -> SeriesWeights {
    let mut weights = IndexMap::new();
    for (id, ts) in series.iter() {
        let Some((role, binding)) = config.binding(ts.name()) else {
            continue;
        };
        let raw = ts.annual_sum()
            * scaling.scaling_for(role, &binding.references)
            * binding.quality_factor;
        debug!(series = ts.name(), role = role.label(), raw, "raw weight");
        weights.insert(
            id,
            SeriesWeight {
                series: id,
                role,
                raw,
                normalized: None,
            },
        );
    }
    SeriesWeights { weights }
}

/// Rescales raw weights so that the demand and the production group each
/// hold half of the weight mass.
///
/// Weights below `threshold` are dropped. A group left empty contributes
/// nothing and the other group still sums to 0.5, so the total mass is 0.5.
pub fn normalize_weights(mut weights: SeriesWeights, threshold: f64) -> SeriesWeights {
    for role in [SeriesRole::Demand, SeriesRole::Production] {
        let group_sum: f64 = weights
            .weights
            .values()
            .filter(|w| w.role == role && w.raw >= threshold)
            .map(|w| w.raw)
            .sum();

        if group_sum <= 0.0 {
            warn!(
                role = role.label(),
                threshold, "every series of the group is negligible, group carries no weight"
            );
        }

        for weight in weights.weights.values_mut().filter(|w| w.role == role) {
            weight.normalized = if weight.raw >= threshold && group_sum > 0.0 {
                Some(weight.raw / group_sum / 2.0)
            } else {
                None
            };
        }
    }
    weights
}
