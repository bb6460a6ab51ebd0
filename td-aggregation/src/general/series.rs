use ems_model::general::{HOURS_PER_DAY, HOURS_PER_YEAR, SeriesRole};
use indexmap::IndexMap;

use crate::general::error::{Result, TdError};

/// Position of a series inside its [`SeriesSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesId(pub usize);

/// A named signal with one value per hour of the year.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    name: String,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Creates a series, rejecting anything that is not exactly 8760 samples long
    pub fn new(name: &str, values: Vec<f64>) -> Result<Self> {
        if values.len() != HOURS_PER_YEAR {
            return Err(TdError::MalformedSeries {
                name: name.to_string(),
                len: values.len(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            values,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn annual_sum(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn peak(&self) -> f64 {
        self.values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b))
    }

    /// The 24 hourly values of a calendar day (1..=365)
    pub fn day(&self, day: usize) -> &[f64] {
        let start = (day - 1) * HOURS_PER_DAY;
        &self.values[start..start + HOURS_PER_DAY]
    }
}

/// Ordered collection of the yearly series of a model run.
#[derive(Debug, Clone, Default)]
pub struct SeriesSet {
    series: IndexMap<String, TimeSeries>,
}

impl SeriesSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a series, replacing a previous one of the same name in place
    pub fn insert(&mut self, series: TimeSeries) -> SeriesId {
        let (index, _) = self.series.insert_full(series.name.clone(), series);
        SeriesId(index)
    }

    pub fn get(&self, id: SeriesId) -> Option<&TimeSeries> {
        self.series.get_index(id.0).map(|(_, s)| s)
    }

    pub fn by_name(&self, name: &str) -> Option<(SeriesId, &TimeSeries)> {
        self.series
            .get_full(name)
            .map(|(index, _, series)| (SeriesId(index), series))
    }

    pub fn id_of(&self, name: &str) -> Result<SeriesId> {
        self.series
            .get_index_of(name)
            .map(SeriesId)
            .ok_or_else(|| TdError::UnknownSeries(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (SeriesId, &TimeSeries)> {
        self.series
            .values()
            .enumerate()
            .map(|(index, series)| (SeriesId(index), series))
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl FromIterator<TimeSeries> for SeriesSet {
    fn from_iter<I: IntoIterator<Item = TimeSeries>>(iter: I) -> Self {
        let mut set = SeriesSet::new();
        for series in iter {
            set.insert(series);
        }
        set
    }
}

/// Annual demand per end-use category and installed potential per technology.
#[derive(Debug, Clone, Default)]
pub struct ScalingTable {
    pub annual_demand: IndexMap<String, f64>,
    pub capacity_potential: IndexMap<String, f64>,
}

impl ScalingTable {
    /// Scaling quantity of a series: the summed annual demand (demand role)
    /// or installed potential (production role) of its references.
    /// Missing references count as zero.
    pub fn scaling_for(&self, role: SeriesRole, references: &[String]) -> f64 {
        let table = match role {
            SeriesRole::Demand => &self.annual_demand,
            SeriesRole::Production => &self.capacity_potential,
        };
        references
            .iter()
            .map(|reference| table.get(reference).copied().unwrap_or(0.0))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_series_rejects_wrong_length() {
        let result = TimeSeries::new("ELECTRICITY", vec![1.0; 8759]);
        match result {
            Err(TdError::MalformedSeries { name, len }) => {
                assert_eq!(name, "ELECTRICITY");
                assert_eq!(len, 8759);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_day_slices() {
        let values: Vec<f64> = (0..8760).map(|h| h as f64).collect();
        let series = TimeSeries::new("PV", values).unwrap();
        assert_eq!(series.day(1)[0], 0.0);
        assert_eq!(series.day(2)[0], 24.0);
        assert_eq!(series.day(365)[23], 8759.0);
        assert_eq!(series.peak(), 8759.0);
    }

    #[test]
    fn test_series_set_keeps_insertion_order() {
        let mut set = SeriesSet::new();
        set.insert(TimeSeries::new("WIND", vec![0.0; 8760]).unwrap());
        set.insert(TimeSeries::new("PV", vec![0.0; 8760]).unwrap());
        assert_eq!(set.id_of("WIND").unwrap(), SeriesId(0));
        assert_eq!(set.id_of("PV").unwrap(), SeriesId(1));
        assert!(matches!(set.id_of("HYDRO"), Err(TdError::UnknownSeries(_))));

        // replacing keeps the position
        let id = set.insert(TimeSeries::new("WIND", vec![1.0; 8760]).unwrap());
        assert_eq!(id, SeriesId(0));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_scaling_for_sums_references() {
        let mut table = ScalingTable::default();
        table.capacity_potential.insert("PV_ROOF".to_string(), 20.0);
        table.capacity_potential.insert("PV_UTILITY".to_string(), 5.0);
        table.annual_demand.insert("ELECTRICITY".to_string(), 100.0);

        let refs = vec!["PV_ROOF".to_string(), "PV_UTILITY".to_string()];
        assert_eq!(table.scaling_for(SeriesRole::Production, &refs), 25.0);
        assert_eq!(
            table.scaling_for(SeriesRole::Demand, &["HEAT".to_string()]),
            0.0
        );
    }
}
