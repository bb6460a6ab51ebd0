use std::path::{Path, PathBuf};

use ems_model::general::{OutputBinding, TypicalDaySummary};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::general::config::{AssignmentFormat, RunConfig, SelectorKind};
use crate::general::error::{Result, TdError};
use crate::general::series::{ScalingTable, SeriesSet};
use crate::typical_days::assignment::DayAssignment;
use crate::typical_days::correction::{TdSeries, correct_series, peak_factor};
use crate::typical_days::daily::WeightedDailyMatrix;
use crate::typical_days::milp::MilpDaySelector;
use crate::typical_days::reconstruction::Reconstruction;
use crate::typical_days::selection::{DaySelector, ExternalDaySelector};
use crate::typical_days::serializer::{ModelData, write_model_data};
use crate::typical_days::weights::{SeriesWeights, compute_raw_weights, normalize_weights};

const SELECTION_DATA_FILE: &str = "data.dat";
const SUMMARY_FILE: &str = "td_summary.json";

/// Normalized weights a day assignment was selected under, persisted next
/// to the assignment file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SelectionRecord {
    nbr_tds: usize,
    weights: IndexMap<String, f64>,
}

impl SelectionRecord {
    fn new(nbr_tds: usize, series: &SeriesSet, weights: &SeriesWeights) -> Self {
        let weights = weights
            .included()
            .filter_map(|(id, weight)| series.get(id).map(|ts| (ts.name().to_string(), weight)))
            .collect();
        Self { nbr_tds, weights }
    }

    /// Same typical-day count and the same weighted series with equal weights
    fn matches(&self, other: &SelectionRecord) -> bool {
        self.nbr_tds == other.nbr_tds
            && self.weights.len() == other.weights.len()
            && self.weights.iter().all(|(name, weight)| {
                other
                    .weights
                    .get(name)
                    .is_some_and(|w| (w - weight).abs() <= 1e-12 * weight.abs().max(1.0))
            })
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// One forward pass of the typical-day aggregation for a given configuration
pub struct Pipeline {
    config: RunConfig,
}

impl Pipeline {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn assignment_path(&self) -> PathBuf {
        self.config
            .output_dir
            .join(format!("TD_of_days_{}.out", self.config.nbr_tds))
    }

    /// Weighting record of the persisted assignment
    pub fn record_path(&self) -> PathBuf {
        self.config
            .output_dir
            .join(format!("TD_of_days_{}.weights.json", self.config.nbr_tds))
    }

    pub fn model_data_path(&self) -> PathBuf {
        self.config
            .output_dir
            .join(format!("ESTD_{}TD.dat", self.config.nbr_tds))
    }

    /// Selector described by the configuration, writing into the output directory
    pub fn selector(&self) -> Box<dyn DaySelector> {
        match self.config.selector.kind {
            SelectorKind::External => Box::new(ExternalDaySelector::new(
                &self.config.selector,
                self.config.output_dir.clone(),
                self.config.output_dir.join(SELECTION_DATA_FILE),
                self.assignment_path(),
            )),
            SelectorKind::Milp => Box::new(MilpDaySelector::new(good_lp::highs)),
        }
    }

    /// Raw and normalized weights of the configured series
    pub fn weights(&self, series: &SeriesSet, scaling: &ScalingTable) -> SeriesWeights {
        let raw = compute_raw_weights(series, &self.config.weighting, scaling);
        normalize_weights(raw, self.config.weighting.threshold)
    }

    /// Full run: selects typical days (or reuses a persisted assignment
    /// selected under the same weights), then reconstructs, corrects and
    /// writes the model data.
    pub fn run(
        &self,
        series: &SeriesSet,
        scaling: &ScalingTable,
        selector: &dyn DaySelector,
        force_selection: bool,
    ) -> Result<TypicalDaySummary> {
        std::fs::create_dir_all(&self.config.output_dir)?;
        let (record, matrix) = self.matrix(series, scaling)?;
        let format = selector.assignment_format();
        let path = self.assignment_path();

        let reuse = self.config.reuse_assignment
            && !force_selection
            && path.exists()
            && self.record_matches(&record);
        let assignment = if reuse {
            info!(path = %path.display(), "reusing persisted day assignment");
            DayAssignment::read(&path, format, self.config.nbr_tds)?
        } else {
            let assignment = selector.select(&matrix, self.config.nbr_tds)?;
            assignment.write(&path, format)?;
            record.write(&self.record_path())?;
            info!(path = %path.display(), "day assignment written");
            assignment
        };

        self.finish(series, &matrix, assignment, format)
    }

    /// Rebuilds the model data from the persisted assignment without
    /// running the day selection. Fails if the assignment was selected
    /// under different weights.
    pub fn reserialize(
        &self,
        series: &SeriesSet,
        scaling: &ScalingTable,
        format: AssignmentFormat,
    ) -> Result<TypicalDaySummary> {
        let (record, matrix) = self.matrix(series, scaling)?;
        let record_path = self.record_path();
        if record_path.exists() {
            if !SelectionRecord::read(&record_path)?.matches(&record) {
                return Err(TdError::StaleAssignment {
                    path: self.assignment_path(),
                });
            }
        } else {
            warn!(
                path = %record_path.display(),
                "no weighting record, assuming the assignment matches the weights"
            );
        }
        let assignment =
            DayAssignment::read(&self.assignment_path(), format, self.config.nbr_tds)?;
        self.finish(series, &matrix, assignment, format)
    }

    /// Whether the persisted weighting record equals the current one
    fn record_matches(&self, record: &SelectionRecord) -> bool {
        let path = self.record_path();
        match SelectionRecord::read(&path) {
            Ok(persisted) if persisted.matches(record) => true,
            Ok(_) => {
                info!(path = %path.display(), "weighting changed, selecting days again");
                false
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "no usable weighting record, selecting days again"
                );
                false
            }
        }
    }

    fn matrix(
        &self,
        series: &SeriesSet,
        scaling: &ScalingTable,
    ) -> Result<(SelectionRecord, WeightedDailyMatrix)> {
        let weights = self.weights(series, scaling);
        let matrix = WeightedDailyMatrix::build(series, &weights)?;
        info!(
            series = weights.included().count(),
            columns = matrix.columns().len(),
            "weighted daily matrix built"
        );
        Ok((SelectionRecord::new(self.config.nbr_tds, series, &weights), matrix))
    }

    fn finish(
        &self,
        series: &SeriesSet,
        matrix: &WeightedDailyMatrix,
        mut assignment: DayAssignment,
        format: AssignmentFormat,
    ) -> Result<TypicalDaySummary> {
        if format == AssignmentFormat::TdIndex {
            assignment.validate()?;
            assignment.refine_representatives(matrix);
        }
        let reconstruction = Reconstruction::new(assignment)?;

        let corrected: Vec<TdSeries> = series
            .iter()
            .map(|(_, ts)| correct_series(ts, &reconstruction))
            .collect();
        let peak_sh_factor = self.peak_sh_factor(series, &reconstruction);

        // only series bound to a model parameter are written
        let outputs: Vec<(OutputBinding, &TdSeries)> = corrected
            .iter()
            .filter_map(|td| {
                let (_, binding) = self.config.weighting.binding(&td.name)?;
                binding.output.clone().map(|output| (output, td))
            })
            .collect();
        let data = ModelData {
            reconstruction: &reconstruction,
            peak_sh_factor,
            series: outputs,
        };
        let model_path = self.model_data_path();
        write_model_data(&model_path, &data)?;
        info!(
            path = %model_path.display(),
            series = data.series.len(),
            "model data written"
        );

        let summary = TypicalDaySummary {
            nbr_tds: reconstruction.nbr_tds(),
            representative_days: reconstruction.assignment().representatives().to_vec(),
            day_counts: reconstruction.day_counts().to_vec(),
            peak_sh_factor,
            series: corrected.iter().map(TdSeries::summary).collect(),
        };
        write_summary(&self.config.output_dir.join(SUMMARY_FILE), &summary)?;
        Ok(summary)
    }

    fn peak_sh_factor(&self, series: &SeriesSet, reconstruction: &Reconstruction) -> f64 {
        let Some(name) = &self.config.peak_heating_series else {
            return 1.0;
        };
        match series.by_name(name) {
            Some((_, heating)) => peak_factor(heating, reconstruction),
            None => {
                warn!(series = %name, "heating series not found, peak factor set to 1");
                1.0
            }
        }
    }
}

fn write_summary(path: &Path, summary: &TypicalDaySummary) -> Result<()> {
    let content = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::general::error::TdError;
    use crate::general::series::TimeSeries;
    use ems_model::general::SeriesBinding;

    /// Assigns days 1..=182 to typical day 1 and the rest to typical day 2
    struct SplitSelector;

    impl DaySelector for SplitSelector {
        fn select(&self, _matrix: &WeightedDailyMatrix, nbr_tds: usize) -> Result<DayAssignment> {
            let days = (1..=365).map(|d| if d <= 182 { 1 } else { nbr_tds }).collect();
            Ok(DayAssignment::from_td_indices(days, nbr_tds))
        }
    }

    /// Fails the test if the selection is run
    struct UnreachableSelector;

    impl DaySelector for UnreachableSelector {
        fn select(&self, _matrix: &WeightedDailyMatrix, _nbr_tds: usize) -> Result<DayAssignment> {
            Err(TdError::Selection("selection must not run".to_string()))
        }
    }

    fn inputs() -> (SeriesSet, ScalingTable) {
        let heating: Vec<f64> = (0..8760)
            .map(|h| {
                let day = h / 24;
                if day < 182 { 3.0 + (h % 24) as f64 / 4.0 } else { 0.5 }
            })
            .collect();
        let pv: Vec<f64> = (0..8760)
            .map(|h| if (8..18).contains(&(h % 24)) { 0.3 + (h / 24) as f64 / 1000.0 } else { 0.0 })
            .collect();
        let series: SeriesSet = [
            TimeSeries::new("ELECTRICITY", vec![1.0; 8760]).unwrap(),
            TimeSeries::new("SPACE_HEATING", heating).unwrap(),
            TimeSeries::new("PV", pv).unwrap(),
        ]
        .into_iter()
        .collect();

        let mut scaling = ScalingTable::default();
        scaling.annual_demand.insert("ELECTRICITY".to_string(), 50.0);
        scaling.annual_demand.insert("HEAT_LOW_T_SH".to_string(), 20.0);
        scaling.capacity_potential.insert("PV".to_string(), 10.0);
        (series, scaling)
    }

    fn config(dir: &Path) -> RunConfig {
        let mut config = RunConfig {
            nbr_tds: 2,
            output_dir: dir.to_path_buf(),
            ..Default::default()
        };
        config.weighting.demand.insert(
            "ELECTRICITY".to_string(),
            SeriesBinding::new(vec!["ELECTRICITY".to_string()]),
        );
        config.weighting.demand.insert(
            "SPACE_HEATING".to_string(),
            SeriesBinding::new(vec!["HEAT_LOW_T_SH".to_string()])
                .with_quality_factor(0.5)
                .with_output("heating_time_series", None),
        );
        config.weighting.production.insert(
            "PV".to_string(),
            SeriesBinding::new(vec!["PV".to_string()]).with_output("c_p_t", Some("PV")),
        );
        config
    }

    #[test]
    fn test_run_writes_all_outputs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(config(temp_dir.path()));
        let (series, scaling) = inputs();

        let summary = pipeline.run(&series, &scaling, &SplitSelector, false).unwrap();
        assert_eq!(summary.nbr_tds, 2);
        assert_eq!(summary.day_counts, vec![182, 183]);
        assert_eq!(summary.series.len(), 3);
        for s in &summary.series {
            assert!(
                (s.reconstructed_annual_sum * s.correction_factor - s.true_annual_sum).abs()
                    < 1e-9 * s.true_annual_sum.max(1.0)
            );
        }
        // heating peak 3 + 23/4 is on every winter day, so it is kept
        assert!((summary.peak_sh_factor - 1.0).abs() < 1e-12);

        assert!(pipeline.assignment_path().exists());
        assert!(pipeline.record_path().exists());
        assert!(temp_dir.path().join("td_summary.json").exists());
        let data = std::fs::read_to_string(pipeline.model_data_path()).unwrap();
        assert!(data.contains("param nbr_tds := 2;"));
        assert!(data.contains("param heating_time_series :"));
        // ELECTRICITY is weighted but bound to no model parameter
        assert!(!data.contains("electricity"));
        assert!(data.contains("[\"PV\",*,*] :"));
    }

    #[test]
    fn test_run_reuses_persisted_assignment() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(config(temp_dir.path()));
        let (series, scaling) = inputs();

        let first = pipeline.run(&series, &scaling, &SplitSelector, false).unwrap();
        let first_data = std::fs::read(pipeline.model_data_path()).unwrap();

        let second = pipeline
            .run(&series, &scaling, &UnreachableSelector, false)
            .unwrap();
        let second_data = std::fs::read(pipeline.model_data_path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first_data, second_data);

        assert!(matches!(
            pipeline.run(&series, &scaling, &UnreachableSelector, true),
            Err(TdError::Selection(_))
        ));
    }

    #[test]
    fn test_reserialize_is_byte_identical() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(config(temp_dir.path()));
        let (series, scaling) = inputs();

        pipeline.run(&series, &scaling, &SplitSelector, false).unwrap();
        let first = std::fs::read(pipeline.model_data_path()).unwrap();
        pipeline
            .reserialize(&series, &scaling, AssignmentFormat::TdIndex)
            .unwrap();
        let second = std::fs::read(pipeline.model_data_path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_corrupted_assignment_stops_before_serialization() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(config(temp_dir.path()));
        let (series, scaling) = inputs();

        let mut content = "1\n".repeat(199);
        content.push_str("0\n");
        content.push_str(&"2\n".repeat(165));
        std::fs::write(pipeline.assignment_path(), content).unwrap();

        assert!(matches!(
            pipeline.reserialize(&series, &scaling, AssignmentFormat::TdIndex),
            Err(TdError::ReconstructionMismatch(_))
        ));
        assert!(!pipeline.model_data_path().exists());
    }

    #[test]
    fn test_changed_weighting_selects_again() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (series, scaling) = inputs();
        Pipeline::new(config(temp_dir.path()))
            .run(&series, &scaling, &SplitSelector, false)
            .unwrap();

        let mut changed = config(temp_dir.path());
        changed.weighting.production.shift_remove("PV");
        let pipeline = Pipeline::new(changed);
        assert!(matches!(
            pipeline.run(&series, &scaling, &UnreachableSelector, false),
            Err(TdError::Selection(_))
        ));
        assert!(matches!(
            pipeline.reserialize(&series, &scaling, AssignmentFormat::TdIndex),
            Err(TdError::StaleAssignment { .. })
        ));

        // selecting under the new weights makes the assignment reusable again
        pipeline.run(&series, &scaling, &SplitSelector, false).unwrap();
        pipeline
            .run(&series, &scaling, &UnreachableSelector, false)
            .unwrap();
    }

    #[test]
    fn test_changed_scaling_selects_again() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(config(temp_dir.path()));
        let (series, mut scaling) = inputs();
        pipeline.run(&series, &scaling, &SplitSelector, false).unwrap();

        scaling.annual_demand.insert("ELECTRICITY".to_string(), 200.0);
        assert!(matches!(
            pipeline.run(&series, &scaling, &UnreachableSelector, false),
            Err(TdError::Selection(_))
        ));
    }

    #[test]
    fn test_missing_weighting_record_selects_again() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(config(temp_dir.path()));
        let (series, scaling) = inputs();
        pipeline.run(&series, &scaling, &SplitSelector, false).unwrap();

        std::fs::remove_file(pipeline.record_path()).unwrap();
        assert!(matches!(
            pipeline.run(&series, &scaling, &UnreachableSelector, false),
            Err(TdError::Selection(_))
        ));
    }
}
