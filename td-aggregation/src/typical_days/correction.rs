use ems_model::general::{HOURS_PER_DAY, SeriesCorrectionSummary};
use tracing::{debug, warn};

use crate::general::series::TimeSeries;
use crate::typical_days::reconstruction::Reconstruction;

/// Corrected hourly values of one series on every typical day.
#[derive(Debug, Clone, PartialEq)]
pub struct TdSeries {
    pub name: String,
    /// `values[td - 1][hour - 1]`, already multiplied by the correction factor
    pub values: Vec<[f64; HOURS_PER_DAY]>,
    pub true_annual_sum: f64,
    pub reconstructed_annual_sum: f64,
    pub correction_factor: f64,
}

impl TdSeries {
    /// Corrected value at hour of day `hour` (1..=24) of typical day `td` (1..=N)
    pub fn value(&self, hour: usize, td: usize) -> f64 {
        self.values[td - 1][hour - 1]
    }

    /// Annual sum implied by the corrected values and the day counts
    pub fn annual_sum(&self, reconstruction: &Reconstruction) -> f64 {
        count_weighted_sum(&self.values, reconstruction)
    }

    pub fn summary(&self) -> SeriesCorrectionSummary {
        SeriesCorrectionSummary {
            name: self.name.clone(),
            true_annual_sum: self.true_annual_sum,
            reconstructed_annual_sum: self.reconstructed_annual_sum,
            correction_factor: self.correction_factor,
        }
    }
}

/// Sum of the typical-day values, each day weighted by its day count
fn count_weighted_sum(values: &[[f64; HOURS_PER_DAY]], reconstruction: &Reconstruction) -> f64 {
    values
        .iter()
        .enumerate()
        .map(|(index, day)| {
            reconstruction.day_count(index + 1) as f64 * day.iter().sum::<f64>()
        })
        .sum()
}

/// Hourly values of the representative calendar day of every typical day
fn representative_values(
    series: &TimeSeries,
    reconstruction: &Reconstruction,
) -> Vec<[f64; HOURS_PER_DAY]> {
    let assignment = reconstruction.assignment();
    (1..=reconstruction.nbr_tds())
        .map(|td| {
            let mut day = [0.0; HOURS_PER_DAY];
            day.copy_from_slice(series.day(assignment.representative_day(td)));
            day
        })
        .collect()
}

/// Takes the typical-day values of a series and scales them so that,
/// weighted by the day counts, they reproduce the true annual sum.
///
/// When the typical days sum to zero the factor is 0 and the values stay 0.
pub fn correct_series(series: &TimeSeries, reconstruction: &Reconstruction) -> TdSeries {
    let mut values = representative_values(series, reconstruction);
    let true_annual_sum = series.annual_sum();
    let reconstructed_annual_sum = count_weighted_sum(&values, reconstruction);

    let correction_factor = if reconstructed_annual_sum != 0.0 {
        true_annual_sum / reconstructed_annual_sum
    } else {
        if true_annual_sum != 0.0 {
            warn!(
                series = series.name(),
                true_annual_sum, "typical days sum to zero, series is emitted as zero"
            );
        }
        0.0
    };
    debug!(
        series = series.name(),
        true_annual_sum, reconstructed_annual_sum, correction_factor, "annual correction"
    );

    for day in values.iter_mut() {
        for value in day.iter_mut() {
            *value *= correction_factor;
        }
    }

    TdSeries {
        name: series.name().to_string(),
        values,
        true_annual_sum,
        reconstructed_annual_sum,
        correction_factor,
    }
}

/// Year-wide peak of the heating series over its peak on the representative
/// days. Not affected by the annual correction.
///
/// Falls back to 1 when the typical days carry no heating.
pub fn peak_factor(series: &TimeSeries, reconstruction: &Reconstruction) -> f64 {
    let year_peak = series.peak();
    let td_peak = representative_values(series, reconstruction)
        .iter()
        .flat_map(|day| day.iter().copied())
        .fold(f64::NEG_INFINITY, f64::max);

    if td_peak > 0.0 {
        year_peak / td_peak
    } else {
        warn!(
            series = series.name(),
            year_peak, "typical days have no positive peak, peak factor set to 1"
        );
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typical_days::assignment::DayAssignment;

    fn single_td() -> Reconstruction {
        Reconstruction::new(DayAssignment::from_td_indices(vec![1; 365], 1)).unwrap()
    }

    /// Days 1..=180 on typical day 1, the rest on typical day 2
    fn two_seasons() -> Reconstruction {
        let days = (1..=365).map(|d| if d <= 180 { 1 } else { 2 }).collect();
        Reconstruction::new(DayAssignment::from_td_indices(days, 2)).unwrap()
    }

    fn seasonal_profile() -> TimeSeries {
        let values = (0..8760)
            .map(|h| {
                let day = h / 24;
                let hour = h % 24;
                (1.0 + (day as f64 / 50.0).sin().abs()) * (1.0 + hour as f64 / 10.0)
            })
            .collect();
        TimeSeries::new("ELECTRICITY", values).unwrap()
    }

    #[test]
    fn test_constant_series_count_weighted_factor() {
        let series = TimeSeries::new("ELECTRICITY", vec![1.0; 8760]).unwrap();
        let reconstruction = single_td();
        assert_eq!(reconstruction.day_count(1), 365);

        // the reconstructed sum weights the typical day by its 365 days,
        // so a constant series needs no correction
        let td = correct_series(&series, &reconstruction);
        assert_eq!(td.true_annual_sum, 8760.0);
        assert_eq!(td.reconstructed_annual_sum, 365.0 * 24.0);
        assert_eq!(td.correction_factor, 1.0);
        assert!(td.values[0].iter().all(|&v| v == 1.0));

        // one unweighted day sums to 24, a ratio of 365 to the year, which
        // is exactly the day count the reconstructed sum already carries
        let one_day: f64 = series.day(1).iter().sum();
        assert_eq!(one_day, 24.0);
        assert_eq!(td.true_annual_sum / one_day, 365.0);
        assert_eq!(td.true_annual_sum / one_day, reconstruction.day_count(1) as f64);
        assert_eq!(td.annual_sum(&reconstruction), td.true_annual_sum);
    }

    #[test]
    fn test_annual_sum_is_preserved() {
        let series = seasonal_profile();
        let reconstruction = two_seasons();
        let td = correct_series(&series, &reconstruction);

        assert!(td.correction_factor > 0.0);
        let relative = (td.annual_sum(&reconstruction) - td.true_annual_sum).abs()
            / td.true_annual_sum;
        assert!(relative < 1e-12);
    }

    #[test]
    fn test_values_come_from_representative_day() {
        let series = seasonal_profile();
        let reconstruction = two_seasons();
        let td = correct_series(&series, &reconstruction);

        // typical day 2 is represented by calendar day 181
        let raw = series.day(181)[5];
        assert!((td.value(6, 2) - raw * td.correction_factor).abs() < 1e-12);
    }

    #[test]
    fn test_zero_typical_days_give_zero_factor() {
        let mut values = vec![0.0; 8760];
        // activity only outside the representative days 1 and 181
        values[24 * 10 + 3] = 5.0;
        let series = TimeSeries::new("HYDRO_DAM", values).unwrap();
        let td = correct_series(&series, &two_seasons());

        assert_eq!(td.reconstructed_annual_sum, 0.0);
        assert_eq!(td.correction_factor, 0.0);
        assert!(td.values.iter().flatten().all(|v| *v == 0.0));
    }

    #[test]
    fn test_peak_factor_is_not_corrected() {
        let mut values = vec![1.0; 8760];
        // winter peak on a day that is not representative
        values[24 * 20 + 8] = 4.0;
        values[8] = 2.0;
        let series = TimeSeries::new("SPACE_HEATING", values).unwrap();
        let reconstruction = two_seasons();

        assert_eq!(peak_factor(&series, &reconstruction), 2.0);
    }

    #[test]
    fn test_peak_factor_without_heating() {
        let series = TimeSeries::new("SPACE_HEATING", vec![0.0; 8760]).unwrap();
        assert_eq!(peak_factor(&series, &single_td()), 1.0);
    }

    #[test]
    fn test_correction_is_deterministic() {
        let series = seasonal_profile();
        let first = correct_series(&series, &two_seasons());
        let second = correct_series(&series, &two_seasons());
        assert_eq!(first, second);
    }
}
