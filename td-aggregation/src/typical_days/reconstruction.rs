use ems_model::general::HOURS_PER_YEAR;
use ems_model::general::calendar::{day_of_hour, hour_of_day};

use crate::general::error::Result;
use crate::typical_days::assignment::DayAssignment;

/// Where an hour of the year is read from in the typical-day data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourMapping {
    /// 1..=8760
    pub hour_of_year: usize,
    /// 1..=24
    pub hour_of_day: usize,
    /// 1..=N
    pub td: usize,
}

/// Validated day assignment together with the hour-of-year mapping
/// (`T_H_TD`) and the number of calendar days per typical day.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    assignment: DayAssignment,
    table: Vec<HourMapping>,
    day_counts: Vec<usize>,
}

impl Reconstruction {
    /// Validates the assignment and derives the mapping from it
    pub fn new(assignment: DayAssignment) -> Result<Self> {
        assignment.validate()?;

        let table = (1..=HOURS_PER_YEAR)
            .map(|hour_of_year| HourMapping {
                hour_of_year,
                hour_of_day: hour_of_day(hour_of_year),
                td: assignment.td_of_day(day_of_hour(hour_of_year)),
            })
            .collect();
        let day_counts = assignment.day_counts();

        Ok(Self {
            assignment,
            table,
            day_counts,
        })
    }

    pub fn assignment(&self) -> &DayAssignment {
        &self.assignment
    }

    pub fn nbr_tds(&self) -> usize {
        self.assignment.nbr_tds()
    }

    /// Mapping of every hour of the year, in increasing hour order
    pub fn table(&self) -> &[HourMapping] {
        &self.table
    }

    /// Calendar days represented by typical day `td` (1..=N)
    pub fn day_count(&self, td: usize) -> usize {
        self.day_counts[td - 1]
    }

    pub fn day_counts(&self) -> &[usize] {
        &self.day_counts
    }
}
