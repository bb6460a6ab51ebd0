use std::collections::BTreeSet;
use std::path::Path;

use ems_model::general::DAYS_PER_YEAR;

use crate::general::config::AssignmentFormat;
use crate::general::error::{Result, TdError};
use crate::typical_days::daily::WeightedDailyMatrix;

/// Marks a calendar day that no typical day stands for
const UNASSIGNED: usize = 0;

/// Typical day (1..=N) standing for each calendar day, plus the calendar day
/// whose values represent each typical day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayAssignment {
    nbr_tds: usize,
    days: Vec<usize>,
    representatives: Vec<usize>,
}

impl DayAssignment {
    /// Assignment from one typical-day index per calendar day. Each typical
    /// day is represented by the first calendar day mapped to it.
    pub fn from_td_indices(days: Vec<usize>, nbr_tds: usize) -> Self {
        let mut representatives = vec![UNASSIGNED; nbr_tds];
        for (index, &td) in days.iter().enumerate() {
            if (1..=nbr_tds).contains(&td) && representatives[td - 1] == UNASSIGNED {
                representatives[td - 1] = index + 1;
            }
        }
        Self {
            nbr_tds,
            days,
            representatives,
        }
    }

    /// Assignment from `(calendar day, typical day)` pairs. Days without a
    /// pair stay unassigned and fail validation.
    pub fn from_entries<I>(entries: I, nbr_tds: usize) -> Self
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut days = vec![UNASSIGNED; DAYS_PER_YEAR];
        for (day, td) in entries {
            if (1..=DAYS_PER_YEAR).contains(&day) {
                days[day - 1] = td;
            }
        }
        Self::from_td_indices(days, nbr_tds)
    }

    /// Assignment from the medoid calendar day of each calendar day.
    /// Typical days are numbered by increasing medoid day.
    pub fn from_medoid_days(medoids: &[usize], nbr_tds: usize) -> Result<Self> {
        if let Some(bad) = medoids.iter().find(|m| !(1..=DAYS_PER_YEAR).contains(*m)) {
            return Err(TdError::ReconstructionMismatch(format!(
                "medoid day {} is outside the year",
                bad
            )));
        }
        let distinct: BTreeSet<usize> = medoids.iter().copied().collect();
        if distinct.len() != nbr_tds {
            return Err(TdError::ReconstructionMismatch(format!(
                "{} distinct medoid days for {} typical days",
                distinct.len(),
                nbr_tds
            )));
        }
        let representatives: Vec<usize> = distinct.into_iter().collect();
        let days = medoids
            .iter()
            .map(|m| {
                representatives
                    .binary_search(m)
                    .map(|index| index + 1)
                    .unwrap_or(UNASSIGNED)
            })
            .collect();
        Ok(Self {
            nbr_tds,
            days,
            representatives,
        })
    }

    pub fn nbr_tds(&self) -> usize {
        self.nbr_tds
    }

    /// Typical day of each calendar day, in calendar order
    pub fn days(&self) -> &[usize] {
        &self.days
    }

    /// Typical day standing for calendar day `day` (1..=365)
    pub fn td_of_day(&self, day: usize) -> usize {
        self.days[day - 1]
    }

    /// Calendar day whose values represent typical day `td` (1..=N)
    pub fn representative_day(&self, td: usize) -> usize {
        self.representatives[td - 1]
    }

    pub fn representatives(&self) -> &[usize] {
        &self.representatives
    }

    /// Number of calendar days each typical day stands for
    pub fn day_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.nbr_tds];
        for &td in &self.days {
            if (1..=self.nbr_tds).contains(&td) {
                counts[td - 1] += 1;
            }
        }
        counts
    }

    /// Checks that every calendar day maps to exactly one typical day and
    /// every typical day stands for at least one calendar day
    pub fn validate(&self) -> Result<()> {
        if self.days.len() != DAYS_PER_YEAR {
            return Err(TdError::ReconstructionMismatch(format!(
                "{} calendar days assigned, expected {}",
                self.days.len(),
                DAYS_PER_YEAR
            )));
        }
        if let Some(index) = self.days.iter().position(|&td| td == UNASSIGNED) {
            return Err(TdError::ReconstructionMismatch(format!(
                "calendar day {} is unassigned",
                index + 1
            )));
        }
        if let Some(index) = self.days.iter().position(|&td| td > self.nbr_tds) {
            return Err(TdError::ReconstructionMismatch(format!(
                "calendar day {} maps to typical day {} of {}",
                index + 1,
                self.days[index],
                self.nbr_tds
            )));
        }

        let counts = self.day_counts();
        if let Some(index) = counts.iter().position(|&count| count == 0) {
            return Err(TdError::ReconstructionMismatch(format!(
                "typical day {} stands for no calendar day",
                index + 1
            )));
        }
        let total: usize = counts.iter().sum();
        if total != DAYS_PER_YEAR {
            return Err(TdError::ReconstructionMismatch(format!(
                "day counts sum to {}, expected {}",
                total, DAYS_PER_YEAR
            )));
        }

        for (index, &day) in self.representatives.iter().enumerate() {
            if day == UNASSIGNED || self.days[day - 1] != index + 1 {
                return Err(TdError::ReconstructionMismatch(format!(
                    "typical day {} is represented by calendar day {} outside its cluster",
                    index + 1,
                    day
                )));
            }
        }
        Ok(())
    }

    /// Represents each typical day by the member day with the smallest summed
    /// distance to the other members of its cluster (lowest day on ties)
    pub fn refine_representatives(&mut self, matrix: &WeightedDailyMatrix) {
        for td in 1..=self.nbr_tds {
            let members: Vec<usize> = (1..=self.days.len())
                .filter(|&day| self.days[day - 1] == td)
                .collect();
            let mut best: Option<(usize, f64)> = None;
            for &candidate in &members {
                let cost: f64 = members
                    .iter()
                    .map(|&other| matrix.distance(candidate, other))
                    .sum();
                if best.is_none_or(|(_, best_cost)| cost < best_cost) {
                    best = Some((candidate, cost));
                }
            }
            if let Some((day, _)) = best {
                self.representatives[td - 1] = day;
            }
        }
    }

    /// Reads a persisted assignment file holding one integer per calendar
    /// day. A corrupted file is a `ReconstructionMismatch`.
    pub fn read(path: &Path, format: AssignmentFormat, nbr_tds: usize) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let values = parse_assignment(&content).map_err(|message| {
            TdError::ReconstructionMismatch(format!("{}: {}", path.display(), message))
        })?;
        Self::from_values(values, format, nbr_tds)
    }

    /// Reads the assignment file a solver just wrote. Malformed output is
    /// reported as a failure of the day selection.
    pub fn read_solver_output(
        path: &Path,
        format: AssignmentFormat,
        nbr_tds: usize,
    ) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let values =
            parse_assignment(&content).map_err(|output| TdError::ExternalSelectionFailure {
                exit_code: None,
                output,
            })?;
        Self::from_values(values, format, nbr_tds)
    }

    fn from_values(values: Vec<usize>, format: AssignmentFormat, nbr_tds: usize) -> Result<Self> {
        match format {
            AssignmentFormat::TdIndex => Ok(Self::from_td_indices(values, nbr_tds)),
            AssignmentFormat::MedoidDay => Self::from_medoid_days(&values, nbr_tds),
        }
    }

    /// Writes one integer per calendar day, in calendar order
    pub fn write(&self, path: &Path, format: AssignmentFormat) -> Result<()> {
        let content: String = self
            .days
            .iter()
            .map(|&td| match format {
                AssignmentFormat::TdIndex => format!("{}\n", td),
                AssignmentFormat::MedoidDay => format!("{}\n", self.representative_day(td)),
            })
            .collect();
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Parses exactly 365 non-empty lines of one integer each
fn parse_assignment(content: &str) -> std::result::Result<Vec<usize>, String> {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.len() != DAYS_PER_YEAR {
        return Err(format!(
            "assignment has {} lines, expected {}",
            lines.len(),
            DAYS_PER_YEAR
        ));
    }
    lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            // solvers print integral values as "3" or "3.0"
            line.parse::<f64>()
                .ok()
                .filter(|v| v.fract() == 0.0 && *v >= 0.0)
                .map(|v| v as usize)
                .ok_or_else(|| format!("line {} is not a day index: '{}'", index + 1, line))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Calendar day d goes to typical day (d - 1) % n + 1
    fn round_robin(nbr_tds: usize) -> DayAssignment {
        DayAssignment::from_td_indices(
            (0..DAYS_PER_YEAR).map(|d| d % nbr_tds + 1).collect(),
            nbr_tds,
        )
    }

    #[test]
    fn test_day_counts_sum_to_365() {
        for nbr_tds in [1, 2, 7, 12, 365] {
            let assignment = round_robin(nbr_tds);
            assignment.validate().unwrap();
            let counts = assignment.day_counts();
            assert_eq!(counts.len(), nbr_tds);
            assert_eq!(counts.iter().sum::<usize>(), 365);
        }
    }

    #[test]
    fn test_first_day_represents_cluster() {
        let assignment = round_robin(3);
        assert_eq!(assignment.representatives(), &[1, 2, 3]);
        assert_eq!(assignment.td_of_day(4), 1);
    }

    #[test]
    fn test_gap_is_reconstruction_mismatch() {
        let assignment = DayAssignment::from_entries(
            (1..=365).filter(|&d| d != 200).map(|d| (d, 1)),
            1,
        );
        match assignment.validate() {
            Err(TdError::ReconstructionMismatch(message)) => {
                assert!(message.contains("200"), "{}", message)
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_empty_typical_day_is_reconstruction_mismatch() {
        let assignment = DayAssignment::from_td_indices(vec![1; 365], 2);
        assert!(matches!(
            assignment.validate(),
            Err(TdError::ReconstructionMismatch(_))
        ));
    }

    #[test]
    fn test_out_of_range_index_is_reconstruction_mismatch() {
        let mut days = vec![1; 365];
        days[10] = 3;
        let assignment = DayAssignment::from_td_indices(days, 2);
        assert!(matches!(
            assignment.validate(),
            Err(TdError::ReconstructionMismatch(_))
        ));
    }

    #[test]
    fn test_medoid_days_are_numbered_in_calendar_order() {
        let medoids: Vec<usize> = (1..=365).map(|d| if d <= 100 { 40 } else { 300 }).collect();
        let assignment = DayAssignment::from_medoid_days(&medoids, 2).unwrap();
        assignment.validate().unwrap();
        assert_eq!(assignment.representatives(), &[40, 300]);
        assert_eq!(assignment.td_of_day(1), 1);
        assert_eq!(assignment.td_of_day(101), 2);
        assert_eq!(assignment.day_counts(), vec![100, 265]);

        assert!(DayAssignment::from_medoid_days(&medoids, 3).is_err());
    }

    #[test]
    fn test_read_rejects_wrong_line_count() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(&temp_file, "1\n".repeat(364)).unwrap();

        // a persisted file is corrupted, a fresh solver output is a failed selection
        let result = DayAssignment::read(temp_file.path(), AssignmentFormat::TdIndex, 1);
        assert!(matches!(result, Err(TdError::ReconstructionMismatch(_))));
        let result =
            DayAssignment::read_solver_output(temp_file.path(), AssignmentFormat::TdIndex, 1);
        assert!(matches!(
            result,
            Err(TdError::ExternalSelectionFailure { exit_code: None, .. })
        ));
    }

    #[test]
    fn test_read_rejects_non_integer_line() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let mut content = "1\n".repeat(364);
        content.push_str("1.5\n");
        std::fs::write(&temp_file, content).unwrap();
        match DayAssignment::read(temp_file.path(), AssignmentFormat::TdIndex, 1) {
            Err(TdError::ReconstructionMismatch(message)) => {
                assert!(message.contains("line 365"), "{}", message)
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_write_then_read_medoid_format() {
        let medoids: Vec<usize> = (1..=365).map(|d| if d % 2 == 0 { 2 } else { 5 }).collect();
        let assignment = DayAssignment::from_medoid_days(&medoids, 2).unwrap();

        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("TD_of_days_2.out");
        assignment.write(&path, AssignmentFormat::MedoidDay).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("5\n2\n5\n"));

        let read = DayAssignment::read(&path, AssignmentFormat::MedoidDay, 2).unwrap();
        assert_eq!(read, assignment);
    }

    #[test]
    fn test_read_accepts_float_formatted_indices() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(&temp_file, "1.0\n".repeat(365)).unwrap();
        let assignment =
            DayAssignment::read(temp_file.path(), AssignmentFormat::TdIndex, 1).unwrap();
        assert_eq!(assignment.day_counts(), vec![365]);
    }
}
