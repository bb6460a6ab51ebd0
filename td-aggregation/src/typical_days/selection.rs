use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::general::config::{AssignmentFormat, SelectorConfig};
use crate::general::error::{Result, TdError};
use crate::typical_days::assignment::DayAssignment;
use crate::typical_days::daily::WeightedDailyMatrix;
use crate::typical_days::serializer::write_selection_data;

/// Groups the 365 calendar days into `nbr_tds` clusters of similar days.
pub trait DaySelector {
    fn select(&self, matrix: &WeightedDailyMatrix, nbr_tds: usize) -> Result<DayAssignment>;

    /// Format the selection result is persisted in
    fn assignment_format(&self) -> AssignmentFormat {
        AssignmentFormat::TdIndex
    }
}

/// Runs an external solver on the weighted matrix and reads back the
/// assignment file it writes.
///
/// The call blocks until the solver exits; no timeout is enforced.
#[derive(Debug, Clone)]
pub struct ExternalDaySelector {
    program: String,
    args: Vec<String>,
    work_dir: PathBuf,
    data_file: PathBuf,
    output_file: PathBuf,
    format: AssignmentFormat,
}

impl ExternalDaySelector {
    pub fn new(
        config: &SelectorConfig,
        work_dir: PathBuf,
        data_file: PathBuf,
        output_file: PathBuf,
    ) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            work_dir,
            data_file,
            output_file,
            format: config.assignment_format,
        }
    }

    /// Substitutes `{data}`, `{output}` and `{nbr_tds}`; the file paths must
    /// be absolute since the solver runs inside `work_dir`
    fn expand_args(&self, data_file: &Path, output_file: &Path, nbr_tds: usize) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{data}", &data_file.to_string_lossy())
                    .replace("{output}", &output_file.to_string_lossy())
                    .replace("{nbr_tds}", &nbr_tds.to_string())
            })
            .collect()
    }
}

impl DaySelector for ExternalDaySelector {
    fn select(&self, matrix: &WeightedDailyMatrix, nbr_tds: usize) -> Result<DayAssignment> {
        let data_file = std::path::absolute(&self.data_file)?;
        let output_file = std::path::absolute(&self.output_file)?;
        write_selection_data(&data_file, matrix, nbr_tds)?;
        if output_file.exists() {
            std::fs::remove_file(&output_file)?;
        }

        let program = which::which(&self.program).map_err(|e| TdError::ExternalSelectionFailure {
            exit_code: None,
            output: format!("solver '{}' not found: {}", self.program, e),
        })?;
        let args = self.expand_args(&data_file, &output_file, nbr_tds);
        info!(program = %program.display(), ?args, nbr_tds, "running day selection");

        let output = Command::new(&program)
            .args(&args)
            .current_dir(&self.work_dir)
            .output()?;

        let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
        captured.push_str(&String::from_utf8_lossy(&output.stderr));
        debug!(output = %captured, "day selection finished");

        if !output.status.success() {
            return Err(TdError::ExternalSelectionFailure {
                exit_code: output.status.code(),
                output: captured,
            });
        }
        if !output_file.exists() {
            return Err(TdError::ExternalSelectionFailure {
                exit_code: output.status.code(),
                output: format!(
                    "no assignment written to {}\n{}",
                    output_file.display(),
                    captured
                ),
            });
        }

        DayAssignment::read_solver_output(&output_file, self.format, nbr_tds)
    }

    fn assignment_format(&self) -> AssignmentFormat {
        self.format
    }
}
