use good_lp::{Expression, ProblemVariables, Solution, Solver, SolverModel, constraint, variable};
use tracing::{info, warn};

use crate::general::config::AssignmentFormat;
use crate::general::error::{Result, TdError};
use crate::typical_days::assignment::DayAssignment;
use crate::typical_days::daily::WeightedDailyMatrix;
use crate::typical_days::selection::DaySelector;

/// Selects typical days in-process by solving a k-medoids mixed-integer
/// program with a good_lp solver that supports binaries (HiGHS, SCIP).
#[derive(Debug, Clone)]
pub struct MilpDaySelector<S> {
    solver: S,
}

impl<S: Solver + Clone> MilpDaySelector<S> {
    pub fn new(solver: S) -> Self {
        Self { solver }
    }
}

/// Solves the k-medoids problem on a square distance matrix.
///
/// Minimizes the summed distance of every item to its medoid, with exactly
/// `nbr_medoids` medoids. Returns the medoid (0-based) of every item;
/// medoids are their own medoid.
pub fn select_medoids<S: Solver>(
    distances: &[Vec<f64>],
    nbr_medoids: usize,
    solver: S,
) -> Result<Vec<usize>> {
    let n = distances.len();
    if nbr_medoids == 0 || nbr_medoids > n {
        return Err(TdError::Selection(format!(
            "cannot select {} medoids among {} items",
            nbr_medoids, n
        )));
    }

    let mut vars = ProblemVariables::new();
    // selected[j]: item j is a medoid
    let selected: Vec<good_lp::Variable> = (0..n).map(|_| vars.add(variable().binary())).collect();
    // assign[i][j]: item i is represented by medoid j
    let assign: Vec<Vec<good_lp::Variable>> = (0..n)
        .map(|_| {
            (0..n)
                .map(|_| vars.add(variable().min(0.0).max(1.0)))
                .collect()
        })
        .collect();

    let mut objective = Expression::default();
    for (i, row) in assign.iter().enumerate() {
        for (j, &var) in row.iter().enumerate() {
            objective += var * distances[i][j];
        }
    }

    let mut model = vars.minimise(objective).using(solver);

    for row in &assign {
        let assigned: Expression = row.iter().map(|&var| Expression::from(var)).sum();
        model = model.with(constraint!(assigned == 1.0));
        for (j, &var) in row.iter().enumerate() {
            model = model.with(constraint!(var <= selected[j]));
        }
    }
    let medoid_count: Expression = selected.iter().map(|&var| Expression::from(var)).sum();
    let target = nbr_medoids as f64;
    model = model.with(constraint!(medoid_count == target));

    let solution = model
        .solve()
        .map_err(|e| TdError::Selection(e.to_string()))?;

    let medoids: Vec<usize> = (0..n)
        .filter(|&j| solution.value(selected[j]) > 0.5)
        .collect();
    if medoids.len() != nbr_medoids {
        return Err(TdError::Selection(format!(
            "solver selected {} medoids, expected {}",
            medoids.len(),
            nbr_medoids
        )));
    }

    // nearest medoid, lowest index on ties; medoids keep themselves
    let result = (0..n)
        .map(|i| {
            if medoids.contains(&i) {
                return i;
            }
            let mut best = medoids[0];
            for &m in &medoids[1..] {
                if distances[i][m] < distances[i][best] {
                    best = m;
                }
            }
            best
        })
        .collect();
    Ok(result)
}

impl<S: Solver + Clone> DaySelector for MilpDaySelector<S> {
    fn select(&self, matrix: &WeightedDailyMatrix, nbr_tds: usize) -> Result<DayAssignment> {
        if matrix.columns().is_empty() {
            warn!("no weighted series, every day is equally similar");
        }
        let days = matrix.rows().len();
        let distances: Vec<Vec<f64>> = (1..=days)
            .map(|a| (1..=days).map(|b| matrix.distance(a, b)).collect())
            .collect();

        info!(days, nbr_tds, "solving k-medoids day selection");
        let medoids = select_medoids(&distances, nbr_tds, self.solver.clone())?;
        let medoid_days: Vec<usize> = medoids.iter().map(|m| m + 1).collect();
        DayAssignment::from_medoid_days(&medoid_days, nbr_tds)
    }

    fn assignment_format(&self) -> AssignmentFormat {
        AssignmentFormat::MedoidDay
    }
}
