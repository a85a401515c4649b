//! Contract for pluggable MIP backends.
//!
//! The orchestration engine treats the backend as an opaque blocking solver:
//! every long-running call is bounded by an explicit time budget, and
//! failures surface as statuses rather than unwinding the pipeline.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use hyperforge_core::Problem;
use thiserror::Error;

/// Sentinel accepted-solution-count limit meaning "solve to optimality".
pub const SOLUTION_LIMIT_SENTINEL: u64 = 2_100_000_000;

/// Outcome of one backend solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// No solve has been attempted for this pass.
    NotSolved,
    /// Proven optimal for the model as given to the backend.
    Optimal,
    Infeasible,
    /// The accepted-solution-count limit was reached first.
    SolutionLimit,
    TimeLimit,
    /// A numeric fault or backend exception, absorbed at the call site.
    Error,
}

impl SolverStatus {
    /// True when the backend may hold at least one feasible point.
    pub fn has_solutions(self) -> bool {
        matches!(
            self,
            SolverStatus::Optimal | SolverStatus::SolutionLimit | SolverStatus::TimeLimit
        )
    }
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SolverStatus::NotSolved => "not solved",
            SolverStatus::Optimal => "optimal",
            SolverStatus::Infeasible => "infeasible",
            SolverStatus::SolutionLimit => "solution limit",
            SolverStatus::TimeLimit => "time limit",
            SolverStatus::Error => "error",
        };
        f.write_str(text)
    }
}

/// Recoverable backend failure, logged and absorbed at the call site.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend failure: {0}")]
    Failure(String),

    #[error("backend does not support {0}")]
    Unsupported(&'static str),
}

/// Direction of a linear row added to the dual model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowDirection {
    LessOrEqual,
    GreaterOrEqual,
}

/// Handle to a row added to the backend model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowHandle(pub usize);

/// The fixed contract a MIP backend implements.
///
/// `solve` returns a status rather than a `Result`: a crashed or confused
/// backend reports [`SolverStatus::Error`] and the pipeline carries on.
pub trait MipBackend: fmt::Debug {
    /// (Re)builds the backend model from the problem's variables, linear and
    /// quadratic constraints, and objective. Nonlinear constraints are not
    /// part of the dual model; they enter as hyperplane rows over time.
    fn build_model(&mut self, problem: &Problem) -> Result<(), BackendError>;

    /// Adds `coefficients · x (direction) constant` as a permanent row.
    fn add_linear_constraint(
        &mut self,
        coefficients: &[(usize, f64)],
        constant: f64,
        direction: RowDirection,
    ) -> Result<RowHandle, BackendError>;

    /// Toggles whether discrete variables are enforced or relaxed.
    fn activate_discrete_variables(&mut self, active: bool);
    fn discrete_variables_active(&self) -> bool;

    fn solve(&mut self) -> SolverStatus;

    /// Number of pooled solutions available after the last solve.
    fn solution_count(&self) -> usize;
    fn variable_values(&self, solution_index: usize) -> Vec<f64>;
    fn objective_value(&self, solution_index: usize) -> f64;

    /// Presolves the model and reports tightened variable bounds, when the
    /// backend supports it.
    fn presolve_bounds(&mut self) -> Option<(Vec<f64>, Vec<f64>)>;

    fn solution_limit(&self) -> u64;
    fn set_solution_limit(&mut self, limit: u64);
    fn increase_solution_limit(&mut self, increment: u64) {
        let limit = self.solution_limit().saturating_add(increment);
        self.set_solution_limit(limit);
    }

    /// Objective cutoff: solutions worse than this bound are pruned.
    fn set_cutoff(&mut self, bound: f64);
    fn set_time_limit(&mut self, limit: Duration);

    fn fix_variable(&mut self, index: usize, value: f64);
    fn unfix_variables(&mut self);
    fn update_variable_bounds(&mut self, index: usize, lower: f64, upper: f64);

    /// Dumps the current model to a file for debugging. Backends without a
    /// writer simply decline.
    fn write_model(&self, _path: &Path) -> Result<(), BackendError> {
        Err(BackendError::Unsupported("model export"))
    }
}
