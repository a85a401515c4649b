//! Contract for pluggable NLP backends and interior point maintenance.
//!
//! The engine needs an NLP solver for exactly one job: producing points
//! strictly inside the nonlinear feasible region to anchor the rootsearch.
//! The backend solves the auxiliary problem (minimize the largest
//! constraint deviation over the variable box) however it likes; the engine
//! only validates and installs the result.

use std::fmt;

use hyperforge_core::{InteriorPoint, Problem};
use smallvec::SmallVec;
use tracing::{info, warn};

/// The interior point set almost always holds a single anchor.
pub type InteriorPointSet = SmallVec<[InteriorPoint; 2]>;

/// Outcome of one NLP backend solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NlpStatus {
    Optimal,
    /// Feasible but not proven optimal; good enough for an anchor.
    Feasible,
    Infeasible,
    Error,
}

impl NlpStatus {
    pub fn has_solution(self) -> bool {
        matches!(self, NlpStatus::Optimal | NlpStatus::Feasible)
    }
}

/// The fixed contract an NLP backend implements.
pub trait NlpBackend: fmt::Debug {
    /// Warm start for the next solve.
    fn set_starting_point(&mut self, point: &[f64]);

    /// Solves the interior-point auxiliary problem for `problem`.
    fn solve(&mut self, problem: &Problem) -> NlpStatus;

    /// The point of the last successful solve.
    fn solution(&self) -> Vec<f64>;

    /// Objective value of the auxiliary problem at [`NlpBackend::solution`],
    /// NaN when no solve succeeded yet.
    fn objective_value(&self) -> f64;
}

/// Runs one auxiliary solve and, when it produced a strictly interior
/// point, replaces the interior point set wholesale. Returns whether the
/// set was replaced.
///
/// A point on or outside the boundary is rejected: cuts rootsearched
/// against it could pass through feasible territory.
pub fn refresh_interior_points(
    backend: &mut dyn NlpBackend,
    problem: &Problem,
    set: &mut InteriorPointSet,
) -> bool {
    let status = backend.solve(problem);
    if !status.has_solution() {
        warn!(?status, "interior point solve failed, keeping current set");
        return false;
    }

    let point = backend.solution();
    let deviation = problem
        .most_deviating_nonlinear_constraint(&point)
        .map_or(f64::NEG_INFINITY, |d| d.value);

    if deviation >= 0.0 {
        warn!(
            deviation,
            "candidate interior point is not strictly feasible, keeping current set"
        );
        return false;
    }

    info!(
        deviation,
        auxiliary_objective = backend.objective_value(),
        "interior point updated"
    );
    set.clear();
    set.push(InteriorPoint {
        point,
        max_deviation: deviation,
    });
    true
}
