//! Solution-limit strategy: adapts the number of MIP solutions the backend
//! may accept per solve.
//!
//! The limit starts small (early passes only need points to cut at, not
//! proven optima) and grows when a pass stalls at the limit. Three triggers
//! force a one-off full-optimality solve through the sentinel limit; the
//! pass after a forced one restores exactly the limit recorded before
//! forcing.

use std::time::Duration;

use hyperforge_config::DualSettings;
use tracing::info;

use super::backend::{MipBackend, SolverStatus, SOLUTION_LIMIT_SENTINEL};
use crate::results::Results;

#[derive(Debug)]
pub struct SolutionLimitStrategy {
    increment: u64,
    force_after_passes: usize,
    force_after_time: Duration,
    primal_proximity_tolerance: f64,
    forced_active: bool,
    limit_before_force: u64,
}

impl SolutionLimitStrategy {
    pub fn new(settings: &DualSettings) -> Self {
        Self {
            increment: settings.solution_limit_increment,
            force_after_passes: settings.force_optimal_after_passes,
            force_after_time: settings.force_optimal_after(),
            primal_proximity_tolerance: settings.force_optimal_primal_tolerance,
            forced_active: false,
            limit_before_force: settings.solution_limit_initial,
        }
    }

    /// True when the previous pass was a forced full-optimality solve.
    pub fn forced_active(&self) -> bool {
        self.forced_active
    }

    /// Runs once per pass, strictly before the backend solve. Returns
    /// whether the backend's limit was changed for this pass.
    pub fn execute(
        &mut self,
        backend: &mut dyn MipBackend,
        results: &Results,
        elapsed: Duration,
    ) -> bool {
        // Restore first: a forced pass borrows the sentinel for exactly one
        // solve.
        if self.forced_active {
            self.forced_active = false;
            backend.set_solution_limit(self.limit_before_force);
        }

        let current_pass = results.iteration_count();
        let dual_known = results.dual_bound().is_finite();

        let stalled_passes = dual_known
            && current_pass.saturating_sub(results.pass_of_last_dual_improvement)
                > self.force_after_passes;
        let stalled_time = dual_known
            && elapsed.saturating_sub(results.time_of_last_dual_improvement)
                > self.force_after_time;
        let near_primal = results.primal_bound().is_finite()
            && results.previous().map_or(false, |previous| {
                previous.objective_value.is_finite()
                    && (previous.objective_value - results.primal_bound()).abs()
                        < self.primal_proximity_tolerance
            });

        if stalled_passes || stalled_time || near_primal {
            self.limit_before_force = backend.solution_limit();
            backend.set_solution_limit(SOLUTION_LIMIT_SENTINEL);
            self.forced_active = true;
            let trigger = if stalled_passes {
                "pass count since last dual bound update"
            } else if stalled_time {
                "time since last dual bound update"
            } else {
                "MIP objective close to primal bound"
            };
            info!(trigger, "forcing a full-optimality pass");
            return true;
        }

        // Incremental growth: the previous pass hit its limit without moving
        // the dual bound.
        if let Some(previous) = results.previous() {
            if previous.status == SolverStatus::SolutionLimit
                && results.pass_of_last_dual_improvement < previous.number
            {
                backend.increase_solution_limit(self.increment);
                return true;
            }
        }

        false
    }
}
