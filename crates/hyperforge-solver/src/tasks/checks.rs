//! Termination checks. Each check either lets the pipeline continue or
//! records a termination reason and jumps to the finalization block; the
//! first recorded reason is the one reported.

use hyperforge_core::Result;
use tracing::{debug, info, warn};

use super::{Task, TaskFlow};
use crate::dual::SolverStatus;
use crate::results::TerminationReason;
use crate::scope::SolveScope;

/// Inspects the status of the pass that just solved: an infeasible dual
/// model or a solve error with no usable points ends the run.
pub struct CheckIterationErrorTask {
    pub finalize: String,
}

impl Task for CheckIterationErrorTask {
    fn run(&mut self, scope: &mut SolveScope, flow: &mut TaskFlow) -> Result<()> {
        let Some(current) = scope.results.current() else {
            return Ok(());
        };
        let status = current.status;
        let pass = current.number;
        let mip = current.is_mip();
        let has_points = !current.solution_points.is_empty();

        match status {
            SolverStatus::Infeasible => {
                if mip && scope.dual.prescribes_relaxed(pass + 1, &scope.results) {
                    // The upcoming relaxed pass may still make progress.
                    debug!(pass, "infeasible pass, continuing into a relaxation");
                } else {
                    scope.results.record_termination(
                        TerminationReason::InfeasibleProblem,
                        "the dual problem is infeasible",
                    );
                    flow.jump_to(self.finalize.clone());
                }
            }
            SolverStatus::Error if !has_points => {
                warn!(pass, "dual solve failed without a usable point");
                scope.results.record_termination(
                    TerminationReason::NumericalError,
                    "the dual solver failed without returning a solution",
                );
                flow.jump_to(self.finalize.clone());
            }
            _ => {}
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "CheckIterationErrorTask"
    }
}

/// Whether the gap checks may fire for the current pass.
fn gap_check_allowed(scope: &SolveScope) -> bool {
    if !scope.settings.termination.require_optimal_for_gap {
        return true;
    }
    scope
        .results
        .current()
        .map_or(false, |c| c.status == SolverStatus::Optimal && c.is_mip())
}

pub struct CheckAbsoluteGapTask {
    pub finalize: String,
}

impl Task for CheckAbsoluteGapTask {
    fn run(&mut self, scope: &mut SolveScope, flow: &mut TaskFlow) -> Result<()> {
        if !gap_check_allowed(scope) {
            return Ok(());
        }
        let gap = scope.results.absolute_gap();
        if gap <= scope.settings.termination.absolute_gap {
            info!(gap, "absolute gap within tolerance");
            scope.results.record_termination(
                TerminationReason::AbsoluteGap,
                format!("absolute objective gap {gap:.3e} within tolerance"),
            );
            flow.jump_to(self.finalize.clone());
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "CheckAbsoluteGapTask"
    }
}

pub struct CheckRelativeGapTask {
    pub finalize: String,
}

impl Task for CheckRelativeGapTask {
    fn run(&mut self, scope: &mut SolveScope, flow: &mut TaskFlow) -> Result<()> {
        if !gap_check_allowed(scope) {
            return Ok(());
        }
        let gap = scope.results.relative_gap();
        if gap <= scope.settings.termination.relative_gap {
            info!(gap, "relative gap within tolerance");
            scope.results.record_termination(
                TerminationReason::RelativeGap,
                format!("relative objective gap {gap:.3e} within tolerance"),
            );
            flow.jump_to(self.finalize.clone());
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "CheckRelativeGapTask"
    }
}

/// Ends the run when the dual optimum already satisfies the nonlinear
/// constraints: the dual model's solution then solves the original problem.
pub struct CheckConstraintToleranceTask {
    pub finalize: String,
}

impl Task for CheckConstraintToleranceTask {
    fn run(&mut self, scope: &mut SolveScope, flow: &mut TaskFlow) -> Result<()> {
        if scope.problem.classification().is_linear_or_quadratic() {
            return Ok(());
        }
        // With a nonlinear objective part the dual objective underestimates
        // the true one, so constraint feasibility alone proves nothing.
        if scope.problem.objective().has_nonlinear_part() {
            return Ok(());
        }

        let deviation = {
            let Some(current) = scope.results.current() else {
                return Ok(());
            };
            if !(current.status == SolverStatus::Optimal && current.is_mip()) {
                return Ok(());
            }
            match current.point_with_smallest_deviation() {
                Some(best) => best.max_deviation.value,
                None => return Ok(()),
            }
        };

        if deviation <= scope.settings.termination.constraint_tolerance {
            info!(deviation, "dual optimum fulfills the nonlinear constraints");
            scope.results.record_termination(
                TerminationReason::ConstraintTolerance,
                format!("nonlinear constraints fulfilled within {deviation:.3e} at the dual optimum"),
            );
            flow.jump_to(self.finalize.clone());
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "CheckConstraintToleranceTask"
    }
}

/// Ends the run when the dual solver keeps returning the very same
/// incumbent pass after pass: the cut loop can no longer separate it, so no
/// later pass will move either bound.
pub struct CheckPrimalStagnationTask {
    pub finalize: String,
    repeats: usize,
    last_incumbent: Option<Vec<f64>>,
}

impl CheckPrimalStagnationTask {
    pub fn new(finalize: impl Into<String>) -> Self {
        Self {
            finalize: finalize.into(),
            repeats: 0,
            last_incumbent: None,
        }
    }
}

impl Task for CheckPrimalStagnationTask {
    fn run(&mut self, scope: &mut SolveScope, flow: &mut TaskFlow) -> Result<()> {
        let limit = scope.settings.termination.primal_stagnation_passes;
        if limit == 0 {
            return Ok(());
        }
        let incumbent = scope
            .results
            .current()
            .and_then(|c| c.solution_points.first())
            .map(|p| p.point.clone());
        let Some(incumbent) = incumbent else {
            self.repeats = 0;
            self.last_incumbent = None;
            return Ok(());
        };

        if self.last_incumbent.as_deref() == Some(incumbent.as_slice()) {
            self.repeats += 1;
        } else {
            self.repeats = 0;
            self.last_incumbent = Some(incumbent);
        }

        if self.repeats >= limit {
            warn!(passes = self.repeats, "dual incumbent is stagnating");
            scope.results.record_termination(
                TerminationReason::PrimalStagnation,
                format!("identical dual incumbent for {} consecutive passes", self.repeats),
            );
            flow.jump_to(self.finalize.clone());
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "CheckPrimalStagnationTask"
    }
}

pub struct CheckIterationLimitTask {
    pub finalize: String,
}

impl Task for CheckIterationLimitTask {
    fn run(&mut self, scope: &mut SolveScope, flow: &mut TaskFlow) -> Result<()> {
        let limit = scope.settings.termination.iteration_limit;
        if scope.results.iteration_count() >= limit {
            warn!(limit, "iteration limit reached");
            scope.results.record_termination(
                TerminationReason::IterationLimit,
                format!("iteration limit {limit} reached"),
            );
            flow.jump_to(self.finalize.clone());
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "CheckIterationLimitTask"
    }
}

pub struct CheckTimeLimitTask {
    pub finalize: String,
}

impl Task for CheckTimeLimitTask {
    fn run(&mut self, scope: &mut SolveScope, flow: &mut TaskFlow) -> Result<()> {
        if scope.remaining_time().is_zero() {
            warn!("time limit reached");
            scope.results.record_termination(
                TerminationReason::TimeLimit,
                format!(
                    "time limit of {:.1} s reached",
                    scope.settings.termination.time_limit_secs
                ),
            );
            flow.jump_to(self.finalize.clone());
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "CheckTimeLimitTask"
    }
}
