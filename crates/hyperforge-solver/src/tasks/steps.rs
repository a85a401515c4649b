//! Pipeline steps that advance the solve: model setup, per-pass bookkeeping,
//! cut generation, the dual solve itself and primal candidate selection.

use hyperforge_core::Result;
use tracing::{debug, info, warn};

use super::{Task, TaskFlow};
use crate::cuts;
use crate::dual::SolverStatus;
use crate::nlp::refresh_interior_points;
use crate::results::PrimalSolution;
use crate::scope::SolveScope;

/// A warm-start point at the center of the variable box, falling back to a
/// finite bound (or zero) for unbounded variables.
fn box_center(scope: &SolveScope) -> Vec<f64> {
    scope
        .problem
        .variables()
        .iter()
        .map(|v| {
            if v.lower.is_finite() && v.upper.is_finite() {
                0.5 * (v.lower + v.upper)
            } else if v.lower.is_finite() {
                v.lower
            } else if v.upper.is_finite() {
                v.upper
            } else {
                0.0
            }
        })
        .collect()
}

/// Builds the dual model on the backend and applies the initial solution
/// limit.
pub struct CreateDualProblemTask;

impl Task for CreateDualProblemTask {
    fn run(&mut self, scope: &mut SolveScope, _flow: &mut TaskFlow) -> Result<()> {
        let limit = scope.settings.dual.solution_limit_initial;
        scope.dual.build(&scope.problem, limit)
    }

    fn type_name(&self) -> &'static str {
        "CreateDualProblemTask"
    }
}

/// Presolves the dual model, honoring the configured frequency.
pub struct PresolveTask;

impl Task for PresolveTask {
    fn run(&mut self, scope: &mut SolveScope, _flow: &mut TaskFlow) -> Result<()> {
        scope.dual.presolve(&scope.problem);
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "PresolveTask"
    }
}

/// Seeds the interior point set through the NLP backend.
pub struct FindInteriorPointTask;

impl Task for FindInteriorPointTask {
    fn run(&mut self, scope: &mut SolveScope, _flow: &mut TaskFlow) -> Result<()> {
        if scope.problem.nonlinear_constraints().next().is_none() {
            return Ok(());
        }
        let start = box_center(scope);
        let Some(nlp) = scope.nlp.as_mut() else {
            warn!("no NLP backend, cutting planes will be taken at solution points");
            return Ok(());
        };
        nlp.set_starting_point(&start);
        refresh_interior_points(nlp.as_mut(), &scope.problem, &mut scope.interior_points);
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "FindInteriorPointTask"
    }
}

/// Runs the relaxation strategy for the upcoming pass, before its iteration
/// is opened.
pub struct ExecuteRelaxationStrategyTask;

impl Task for ExecuteRelaxationStrategyTask {
    fn run(&mut self, scope: &mut SolveScope, _flow: &mut TaskFlow) -> Result<()> {
        let pass = scope.results.iteration_count() + 1;
        scope
            .dual
            .prepare_relaxation(pass, &scope.results, &scope.problem);
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "ExecuteRelaxationStrategyTask"
    }
}

/// Opens the ledger entry for the new pass.
pub struct InitIterationTask;

impl Task for InitIterationTask {
    fn run(&mut self, scope: &mut SolveScope, _flow: &mut TaskFlow) -> Result<()> {
        let class = scope.dual.pass_class();
        let used_limit = scope.dual.used_solution_limit();
        let reset = scope.dual.reinitializes_tree();
        let iteration = scope.results.open_iteration(class, used_limit, reset);
        debug!(pass = iteration.number, class = ?iteration.class, "pass started");
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "InitIterationTask"
    }
}

/// Rootsearches the previous pass's solution points into new hyperplanes on
/// the waiting list, and books them on the current pass.
pub struct GenerateCutsTask;

impl Task for GenerateCutsTask {
    fn run(&mut self, scope: &mut SolveScope, _flow: &mut TaskFlow) -> Result<()> {
        if scope.problem.nonlinear_constraints().next().is_none() {
            return Ok(());
        }

        let Some(previous) = scope.results.previous() else {
            return Ok(());
        };
        if previous.solution_points.is_empty() {
            return Ok(());
        }
        cuts::generate_rootsearch_cuts(
            &scope.problem,
            &scope.interior_points,
            &scope.settings,
            &previous.solution_points,
            previous.is_mip(),
            &mut scope.waiting_hyperplanes,
        );
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "GenerateCutsTask"
    }
}

/// Runs the solution-limit strategy and stamps its outcome on the current
/// iteration.
pub struct ExecuteSolutionLimitStrategyTask;

impl Task for ExecuteSolutionLimitStrategyTask {
    fn run(&mut self, scope: &mut SolveScope, _flow: &mut TaskFlow) -> Result<()> {
        let elapsed = scope.elapsed();
        let updated = scope.dual.execute_solution_limit(&scope.results, elapsed);
        let used_limit = scope.dual.used_solution_limit();
        if let Some(current) = scope.results.current_mut() {
            current.solution_limit_updated = updated;
            current.used_solution_limit = used_limit;
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "ExecuteSolutionLimitStrategyTask"
    }
}

/// Commits waiting hyperplanes and runs one bounded dual solve, recording
/// the outcome on the current iteration and the dual bound when it is
/// proven.
pub struct SolveDualTask;

impl Task for SolveDualTask {
    fn run(&mut self, scope: &mut SolveScope, _flow: &mut TaskFlow) -> Result<()> {
        // The ledger counts rows actually committed, not waiting-list
        // entries; duplicates and degenerate cuts are dropped at commit.
        let committed = scope
            .dual
            .commit_waiting_hyperplanes(&scope.problem, &mut scope.waiting_hyperplanes);

        let remaining = scope.remaining_time();
        let cutoff = scope.results.primal_bound();
        let solution = scope.dual.solve_pass(&scope.problem, remaining, cutoff);

        let pass = scope.results.iteration_count();
        let elapsed = scope.elapsed();
        if solution.status == SolverStatus::Optimal && solution.objective_value.is_finite() {
            // A proven solve of the dual model bounds the original problem.
            if scope
                .results
                .update_dual_bound(solution.objective_value, pass, elapsed)
            {
                info!(dual_bound = solution.objective_value, pass, "dual bound improved");
            }
        }

        if let Some(current) = scope.results.current_mut() {
            current.hyperplanes_added = committed;
            current.cumulative_hyperplanes += committed;
            current.status = solution.status;
            current.objective_value = solution.objective_value;
            current.solution_points = solution.points;
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "SolveDualTask"
    }
}

/// Promotes solution points that satisfy the original problem to primal
/// solutions.
pub struct SelectPrimalCandidatesTask;

impl Task for SelectPrimalCandidatesTask {
    fn run(&mut self, scope: &mut SolveScope, _flow: &mut TaskFlow) -> Result<()> {
        let tolerance = scope.settings.termination.constraint_tolerance;
        let Some(current) = scope.results.current() else {
            return Ok(());
        };
        let pass = current.number;
        let points = current.solution_points.clone();

        for point in points {
            if !scope
                .problem
                .are_nonlinear_constraints_fulfilled(&point.point, tolerance)
                || !scope
                    .problem
                    .are_quadratic_constraints_fulfilled(&point.point, tolerance)
                || !scope
                    .problem
                    .are_integrality_constraints_fulfilled(&point.point, tolerance)
            {
                continue;
            }

            // The same point may be pooled again on a later pass (or seen
            // twice through the finalize sweep); record it once.
            if scope
                .results
                .primal_solutions
                .iter()
                .any(|s| s.point == point.point)
            {
                continue;
            }

            // The dual model's objective may ignore nonlinear parts; the
            // primal bound always uses the true objective.
            let objective_value = scope.problem.objective().evaluate(&point.point);
            if scope.results.update_primal_bound(objective_value) {
                info!(objective_value, pass, "new primal solution");
            }
            scope.results.primal_solutions.push(PrimalSolution {
                point: point.point,
                objective_value,
                max_deviation: point.max_deviation.value,
                found_at_pass: pass,
            });
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "SelectPrimalCandidatesTask"
    }
}

/// Periodically refreshes the interior point set, warm started from the
/// least violated point of the pass.
pub struct UpdateInteriorPointTask;

impl Task for UpdateInteriorPointTask {
    fn run(&mut self, scope: &mut SolveScope, _flow: &mut TaskFlow) -> Result<()> {
        let frequency = scope.settings.interior.refresh_frequency;
        if frequency == 0 {
            return Ok(());
        }
        let pass = scope.results.iteration_count();
        if pass == 0 || pass % frequency != 0 {
            return Ok(());
        }
        let Some(nlp) = scope.nlp.as_mut() else {
            return Ok(());
        };

        if let Some(best) = scope
            .results
            .current()
            .and_then(|i| i.point_with_smallest_deviation())
        {
            nlp.set_starting_point(&best.point);
        }
        refresh_interior_points(nlp.as_mut(), &scope.problem, &mut scope.interior_points);
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "UpdateInteriorPointTask"
    }
}
