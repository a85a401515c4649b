//! Solver front-end: wires problem, settings and backends into the task
//! pipeline and runs it to a termination verdict.

use std::time::Duration;

use hyperforge_config::Settings;
use hyperforge_core::{HyperforgeError, Problem, Result};
use tracing::{info, warn};

use crate::dual::{DualSolver, MipBackend};
use crate::nlp::NlpBackend;
use crate::results::{PrimalSolution, Results};
use crate::scope::SolveScope;
use crate::tasks::{
    CheckAbsoluteGapTask, CheckConstraintToleranceTask, CheckIterationErrorTask,
    CheckIterationLimitTask, CheckPrimalStagnationTask, CheckRelativeGapTask, CheckTimeLimitTask,
    CreateDualProblemTask,
    ExecuteRelaxationStrategyTask, ExecuteSolutionLimitStrategyTask, FindInteriorPointTask,
    GenerateCutsTask, InitIterationTask, JumpTask, PresolveTask, SelectPrimalCandidatesTask,
    SequentialTask, SolveDualTask, TaskPipeline, UpdateInteriorPointTask,
};

/// Identifier of the loop entry, the target of the loop-closing jump.
const LOOP_START: &str = "ExecuteRelaxationStrategy";
/// Identifier of the finalization block, the target of every termination
/// check.
const FINALIZE: &str = "FinalizeSolution";

/// Assembles the solver from a problem, settings and backends.
pub struct SolverBuilder {
    problem: Problem,
    settings: Settings,
    mip: Option<Box<dyn MipBackend>>,
    nlp: Option<Box<dyn NlpBackend>>,
}

impl SolverBuilder {
    pub fn new(problem: Problem) -> Self {
        Self {
            problem,
            settings: Settings::default(),
            mip: None,
            nlp: None,
        }
    }

    /// Installs settings; out-of-range values are corrected with warnings.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings.validated();
        self
    }

    /// The MIP backend solving the dual problem. Required.
    pub fn mip_backend(mut self, backend: Box<dyn MipBackend>) -> Self {
        self.mip = Some(backend);
        self
    }

    /// The NLP backend producing interior points. Optional; without one,
    /// cutting planes fall back to solution points.
    pub fn nlp_backend(mut self, backend: Box<dyn NlpBackend>) -> Self {
        self.nlp = Some(backend);
        self
    }

    pub fn build(self) -> Result<Solver> {
        let mip = self
            .mip
            .ok_or_else(|| HyperforgeError::Config("no MIP backend installed".into()))?;

        if self.nlp.is_none()
            && self.problem.nonlinear_constraints().next().is_some()
        {
            warn!("no NLP backend installed, cutting planes degrade to solution points");
        }

        let dual = DualSolver::new(mip, &self.settings, &self.problem);
        let scope = SolveScope::new(self.problem, self.settings, dual, self.nlp);

        Ok(Solver {
            scope,
            pipeline: build_pipeline(),
        })
    }
}

fn build_pipeline() -> TaskPipeline {
    let mut pipeline = TaskPipeline::new();
    let finalize = || FINALIZE.to_string();

    // Preamble, run once.
    pipeline.add_task("CreateDualProblem", Box::new(CreateDualProblemTask));
    let presolve = pipeline.add_task("Presolve", Box::new(PresolveTask));
    pipeline.add_task("FindInteriorPoint", Box::new(FindInteriorPointTask));

    // Main loop: strategy, ledger, cuts, solve, record, check.
    pipeline.add_task(LOOP_START, Box::new(ExecuteRelaxationStrategyTask));
    pipeline.add_task("InitIteration", Box::new(InitIterationTask));
    pipeline.add_task("GenerateCuts", Box::new(GenerateCutsTask));
    pipeline.add_task(
        "ExecuteSolutionLimitStrategy",
        Box::new(ExecuteSolutionLimitStrategyTask),
    );
    pipeline.add_existing("PresolveIteration", presolve);
    pipeline.add_task("SolveDual", Box::new(SolveDualTask));
    pipeline.add_task(
        "CheckIterationError",
        Box::new(CheckIterationErrorTask {
            finalize: finalize(),
        }),
    );

    // Gap checks run twice per pass: after the dual bound moved, and again
    // once primal candidates may have tightened the primal bound.
    let absolute_gap = pipeline.add_task(
        "CheckAbsoluteGap",
        Box::new(CheckAbsoluteGapTask {
            finalize: finalize(),
        }),
    );
    let relative_gap = pipeline.add_task(
        "CheckRelativeGap",
        Box::new(CheckRelativeGapTask {
            finalize: finalize(),
        }),
    );
    pipeline.add_task(
        "SelectPrimalCandidates",
        Box::new(SelectPrimalCandidatesTask),
    );
    pipeline.add_existing("CheckAbsoluteGapAfterPrimal", absolute_gap);
    pipeline.add_existing("CheckRelativeGapAfterPrimal", relative_gap);

    pipeline.add_task(
        "CheckConstraintTolerance",
        Box::new(CheckConstraintToleranceTask {
            finalize: finalize(),
        }),
    );
    pipeline.add_task(
        "CheckPrimalStagnation",
        Box::new(CheckPrimalStagnationTask::new(FINALIZE)),
    );
    pipeline.add_task(
        "CheckIterationLimit",
        Box::new(CheckIterationLimitTask {
            finalize: finalize(),
        }),
    );
    pipeline.add_task(
        "CheckTimeLimit",
        Box::new(CheckTimeLimitTask {
            finalize: finalize(),
        }),
    );
    pipeline.add_task("UpdateInteriorPoint", Box::new(UpdateInteriorPointTask));
    pipeline.add_task("Repeat", Box::new(JumpTask::new(LOOP_START)));

    // Finalization: one last sweep over the final pass's points.
    let mut finalize_block = SequentialTask::new();
    finalize_block.push(Box::new(SelectPrimalCandidatesTask));
    pipeline.add_task(FINALIZE, Box::new(finalize_block));

    pipeline
}

/// A fully wired solver, consumed by [`Solver::solve`].
#[derive(Debug)]
pub struct Solver {
    scope: SolveScope,
    pipeline: TaskPipeline,
}

impl Solver {
    pub fn solve(mut self) -> Result<SolveReport> {
        self.scope.start_solving();
        info!(
            problem = self.scope.problem.name(),
            class = ?self.scope.problem.classification(),
            "solve started"
        );

        self.pipeline.run(&mut self.scope)?;

        let wall_time = self.scope.elapsed();
        let results = self.scope.results;
        match results.termination_reason() {
            Some(reason) => info!(
                ?reason,
                passes = results.iteration_count(),
                dual_bound = results.dual_bound(),
                primal_bound = results.primal_bound(),
                "solve finished"
            ),
            None => warn!("pipeline finished without a termination verdict"),
        }

        Ok(SolveReport { results, wall_time })
    }
}

/// Outcome of a solve, ready for reporting.
#[derive(Debug)]
pub struct SolveReport {
    pub results: Results,
    pub wall_time: Duration,
}

impl SolveReport {
    pub fn best_primal_solution(&self) -> Option<&PrimalSolution> {
        self.results.best_primal_solution()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dual::SolverStatus;
    use crate::results::TerminationReason;
    use crate::test_utils::{ball_problem, ScriptedBackend, ScriptedSolve};

    #[test]
    fn test_builder_requires_mip_backend() {
        let error = SolverBuilder::new(ball_problem(false)).build().unwrap_err();
        assert!(matches!(error, HyperforgeError::Config(_)));
    }

    #[test]
    fn test_scripted_run_terminates_on_gap() {
        // The single scripted pass lands directly on an interior optimum:
        // dual and primal bound coincide and the gap check ends the run.
        let backend = ScriptedBackend::new(vec![ScriptedSolve {
            status: SolverStatus::Optimal,
            points: vec![(vec![1.0, 1.0], -2.0)],
        }]);

        let report = SolverBuilder::new(ball_problem(false))
            .mip_backend(Box::new(backend))
            .build()
            .unwrap()
            .solve()
            .unwrap();

        assert_eq!(
            report.results.termination_reason(),
            Some(TerminationReason::AbsoluteGap)
        );
        assert_eq!(report.results.iteration_count(), 1);
        assert_eq!(report.results.dual_bound(), -2.0);
        assert_eq!(report.results.primal_bound(), -2.0);
        assert_eq!(report.best_primal_solution().unwrap().point, vec![1.0, 1.0]);
    }

    #[test]
    fn test_exhausted_backend_ends_with_numerical_error() {
        // Pass 1 returns an exterior point; pass 2 runs off the script and
        // reports a backend error without a point.
        let backend = ScriptedBackend::new(vec![ScriptedSolve {
            status: SolverStatus::Optimal,
            points: vec![(vec![3.0, 3.0], -6.0)],
        }]);

        let report = SolverBuilder::new(ball_problem(false))
            .mip_backend(Box::new(backend))
            .build()
            .unwrap()
            .solve()
            .unwrap();

        assert_eq!(
            report.results.termination_reason(),
            Some(TerminationReason::NumericalError)
        );
        assert_eq!(report.results.iteration_count(), 2);
    }
}
