//! The dual solver layer: a pluggable MIP backend plus the strategies that
//! steer it between passes.
//!
//! [`DualSolver`] owns the backend and mediates every interaction the task
//! pipeline has with it: building the model, committing waiting hyperplanes
//! as linear rows, running the relaxation and solution-limit strategies, and
//! executing the bounded per-pass solve.

mod backend;
mod relaxation;
mod solution_limit;

pub use backend::{
    BackendError, MipBackend, RowDirection, RowHandle, SolverStatus, SOLUTION_LIMIT_SENTINEL,
};
pub use relaxation::RelaxationStrategy;
pub use solution_limit::SolutionLimitStrategy;

use std::time::Duration;

use hyperforge_config::{PresolveFrequency, Settings};
use hyperforge_core::{
    ConstraintDeviation, ConstraintSide, Hyperplane, HyperforgeError, Problem, SolutionPoint,
};
use tracing::{debug, error, info, warn};

use crate::results::{IterationClass, Results};

/// Outcome of one dual solve pass.
#[derive(Debug)]
pub struct DualSolution {
    pub status: SolverStatus,
    /// Pooled candidate points, the incumbent first. Empty unless the
    /// status carries solutions.
    pub points: Vec<SolutionPoint>,
    /// Best objective value of the dual model, NaN when no point exists.
    pub objective_value: f64,
}

/// The dual problem and everything that steers it between passes.
#[derive(Debug)]
pub struct DualSolver {
    backend: Box<dyn MipBackend>,
    relaxation: RelaxationStrategy,
    solution_limit: SolutionLimitStrategy,
    presolve: PresolveFrequency,
    presolve_done: bool,
    reinitialize_tree: bool,
    /// Every committed hyperplane, re-added after a tree reinitialization.
    committed: Vec<Hyperplane>,
}

impl DualSolver {
    pub fn new(backend: Box<dyn MipBackend>, settings: &Settings, problem: &Problem) -> Self {
        Self {
            backend,
            relaxation: RelaxationStrategy::from_settings(&settings.dual, problem.is_discrete()),
            solution_limit: SolutionLimitStrategy::new(&settings.dual),
            presolve: settings.dual.presolve,
            presolve_done: false,
            reinitialize_tree: settings.cuts.reinitialize_dual_tree,
            committed: Vec::new(),
        }
    }

    /// Builds the backend model from the problem's linear and quadratic
    /// parts and applies the initial solution limit.
    pub fn build(
        &mut self,
        problem: &Problem,
        initial_solution_limit: u64,
    ) -> hyperforge_core::Result<()> {
        self.backend
            .build_model(problem)
            .map_err(|e| HyperforgeError::Backend(e.to_string()))?;
        self.backend.set_solution_limit(initial_solution_limit);
        info!(
            variables = problem.variable_count(),
            constraints = problem.constraints().len(),
            "dual problem created"
        );
        Ok(())
    }

    /// Presolves the dual model and tightens variable bounds, honoring the
    /// configured frequency.
    pub fn presolve(&mut self, problem: &Problem) {
        match self.presolve {
            PresolveFrequency::Never => return,
            PresolveFrequency::Once if self.presolve_done => return,
            _ => {}
        }
        self.presolve_done = true;

        let Some((lower, upper)) = self.backend.presolve_bounds() else {
            debug!("backend reports no presolve bound information");
            return;
        };

        let mut tightened = 0;
        for (index, variable) in problem.variables().iter().enumerate() {
            let new_lower = lower.get(index).copied().unwrap_or(variable.lower);
            let new_upper = upper.get(index).copied().unwrap_or(variable.upper);
            if new_lower > variable.lower || new_upper < variable.upper {
                self.backend
                    .update_variable_bounds(index, new_lower.max(variable.lower), new_upper.min(variable.upper));
                tightened += 1;
            }
        }
        if tightened > 0 {
            info!(tightened, "presolve tightened variable bounds");
        }
    }

    /// Runs the relaxation strategy for the upcoming pass.
    pub fn prepare_relaxation(&mut self, pass: usize, results: &Results, problem: &Problem) {
        self.relaxation
            .execute(pass, self.backend.as_mut(), results, problem.is_discrete());
    }

    /// Classification of the upcoming pass, from the backend's current
    /// discrete activation.
    pub fn pass_class(&self) -> IterationClass {
        self.relaxation.problem_class(self.backend.as_ref())
    }

    /// Whether the relaxation strategy prescribes a relaxed solve for pass
    /// number `pass`.
    pub fn prescribes_relaxed(&self, pass: usize, results: &Results) -> bool {
        self.relaxation.prescribes_relaxed(pass, results)
    }

    /// Runs the solution-limit strategy for the upcoming pass. Returns
    /// whether the backend limit changed.
    pub fn execute_solution_limit(&mut self, results: &Results, elapsed: Duration) -> bool {
        self.solution_limit
            .execute(self.backend.as_mut(), results, elapsed)
    }

    /// The accepted-solution-count limit currently set on the backend.
    pub fn used_solution_limit(&self) -> u64 {
        self.backend.solution_limit()
    }

    /// True when the dual tree is rebuilt before every solve, which restarts
    /// the ledger's cumulative hyperplane count.
    pub fn reinitializes_tree(&self) -> bool {
        self.reinitialize_tree
    }

    /// Drains the waiting list into the backend model as linear rows.
    /// Returns the number of rows added; duplicates of already committed
    /// cuts, degenerate and rejected cuts are logged and skipped, never
    /// fatal.
    pub fn commit_waiting_hyperplanes(
        &mut self,
        problem: &Problem,
        waiting: &mut Vec<Hyperplane>,
    ) -> usize {
        let mut added = 0;
        for hyperplane in waiting.drain(..) {
            if self.is_already_committed(&hyperplane) {
                debug!(
                    constraint = hyperplane.source_constraint,
                    "hyperplane already in the dual model, skipping"
                );
                continue;
            }
            if self.commit_one(problem, &hyperplane) {
                self.committed.push(hyperplane);
                added += 1;
            }
        }
        added
    }

    fn is_already_committed(&self, hyperplane: &Hyperplane) -> bool {
        self.committed.iter().any(|committed| {
            committed.source_constraint == hyperplane.source_constraint
                && committed.generated_point == hyperplane.generated_point
        })
    }

    fn commit_one(&mut self, problem: &Problem, hyperplane: &Hyperplane) -> bool {
        let constraint = &problem.constraints()[hyperplane.source_constraint];
        let point = &hyperplane.generated_point;

        let gradient = constraint.gradient(point);
        if gradient.iter().all(|(_, g)| *g == 0.0) {
            warn!(
                constraint = constraint.name(),
                "zero gradient at generation point, dropping hyperplane"
            );
            return false;
        }

        // Linearization g(x*) + grad·(x - x*) compared against the violated
        // bound, rearranged into grad·x (dir) bound - g(x*) + grad·x*.
        let value = constraint.value(point);
        let grad_dot_point: f64 = gradient.iter().map(|(i, g)| g * point[*i]).sum();
        let (_, side) = constraint.deviation_detail(point);
        let (bound, direction) = match side {
            ConstraintSide::Upper => match constraint.upper() {
                Some(upper) => (upper, RowDirection::LessOrEqual),
                None => return false,
            },
            ConstraintSide::Lower => match constraint.lower() {
                Some(lower) => (lower, RowDirection::GreaterOrEqual),
                None => return false,
            },
        };
        let constant = bound - value + grad_dot_point;

        match self
            .backend
            .add_linear_constraint(&gradient, constant, direction)
        {
            Ok(row) => {
                debug!(
                    row = row.0,
                    constraint = constraint.name(),
                    source = ?hyperplane.source,
                    "hyperplane committed to dual model"
                );
                true
            }
            Err(e) => {
                error!(%e, constraint = constraint.name(), "backend rejected hyperplane row");
                false
            }
        }
    }

    /// Runs one bounded backend solve and extracts the pooled points.
    ///
    /// When tree reinitialization is on, the model is rebuilt first and
    /// every previously committed hyperplane is re-added. A status that
    /// claims solutions while the pool is empty is downgraded to
    /// [`SolverStatus::Error`].
    pub fn solve_pass(
        &mut self,
        problem: &Problem,
        remaining: Duration,
        cutoff: f64,
    ) -> DualSolution {
        if self.reinitialize_tree {
            if let Err(e) = self.backend.build_model(problem) {
                error!(%e, "dual model rebuild failed");
                return DualSolution {
                    status: SolverStatus::Error,
                    points: Vec::new(),
                    objective_value: f64::NAN,
                };
            }
            let retained = std::mem::take(&mut self.committed);
            for hyperplane in &retained {
                let _ = self.commit_one(problem, hyperplane);
            }
            self.committed = retained;
        }

        if cutoff.is_finite() {
            self.backend.set_cutoff(cutoff);
        }
        self.backend.set_time_limit(remaining);

        let relaxed = self.pass_class() == IterationClass::Relaxed;
        let mut status = self.backend.solve();

        let mut points = Vec::new();
        if status.has_solutions() {
            let count = self.backend.solution_count();
            if count == 0 {
                warn!(%status, "backend claims solutions but the pool is empty");
                status = SolverStatus::Error;
            }
            for index in 0..count {
                let point = self.backend.variable_values(index);
                let max_deviation = problem
                    .most_deviating_nonlinear_constraint(&point)
                    .unwrap_or_else(ConstraintDeviation::none);
                points.push(SolutionPoint {
                    objective_value: self.backend.objective_value(index),
                    max_deviation,
                    is_relaxed: relaxed,
                    point,
                });
            }
        }

        let objective_value = points.first().map_or(f64::NAN, |p| p.objective_value);
        debug!(%status, pool = points.len(), objective_value, "dual solve finished");

        DualSolution {
            status,
            points,
            objective_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ball_problem, ScriptedBackend, ScriptedSolve};

    fn solver_with(backend: ScriptedBackend, problem: &Problem) -> DualSolver {
        let settings = Settings::default();
        DualSolver::new(Box::new(backend), &settings, problem)
    }

    #[test]
    fn test_commit_upper_bound_hyperplane_row() {
        let problem = ball_problem(false);
        let backend = ScriptedBackend::new(vec![]);
        let rows = backend.rows_handle();
        let mut solver = solver_with(backend, &problem);

        // Boundary point (2, 0) of x1^2 + x2^2 <= 4.
        let mut waiting = vec![Hyperplane {
            source_constraint: 0,
            generated_point: vec![2.0, 0.0],
            source: hyperforge_core::HyperplaneSource::MipOptimalRootsearch,
        }];

        let added = solver.commit_waiting_hyperplanes(&problem, &mut waiting);
        assert_eq!(added, 1);
        assert!(waiting.is_empty());

        let rows = rows.borrow();
        assert_eq!(rows.len(), 1);
        let (coefficients, constant, direction) = &rows[0];
        assert_eq!(*direction, RowDirection::LessOrEqual);
        // Gradient (2 x1, 2 x2) = (4, 0) at the generation point.
        assert_eq!(coefficients, &vec![(0, 4.0), (1, 0.0)]);
        // g(x*) = 4 on the boundary, so the constant is 4 - 4 + 4*2 = 8.
        assert!((constant - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_repeated_hyperplane_is_committed_once() {
        let problem = ball_problem(false);
        let backend = ScriptedBackend::new(vec![]);
        let rows = backend.rows_handle();
        let mut solver = solver_with(backend, &problem);

        let cut = || Hyperplane {
            source_constraint: 0,
            generated_point: vec![2.0, 0.0],
            source: hyperforge_core::HyperplaneSource::MipOptimalRootsearch,
        };

        let mut waiting = vec![cut(), cut()];
        assert_eq!(solver.commit_waiting_hyperplanes(&problem, &mut waiting), 1);

        // A later pass regenerating the same cut must not grow the model.
        let mut waiting = vec![cut()];
        assert_eq!(solver.commit_waiting_hyperplanes(&problem, &mut waiting), 0);
        assert_eq!(rows.borrow().len(), 1);
    }

    #[test]
    fn test_solve_pass_extracts_pool_with_deviations() {
        let problem = ball_problem(false);
        let backend = ScriptedBackend::new(vec![ScriptedSolve {
            status: SolverStatus::Optimal,
            points: vec![(vec![3.0, 3.0], -6.0), (vec![1.0, 1.0], -2.0)],
        }]);
        let mut solver = solver_with(backend, &problem);

        let solution = solver.solve_pass(&problem, Duration::from_secs(1), f64::INFINITY);

        assert_eq!(solution.status, SolverStatus::Optimal);
        assert_eq!(solution.points.len(), 2);
        assert_eq!(solution.objective_value, -6.0);
        // (3, 3) violates the ball by 14, (1, 1) is interior by -2.
        assert!((solution.points[0].max_deviation.value - 14.0).abs() < 1e-12);
        assert!((solution.points[1].max_deviation.value + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_pool_on_feasible_status_downgrades_to_error() {
        let problem = ball_problem(false);
        let backend = ScriptedBackend::new(vec![ScriptedSolve {
            status: SolverStatus::Optimal,
            points: vec![],
        }]);
        let mut solver = solver_with(backend, &problem);

        let solution = solver.solve_pass(&problem, Duration::from_secs(1), f64::INFINITY);
        assert_eq!(solution.status, SolverStatus::Error);
        assert!(solution.points.is_empty());
    }
}
