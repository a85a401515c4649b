//! Shared fixtures for unit tests: a small convex ball problem and a
//! scripted MIP backend with canned solve outcomes.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use hyperforge_core::{
    ConstraintDeviation, ConstraintFunction, LinearTerm, NonlinearFunction, Objective,
    ObjectiveSense, Problem, SolutionPoint, VariableKind,
};

use hyperforge_config::Settings;

use crate::dual::{BackendError, DualSolver, MipBackend, RowDirection, RowHandle, SolverStatus};
use crate::scope::SolveScope;

/// A scope around a scripted backend, with default settings and no NLP
/// backend.
pub fn scripted_scope(problem: Problem, script: Vec<ScriptedSolve>) -> SolveScope {
    let settings = Settings::default();
    let backend = ScriptedBackend::new(script);
    let dual = DualSolver::new(Box::new(backend), &settings, &problem);
    SolveScope::new(problem, settings, dual, None)
}

#[derive(Debug)]
struct Ball;

impl NonlinearFunction for Ball {
    fn value(&self, point: &[f64]) -> f64 {
        point[0] * point[0] + point[1] * point[1]
    }

    fn gradient(&self, point: &[f64]) -> Vec<(usize, f64)> {
        vec![(0, 2.0 * point[0]), (1, 2.0 * point[1])]
    }
}

/// `min -x1 - x2` over the box `[0, 3]^2` subject to `x1^2 + x2^2 <= 4`.
/// With `discrete` set, `x1` becomes an integer variable.
pub fn ball_problem(discrete: bool) -> Problem {
    let x1_kind = if discrete {
        VariableKind::Integer
    } else {
        VariableKind::Continuous
    };
    Problem::builder("ball")
        .variable("x1", x1_kind, 0.0, 3.0)
        .variable("x2", VariableKind::Continuous, 0.0, 3.0)
        .constraint(
            "ball",
            ConstraintFunction::Nonlinear(Box::new(Ball)),
            None,
            Some(4.0),
        )
        .objective(Objective::linear(
            ObjectiveSense::Minimize,
            vec![
                LinearTerm {
                    coefficient: -1.0,
                    variable: 0,
                },
                LinearTerm {
                    coefficient: -1.0,
                    variable: 1,
                },
            ],
            0.0,
        ))
        .build()
        .unwrap()
}

/// A solution point with the objective and deviation evaluated from the
/// problem, the way the dual solver produces them.
pub fn solution_point(problem: &Problem, point: Vec<f64>, is_relaxed: bool) -> SolutionPoint {
    let objective_value = problem.objective().evaluate(&point);
    let max_deviation = problem
        .most_deviating_nonlinear_constraint(&point)
        .unwrap_or_else(ConstraintDeviation::none);
    SolutionPoint {
        point,
        objective_value,
        max_deviation,
        is_relaxed,
    }
}

/// One canned backend solve outcome: a status plus the pooled points as
/// `(values, objective)` pairs.
#[derive(Debug, Clone)]
pub struct ScriptedSolve {
    pub status: SolverStatus,
    pub points: Vec<(Vec<f64>, f64)>,
}

type RowLog = Rc<RefCell<Vec<(Vec<(usize, f64)>, f64, RowDirection)>>>;

/// A backend that replays scripted solve outcomes in order and records
/// every interaction so tests can assert on it. Solving past the end of
/// the script reports [`SolverStatus::Error`].
#[derive(Debug)]
pub struct ScriptedBackend {
    script: Vec<ScriptedSolve>,
    next_solve: usize,
    current: Option<ScriptedSolve>,
    rows: RowLog,
    discrete_active: bool,
    solution_limit: u64,
    pub cutoffs: Vec<f64>,
    pub time_limits: Vec<Duration>,
    pub build_count: usize,
}

impl ScriptedBackend {
    pub fn new(script: Vec<ScriptedSolve>) -> Self {
        Self {
            script,
            next_solve: 0,
            current: None,
            rows: Rc::new(RefCell::new(Vec::new())),
            discrete_active: false,
            solution_limit: 1,
            cutoffs: Vec::new(),
            time_limits: Vec::new(),
            build_count: 0,
        }
    }

    /// Handle to the committed-row log, usable after the backend is boxed.
    pub fn rows_handle(&self) -> RowLog {
        Rc::clone(&self.rows)
    }
}

impl MipBackend for ScriptedBackend {
    fn build_model(&mut self, _problem: &Problem) -> Result<(), BackendError> {
        self.build_count += 1;
        self.rows.borrow_mut().clear();
        Ok(())
    }

    fn add_linear_constraint(
        &mut self,
        coefficients: &[(usize, f64)],
        constant: f64,
        direction: RowDirection,
    ) -> Result<RowHandle, BackendError> {
        let mut rows = self.rows.borrow_mut();
        rows.push((coefficients.to_vec(), constant, direction));
        Ok(RowHandle(rows.len() - 1))
    }

    fn activate_discrete_variables(&mut self, active: bool) {
        self.discrete_active = active;
    }

    fn discrete_variables_active(&self) -> bool {
        self.discrete_active
    }

    fn solve(&mut self) -> SolverStatus {
        let outcome = self.script.get(self.next_solve).cloned();
        self.next_solve += 1;
        match outcome {
            Some(solve) => {
                let status = solve.status;
                self.current = Some(solve);
                status
            }
            None => {
                self.current = None;
                SolverStatus::Error
            }
        }
    }

    fn solution_count(&self) -> usize {
        self.current.as_ref().map_or(0, |s| s.points.len())
    }

    fn variable_values(&self, solution_index: usize) -> Vec<f64> {
        self.current.as_ref().expect("no scripted solve").points[solution_index]
            .0
            .clone()
    }

    fn objective_value(&self, solution_index: usize) -> f64 {
        self.current.as_ref().expect("no scripted solve").points[solution_index].1
    }

    fn presolve_bounds(&mut self) -> Option<(Vec<f64>, Vec<f64>)> {
        None
    }

    fn solution_limit(&self) -> u64 {
        self.solution_limit
    }

    fn set_solution_limit(&mut self, limit: u64) {
        self.solution_limit = limit;
    }

    fn set_cutoff(&mut self, bound: f64) {
        self.cutoffs.push(bound);
    }

    fn set_time_limit(&mut self, limit: Duration) {
        self.time_limits.push(limit);
    }

    fn fix_variable(&mut self, _index: usize, _value: f64) {}

    fn unfix_variables(&mut self) {}

    fn update_variable_bounds(&mut self, _index: usize, _lower: f64, _upper: f64) {}

    fn write_model(&self, _path: &Path) -> Result<(), BackendError> {
        Err(BackendError::Unsupported("model export"))
    }
}
