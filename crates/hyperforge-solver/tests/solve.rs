//! End-to-end solves of a small convex problem against a real (if tiny)
//! MIP backend: a two-variable solver that enumerates the vertices of the
//! current cut polygon.

use std::path::Path;
use std::time::Duration;

use hyperforge_core::{
    ConstraintFunction, LinearTerm, NonlinearFunction, Objective, ObjectiveSense, Problem,
    VariableKind,
};
use hyperforge_solver::{
    BackendError, MipBackend, NlpBackend, NlpStatus, RowDirection, RowHandle, SolverBuilder,
    SolverStatus, TerminationReason,
};

fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
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

/// `min -x1 - x2` over `[0, 3]^2` with `x1^2 + x2^2 <= 4`; optionally with
/// `x1` integer.
fn ball_problem(discrete: bool) -> Problem {
    let x1_kind = if discrete {
        VariableKind::Integer
    } else {
        VariableKind::Continuous
    };
    Problem::builder("ball")
        .variable("x1", x1_kind, 0.0, 3.0)
        .variable("x2", VariableKind::Continuous, 0.0, 3.0)
        .constraint("ball", ConstraintFunction::Nonlinear(Box::new(Ball)), None, Some(4.0))
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

// Strictly below the engine's constraint tolerance (1e-8): a vertex the
// backend accepts as feasible for the cut rows must still be separable
// until its true deviation drops under the engine's acceptance threshold,
// otherwise the cut loop stalls on an unacceptable vertex.
const FEAS_TOL: f64 = 1e-9;

/// An exact two-variable MIP solver over box bounds plus linear rows. It
/// enumerates the pairwise intersections of all bounding lines (box edges,
/// rows and, with discrete variables active, integer lattice lines), keeps
/// the feasible ones and returns the best vertex.
#[derive(Debug)]
struct VertexEnumBackend {
    bounds: Vec<(f64, f64)>,
    integer: Vec<bool>,
    objective: Vec<f64>,
    rows: Vec<(Vec<(usize, f64)>, f64, RowDirection)>,
    discrete_active: bool,
    solution_limit: u64,
    incumbent: Option<(Vec<f64>, f64)>,
}

impl VertexEnumBackend {
    fn new() -> Self {
        Self {
            bounds: Vec::new(),
            integer: Vec::new(),
            objective: Vec::new(),
            rows: Vec::new(),
            discrete_active: false,
            solution_limit: 1,
            incumbent: None,
        }
    }

    /// Lines `a1 x1 + a2 x2 = b` bounding the feasible set.
    fn lines(&self) -> Vec<(f64, f64, f64)> {
        let mut lines = vec![
            (1.0, 0.0, self.bounds[0].0),
            (1.0, 0.0, self.bounds[0].1),
            (0.0, 1.0, self.bounds[1].0),
            (0.0, 1.0, self.bounds[1].1),
        ];
        for (coefficients, constant, _) in &self.rows {
            let mut a = [0.0; 2];
            for (index, value) in coefficients {
                a[*index] += value;
            }
            lines.push((a[0], a[1], *constant));
        }
        if self.discrete_active {
            for (index, integer) in self.integer.iter().enumerate() {
                if !integer {
                    continue;
                }
                let (lower, upper) = self.bounds[index];
                let mut value = lower.ceil();
                while value <= upper.floor() {
                    if index == 0 {
                        lines.push((1.0, 0.0, value));
                    } else {
                        lines.push((0.0, 1.0, value));
                    }
                    value += 1.0;
                }
            }
        }
        lines
    }

    fn is_feasible(&self, point: &mut [f64]) -> bool {
        for (index, (lower, upper)) in self.bounds.iter().enumerate() {
            if point[index] < lower - FEAS_TOL || point[index] > upper + FEAS_TOL {
                return false;
            }
            if self.discrete_active && self.integer[index] {
                if (point[index] - point[index].round()).abs() > FEAS_TOL {
                    return false;
                }
                point[index] = point[index].round();
            }
        }
        for (coefficients, constant, direction) in &self.rows {
            let value: f64 = coefficients.iter().map(|(i, c)| c * point[*i]).sum();
            let ok = match direction {
                RowDirection::LessOrEqual => value <= constant + FEAS_TOL,
                RowDirection::GreaterOrEqual => value >= constant - FEAS_TOL,
            };
            if !ok {
                return false;
            }
        }
        true
    }
}

impl MipBackend for VertexEnumBackend {
    fn build_model(&mut self, problem: &Problem) -> Result<(), BackendError> {
        assert_eq!(problem.variable_count(), 2, "toy backend is two-variable");
        self.bounds = problem
            .variables()
            .iter()
            .map(|v| (v.lower, v.upper))
            .collect();
        self.integer = problem
            .variables()
            .iter()
            .map(|v| v.kind.is_discrete())
            .collect();
        self.objective = vec![0.0; 2];
        for term in problem.objective().terms() {
            self.objective[term.variable] += term.coefficient;
        }
        self.rows.clear();
        self.incumbent = None;
        Ok(())
    }

    fn add_linear_constraint(
        &mut self,
        coefficients: &[(usize, f64)],
        constant: f64,
        direction: RowDirection,
    ) -> Result<RowHandle, BackendError> {
        self.rows.push((coefficients.to_vec(), constant, direction));
        Ok(RowHandle(self.rows.len() - 1))
    }

    fn activate_discrete_variables(&mut self, active: bool) {
        self.discrete_active = active;
    }

    fn discrete_variables_active(&self) -> bool {
        self.discrete_active
    }

    fn solve(&mut self) -> SolverStatus {
        let lines = self.lines();
        let mut best: Option<(Vec<f64>, f64)> = None;

        for i in 0..lines.len() {
            for j in (i + 1)..lines.len() {
                let (a11, a12, b1) = lines[i];
                let (a21, a22, b2) = lines[j];
                let det = a11 * a22 - a12 * a21;
                if det.abs() < 1e-12 {
                    continue;
                }
                let mut point = vec![(b1 * a22 - b2 * a12) / det, (a11 * b2 - a21 * b1) / det];
                if !self.is_feasible(&mut point) {
                    continue;
                }
                let objective = self.objective[0] * point[0] + self.objective[1] * point[1];
                if best.as_ref().map_or(true, |(_, b)| objective < *b) {
                    best = Some((point, objective));
                }
            }
        }

        match best {
            Some(solution) => {
                self.incumbent = Some(solution);
                SolverStatus::Optimal
            }
            None => {
                self.incumbent = None;
                SolverStatus::Infeasible
            }
        }
    }

    fn solution_count(&self) -> usize {
        usize::from(self.incumbent.is_some())
    }

    fn variable_values(&self, _solution_index: usize) -> Vec<f64> {
        self.incumbent.as_ref().map(|(p, _)| p.clone()).unwrap_or_default()
    }

    fn objective_value(&self, _solution_index: usize) -> f64 {
        self.incumbent.as_ref().map_or(f64::NAN, |(_, o)| *o)
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

    fn set_cutoff(&mut self, _bound: f64) {}

    fn set_time_limit(&mut self, _limit: Duration) {}

    fn fix_variable(&mut self, _index: usize, _value: f64) {}

    fn unfix_variables(&mut self) {}

    fn update_variable_bounds(&mut self, index: usize, lower: f64, upper: f64) {
        self.bounds[index] = (lower, upper);
    }

    fn write_model(&self, _path: &Path) -> Result<(), BackendError> {
        Err(BackendError::Unsupported("model export"))
    }
}

/// An NLP backend that always proposes the same strictly interior point.
#[derive(Debug)]
struct CenterNlp;

impl NlpBackend for CenterNlp {
    fn set_starting_point(&mut self, _point: &[f64]) {}

    fn solve(&mut self, _problem: &Problem) -> NlpStatus {
        NlpStatus::Optimal
    }

    fn solution(&self) -> Vec<f64> {
        vec![0.5, 0.5]
    }

    fn objective_value(&self) -> f64 {
        // Ball deviation at (0.5, 0.5).
        -3.5
    }
}

/// A backend that reports the same near-feasible optimum forever, no matter
/// how many cuts are added.
#[derive(Debug)]
struct StuckBackend;

impl MipBackend for StuckBackend {
    fn build_model(&mut self, _problem: &Problem) -> Result<(), BackendError> {
        Ok(())
    }

    fn add_linear_constraint(
        &mut self,
        _coefficients: &[(usize, f64)],
        _constant: f64,
        _direction: RowDirection,
    ) -> Result<RowHandle, BackendError> {
        Ok(RowHandle(0))
    }

    fn activate_discrete_variables(&mut self, _active: bool) {}

    fn discrete_variables_active(&self) -> bool {
        false
    }

    fn solve(&mut self) -> SolverStatus {
        SolverStatus::Optimal
    }

    fn solution_count(&self) -> usize {
        1
    }

    fn variable_values(&self, _solution_index: usize) -> Vec<f64> {
        // Violates the ball by ~2.8e-4, above the acceptance tolerance.
        vec![1.41431356, 1.41421356]
    }

    fn objective_value(&self, _solution_index: usize) -> f64 {
        -2.8284271
    }

    fn presolve_bounds(&mut self) -> Option<(Vec<f64>, Vec<f64>)> {
        None
    }

    fn solution_limit(&self) -> u64 {
        1
    }

    fn set_solution_limit(&mut self, _limit: u64) {}

    fn set_cutoff(&mut self, _bound: f64) {}

    fn set_time_limit(&mut self, _limit: Duration) {}

    fn fix_variable(&mut self, _index: usize, _value: f64) {}

    fn unfix_variables(&mut self) {}

    fn update_variable_bounds(&mut self, _index: usize, _lower: f64, _upper: f64) {}

    fn write_model(&self, _path: &Path) -> Result<(), BackendError> {
        Err(BackendError::Unsupported("model export"))
    }
}

fn gap_like(reason: TerminationReason) -> bool {
    matches!(
        reason,
        TerminationReason::AbsoluteGap
            | TerminationReason::RelativeGap
            | TerminationReason::ConstraintTolerance
    )
}

#[test]
fn test_continuous_ball_converges_to_optimum() {
    init_logging();
    let report = SolverBuilder::new(ball_problem(false))
        .mip_backend(Box::new(VertexEnumBackend::new()))
        .nlp_backend(Box::new(CenterNlp))
        .build()
        .unwrap()
        .solve()
        .unwrap();

    let results = &report.results;
    let reason = results.termination_reason().expect("run must terminate");
    assert!(gap_like(reason), "unexpected reason {reason:?}");

    // Optimum -2 sqrt(2) at (sqrt(2), sqrt(2)).
    let optimum = -2.0 * 2.0_f64.sqrt();
    assert!((results.dual_bound() - optimum).abs() < 1e-2);

    let best = report.best_primal_solution().expect("primal solution found");
    assert!((best.objective_value - optimum).abs() < 1e-2);
    assert!((best.point[0] - 2.0_f64.sqrt()).abs() < 0.1);
    assert!((best.point[1] - 2.0_f64.sqrt()).abs() < 0.1);
    assert!(best.max_deviation <= 1e-7);

    // The ledger's cumulative cut count never decreases.
    let counts: Vec<_> = results
        .iterations()
        .iter()
        .map(|i| i.cumulative_hyperplanes)
        .collect();
    assert!(counts.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_discrete_ball_converges_through_relaxed_passes() {
    init_logging();
    let report = SolverBuilder::new(ball_problem(true))
        .mip_backend(Box::new(VertexEnumBackend::new()))
        .nlp_backend(Box::new(CenterNlp))
        .build()
        .unwrap()
        .solve()
        .unwrap();

    let results = &report.results;
    let reason = results.termination_reason().expect("run must terminate");
    assert!(gap_like(reason), "unexpected reason {reason:?}");

    // The standard schedule solves relaxations first, the full problem
    // after.
    assert!(!results.iterations()[0].is_mip());
    assert!(results.iterations().iter().any(|i| i.is_mip()));

    // Optimum -1 - sqrt(3) at (1, sqrt(3)).
    let optimum = -1.0 - 3.0_f64.sqrt();
    let best = report.best_primal_solution().expect("primal solution found");
    assert!((best.objective_value - optimum).abs() < 1e-2);
    assert_eq!(best.point[0], 1.0);
    assert!((best.point[1] - 3.0_f64.sqrt()).abs() < 0.1);
}

#[test]
fn test_unseparable_incumbent_terminates_with_stagnation() {
    init_logging();
    // Every pass returns the same point violating the ball by more than the
    // acceptance tolerance: no check based on bounds or feasibility can
    // ever fire, so the stagnation guard must end the run.
    let report = SolverBuilder::new(ball_problem(false))
        .mip_backend(Box::new(StuckBackend))
        .nlp_backend(Box::new(CenterNlp))
        .build()
        .unwrap()
        .solve()
        .unwrap();

    assert_eq!(
        report.results.termination_reason(),
        Some(TerminationReason::PrimalStagnation)
    );
    assert!(report.results.iteration_count() < 20);
    assert!(report.best_primal_solution().is_none());
}

#[test]
fn test_iteration_limit_bounds_a_stalled_run() {
    init_logging();
    // With tolerances far below what the cut polygon can reach in three
    // passes, the iteration limit must end the run.
    let mut settings = hyperforge_config::Settings::default();
    settings.termination.iteration_limit = 3;
    settings.termination.absolute_gap = 1e-12;
    settings.termination.relative_gap = 1e-12;
    settings.termination.constraint_tolerance = 1e-12;

    let report = SolverBuilder::new(ball_problem(false))
        .settings(settings)
        .mip_backend(Box::new(VertexEnumBackend::new()))
        .nlp_backend(Box::new(CenterNlp))
        .build()
        .unwrap()
        .solve()
        .unwrap();

    assert_eq!(report.results.iteration_count(), 3);
    assert_eq!(
        report.results.termination_reason(),
        Some(TerminationReason::IterationLimit)
    );
}
