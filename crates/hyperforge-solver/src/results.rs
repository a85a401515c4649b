//! The iteration ledger: an append-only sequence of per-pass snapshots plus
//! running best bounds.
//!
//! A new [`Iteration`] is opened at the start of every pass, deriving its
//! cumulative hyperplane count from the previous one and snapshotting the
//! global bounds at creation time. Closed iterations are never mutated;
//! iteration `n` reads only the state of iteration `n - 1`.

use std::time::Duration;

use hyperforge_core::{ObjectiveSense, SolutionPoint};

use crate::dual::SolverStatus;

/// Which problem a pass solved: the full discrete problem or its continuous
/// relaxation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationClass {
    Mip,
    Relaxed,
}

/// Why the run terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    AbsoluteGap,
    RelativeGap,
    ConstraintTolerance,
    /// The dual incumbent repeated identically for too many passes.
    PrimalStagnation,
    IterationLimit,
    TimeLimit,
    InfeasibleProblem,
    NumericalError,
}

/// A feasible candidate for the original nonlinear problem.
#[derive(Debug, Clone)]
pub struct PrimalSolution {
    pub point: Vec<f64>,
    /// True objective value at the point (not the dual model's).
    pub objective_value: f64,
    /// Largest nonlinear-constraint deviation at the point.
    pub max_deviation: f64,
    pub found_at_pass: usize,
}

/// Snapshot of one solve-generate-cut-record-check pass.
#[derive(Debug)]
pub struct Iteration {
    /// 1-based sequence number; strictly increasing across the ledger.
    pub number: usize,
    pub class: IterationClass,
    /// Total hyperplanes generated up to and including this pass. Derived
    /// from the predecessor; resets to 0 when the dual tree is reinitialized.
    pub cumulative_hyperplanes: usize,
    pub hyperplanes_added: usize,
    pub solution_points: Vec<SolutionPoint>,
    /// Best objective value reported by the dual solve of this pass.
    pub objective_value: f64,
    /// Global dual bound at the moment this iteration was opened.
    pub dual_bound_snapshot: f64,
    /// Global primal bound at the moment this iteration was opened.
    pub primal_bound_snapshot: f64,
    pub status: SolverStatus,
    /// True when the solution-limit strategy changed the backend limit for
    /// this pass.
    pub solution_limit_updated: bool,
    /// The accepted-solution-count limit the backend used for this pass.
    pub used_solution_limit: u64,
}

impl Iteration {
    /// Whether this pass solved the full discrete problem, as classified by
    /// the active relaxation strategy.
    pub fn is_mip(&self) -> bool {
        self.class == IterationClass::Mip
    }

    /// The solution point with the smallest maximum deviation, ties broken
    /// by first occurrence in list order.
    pub fn point_with_smallest_deviation(&self) -> Option<&SolutionPoint> {
        let mut best: Option<&SolutionPoint> = None;
        for point in &self.solution_points {
            if best.map_or(true, |b| point.max_deviation.value < b.max_deviation.value) {
                best = Some(point);
            }
        }
        best
    }
}

/// Ordered append-only sequence of iterations plus the running best bounds,
/// primal candidates and termination verdict.
#[derive(Debug)]
pub struct Results {
    sense: ObjectiveSense,
    iterations: Vec<Iteration>,
    dual_bound: f64,
    primal_bound: f64,
    pub primal_solutions: Vec<PrimalSolution>,
    termination_reason: Option<TerminationReason>,
    termination_description: String,
    /// Pass number of the last dual bound improvement.
    pub pass_of_last_dual_improvement: usize,
    /// Elapsed run time at the last dual bound improvement.
    pub time_of_last_dual_improvement: Duration,
}

impl Results {
    pub fn new(sense: ObjectiveSense) -> Self {
        let (dual_bound, primal_bound) = match sense {
            ObjectiveSense::Minimize => (f64::NEG_INFINITY, f64::INFINITY),
            ObjectiveSense::Maximize => (f64::INFINITY, f64::NEG_INFINITY),
        };
        Self {
            sense,
            iterations: Vec::new(),
            dual_bound,
            primal_bound,
            primal_solutions: Vec::new(),
            termination_reason: None,
            termination_description: String::new(),
            pass_of_last_dual_improvement: 0,
            time_of_last_dual_improvement: Duration::ZERO,
        }
    }

    /// Opens the iteration for a new pass. The cumulative hyperplane count is
    /// carried over from the previous iteration, or restarts at 0 when
    /// `reset_hyperplane_count` is set (dual tree reinitialization).
    pub fn open_iteration(
        &mut self,
        class: IterationClass,
        used_solution_limit: u64,
        reset_hyperplane_count: bool,
    ) -> &mut Iteration {
        let cumulative = if reset_hyperplane_count {
            0
        } else {
            self.iterations
                .last()
                .map_or(0, |previous| previous.cumulative_hyperplanes)
        };

        self.iterations.push(Iteration {
            number: self.iterations.len() + 1,
            class,
            cumulative_hyperplanes: cumulative,
            hyperplanes_added: 0,
            solution_points: Vec::new(),
            objective_value: f64::NAN,
            dual_bound_snapshot: self.dual_bound,
            primal_bound_snapshot: self.primal_bound,
            status: SolverStatus::NotSolved,
            solution_limit_updated: false,
            used_solution_limit,
        });

        self.iterations.last_mut().expect("just pushed")
    }

    pub fn iterations(&self) -> &[Iteration] {
        &self.iterations
    }

    pub fn iteration_count(&self) -> usize {
        self.iterations.len()
    }

    /// The iteration of the pass currently executing.
    pub fn current(&self) -> Option<&Iteration> {
        self.iterations.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut Iteration> {
        self.iterations.last_mut()
    }

    /// The closed iteration preceding the current one.
    pub fn previous(&self) -> Option<&Iteration> {
        let n = self.iterations.len();
        if n < 2 {
            None
        } else {
            self.iterations.get(n - 2)
        }
    }

    pub fn dual_bound(&self) -> f64 {
        self.dual_bound
    }

    pub fn primal_bound(&self) -> f64 {
        self.primal_bound
    }

    /// Accepts `candidate` as the new dual bound when it improves on the
    /// current one, stamping the improvement pass and time for the adaptive
    /// strategies. Returns whether it improved.
    pub fn update_dual_bound(&mut self, candidate: f64, pass: usize, elapsed: Duration) -> bool {
        let improved = match self.sense {
            ObjectiveSense::Minimize => candidate > self.dual_bound,
            ObjectiveSense::Maximize => candidate < self.dual_bound,
        };
        if improved {
            self.dual_bound = candidate;
            self.pass_of_last_dual_improvement = pass;
            self.time_of_last_dual_improvement = elapsed;
        }
        improved
    }

    /// Accepts `candidate` as the new primal bound when it improves on the
    /// current one. Returns whether it improved.
    pub fn update_primal_bound(&mut self, candidate: f64) -> bool {
        let improved = match self.sense {
            ObjectiveSense::Minimize => candidate < self.primal_bound,
            ObjectiveSense::Maximize => candidate > self.primal_bound,
        };
        if improved {
            self.primal_bound = candidate;
        }
        improved
    }

    /// `|primal - dual|`, infinite while either bound is unset.
    pub fn absolute_gap(&self) -> f64 {
        if self.primal_bound.is_finite() && self.dual_bound.is_finite() {
            (self.primal_bound - self.dual_bound).abs()
        } else {
            f64::INFINITY
        }
    }

    /// Gap relative to the primal bound, infinite while either bound is
    /// unset.
    pub fn relative_gap(&self) -> f64 {
        if self.primal_bound.is_finite() && self.dual_bound.is_finite() {
            (self.primal_bound - self.dual_bound).abs() / (1e-10 + self.primal_bound.abs())
        } else {
            f64::INFINITY
        }
    }

    /// The best primal candidate found, if any.
    pub fn best_primal_solution(&self) -> Option<&PrimalSolution> {
        let mut best: Option<&PrimalSolution> = None;
        for candidate in &self.primal_solutions {
            let better = match best {
                None => true,
                Some(b) => match self.sense {
                    ObjectiveSense::Minimize => candidate.objective_value < b.objective_value,
                    ObjectiveSense::Maximize => candidate.objective_value > b.objective_value,
                },
            };
            if better {
                best = Some(candidate);
            }
        }
        best
    }

    /// Records the termination verdict; the first recorded reason wins.
    pub fn record_termination(&mut self, reason: TerminationReason, description: impl Into<String>) {
        if self.termination_reason.is_none() {
            self.termination_reason = Some(reason);
            self.termination_description = description.into();
        }
    }

    pub fn termination_reason(&self) -> Option<TerminationReason> {
        self.termination_reason
    }

    pub fn termination_description(&self) -> &str {
        &self.termination_description
    }
}
