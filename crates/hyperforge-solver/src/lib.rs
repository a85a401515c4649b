//! Hyperforge Solver Engine
//!
//! This crate provides the extended-supporting-hyperplane orchestration
//! engine:
//! - Solve scope carrying the per-run context (settings, ledger, timers)
//! - Iteration ledger with running dual/primal bounds
//! - Rootsearch and hyperplane generation
//! - Dual solver strategy layer (relaxation and solution-limit strategies)
//! - Task pipeline with termination checks
//! - Solver front-end wiring it all together

pub mod cuts;
pub mod dual;
pub mod nlp;
pub mod results;
pub mod rootsearch;
pub mod scope;
pub mod solver;
pub mod tasks;

pub use dual::{
    BackendError, DualSolution, DualSolver, MipBackend, RelaxationStrategy, RowDirection,
    RowHandle, SolutionLimitStrategy, SolverStatus, SOLUTION_LIMIT_SENTINEL,
};
pub use nlp::{InteriorPointSet, NlpBackend, NlpStatus};
pub use results::{Iteration, IterationClass, PrimalSolution, Results, TerminationReason};
pub use rootsearch::{RootsearchError, RootsearchResult};
pub use scope::SolveScope;
pub use solver::{SolveReport, Solver, SolverBuilder};
pub use tasks::{JumpTask, SequentialTask, Task, TaskFlow, TaskHandle, TaskPipeline};

#[cfg(test)]
mod test_utils;
