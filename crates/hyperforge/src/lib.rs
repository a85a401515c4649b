//! Hyperforge - an extended supporting hyperplane solver engine for convex
//! MINLP problems.
//!
//! This crate re-exports the public surface of the workspace: build a
//! [`Problem`], install a [`MipBackend`] (and optionally an [`NlpBackend`])
//! on a [`SolverBuilder`], and solve.
//!
//! # Example
//!
//! ```rust,ignore
//! use hyperforge::{Settings, SolverBuilder};
//!
//! let report = SolverBuilder::new(problem)
//!     .settings(Settings::default())
//!     .mip_backend(mip)
//!     .nlp_backend(nlp)
//!     .build()?
//!     .solve()?;
//! println!("{:?}", report.results.termination_reason());
//! ```

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

// Problem model
pub use hyperforge_core::{
    Constraint, ConstraintClass, ConstraintDeviation, ConstraintFunction, ConstraintSide,
    Hyperplane, HyperplaneSource, HyperforgeError, InteriorPoint, LinearTerm, NonlinearFunction,
    Objective, ObjectiveSense, Problem, ProblemBuilder, ProblemClass, QuadraticTerm, Result,
    SolutionPoint, Variable, VariableKind,
};

// Settings snapshot
pub use hyperforge_config::{
    ConfigError, CutSettings, DualSettings, InteriorSettings, PresolveFrequency, RelaxationKind,
    RootsearchSettings, Settings, TerminationSettings,
};

// Engine surface
pub use hyperforge_solver::{
    BackendError, Iteration, IterationClass, MipBackend, NlpBackend, NlpStatus, PrimalSolution,
    Results, RowDirection, RowHandle, SolveReport, Solver, SolverBuilder, SolverStatus,
    TerminationReason, SOLUTION_LIMIT_SENTINEL,
};

static INIT: OnceLock<()> = OnceLock::new();

/// Initializes console logging for the solver.
///
/// Safe to call multiple times; only the first call has effect. Honors
/// `RUST_LOG`, defaulting to progress output from the engine.
pub fn init_logging() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("hyperforge_solver=info"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}
