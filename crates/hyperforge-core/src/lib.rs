//! Hyperforge Core - Problem model and core types for MINLP solving
//!
//! This crate provides the fundamental abstractions for hyperforge:
//! - Variables, constraints and objectives with per-point evaluation
//! - The `Problem` container with derived classification properties
//! - Solution points, interior points and supporting hyperplanes
//! - The fatal error type shared across the workspace

pub mod error;
pub mod hyperplane;
pub mod problem;
pub mod solution;

pub use error::{HyperforgeError, Result};
pub use hyperplane::{Hyperplane, HyperplaneSource};
pub use problem::{
    Constraint, ConstraintClass, ConstraintFunction, ConstraintSide, LinearTerm,
    NonlinearFunction, Objective, ObjectiveSense, Problem, ProblemBuilder, ProblemClass,
    QuadraticTerm, Variable, VariableKind,
};
pub use solution::{ConstraintDeviation, InteriorPoint, SolutionPoint};
