//! Supporting hyperplanes.

/// How a hyperplane's generation point was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HyperplaneSource {
    /// Rootsearch from the optimal point of a MIP pass.
    MipOptimalRootsearch,
    /// Rootsearch from a pooled (non-optimal) point of a MIP pass.
    MipSolutionPoolRootsearch,
    /// Rootsearch from a point of a continuous-relaxation pass.
    LpRelaxedRootsearch,
    /// Cut taken directly at a solution point (no interior point known).
    SolutionPoint,
    /// Cut generated at an interior point during setup.
    InteriorPoint,
}

/// One linear cutting plane, described by the constraint it supports and the
/// point it was generated at.
///
/// Created once and immutable; held in the scope's waiting list until the
/// dual solver commits it to the backend model as a linear row.
#[derive(Debug, Clone)]
pub struct Hyperplane {
    /// Index of the source constraint in the problem.
    pub source_constraint: usize,
    /// The boundary (or exterior) point the cut supports the constraint at.
    pub generated_point: Vec<f64>,
    pub source: HyperplaneSource,
}
