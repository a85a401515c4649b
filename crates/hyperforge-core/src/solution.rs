//! Solution points and interior points.

/// The most violated constraint at a point, with its signed violation.
///
/// `constraint` is `None` for problems without nonlinear constraints; the
/// value is then negative infinity (everything fulfilled).
#[derive(Debug, Clone, Copy)]
pub struct ConstraintDeviation {
    pub constraint: Option<usize>,
    pub value: f64,
}

impl ConstraintDeviation {
    /// Deviation of a point with no violated (or no existing) nonlinear
    /// constraint.
    pub fn none() -> Self {
        Self {
            constraint: None,
            value: f64::NEG_INFINITY,
        }
    }
}

/// One candidate point produced by a dual solve.
#[derive(Debug, Clone)]
pub struct SolutionPoint {
    pub point: Vec<f64>,
    pub objective_value: f64,
    /// Most violated nonlinear constraint at `point`; consistent with
    /// re-evaluating the problem at `point` by construction.
    pub max_deviation: ConstraintDeviation,
    /// True when the point came from a continuous-relaxation solve.
    pub is_relaxed: bool,
}

/// A point strictly feasible for all nonlinear constraints, used as the
/// inner anchor of the rootsearch.
#[derive(Debug, Clone)]
pub struct InteriorPoint {
    pub point: Vec<f64>,
    /// Largest nonlinear-constraint deviation at the point; strictly
    /// negative for a true interior point.
    pub max_deviation: f64,
}
