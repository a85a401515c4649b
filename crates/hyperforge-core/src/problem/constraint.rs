//! Constraints and their per-point evaluation.
//!
//! Constraint functions form a widening hierarchy of capability: linear,
//! quadratic (linear plus bilinear terms) and general nonlinear. The
//! nonlinear case delegates to an externally supplied [`NonlinearFunction`];
//! expression-tree internals are outside this crate.

use std::fmt;

/// One linear term `coefficient * x[variable]`.
#[derive(Debug, Clone, Copy)]
pub struct LinearTerm {
    pub coefficient: f64,
    pub variable: usize,
}

/// One bilinear term `coefficient * x[first] * x[second]`.
#[derive(Debug, Clone, Copy)]
pub struct QuadraticTerm {
    pub coefficient: f64,
    pub first: usize,
    pub second: usize,
}

/// Evaluation seam for general nonlinear functions.
///
/// Implementations are supplied by the embedding application (or by tests);
/// the solver only ever calls through this trait.
pub trait NonlinearFunction: Send + Sync + fmt::Debug {
    /// Function value at `point`.
    fn value(&self, point: &[f64]) -> f64;

    /// Sparse gradient at `point`, as `(variable index, partial derivative)`
    /// pairs. Entries with zero derivative may be omitted.
    fn gradient(&self, point: &[f64]) -> Vec<(usize, f64)>;
}

/// Classification tag for a constraint function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintClass {
    Linear,
    Quadratic,
    Nonlinear,
}

/// Which bound of a two-sided constraint a deviation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSide {
    /// The `lower <= g(x)` side.
    Lower,
    /// The `g(x) <= upper` side.
    Upper,
}

/// The function part of a constraint.
#[derive(Debug)]
pub enum ConstraintFunction {
    Linear(Vec<LinearTerm>),
    Quadratic {
        linear: Vec<LinearTerm>,
        quadratic: Vec<QuadraticTerm>,
    },
    Nonlinear(Box<dyn NonlinearFunction>),
}

impl ConstraintFunction {
    fn value(&self, point: &[f64]) -> f64 {
        match self {
            ConstraintFunction::Linear(terms) => linear_value(terms, point),
            ConstraintFunction::Quadratic { linear, quadratic } => {
                let mut value = linear_value(linear, point);
                for term in quadratic {
                    value += term.coefficient * point[term.first] * point[term.second];
                }
                value
            }
            ConstraintFunction::Nonlinear(function) => function.value(point),
        }
    }

    fn gradient(&self, point: &[f64]) -> Vec<(usize, f64)> {
        match self {
            ConstraintFunction::Linear(terms) => terms
                .iter()
                .map(|t| (t.variable, t.coefficient))
                .collect(),
            ConstraintFunction::Quadratic { linear, quadratic } => {
                let mut gradient = vec![0.0; point.len()];
                for term in linear {
                    gradient[term.variable] += term.coefficient;
                }
                for term in quadratic {
                    gradient[term.first] += term.coefficient * point[term.second];
                    gradient[term.second] += term.coefficient * point[term.first];
                }
                gradient
                    .into_iter()
                    .enumerate()
                    .filter(|(_, g)| *g != 0.0)
                    .collect()
            }
            ConstraintFunction::Nonlinear(function) => function.gradient(point),
        }
    }
}

fn linear_value(terms: &[LinearTerm], point: &[f64]) -> f64 {
    terms
        .iter()
        .map(|t| t.coefficient * point[t.variable])
        .sum()
}

/// A constraint `lower <= g(x) <= upper` (either bound optional, never both
/// absent).
#[derive(Debug)]
pub struct Constraint {
    index: usize,
    name: String,
    function: ConstraintFunction,
    lower: Option<f64>,
    upper: Option<f64>,
}

impl Constraint {
    pub fn new(
        index: usize,
        name: String,
        function: ConstraintFunction,
        lower: Option<f64>,
        upper: Option<f64>,
    ) -> Self {
        Self {
            index,
            name,
            function,
            lower,
            upper,
        }
    }

    /// Position in the problem's constraint ordering.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lower(&self) -> Option<f64> {
        self.lower
    }

    pub fn upper(&self) -> Option<f64> {
        self.upper
    }

    pub fn classification(&self) -> ConstraintClass {
        match &self.function {
            ConstraintFunction::Linear(_) => ConstraintClass::Linear,
            ConstraintFunction::Quadratic { .. } => ConstraintClass::Quadratic,
            ConstraintFunction::Nonlinear(_) => ConstraintClass::Nonlinear,
        }
    }

    /// Function value `g(point)`.
    pub fn value(&self, point: &[f64]) -> f64 {
        self.function.value(point)
    }

    /// Sparse gradient of `g` at `point`.
    pub fn gradient(&self, point: &[f64]) -> Vec<(usize, f64)> {
        self.function.gradient(point)
    }

    /// Signed violation at `point`: positive when the constraint is violated,
    /// zero on the boundary, negative strictly inside. For two-sided
    /// constraints the worse side wins.
    pub fn deviation(&self, point: &[f64]) -> f64 {
        self.deviation_detail(point).0
    }

    /// Signed violation together with the side it refers to.
    pub fn deviation_detail(&self, point: &[f64]) -> (f64, ConstraintSide) {
        let value = self.function.value(point);
        let upper_deviation = self.upper.map(|u| value - u);
        let lower_deviation = self.lower.map(|l| l - value);

        match (upper_deviation, lower_deviation) {
            (Some(u), Some(l)) if l > u => (l, ConstraintSide::Lower),
            (Some(u), _) => (u, ConstraintSide::Upper),
            (None, Some(l)) => (l, ConstraintSide::Lower),
            // Ruled out by problem validation.
            (None, None) => (f64::NEG_INFINITY, ConstraintSide::Upper),
        }
    }

    /// True when the signed violation at `point` is at most `tolerance`.
    pub fn is_fulfilled(&self, point: &[f64], tolerance: f64) -> bool {
        self.deviation(point) <= tolerance
    }

    /// Variable indices this constraint references.
    pub(crate) fn referenced_variables(&self) -> Vec<usize> {
        match &self.function {
            ConstraintFunction::Linear(terms) => terms.iter().map(|t| t.variable).collect(),
            ConstraintFunction::Quadratic { linear, quadratic } => linear
                .iter()
                .map(|t| t.variable)
                .chain(quadratic.iter().flat_map(|t| [t.first, t.second]))
                .collect(),
            // Nonlinear functions are opaque; nothing to validate.
            ConstraintFunction::Nonlinear(_) => Vec::new(),
        }
    }
}
