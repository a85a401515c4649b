//! Objective function with sense-aware bound comparisons.

use super::constraint::{LinearTerm, NonlinearFunction};

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectiveSense {
    #[default]
    Minimize,
    Maximize,
}

/// The objective: a linear part, a constant and an optional nonlinear part.
#[derive(Debug)]
pub struct Objective {
    sense: ObjectiveSense,
    constant: f64,
    terms: Vec<LinearTerm>,
    nonlinear: Option<Box<dyn NonlinearFunction>>,
}

impl Objective {
    pub fn linear(sense: ObjectiveSense, terms: Vec<LinearTerm>, constant: f64) -> Self {
        Self {
            sense,
            constant,
            terms,
            nonlinear: None,
        }
    }

    pub fn with_nonlinear_part(mut self, function: Box<dyn NonlinearFunction>) -> Self {
        self.nonlinear = Some(function);
        self
    }

    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    pub fn terms(&self) -> &[LinearTerm] {
        &self.terms
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn has_nonlinear_part(&self) -> bool {
        self.nonlinear.is_some()
    }

    pub fn evaluate(&self, point: &[f64]) -> f64 {
        let mut value = self.constant;
        for term in &self.terms {
            value += term.coefficient * point[term.variable];
        }
        if let Some(function) = &self.nonlinear {
            value += function.value(point);
        }
        value
    }

    /// Value of the nonlinear part alone, zero when there is none.
    pub fn nonlinear_value(&self, point: &[f64]) -> f64 {
        self.nonlinear.as_ref().map_or(0.0, |f| f.value(point))
    }

    /// True when `candidate` is a strictly better objective value than
    /// `incumbent` under this sense.
    pub fn is_better(&self, candidate: f64, incumbent: f64) -> bool {
        match self.sense {
            ObjectiveSense::Minimize => candidate < incumbent,
            ObjectiveSense::Maximize => candidate > incumbent,
        }
    }

    /// The worst representable objective value under this sense, used to
    /// initialize primal bounds.
    pub fn worst_value(&self) -> f64 {
        match self.sense {
            ObjectiveSense::Minimize => f64::INFINITY,
            ObjectiveSense::Maximize => f64::NEG_INFINITY,
        }
    }

    /// The worst representable dual bound under this sense.
    pub fn worst_dual_value(&self) -> f64 {
        match self.sense {
            ObjectiveSense::Minimize => f64::NEG_INFINITY,
            ObjectiveSense::Maximize => f64::INFINITY,
        }
    }
}
