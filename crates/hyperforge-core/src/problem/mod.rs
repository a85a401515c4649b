//! Problem model: variables, constraints, objective and derived properties.
//!
//! A [`Problem`] is a read-only view during a solve pass. It may be replaced
//! wholesale between reformulation stages, but no component mutates it while
//! the task pipeline is running.

mod constraint;
mod objective;
mod variable;

pub use constraint::{
    Constraint, ConstraintClass, ConstraintFunction, ConstraintSide, LinearTerm,
    NonlinearFunction, QuadraticTerm,
};
pub use objective::{Objective, ObjectiveSense};
pub use variable::{Variable, VariableKind};

use crate::error::{HyperforgeError, Result};
use crate::solution::ConstraintDeviation;

/// Classification of a problem instance, derived from its variables,
/// constraints and objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemClass {
    /// Continuous with linear constraints and objective.
    Lp,
    /// Continuous with at least one quadratic constraint or objective part.
    Qp,
    /// Discrete with linear constraints and objective.
    Milp,
    /// Discrete with quadratic parts but no general nonlinearity.
    Miqp,
    /// Continuous with general nonlinear constraints or objective.
    Nlp,
    /// Discrete with general nonlinear constraints or objective.
    Minlp,
}

impl ProblemClass {
    /// True when the class contains no general nonlinear part, so the
    /// constraint-tolerance termination check does not apply.
    pub fn is_linear_or_quadratic(self) -> bool {
        matches!(
            self,
            ProblemClass::Lp | ProblemClass::Qp | ProblemClass::Milp | ProblemClass::Miqp
        )
    }
}

/// An ordered collection of variables and constraints plus an objective.
#[derive(Debug)]
pub struct Problem {
    name: String,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: Objective,
}

impl Problem {
    /// Starts building a problem with the given name.
    pub fn builder(name: impl Into<String>) -> ProblemBuilder {
        ProblemBuilder {
            name: name.into(),
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// True when at least one variable is binary, integer or semicontinuous.
    pub fn is_discrete(&self) -> bool {
        self.variables.iter().any(|v| v.kind.is_discrete())
    }

    /// Indices of the discrete variables, in declaration order.
    pub fn discrete_variable_indices(&self) -> Vec<usize> {
        self.variables
            .iter()
            .filter(|v| v.kind.is_discrete())
            .map(|v| v.index)
            .collect()
    }

    /// The nonlinear constraints, in declaration order.
    pub fn nonlinear_constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints
            .iter()
            .filter(|c| c.classification() == ConstraintClass::Nonlinear)
    }

    /// Derived classification of this instance.
    pub fn classification(&self) -> ProblemClass {
        let has_nonlinear = self.nonlinear_constraints().next().is_some()
            || self.objective.has_nonlinear_part();
        let has_quadratic = self
            .constraints
            .iter()
            .any(|c| c.classification() == ConstraintClass::Quadratic);

        match (self.is_discrete(), has_nonlinear, has_quadratic) {
            (false, true, _) => ProblemClass::Nlp,
            (true, true, _) => ProblemClass::Minlp,
            (false, false, true) => ProblemClass::Qp,
            (true, false, true) => ProblemClass::Miqp,
            (false, false, false) => ProblemClass::Lp,
            (true, false, false) => ProblemClass::Milp,
        }
    }

    /// Returns the nonlinear constraint with the largest deviation at `point`,
    /// or `None` when the problem has no nonlinear constraints.
    ///
    /// Constraints whose function value is NaN at the point are skipped.
    pub fn most_deviating_nonlinear_constraint(&self, point: &[f64]) -> Option<ConstraintDeviation> {
        let mut best: Option<ConstraintDeviation> = None;

        for constraint in self.nonlinear_constraints() {
            let deviation = constraint.deviation(point);
            if deviation.is_nan() {
                continue;
            }
            if best.as_ref().map_or(true, |b| deviation > b.value) {
                best = Some(ConstraintDeviation {
                    constraint: Some(constraint.index()),
                    value: deviation,
                });
            }
        }

        best
    }

    /// Largest deviation among the nonlinear constraints at `point`, together
    /// with the set of constraints within `active_tolerance` of that maximum.
    pub fn max_nonlinear_deviation(
        &self,
        point: &[f64],
        active_tolerance: f64,
    ) -> Option<(ConstraintDeviation, Vec<usize>)> {
        let max = self.most_deviating_nonlinear_constraint(point)?;
        let active = self
            .nonlinear_constraints()
            .filter(|c| {
                let d = c.deviation(point);
                !d.is_nan() && (max.value - d).abs() <= active_tolerance
            })
            .map(|c| c.index())
            .collect();
        Some((max, active))
    }

    /// True when every nonlinear constraint is fulfilled within `tolerance`.
    pub fn are_nonlinear_constraints_fulfilled(&self, point: &[f64], tolerance: f64) -> bool {
        self.nonlinear_constraints()
            .all(|c| c.is_fulfilled(point, tolerance))
    }

    /// True when every quadratic constraint is fulfilled within `tolerance`.
    pub fn are_quadratic_constraints_fulfilled(&self, point: &[f64], tolerance: f64) -> bool {
        self.constraints
            .iter()
            .filter(|c| c.classification() == ConstraintClass::Quadratic)
            .all(|c| c.is_fulfilled(point, tolerance))
    }

    /// True when every discrete variable takes an integral value at `point`,
    /// within `tolerance`.
    pub fn are_integrality_constraints_fulfilled(&self, point: &[f64], tolerance: f64) -> bool {
        self.variables
            .iter()
            .filter(|v| v.kind.is_discrete())
            .all(|v| {
                let value = point[v.index];
                (value - value.round()).abs() <= tolerance
            })
    }
}

/// Incremental builder for [`Problem`], validating the definition on `build`.
#[derive(Debug)]
pub struct ProblemBuilder {
    name: String,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: Option<Objective>,
}

impl ProblemBuilder {
    /// Appends a variable; its index is its position in declaration order.
    pub fn variable(
        mut self,
        name: impl Into<String>,
        kind: VariableKind,
        lower: f64,
        upper: f64,
    ) -> Self {
        let index = self.variables.len();
        self.variables.push(Variable {
            index,
            name: name.into(),
            kind,
            lower,
            upper,
        });
        self
    }

    /// Appends a constraint; its index is its position in declaration order.
    pub fn constraint(
        mut self,
        name: impl Into<String>,
        function: ConstraintFunction,
        lower: Option<f64>,
        upper: Option<f64>,
    ) -> Self {
        let index = self.constraints.len();
        self.constraints
            .push(Constraint::new(index, name.into(), function, lower, upper));
        self
    }

    pub fn objective(mut self, objective: Objective) -> Self {
        self.objective = Some(objective);
        self
    }

    /// Validates and finalizes the problem definition.
    pub fn build(self) -> Result<Problem> {
        if self.variables.is_empty() {
            return Err(HyperforgeError::Problem(format!(
                "problem `{}` has no variables",
                self.name
            )));
        }

        for variable in &self.variables {
            if variable.lower > variable.upper {
                return Err(HyperforgeError::Problem(format!(
                    "variable `{}` has empty domain [{}, {}]",
                    variable.name, variable.lower, variable.upper
                )));
            }
        }

        for constraint in &self.constraints {
            if constraint.lower().is_none() && constraint.upper().is_none() {
                return Err(HyperforgeError::Problem(format!(
                    "constraint `{}` has neither a lower nor an upper bound",
                    constraint.name()
                )));
            }
            for term in constraint.referenced_variables() {
                if term >= self.variables.len() {
                    return Err(HyperforgeError::Problem(format!(
                        "constraint `{}` references unknown variable index {}",
                        constraint.name(),
                        term
                    )));
                }
            }
        }

        let objective = self.objective.ok_or_else(|| {
            HyperforgeError::Problem(format!("problem `{}` has no objective", self.name))
        })?;

        Ok(Problem {
            name: self.name,
            variables: self.variables,
            constraints: self.constraints,
            objective,
        })
    }
}
