//! Decision variables.

/// The type of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// Real-valued within its bounds.
    Continuous,
    /// Either 0 or 1.
    Binary,
    /// Integer-valued within its bounds.
    Integer,
    /// Zero, or continuous within its bounds.
    Semicontinuous,
}

impl VariableKind {
    /// True when the variable participates in the discrete part of the
    /// problem, i.e. it is deactivated by a continuous relaxation.
    pub fn is_discrete(self) -> bool {
        !matches!(self, VariableKind::Continuous)
    }
}

/// A single decision variable.
#[derive(Debug, Clone)]
pub struct Variable {
    /// Position in the problem's variable ordering.
    pub index: usize,
    pub name: String,
    pub kind: VariableKind,
    pub lower: f64,
    pub upper: f64,
}
