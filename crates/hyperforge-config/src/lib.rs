//! Configuration system for hyperforge.
//!
//! Settings are read once per run, validated, and carried through the solve
//! as an immutable snapshot. Load them from TOML files to control tolerances,
//! limits and strategy selectors without code changes.
//!
//! # Examples
//!
//! Load settings from a TOML string:
//!
//! ```
//! use hyperforge_config::Settings;
//!
//! let settings = Settings::from_toml_str(r#"
//!     [termination]
//!     absolute_gap = 1e-4
//!     iteration_limit = 50
//!
//!     [dual]
//!     relaxation_strategy = "none"
//!     solution_limit_initial = 2
//! "#).unwrap();
//!
//! assert_eq!(settings.termination.iteration_limit, 50);
//! ```
//!
//! Use defaults when the file is missing:
//!
//! ```
//! use hyperforge_config::Settings;
//!
//! let settings = Settings::load("hyperforge.toml").unwrap_or_default();
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// The full settings snapshot.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default)]
    pub termination: TerminationSettings,

    #[serde(default)]
    pub rootsearch: RootsearchSettings,

    #[serde(default)]
    pub cuts: CutSettings,

    #[serde(default)]
    pub dual: DualSettings,

    #[serde(default)]
    pub interior: InteriorSettings,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses settings from a TOML string.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(input)?;
        Ok(settings)
    }

    /// Returns a copy with out-of-range values corrected to the nearest
    /// supported ones, emitting a warning for each correction. The run
    /// continues with the corrected snapshot.
    pub fn validated(mut self) -> Self {
        if self.termination.absolute_gap < 0.0 {
            warn!(
                value = self.termination.absolute_gap,
                "negative absolute gap tolerance, using 0"
            );
            self.termination.absolute_gap = 0.0;
        }
        if self.termination.relative_gap < 0.0 {
            warn!(
                value = self.termination.relative_gap,
                "negative relative gap tolerance, using 0"
            );
            self.termination.relative_gap = 0.0;
        }
        if self.rootsearch.max_iterations == 0 {
            warn!("rootsearch iteration budget of 0, using 1");
            self.rootsearch.max_iterations = 1;
        }
        if self.dual.solution_limit_initial == 0 {
            warn!("MIP solution limit of 0, using 1");
            self.dual.solution_limit_initial = 1;
        }
        self
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_secs_f64(self.termination.time_limit_secs)
    }
}

/// Tolerances and limits for the termination evaluator.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TerminationSettings {
    /// Terminate when `|primal - dual|` falls to this value.
    #[serde(default = "default_absolute_gap")]
    pub absolute_gap: f64,

    /// Terminate when the gap relative to the primal bound falls to this
    /// value.
    #[serde(default = "default_relative_gap")]
    pub relative_gap: f64,

    /// Nonlinear/quadratic constraint satisfaction tolerance for accepting a
    /// point as feasible.
    #[serde(default = "default_constraint_tolerance")]
    pub constraint_tolerance: f64,

    /// Maximum number of passes.
    #[serde(default = "default_iteration_limit")]
    pub iteration_limit: usize,

    /// Terminate after this many consecutive passes returning an identical
    /// dual incumbent; 0 disables the check.
    #[serde(default = "default_primal_stagnation_passes")]
    pub primal_stagnation_passes: usize,

    /// Wall-clock budget for the whole run, in seconds.
    #[serde(default = "default_time_limit_secs")]
    pub time_limit_secs: f64,

    /// When true, the gap checks additionally require the pass to have been
    /// solved to proven optimality before accepting.
    #[serde(default)]
    pub require_optimal_for_gap: bool,
}

impl Default for TerminationSettings {
    fn default() -> Self {
        Self {
            absolute_gap: default_absolute_gap(),
            relative_gap: default_relative_gap(),
            constraint_tolerance: default_constraint_tolerance(),
            iteration_limit: default_iteration_limit(),
            primal_stagnation_passes: default_primal_stagnation_passes(),
            time_limit_secs: default_time_limit_secs(),
            require_optimal_for_gap: false,
        }
    }
}

/// Parameters of the 1-D rootsearch between an interior and an exterior
/// point.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RootsearchSettings {
    #[serde(default = "default_rootsearch_iterations")]
    pub max_iterations: usize,

    /// Terminate when the remaining segment is shorter than this.
    #[serde(default = "default_rootsearch_tolerance")]
    pub termination_tolerance: f64,

    /// Constraints within this distance of the largest deviation count as
    /// simultaneously active at the located boundary point.
    #[serde(default = "default_active_constraint_tolerance")]
    pub active_constraint_tolerance: f64,

    /// Candidates whose deviation is below this factor of the largest seen
    /// deviation are skipped during cut generation.
    #[serde(default = "default_constraint_factor")]
    pub constraint_factor: f64,
}

impl Default for RootsearchSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_rootsearch_iterations(),
            termination_tolerance: default_rootsearch_tolerance(),
            active_constraint_tolerance: default_active_constraint_tolerance(),
            constraint_factor: default_constraint_factor(),
        }
    }
}

/// Hyperplane generation limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CutSettings {
    /// Cap on hyperplanes added per pass, enforced greedily in generation
    /// order.
    #[serde(default = "default_max_cuts_per_pass")]
    pub max_per_pass: usize,

    /// Rebuild the dual model each pass instead of growing it; the cumulative
    /// hyperplane count of the ledger restarts at 0.
    #[serde(default)]
    pub reinitialize_dual_tree: bool,
}

impl Default for CutSettings {
    fn default() -> Self {
        Self {
            max_per_pass: default_max_cuts_per_pass(),
            reinitialize_dual_tree: false,
        }
    }
}

/// Selectors and thresholds for the dual solver strategy layer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DualSettings {
    /// Relaxation strategy selector: `"standard"` or `"none"`. Unknown values
    /// fall back to `"standard"` with a warning.
    #[serde(default = "default_relaxation_strategy")]
    pub relaxation_strategy: String,

    /// Number of initial passes solved as continuous relaxations.
    #[serde(default = "default_relaxed_passes")]
    pub relaxed_passes: usize,

    /// Insert one relaxed pass every this many passes while the relative gap
    /// exceeds `relaxed_gap_threshold`; 0 disables the periodic relaxation.
    #[serde(default)]
    pub relaxation_frequency: usize,

    #[serde(default = "default_relaxed_gap_threshold")]
    pub relaxed_gap_threshold: f64,

    /// Initial accepted-solution-count limit for the MIP backend.
    #[serde(default = "default_solution_limit_initial")]
    pub solution_limit_initial: u64,

    /// Increment applied when a pass hits the solution limit without
    /// improving the dual bound.
    #[serde(default = "default_solution_limit_increment")]
    pub solution_limit_increment: u64,

    /// Force a full-optimality solve after this many passes without a dual
    /// bound improvement.
    #[serde(default = "default_force_optimal_passes")]
    pub force_optimal_after_passes: usize,

    /// Force a full-optimality solve after this much time without a dual
    /// bound improvement, in seconds.
    #[serde(default = "default_force_optimal_secs")]
    pub force_optimal_after_secs: f64,

    /// Force a full-optimality solve when the previous MIP objective is this
    /// close to the primal bound.
    #[serde(default = "default_force_optimal_primal_tolerance")]
    pub force_optimal_primal_tolerance: f64,

    /// How often to presolve the dual model and apply tightened bounds.
    #[serde(default)]
    pub presolve: PresolveFrequency,
}

impl Default for DualSettings {
    fn default() -> Self {
        Self {
            relaxation_strategy: default_relaxation_strategy(),
            relaxed_passes: default_relaxed_passes(),
            relaxation_frequency: 0,
            relaxed_gap_threshold: default_relaxed_gap_threshold(),
            solution_limit_initial: default_solution_limit_initial(),
            solution_limit_increment: default_solution_limit_increment(),
            force_optimal_after_passes: default_force_optimal_passes(),
            force_optimal_after_secs: default_force_optimal_secs(),
            force_optimal_primal_tolerance: default_force_optimal_primal_tolerance(),
            presolve: PresolveFrequency::default(),
        }
    }
}

impl DualSettings {
    /// Parses the relaxation selector, falling back to the standard strategy
    /// for unknown values.
    pub fn relaxation_kind(&self) -> RelaxationKind {
        match self.relaxation_strategy.as_str() {
            "none" => RelaxationKind::None,
            "standard" => RelaxationKind::Standard,
            other => {
                warn!(
                    selector = other,
                    "unknown relaxation strategy, using \"standard\""
                );
                RelaxationKind::Standard
            }
        }
    }

    pub fn force_optimal_after(&self) -> Duration {
        Duration::from_secs_f64(self.force_optimal_after_secs)
    }
}

/// Parsed relaxation strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaxationKind {
    None,
    Standard,
}

/// Presolve scheduling for the dual model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PresolveFrequency {
    Never,
    #[default]
    Once,
    EveryPass,
}

/// Interior point maintenance.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct InteriorSettings {
    /// Refresh the interior point set every this many passes; 0 keeps the
    /// seeded set for the whole run.
    #[serde(default)]
    pub refresh_frequency: usize,
}

fn default_absolute_gap() -> f64 {
    1e-3
}

fn default_relative_gap() -> f64 {
    1e-3
}

fn default_constraint_tolerance() -> f64 {
    1e-8
}

fn default_iteration_limit() -> usize {
    200
}

fn default_primal_stagnation_passes() -> usize {
    10
}

fn default_time_limit_secs() -> f64 {
    900.0
}

fn default_rootsearch_iterations() -> usize {
    100
}

fn default_rootsearch_tolerance() -> f64 {
    1e-10
}

fn default_active_constraint_tolerance() -> f64 {
    1e-6
}

fn default_constraint_factor() -> f64 {
    0.5
}

fn default_max_cuts_per_pass() -> usize {
    200
}

fn default_relaxation_strategy() -> String {
    "standard".into()
}

fn default_relaxed_passes() -> usize {
    4
}

fn default_relaxed_gap_threshold() -> f64 {
    0.25
}

fn default_solution_limit_initial() -> u64 {
    1
}

fn default_solution_limit_increment() -> u64 {
    1
}

fn default_force_optimal_passes() -> usize {
    50
}

fn default_force_optimal_secs() -> f64 {
    120.0
}

fn default_force_optimal_primal_tolerance() -> f64 {
    1e-3
}
