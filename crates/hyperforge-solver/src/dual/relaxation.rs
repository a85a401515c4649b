//! Relaxation strategy: decides per pass whether discrete variables are
//! enforced, and classifies the resulting pass.

use hyperforge_config::{DualSettings, RelaxationKind};
use tracing::debug;

use super::backend::MipBackend;
use crate::results::{IterationClass, Results};

/// Tagged relaxation strategy variants; dispatch is a plain match, not a
/// virtual hierarchy.
#[derive(Debug, Clone)]
pub enum RelaxationStrategy {
    /// Always solve the full discrete problem.
    None,
    /// Solve continuous relaxations early (they are cheap and seed the cut
    /// collection), then alternate back in while the gap is still wide.
    Standard {
        relaxed_passes: usize,
        frequency: usize,
        gap_threshold: f64,
    },
}

impl RelaxationStrategy {
    /// Builds the strategy from settings. A relaxation schedule on a problem
    /// without discrete variables degenerates to `None`.
    pub fn from_settings(settings: &DualSettings, problem_is_discrete: bool) -> Self {
        if !problem_is_discrete {
            return RelaxationStrategy::None;
        }
        match settings.relaxation_kind() {
            RelaxationKind::None => RelaxationStrategy::None,
            RelaxationKind::Standard => RelaxationStrategy::Standard {
                relaxed_passes: settings.relaxed_passes,
                frequency: settings.relaxation_frequency,
                gap_threshold: settings.relaxed_gap_threshold,
            },
        }
    }

    /// Whether pass number `pass` should solve the continuous relaxation.
    pub fn prescribes_relaxed(&self, pass: usize, results: &Results) -> bool {
        match self {
            RelaxationStrategy::None => false,
            RelaxationStrategy::Standard {
                relaxed_passes,
                frequency,
                gap_threshold,
            } => {
                if pass <= *relaxed_passes {
                    return true;
                }
                *frequency > 0
                    && pass % *frequency == 0
                    && results.relative_gap() > *gap_threshold
            }
        }
    }

    /// Runs once before each solve: toggles discrete-variable activation on
    /// the backend for the upcoming pass.
    pub fn execute(
        &self,
        pass: usize,
        backend: &mut dyn MipBackend,
        results: &Results,
        problem_is_discrete: bool,
    ) {
        let relax = problem_is_discrete && self.prescribes_relaxed(pass, results);
        let activate = problem_is_discrete && !relax;
        if backend.discrete_variables_active() != activate {
            debug!(pass, activate, "toggling discrete variables");
        }
        backend.activate_discrete_variables(activate);
    }

    /// Classification of the upcoming pass, derived from the backend's
    /// current discrete activation rather than from raw variable types.
    /// Without a relaxation schedule the dual model is always the full
    /// problem, discrete or not.
    pub fn problem_class(&self, backend: &dyn MipBackend) -> IterationClass {
        match self {
            RelaxationStrategy::None => IterationClass::Mip,
            RelaxationStrategy::Standard { .. } => {
                if backend.discrete_variables_active() {
                    IterationClass::Mip
                } else {
                    IterationClass::Relaxed
                }
            }
        }
    }
}
