//! Per-run context shared by every task in the pipeline.

use std::time::{Duration, Instant};

use hyperforge_config::Settings;
use hyperforge_core::{Hyperplane, Problem};

use crate::dual::DualSolver;
use crate::nlp::{InteriorPointSet, NlpBackend};
use crate::results::Results;

/// Everything a task may touch during a solve.
///
/// Fields are public so tasks can borrow them disjointly; the scope itself
/// adds no invariants beyond its parts. It lives exactly as long as one
/// `solve` call.
#[derive(Debug)]
pub struct SolveScope {
    pub settings: Settings,
    pub problem: Problem,
    pub results: Results,
    pub dual: DualSolver,
    pub nlp: Option<Box<dyn NlpBackend>>,
    pub interior_points: InteriorPointSet,
    /// Hyperplanes generated but not yet committed to the dual model.
    pub waiting_hyperplanes: Vec<Hyperplane>,
    start_time: Instant,
}

impl SolveScope {
    pub fn new(
        problem: Problem,
        settings: Settings,
        dual: DualSolver,
        nlp: Option<Box<dyn NlpBackend>>,
    ) -> Self {
        let results = Results::new(problem.objective().sense());
        Self {
            settings,
            problem,
            results,
            dual,
            nlp,
            interior_points: InteriorPointSet::new(),
            waiting_hyperplanes: Vec::new(),
            start_time: Instant::now(),
        }
    }

    /// Restarts the wall clock; called once when the solve begins.
    pub fn start_solving(&mut self) {
        self.start_time = Instant::now();
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Time left within the configured limit, zero once it is spent.
    pub fn remaining_time(&self) -> Duration {
        self.settings.time_limit().saturating_sub(self.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{ball_problem, scripted_scope};
    use std::time::Duration;

    #[test]
    fn test_remaining_time_shrinks_from_the_configured_limit() {
        let mut scope = scripted_scope(ball_problem(false), vec![]);
        scope.settings.termination.time_limit_secs = 900.0;
        scope.start_solving();

        let remaining = scope.remaining_time();
        assert!(remaining <= Duration::from_secs(900));
        assert!(remaining > Duration::from_secs(899));
    }

    #[test]
    fn test_remaining_time_saturates_at_zero() {
        let mut scope = scripted_scope(ball_problem(false), vec![]);
        scope.settings.termination.time_limit_secs = 0.0;
        scope.start_solving();

        assert!(scope.remaining_time().is_zero());
    }
}
