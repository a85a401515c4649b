//! Hyperplane generation from violated nonlinear constraints.
//!
//! The rootsearch generator walks every candidate solution point against
//! every known interior point, locates the constraint boundary along the
//! segment, and appends supporting hyperplanes to the waiting list. Applying
//! the waiting list to the dual model is a separate step owned by the dual
//! solver layer.

use hyperforge_config::Settings;
use hyperforge_core::{Hyperplane, HyperplaneSource, InteriorPoint, Problem, SolutionPoint};
use tracing::{debug, info, warn};

use crate::rootsearch;

fn source_tag(candidate_index: usize, point: &SolutionPoint, is_mip_pass: bool) -> HyperplaneSource {
    if point.is_relaxed || !is_mip_pass {
        HyperplaneSource::LpRelaxedRootsearch
    } else if candidate_index == 0 {
        HyperplaneSource::MipOptimalRootsearch
    } else {
        HyperplaneSource::MipSolutionPoolRootsearch
    }
}

/// Evaluates all nonlinear constraints at `location` and appends a
/// hyperplane for the most violated one, unless the point turned out to lie
/// strictly inside the feasible region.
fn commit_candidate(
    problem: &Problem,
    location: Vec<f64>,
    source: HyperplaneSource,
    active_tolerance: f64,
    waiting: &mut Vec<Hyperplane>,
) -> bool {
    let Some((deviation, _active)) = problem.max_nonlinear_deviation(&location, active_tolerance)
    else {
        return false;
    };

    let Some(constraint) = deviation.constraint else {
        return false;
    };

    if deviation.value < 0.0 {
        // The candidate slipped inside the feasible region; a cut here would
        // chop off feasible points.
        debug!(deviation = deviation.value, "discarding interior cut candidate");
        return false;
    }

    info!(
        constraint,
        deviation = deviation.value,
        "added hyperplane to waiting list"
    );
    waiting.push(Hyperplane {
        source_constraint: constraint,
        generated_point: location,
        source,
    });
    true
}

/// Rootsearch-based generation: one bounded search per candidate point and
/// interior point, with a greedy per-pass cap. Returns the number of
/// hyperplanes appended to the waiting list.
pub fn generate_rootsearch_cuts(
    problem: &Problem,
    interior_points: &[InteriorPoint],
    settings: &Settings,
    points: &[SolutionPoint],
    is_mip_pass: bool,
    waiting: &mut Vec<Hyperplane>,
) -> usize {
    if interior_points.is_empty() {
        warn!("no interior point known, adding cutting planes at solution points");
        return generate_solution_point_cuts(problem, settings, points, waiting);
    }

    let mut added = 0;
    // Pool points far less violated than the worst one processed so far are
    // not worth a search. The first candidate is never filtered.
    let mut largest_deviation = 0.0_f64;

    for (index, point) in points.iter().enumerate() {
        if point.max_deviation.constraint.is_none() {
            continue;
        }
        if point.max_deviation.value.is_nan() || point.max_deviation.value <= 0.0 {
            continue;
        }
        if index > 0
            && point.max_deviation.value
                < settings.rootsearch.constraint_factor * largest_deviation
        {
            continue;
        }
        largest_deviation = largest_deviation.max(point.max_deviation.value);

        for interior in interior_points {
            if added >= settings.cuts.max_per_pass {
                debug!(added, "per-pass hyperplane cap reached");
                return added;
            }

            let location = match rootsearch::find_zero(
                &interior.point,
                &point.point,
                problem,
                &settings.rootsearch,
            ) {
                Ok(result) => result.outer,
                Err(error) => {
                    warn!(%error, "rootsearch failed, using solution point instead");
                    point.point.clone()
                }
            };

            if commit_candidate(
                problem,
                location,
                source_tag(index, point, is_mip_pass),
                settings.rootsearch.active_constraint_tolerance,
                waiting,
            ) {
                added += 1;
            }
        }
    }

    added
}

/// Fallback generation without interior points: the cut is taken directly at
/// each violated solution point (plain outer approximation).
pub fn generate_solution_point_cuts(
    problem: &Problem,
    settings: &Settings,
    points: &[SolutionPoint],
    waiting: &mut Vec<Hyperplane>,
) -> usize {
    let mut added = 0;

    for point in points {
        if added >= settings.cuts.max_per_pass {
            return added;
        }
        if point.max_deviation.value.is_nan() || point.max_deviation.value <= 0.0 {
            continue;
        }
        if commit_candidate(
            problem,
            point.point.clone(),
            HyperplaneSource::SolutionPoint,
            settings.rootsearch.active_constraint_tolerance,
            waiting,
        ) {
            added += 1;
        }
    }

    added
}
