//! Bounded 1-D rootsearch between an interior and an exterior point.
//!
//! Searches the segment `[inner, outer]` for the zero crossing of the
//! largest nonlinear-constraint deviation: negative at the interior anchor,
//! positive at the exterior candidate. The result is a pair of points
//! straddling the boundary, with the outer one on or outside it.

use hyperforge_config::RootsearchSettings;
use hyperforge_core::Problem;
use thiserror::Error;

/// Rootsearch failure. Both variants are recoverable: the caller falls back
/// to the raw candidate point and logs a warning.
#[derive(Debug, Error)]
pub enum RootsearchError {
    /// The deviation does not change sign along the segment, so no boundary
    /// crossing exists between the anchors.
    #[error("no sign change on segment (inner deviation {inner}, outer deviation {outer})")]
    NoSignChange { inner: f64, outer: f64 },

    /// A constraint evaluated to NaN along the segment.
    #[error("numerical fault while evaluating constraints along the segment")]
    NumericalFault,
}

/// The bracketing pair located by [`find_zero`].
#[derive(Debug, Clone)]
pub struct RootsearchResult {
    /// Point on the feasible side of the boundary.
    pub inner: Vec<f64>,
    /// Point on or outside the boundary; the hyperplane candidate.
    pub outer: Vec<f64>,
}

/// Largest nonlinear-constraint deviation at `point`, or an error when it is
/// not a number.
fn max_deviation(problem: &Problem, point: &[f64]) -> Result<f64, RootsearchError> {
    let deviation = problem
        .most_deviating_nonlinear_constraint(point)
        .map_or(f64::NEG_INFINITY, |d| d.value);
    if deviation.is_nan() {
        Err(RootsearchError::NumericalFault)
    } else {
        Ok(deviation)
    }
}

fn interpolate(inner: &[f64], outer: &[f64], t: f64) -> Vec<f64> {
    inner
        .iter()
        .zip(outer)
        .map(|(a, b)| a + t * (b - a))
        .collect()
}

fn segment_length(inner: &[f64], outer: &[f64]) -> f64 {
    inner
        .iter()
        .zip(outer)
        .map(|(a, b)| (b - a) * (b - a))
        .sum::<f64>()
        .sqrt()
}

/// Bisects the segment `[inner, outer]` until the bracketing interval is
/// shorter than the termination tolerance, the deviation at the midpoint is
/// within the active-constraint tolerance of zero, or the iteration budget
/// is spent. The bracket stays valid throughout, so running out of
/// iterations still returns a usable pair.
pub fn find_zero(
    inner: &[f64],
    outer: &[f64],
    problem: &Problem,
    settings: &RootsearchSettings,
) -> Result<RootsearchResult, RootsearchError> {
    let deviation_inner = max_deviation(problem, inner)?;
    let deviation_outer = max_deviation(problem, outer)?;

    if deviation_inner >= 0.0 || deviation_outer < 0.0 {
        return Err(RootsearchError::NoSignChange {
            inner: deviation_inner,
            outer: deviation_outer,
        });
    }

    let length = segment_length(inner, outer);
    let mut t_inner = 0.0_f64;
    let mut t_outer = 1.0_f64;

    for _ in 0..settings.max_iterations {
        if (t_outer - t_inner) * length <= settings.termination_tolerance {
            break;
        }

        let t_mid = 0.5 * (t_inner + t_outer);
        let midpoint = interpolate(inner, outer, t_mid);
        let deviation = max_deviation(problem, &midpoint)?;

        if deviation < 0.0 {
            t_inner = t_mid;
        } else {
            t_outer = t_mid;
            // Close enough to the boundary to treat the crossing (and any
            // simultaneous ones) as located.
            if deviation <= settings.active_constraint_tolerance {
                break;
            }
        }
    }

    Ok(RootsearchResult {
        inner: interpolate(inner, outer, t_inner),
        outer: interpolate(inner, outer, t_outer),
    })
}
