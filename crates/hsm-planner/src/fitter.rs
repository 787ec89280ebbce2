//! The iterative largest-tangent-arc fitter: given a point on the spine,
//! proposes a circle, diffs it against the cut area, and uses a
//! proportional controller to converge the distance along the spine
//! whose resulting step-over matches the target.

use geo::{EuclideanDistance, LineString, MultiPolygon, Point};
use hsm_core::{
    arcs_from_circle_diff, extrapolate_line, interpolate_at_distance, Arc, PlannerConfig,
};

use crate::cut_area::CutAreaBookkeeper;

/// A pluggable controller mapping (desired, achieved) step-over to the
/// next delta to apply to the candidate distance. Only the
/// proportional term is wired up by default; the trait exists so a
/// full PID or an alternate gain can be substituted without touching
/// the fitter.
pub trait StepController {
    fn next_delta(&mut self, desired: f64, achieved: f64) -> f64;
}

#[derive(Debug, Clone, Copy)]
pub struct ProportionalController {
    pub kp: f64,
}

impl StepController for ProportionalController {
    fn next_delta(&mut self, desired: f64, achieved: f64) -> f64 {
        self.kp * (desired - achieved)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitOutcomeKind {
    Converged,
    Unconverged,
    EmptyFragment,
    BackwardsDrift,
}

pub struct FitOutcome {
    pub new_distance: f64,
    pub arcs: Vec<Arc>,
    pub kind: FitOutcomeKind,
    /// `(achieved, desired)` when `kind == Unconverged`, for the
    /// `worst_oversize_arc`/`worst_undersize_arc` diagnostics.
    pub shortfall: Option<(f64, f64)>,
}

const EXTRAPOLATION_OFFSET: f64 = 1.0e5;

/// Fits one arc starting at `start_dist` along `edge`. `radius_at`
/// queries local clearance (distance to pocket boundary) at a point;
/// `min_dist` is the floor below which a regressing controller signals
/// backwards drift and the edge should be finalized.
pub fn calculate_arc(
    edge: &LineString<f64>,
    start_dist: f64,
    min_dist: f64,
    edge_length: f64,
    step: f64,
    config: &PlannerConfig,
    controller: &mut dyn StepController,
    bookkeeper: &mut CutAreaBookkeeper,
    last_circle: &mut Option<Arc>,
    radius_at: &dyn Fn(Point<f64>) -> f64,
    jitter_zone: Option<&MultiPolygon<f64>>,
    circle_segments: usize,
) -> FitOutcome {
    let extrapolated = extrapolate_line(edge, EXTRAPOLATION_OFFSET);

    let mut desired = (step).min((edge_length - start_dist).max(0.0));
    let corner_zoom_threshold = config.corner_zoom * step;

    if corner_zoom_threshold > 0.0 {
        let seed_point =
            interpolate_at_distance(&extrapolated, EXTRAPOLATION_OFFSET + start_dist + desired);
        if let Some(seed_point) = seed_point {
            let tentative_radius = radius_at(seed_point);
            if tentative_radius < corner_zoom_threshold {
                let shrink = step * config.corner_zoom_effect * (corner_zoom_threshold - tentative_radius)
                    / corner_zoom_threshold;
                desired = (step - shrink).max(step / 20.0);
            }
        }
    }

    let mut distance = start_dist + desired;
    let mut best: Option<(f64, Vec<LineString<f64>>, f64, f64)> = None; // (distance, fragments, origin_radius, progress)
    let mut converged = false;

    for _ in 0..config.iteration_count {
        let clamped = distance.clamp(start_dist, edge_length);
        let point = match interpolate_at_distance(&extrapolated, EXTRAPOLATION_OFFSET + clamped) {
            Some(p) => p,
            None => break,
        };
        let radius = radius_at(point);
        if radius <= 0.0 {
            break;
        }

        let fragments = match arcs_from_circle_diff(point, radius, bookkeeper.cut_area(), circle_segments) {
            Ok(f) => f,
            Err(_) => Vec::new(),
        };

        if fragments.is_empty() {
            if best.is_none() {
                *last_circle = Some(Arc::new_fragment(point, radius, LineString::new(vec![])));
                return FitOutcome {
                    new_distance: clamped,
                    arcs: Vec::new(),
                    kind: FitOutcomeKind::EmptyFragment,
                    shortfall: None,
                };
            }
            break;
        }

        let progress = measure_progress(&fragments, last_circle.as_ref(), bookkeeper.cut_area(), point);

        let gap = (desired - progress).abs();
        let is_better = match &best {
            None => true,
            Some((_, _, _, prev_progress)) => (desired - progress).abs() < (desired - prev_progress).abs(),
        };
        if is_better {
            best = Some((clamped, fragments.clone(), radius, progress));
        }
        if gap <= desired / 20.0 {
            converged = true;
            distance = clamped;
            break;
        }

        let delta = controller.next_delta(desired, progress);
        distance += delta;
    }

    let (final_distance, fragments, radius, progress) = match best {
        Some(v) => v,
        None => {
            return FitOutcome {
                new_distance: edge_length,
                arcs: Vec::new(),
                kind: FitOutcomeKind::BackwardsDrift,
                shortfall: None,
            }
        }
    };

    if !converged && final_distance < min_dist {
        return FitOutcome {
            new_distance: edge_length,
            arcs: Vec::new(),
            kind: FitOutcomeKind::BackwardsDrift,
            shortfall: None,
        };
    }

    let center = interpolate_at_distance(&extrapolated, EXTRAPOLATION_OFFSET + final_distance)
        .unwrap_or(Point::new(0.0, 0.0));
    bookkeeper.record_circle(center, radius);
    *last_circle = Some(Arc::new_fragment(center, radius, LineString::new(vec![])));

    let kept: Vec<Arc> = fragments
        .into_iter()
        .filter(|f| f.0.len() >= 3)
        .filter(|f| {
            use geo::EuclideanLength;
            f.euclidean_length() > step / 20.0
        })
        .filter(|f| match jitter_zone {
            None => true,
            Some(zone) => !f.0.iter().all(|c| Point::from(*c).euclidean_distance(zone) <= 1e-9),
        })
        .map(|f| Arc::new_fragment(center, radius, f))
        .collect();

    FitOutcome {
        new_distance: final_distance,
        arcs: kept,
        kind: if converged {
            FitOutcomeKind::Converged
        } else {
            FitOutcomeKind::Unconverged
        },
        shortfall: if converged { None } else { Some((progress, desired)) },
    }
}

fn measure_progress(
    fragments: &[LineString<f64>],
    last_circle: Option<&Arc>,
    cut_area: &MultiPolygon<f64>,
    _proposed_origin: Point<f64>,
) -> f64 {
    match last_circle {
        Some(lc) => fragments
            .iter()
            .flat_map(|f| f.0.iter())
            .map(|c| Point::from(*c).euclidean_distance(&lc.origin) - lc.radius)
            .fold(f64::MIN, f64::max),
        None => fragments
            .iter()
            .flat_map(|f| f.0.iter())
            .map(|c| Point::from(*c).euclidean_distance(cut_area))
            .fold(f64::MIN, f64::max),
    }
}
