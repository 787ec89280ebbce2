//! Arc completion (start/end/angles/winding) and the connector between
//! consecutive arcs, classified as a cut, a rapid traverse inside the
//! pocket, or a rapid traverse outside it.

use std::f64::consts::{PI, TAU};

use geo::{BooleanOps, EuclideanDistance, LineInterpolatePoint, LineString, MultiPolygon, Point};
use hsm_core::{buffer_multipolygon, clip_linestring_by_polygon, Arc, Line, MoveStyle, Winding};

/// Wraps `a` into `(-PI, PI]`, the principal range used to judge whether
/// a start→mid→end turn runs clockwise or counter-clockwise.
fn wrap_signed(a: f64) -> f64 {
    let mut x = a % TAU;
    if x <= -PI {
        x += TAU;
    } else if x > PI {
        x -= TAU;
    }
    x
}

fn angle_from_origin(origin: Point<f64>, point: Point<f64>) -> f64 {
    let dx = point.x() - origin.x();
    let dy = point.y() - origin.y();
    dx.atan2(dy)
}

/// Fills in `start`/`end`/`start_angle`/`span_angle`/`winding` on a raw
/// fragment (only `origin`/`radius`/`path` populated) produced by the
/// fitter. Reverses `path` if the raw orientation runs the wrong way
/// around for the requested `winding`; ties (the midpoint heuristic
/// lands exactly on the boundary, `ds == 0` or `de == 0`) are treated as
/// a mismatch and trigger the reversal, matching the reference
/// implementation's unconditional swap on tie.
pub fn complete_arc(mut arc: Arc, winding: Winding) -> Arc {
    assert!(arc.path.0.len() >= 2, "arc fragment must have at least 2 coordinates");

    let start_point = Point::from(*arc.path.0.first().unwrap());
    let end_point = Point::from(*arc.path.0.last().unwrap());
    let mid_point = arc
        .path
        .line_interpolate_point(0.5)
        .unwrap_or(Point::from(arc.path.0[arc.path.0.len() / 2]));

    let start_angle = angle_from_origin(arc.origin, start_point);
    let mid_angle = angle_from_origin(arc.origin, mid_point);
    let end_angle = angle_from_origin(arc.origin, end_point);

    let ds = wrap_signed(start_angle - mid_angle);
    let de = wrap_signed(mid_angle - end_angle);

    let matches = match winding {
        Winding::Cw => ds > 0.0 && de > 0.0,
        Winding::Ccw => ds < 0.0 && de < 0.0,
    };

    let (start_point, end_point, start_angle, end_angle) = if matches {
        (start_point, end_point, start_angle, end_angle)
    } else {
        arc.path.0.reverse();
        (end_point, start_point, end_angle, start_angle)
    };

    let raw = (end_angle - start_angle).rem_euclid(TAU);
    let span_angle = match winding {
        Winding::Cw => {
            if raw == 0.0 {
                TAU
            } else {
                raw
            }
        }
        Winding::Ccw => {
            let neg = -(TAU - raw).rem_euclid(TAU);
            if neg == 0.0 {
                -TAU
            } else {
                neg
            }
        }
    };

    let radius = if arc.radius > 0.0 {
        arc.radius
    } else {
        arc.origin.euclidean_distance(&start_point)
    };

    arc.radius = radius;
    arc.start = Some(start_point);
    arc.end = Some(end_point);
    arc.start_angle = Some(start_angle);
    arc.span_angle = Some(span_angle);
    arc.winding = Some(winding);
    arc
}

/// Resolves a `WindingMode::Closest` request against the last *emitted*
/// arc: alternates direction every arc, starting CW.
pub fn next_closest_winding(last_arc: Option<&Arc>) -> Winding {
    match last_arc.and_then(|a| a.winding) {
        Some(w) => w.opposite(),
        None => Winding::Cw,
    }
}

/// Produces the connecting moves from `last_end` to `next_arc.start`,
/// classifying each sub-segment as a cut (re-engaging virgin material),
/// a rapid traverse that stays inside the pocket, or (outside-pocket
/// mode only) a rapid traverse that may leave the pocket entirely.
pub fn join_arcs(
    last_end: Point<f64>,
    next_arc: &Arc,
    pocket_polygon: &MultiPolygon<f64>,
    cut_area_swept: &MultiPolygon<f64>,
    step: f64,
) -> Vec<Line> {
    let next_start = next_arc.start.expect("next_arc must be completed before joining");
    let segment = LineString::new(vec![last_end.into(), next_start.into()]);

    if segment.0[0] == segment.0[1] {
        return Vec::new();
    }

    let inside_zone = buffer_multipolygon(pocket_polygon, step / 20.0);
    let (inside, outside) = clip_linestring_by_polygon(&segment, &inside_zone);

    if !outside.is_empty() {
        return vec![Line {
            start: last_end,
            end: next_start,
            path: segment,
            move_style: MoveStyle::RapidOutside,
        }];
    }
    debug_assert!(!inside.is_empty());

    let channel = hsm_core::buffer_linestring(&segment, step / 2.0, 32);
    let uncut = buffer_multipolygon(
        &buffer_multipolygon(&channel.difference(cut_area_swept), -step / 20.0),
        step / 2.0,
    );

    let (cut_candidates, rapid_candidates) = clip_linestring_by_polygon(&segment, &uncut);

    let near_uncut = buffer_multipolygon(&uncut, -0.01);
    let mut lines: Vec<(LineString<f64>, MoveStyle)> = Vec::new();
    for seg in cut_candidates {
        let mid = seg
            .line_interpolate_point(0.5)
            .unwrap_or_else(|| Point::from(seg.0[0]));
        let covers = near_uncut.0.iter().any(|p| {
            use geo::Contains;
            p.contains(&mid) || p.exterior().contains(&mid)
        });
        lines.push((seg, if covers { MoveStyle::Cut } else { MoveStyle::RapidInside }));
    }
    for seg in rapid_candidates {
        lines.push((seg, MoveStyle::RapidInside));
    }

    lines.sort_by(|a, b| {
        let da = a.0 .0[0].euclidean_distance(&last_end);
        let db = b.0 .0[0].euclidean_distance(&last_end);
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    });

    if lines.is_empty() {
        return vec![Line {
            start: last_end,
            end: next_start,
            path: segment,
            move_style: MoveStyle::RapidInside,
        }];
    }

    let n = lines.len();
    let mut out = Vec::with_capacity(n);
    for (i, (mut path, style)) in lines.into_iter().enumerate() {
        if i == 0 {
            *path.0.first_mut().unwrap() = last_end.into();
        }
        if i == n - 1 {
            *path.0.last_mut().unwrap() = next_start.into();
        }
        let start = Point::from(*path.0.first().unwrap());
        let end = Point::from(*path.0.last().unwrap());
        out.push(Line { start, end, path, move_style: style });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;

    fn quarter_arc_ccw_coords() -> LineString<f64> {
        // path running CCW: (1,0) -> (0.707,0.707) -> (0,1) around origin (0,0)
        LineString::new(vec![
            Coord { x: 1.0, y: 0.0 },
            Coord { x: std::f64::consts::FRAC_1_SQRT_2, y: std::f64::consts::FRAC_1_SQRT_2 },
            Coord { x: 0.0, y: 1.0 },
        ])
    }

    #[test]
    fn complete_arc_sets_cw_span_positive() {
        let raw = Arc::new_fragment(Point::new(0.0, 0.0), 1.0, quarter_arc_ccw_coords());
        let completed = complete_arc(raw, Winding::Cw);
        assert_eq!(completed.winding, Some(Winding::Cw));
        assert!(completed.span_angle.unwrap() > 0.0);
    }

    #[test]
    fn complete_arc_sets_ccw_span_negative() {
        let raw = Arc::new_fragment(Point::new(0.0, 0.0), 1.0, quarter_arc_ccw_coords());
        let completed = complete_arc(raw, Winding::Ccw);
        assert_eq!(completed.winding, Some(Winding::Ccw));
        assert!(completed.span_angle.unwrap() < 0.0);
    }

    #[test]
    fn complete_arc_is_idempotent() {
        let raw = Arc::new_fragment(Point::new(0.0, 0.0), 1.0, quarter_arc_ccw_coords());
        let once = complete_arc(raw, Winding::Cw);
        let twice = complete_arc(once.clone(), Winding::Cw);
        assert_eq!(once.span_angle, twice.span_angle);
        assert_eq!(once.start, twice.start);
        assert_eq!(once.end, twice.end);
    }

    #[test]
    fn closest_winding_alternates_and_starts_cw() {
        assert_eq!(next_closest_winding(None), Winding::Cw);
        let mut last = Arc::new_fragment(Point::new(0.0, 0.0), 1.0, quarter_arc_ccw_coords());
        last.winding = Some(Winding::Cw);
        assert_eq!(next_closest_winding(Some(&last)), Winding::Ccw);
    }
}
