//! Path-element value types and the small geometry helpers the consumed
//! `geo` toolkit doesn't expose verbatim: line-vs-polygon clipping,
//! line-string buffering, boundary extraction, line-merge and a
//! pragmatic validity check. Everything downstream (`hsm-voronoi`,
//! `hsm-planner`) calls through this module rather than reaching for
//! `geo`'s primitives directly, so the adapter boundary stays in one
//! place.

use geo::{
    BooleanOps, Coord, EuclideanDistance, EuclideanLength, LineInterpolatePoint, LineString,
    MultiPolygon, Point, Polygon,
};

use crate::error::{GeometryError, GeometryResult};

/// Rotational direction of a completed arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winding {
    Cw,
    Ccw,
}

impl Winding {
    pub fn opposite(self) -> Winding {
        match self {
            Winding::Cw => Winding::Ccw,
            Winding::Ccw => Winding::Cw,
        }
    }
}

/// The winding a caller asks the planner for. `Closest` defers the
/// decision to the joiner: the effective direction alternates relative
/// to the previous arc (CW on the very first arc of a plan), rather than
/// being fixed up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindingMode {
    Cw,
    Ccw,
    Closest,
}

/// Classification of a connecting move between two arcs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStyle {
    /// Traverses material that has not yet been cut.
    Cut,
    /// Safe traverse, but inside the pocket boundary.
    RapidInside,
    /// Traverse outside the pocket boundary (outside-pocket mode only).
    RapidOutside,
}

/// A single cutting arc. `start`/`end`/`start_angle`/`span_angle`/
/// `winding` are `None` until `complete_arc` (in `hsm-planner`) fills
/// them in; the raw fragment geometry in `path` is what the fitter
/// produces directly from a circle/cut-area diff.
#[derive(Debug, Clone)]
pub struct Arc {
    pub origin: Point<f64>,
    pub radius: f64,
    pub start: Option<Point<f64>>,
    pub end: Option<Point<f64>>,
    pub start_angle: Option<f64>,
    pub span_angle: Option<f64>,
    pub winding: Option<Winding>,
    pub path: LineString<f64>,
    pub debug: Option<String>,
}

impl Arc {
    pub fn new_fragment(origin: Point<f64>, radius: f64, path: LineString<f64>) -> Self {
        Arc {
            origin,
            radius,
            start: None,
            end: None,
            start_angle: None,
            span_angle: None,
            winding: None,
            path,
            debug: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.start.is_some() && self.end.is_some() && self.span_angle.is_some()
    }
}

/// A connecting move between two arcs (or the seed of a pocket).
#[derive(Debug, Clone)]
pub struct Line {
    pub start: Point<f64>,
    pub end: Point<f64>,
    pub path: LineString<f64>,
    pub move_style: MoveStyle,
}

/// One element of an emitted toolpath.
#[derive(Debug, Clone)]
pub enum PathElement {
    Arc(Arc),
    Line(Line),
}

/// Collapses consecutive duplicate vertices (within `epsilon`).
pub fn dedupe_consecutive_points(line: &LineString<f64>, epsilon: f64) -> LineString<f64> {
    let mut out: Vec<Coord<f64>> = Vec::with_capacity(line.0.len());
    for &c in line.0.iter() {
        let keep = match out.last() {
            None => true,
            Some(prev) => {
                let dx = prev.x - c.x;
                let dy = prev.y - c.y;
                (dx * dx + dy * dy).sqrt() > epsilon
            }
        };
        if keep {
            out.push(c);
        }
    }
    LineString::new(out)
}

/// Extends `line` by `distance` at both ends, following the direction
/// of the first and last *segments* respectively (not the chord between
/// the endpoints) so short end segments relative to `distance` don't
/// produce a badly conditioned extrapolation.
pub fn extrapolate_line(line: &LineString<f64>, distance: f64) -> LineString<f64> {
    let coords = &line.0;
    if coords.len() < 2 || distance <= 0.0 {
        return line.clone();
    }

    let lead = {
        let a = coords[0];
        let b = coords[1];
        let len = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
        if len <= f64::EPSILON {
            a
        } else {
            let scale = distance / len;
            Coord {
                x: a.x + (a.x - b.x) * scale,
                y: a.y + (a.y - b.y) * scale,
            }
        }
    };

    let last = coords.len() - 1;
    let trail = {
        let a = coords[last];
        let b = coords[last - 1];
        let len = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
        if len <= f64::EPSILON {
            a
        } else {
            let scale = distance / len;
            Coord {
                x: a.x + (a.x - b.x) * scale,
                y: a.y + (a.y - b.y) * scale,
            }
        }
    };

    let mut out = Vec::with_capacity(coords.len() + 2);
    out.push(lead);
    out.extend_from_slice(coords);
    out.push(trail);
    LineString::new(out)
}

/// Builds a full-circle linestring (closed ring) approximated by
/// `segments` vertices, suitable for differencing against a cut area.
pub fn create_circle(origin: Point<f64>, radius: f64, segments: usize) -> LineString<f64> {
    let n = segments.max(16);
    let mut coords = Vec::with_capacity(n + 1);
    for i in 0..=n {
        let theta = 2.0 * std::f64::consts::PI * (i as f64) / (n as f64);
        coords.push(Coord {
            x: origin.x() + radius * theta.cos(),
            y: origin.y() + radius * theta.sin(),
        });
    }
    LineString::new(coords)
}

/// Merges a set of linestrings that share endpoints (within `epsilon`)
/// into as few contiguous polylines as possible. `geo` does not expose
/// a line-merge directly; this is a simple greedy endpoint-chaining
/// pass, adequate for the short fragment lists the fitter and joiner
/// produce.
pub fn linemerge(mut lines: Vec<LineString<f64>>, epsilon: f64) -> Vec<LineString<f64>> {
    let close = |a: Coord<f64>, b: Coord<f64>| -> bool {
        ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt() <= epsilon
    };

    let mut merged: Vec<LineString<f64>> = Vec::new();
    'outer: while let Some(mut current) = lines.pop() {
        loop {
            let mut joined = false;
            for i in 0..lines.len() {
                let candidate = &lines[i];
                let c_first = *candidate.0.first().unwrap();
                let c_last = *candidate.0.last().unwrap();
                let cur_first = *current.0.first().unwrap();
                let cur_last = *current.0.last().unwrap();

                if close(cur_last, c_first) {
                    let mut coords = current.0.clone();
                    coords.extend(candidate.0.iter().skip(1).copied());
                    current = LineString::new(coords);
                    lines.remove(i);
                    joined = true;
                    break;
                } else if close(cur_last, c_last) {
                    let mut coords = current.0.clone();
                    coords.extend(candidate.0.iter().rev().skip(1).copied());
                    current = LineString::new(coords);
                    lines.remove(i);
                    joined = true;
                    break;
                } else if close(cur_first, c_last) {
                    let mut coords = candidate.0.clone();
                    coords.extend(current.0.iter().skip(1).copied());
                    current = LineString::new(coords);
                    lines.remove(i);
                    joined = true;
                    break;
                } else if close(cur_first, c_first) {
                    let mut coords: Vec<Coord<f64>> = candidate.0.iter().rev().copied().collect();
                    coords.extend(current.0.iter().skip(1).copied());
                    current = LineString::new(coords);
                    lines.remove(i);
                    joined = true;
                    break;
                }
            }
            if !joined {
                merged.push(current);
                continue 'outer;
            }
        }
    }
    merged
}

/// Boundary rings of a (multi)polygon as linestrings (exterior + holes
/// of every member polygon).
pub fn boundary_rings(poly: &MultiPolygon<f64>) -> Vec<LineString<f64>> {
    let mut rings = Vec::new();
    for p in poly.0.iter() {
        rings.push(p.exterior().clone());
        for hole in p.interiors() {
            rings.push(hole.clone());
        }
    }
    rings
}

/// Pragmatic validity check: every ring has at least 4 coordinates
/// (closed, ≥3 distinct vertices) and no polygon member is empty.
/// This is not a full OGC simple-feature validity check; it catches the
/// degenerate results boolean ops occasionally produce (collapsed
/// slivers, empty rings) before they're unioned into `cut_area`.
pub fn is_valid(poly: &MultiPolygon<f64>) -> bool {
    poly.0.iter().all(|p| {
        p.exterior().0.len() >= 4
            && p.interiors().iter().all(|r| r.0.len() >= 4 || r.0.is_empty())
    })
}

/// Drops any member polygon that fails `is_valid`'s per-ring check. A
/// no-op clone when `poly` is already fully valid.
fn drop_invalid_members(poly: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    if is_valid(poly) {
        return poly.clone();
    }
    MultiPolygon(
        poly.0
            .iter()
            .filter(|p| {
                p.exterior().0.len() >= 4
                    && p.interiors().iter().all(|r| r.0.len() >= 4 || r.0.is_empty())
            })
            .cloned()
            .collect(),
    )
}

/// Unions `a` and `b`, first running `is_valid` on each operand and
/// dropping any degenerate member it finds (collapsed slivers, empty
/// rings a prior boolean op occasionally produced). §7's numerical-
/// robustness rule requires this check precede every union that feeds
/// an accumulating cut-area polygon, rather than handing raw boolean-op
/// output straight back into the next union.
pub fn validated_union(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    let a = drop_invalid_members(a);
    let b = drop_invalid_members(b);
    a.union(&b)
}

/// Splits `line` against `polygon`, returning the sub-segments that lie
/// inside and the sub-segments that lie outside, in traversal order.
/// `geo`'s `BooleanOps` only operates on areal geometry, so this walks
/// `line` and tests each midpoint against `polygon` via `intersection`
/// with a degenerate buffered point, splitting at sign changes.
pub fn clip_linestring_by_polygon(
    line: &LineString<f64>,
    polygon: &MultiPolygon<f64>,
) -> (Vec<LineString<f64>>, Vec<LineString<f64>>) {
    use geo::Contains;

    let coords = &line.0;
    if coords.len() < 2 {
        return (Vec::new(), Vec::new());
    }

    let mut inside_segments = Vec::new();
    let mut outside_segments = Vec::new();
    let mut current: Vec<Coord<f64>> = vec![coords[0]];
    let mut current_inside = polygon.contains(&Point::from(coords[0]));

    for window in coords.windows(2) {
        let a = window[0];
        let b = window[1];
        let mid = Coord {
            x: (a.x + b.x) / 2.0,
            y: (a.y + b.y) / 2.0,
        };
        let mid_inside = polygon.contains(&Point::from(mid));

        if mid_inside == current_inside {
            current.push(b);
        } else {
            current.push(mid);
            let finished = LineString::new(std::mem::replace(&mut current, vec![mid, b]));
            if current_inside {
                inside_segments.push(finished);
            } else {
                outside_segments.push(finished);
            }
            current_inside = mid_inside;
        }
    }

    if current.len() >= 2 {
        let finished = LineString::new(current);
        if current_inside {
            inside_segments.push(finished);
        } else {
            outside_segments.push(finished);
        }
    }

    (inside_segments, outside_segments)
}

/// Buffers a linestring into a capsule-chain (stadium) polygon: the
/// union of a `distance`-wide rectangle per segment plus a full circle
/// at every vertex, approximating a Minkowski sum with a disc. `geo`
/// buffers areal geometry (via `geo-buffer`) but not bare linestrings.
pub fn buffer_linestring(line: &LineString<f64>, distance: f64, segments: usize) -> MultiPolygon<f64> {
    if line.0.len() < 2 || distance <= 0.0 {
        return MultiPolygon(Vec::new());
    }

    let mut parts: Vec<Polygon<f64>> = Vec::new();
    for window in line.0.windows(2) {
        let a = Point::from(window[0]);
        let b = Point::from(window[1]);
        let dx = b.x() - a.x();
        let dy = b.y() - a.y();
        let len = (dx * dx + dy * dy).sqrt();
        if len <= f64::EPSILON {
            continue;
        }
        let nx = -dy / len * distance;
        let ny = dx / len * distance;
        let ring = LineString::new(vec![
            Coord { x: a.x() + nx, y: a.y() + ny },
            Coord { x: b.x() + nx, y: b.y() + ny },
            Coord { x: b.x() - nx, y: b.y() - ny },
            Coord { x: a.x() - nx, y: a.y() - ny },
            Coord { x: a.x() + nx, y: a.y() + ny },
        ]);
        parts.push(Polygon::new(ring, vec![]));
    }
    for &c in line.0.iter() {
        let ring = create_circle(Point::from(c), distance, segments);
        parts.push(Polygon::new(ring, vec![]));
    }

    let mut out = MultiPolygon(vec![]);
    for p in parts {
        out = out.union(&MultiPolygon(vec![p]));
    }
    out
}

/// Subtracts `cut_area` from the boundary of a full circle at `origin`,
/// returning the uncut fragments as linestrings (merged where they
/// chain end-to-end). Empty when the circle is entirely subsumed.
pub fn arcs_from_circle_diff(
    origin: Point<f64>,
    radius: f64,
    cut_area: &MultiPolygon<f64>,
    segments: usize,
) -> GeometryResult<Vec<LineString<f64>>> {
    let circle_ring = create_circle(origin, radius, segments);
    let circle_poly = MultiPolygon(vec![Polygon::new(circle_ring.clone(), vec![])]);

    if cut_area.0.is_empty() {
        return Ok(vec![circle_ring]);
    }

    let (inside, outside) = clip_linestring_by_polygon(&circle_ring, cut_area);
    let _ = inside;
    let _ = circle_poly;
    Ok(linemerge(outside, radius * 1e-6_f64.max(1e-9)))
}

pub fn linestring_length(line: &LineString<f64>) -> f64 {
    line.euclidean_length()
}

pub fn interpolate_at_distance(line: &LineString<f64>, distance: f64) -> Option<Point<f64>> {
    let len = line.euclidean_length();
    if len <= 0.0 {
        return None;
    }
    line.line_interpolate_point((distance / len).clamp(0.0, 1.0))
}

/// Buffers every member polygon of `poly` by `distance` (positive grows,
/// negative erodes) and unions the results back into one `MultiPolygon`.
/// `geo-buffer` only operates on a single `Polygon` at a time; this is
/// the areal counterpart to `buffer_linestring` above. A zero distance
/// is a no-op copy.
pub fn buffer_multipolygon(poly: &MultiPolygon<f64>, distance: f64) -> MultiPolygon<f64> {
    if distance == 0.0 {
        return poly.clone();
    }
    let mut out = MultiPolygon(Vec::new());
    for p in &poly.0 {
        out = out.union(&geo_buffer::buffer_polygon(p, distance));
    }
    out
}

pub fn validate_polygon(polygon: &Polygon<f64>) -> GeometryResult<()> {
    if polygon.exterior().0.is_empty() {
        return Err(GeometryError::EmptyPolygon);
    }
    let distinct = dedupe_consecutive_points(polygon.exterior(), 1e-9);
    if distinct.0.len() < 4 {
        return Err(GeometryError::TooFewVertices("exterior".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn dedupe_collapses_repeats() {
        let line = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
        ]);
        let out = dedupe_consecutive_points(&line, 1e-9);
        assert_eq!(out.0.len(), 2);
    }

    #[test]
    fn extrapolate_extends_both_ends() {
        let line = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 2.0, y: 0.0 },
        ]);
        let out = extrapolate_line(&line, 10.0);
        assert_eq!(out.0.len(), 5);
        assert_relative_eq!(out.0[0].x, -10.0, epsilon = 1e-9);
        assert_relative_eq!(out.0.last().unwrap().x, 12.0, epsilon = 1e-9);
    }

    #[test]
    fn circle_closes_and_has_correct_radius() {
        let origin = Point::new(1.0, 1.0);
        let circle = create_circle(origin, 2.0, 32);
        assert_eq!(circle.0.first(), circle.0.last());
        for c in circle.0.iter() {
            let d = ((c.x - 1.0).powi(2) + (c.y - 1.0).powi(2)).sqrt();
            assert_relative_eq!(d, 2.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn linemerge_chains_two_segments() {
        let a = LineString::new(vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 }]);
        let b = LineString::new(vec![Coord { x: 1.0, y: 0.0 }, Coord { x: 2.0, y: 0.0 }]);
        let merged = linemerge(vec![a, b], 1e-9);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].0.len(), 3);
    }

    #[test]
    fn clip_linestring_splits_at_polygon_boundary() {
        let square = Polygon::new(
            LineString::new(vec![
                Coord { x: 0.0, y: 0.0 },
                Coord { x: 10.0, y: 0.0 },
                Coord { x: 10.0, y: 10.0 },
                Coord { x: 0.0, y: 10.0 },
                Coord { x: 0.0, y: 0.0 },
            ]),
            vec![],
        );
        let multi = MultiPolygon(vec![square]);
        let line = LineString::new(vec![Coord { x: -5.0, y: 5.0 }, Coord { x: 15.0, y: 5.0 }]);
        let (inside, outside) = clip_linestring_by_polygon(&line, &multi);
        assert_eq!(inside.len(), 1);
        assert_eq!(outside.len(), 2);
    }

    #[test]
    fn validate_polygon_rejects_empty() {
        let empty = Polygon::new(LineString::new(vec![]), vec![]);
        assert!(validate_polygon(&empty).is_err());
    }
}
