//! Builds a filtered, discretized medial-axis graph from a polygon's
//! segment Voronoi diagram.
//!
//! The diagram itself is produced by `boostvoronoi` (a Rust port of the
//! Boost.Polygon sweepline construction); this module owns everything
//! downstream of that: converting polygon rings to the integer segment
//! sites the builder wants, discarding the degenerate edges every input
//! vertex contributes (`is_primary() == false`, or primary edges whose
//! midpoint falls outside the polygon), discretizing the curved
//! (point-vs-segment) bisector edges the diagram reports only as
//! endpoints, and de-duplicating twin half-edges into one undirected
//! graph edge.

use std::collections::{BTreeMap, HashSet};

use boostvoronoi as bv;
use geo::{Contains, Coord, LineString, Point, Polygon};

use crate::adapter::{EdgeId, VertexKey, SNAP_SCALE};

/// Integer coordinate scale used to feed `boostvoronoi`, which operates
/// on integer input coordinates. Chosen so a typical mm-scale pocket
/// (tens to low hundreds of units) keeps better than micron resolution.
const INPUT_SCALE: f64 = 1_000.0;

struct Segment {
    start: Coord<f64>,
    end: Coord<f64>,
}

fn ring_segments(ring: &LineString<f64>) -> Vec<Segment> {
    ring.0
        .windows(2)
        .filter(|w| w[0] != w[1])
        .map(|w| Segment { start: w[0], end: w[1] })
        .collect()
}

fn polygon_segments(polygon: &Polygon<f64>) -> Vec<Segment> {
    let mut segs = ring_segments(polygon.exterior());
    for hole in polygon.interiors() {
        segs.extend(ring_segments(hole));
    }
    segs
}

fn to_input_point(c: Coord<f64>) -> bv::Point<i64> {
    bv::Point {
        x: (c.x * INPUT_SCALE).round() as i64,
        y: (c.y * INPUT_SCALE).round() as i64,
    }
}

fn from_input_point(p: bv::Point<i64>) -> Coord<f64> {
    Coord {
        x: p.x as f64 / INPUT_SCALE,
        y: p.y as f64 / INPUT_SCALE,
    }
}

fn vertex_key(c: Coord<f64>) -> VertexKey {
    VertexKey(
        (c.x * SNAP_SCALE).round() as i64,
        (c.y * SNAP_SCALE).round() as i64,
    )
}

/// The discretized, filtered result, ready for `VoronoiCenters` to wrap.
pub struct BuiltGraph {
    pub edges: BTreeMap<EdgeId, LineString<f64>>,
    pub vertex_to_edges: BTreeMap<VertexKey, Vec<EdgeId>>,
    pub vertex_points: BTreeMap<VertexKey, Point<f64>>,
}

/// Distance (in source units) between successive discretization samples
/// on a curved bisector edge, expressed as a fraction of the polygon's
/// bounding-box diagonal so short and long edges get proportionate
/// resolution.
fn curve_sample_step(polygon: &Polygon<f64>) -> f64 {
    let bbox = geo::BoundingRect::bounding_rect(polygon)
        .expect("validated polygon has a bounding rect");
    let diag = ((bbox.width()).powi(2) + (bbox.height()).powi(2)).sqrt();
    (diag * 0.01).max(1e-3)
}

/// Samples a parabolic bisector edge between a point focus and a
/// segment directrix, evaluated at `steps` evenly spaced parameters
/// between the two known endpoints. Uses the standard point-to-segment
/// Voronoi parabola parametrization: for a point on the bisector, its
/// distance to `focus` equals its perpendicular distance to the line
/// through `directrix`.
fn discretize_parabola(
    focus: Coord<f64>,
    directrix_a: Coord<f64>,
    directrix_b: Coord<f64>,
    start: Coord<f64>,
    end: Coord<f64>,
    step: f64,
) -> Vec<Coord<f64>> {
    let dx = directrix_b.x - directrix_a.x;
    let dy = directrix_b.y - directrix_a.y;
    let dlen = (dx * dx + dy * dy).sqrt();
    if dlen <= f64::EPSILON {
        return vec![start, end];
    }
    let nx = -dy / dlen;
    let ny = dx / dlen;

    // Parametrize by arc-length-ish linear interpolation of the x
    // coordinate along the directrix direction between start and end,
    // projecting each sample onto the true parabola by matching
    // distance-to-focus == distance-to-directrix along the local
    // tangent frame (nx, ny).
    let project = |t: f64| -> Coord<f64> {
        let along = Coord {
            x: start.x + (end.x - start.x) * t,
            y: start.y + (end.y - start.y) * t,
        };
        // offset of `along` from the directrix line
        let rel_x = along.x - directrix_a.x;
        let rel_y = along.y - directrix_a.y;
        let perp = rel_x * nx + rel_y * ny;
        let along_dir = rel_x * (dx / dlen) + rel_y * (dy / dlen);
        let base = Coord {
            x: directrix_a.x + along_dir * dx / dlen,
            y: directrix_a.y + along_dir * dy / dlen,
        };
        // distance from focus to the directrix-projected base point
        let fdx = base.x - focus.x;
        let fdy = base.y - focus.y;
        let p = ((fdx * fdx + fdy * fdy) - perp * perp).max(0.0) / (2.0 * perp.abs().max(1e-9));
        Coord {
            x: base.x + nx * p.copysign(perp),
            y: base.y + ny * p.copysign(perp),
        }
    };

    let chord = ((end.x - start.x).powi(2) + (end.y - start.y).powi(2)).sqrt();
    let n = ((chord / step).ceil() as usize).clamp(2, 64);
    let mut out = Vec::with_capacity(n + 1);
    out.push(start);
    for i in 1..n {
        out.push(project(i as f64 / n as f64));
    }
    out.push(end);
    out
}

/// Builds the filtered medial-axis graph of `polygon`.
pub fn build_medial_graph(polygon: &Polygon<f64>) -> BuiltGraph {
    let segments = polygon_segments(polygon);
    let step = curve_sample_step(polygon);

    let input_segments: Vec<bv::Line<i64>> = segments
        .iter()
        .map(|s| bv::Line::new(to_input_point(s.start), to_input_point(s.end)))
        .collect();

    let mut builder = bv::Builder::<i64, f64>::default();
    builder
        .with_segments(input_segments.iter())
        .expect("segment sites derived from a validated polygon are well-formed");
    let diagram = builder.build().expect("diagram construction from validated input");

    let mut edges: BTreeMap<EdgeId, LineString<f64>> = BTreeMap::new();
    let mut vertex_to_edges: BTreeMap<VertexKey, Vec<EdgeId>> = BTreeMap::new();
    let mut vertex_points: BTreeMap<VertexKey, Point<f64>> = BTreeMap::new();
    let mut next_id: EdgeId = 0;

    let mut record_vertex = |c: Coord<f64>| -> VertexKey {
        let key = vertex_key(c);
        vertex_points.entry(key).or_insert_with(|| Point::from(c));
        key
    };

    for edge_id in diagram.edges().iter_ids() {
        let edge = diagram.edge(edge_id);
        if !edge.is_primary() {
            continue;
        }
        let twin_id = diagram.edge_get_twin(edge_id);
        if twin_id.0 < edge_id.0 {
            // keep only one direction of each twin pair
            continue;
        }

        let (v0, v1) = match (edge.vertex0(), diagram.edge_get_vertex1(edge_id)) {
            (Some(v0), Some(v1)) => (v0, v1),
            _ => continue, // infinite ray: outside the bounded pocket, skip
        };
        let v0 = diagram.vertex(v0);
        let v1 = diagram.vertex(v1);
        let start = Coord { x: v0.x(), y: v0.y() };
        let end = Coord { x: v1.x(), y: v1.y() };
        if start == end {
            continue;
        }

        let path = if edge.is_curved() {
            let cell = diagram.edge_get_cell(edge_id);
            let cell = diagram.cell(cell);
            let twin_cell = diagram.edge_get_cell(twin_id);
            let twin_cell = diagram.cell(twin_cell);
            let (point_cell, seg_cell) = if cell.contains_point() {
                (cell, twin_cell)
            } else {
                (twin_cell, cell)
            };
            let focus_idx = point_cell.source_index();
            let seg_idx = seg_cell.source_index();
            let focus = from_input_point(
                input_segments
                    .get(focus_idx)
                    .map(|s| s.start)
                    .unwrap_or(to_input_point(start)),
            );
            if let Some(seg) = input_segments.get(seg_idx) {
                let a = from_input_point(seg.start);
                let b = from_input_point(seg.end);
                discretize_parabola(focus, a, b, start, end, step)
            } else {
                vec![start, end]
            }
        } else {
            vec![start, end]
        };

        let id = next_id;
        next_id += 1;
        let start_key = record_vertex(*path.first().unwrap());
        let end_key = record_vertex(*path.last().unwrap());
        vertex_to_edges.entry(start_key).or_default().push(id);
        vertex_to_edges.entry(end_key).or_default().push(id);
        edges.insert(id, LineString::new(path));
    }

    // Discard edges whose midpoint falls outside the pocket: these are
    // artifact spikes the diagram produces at reflex input vertices,
    // never traversed by a real medial axis.
    let exterior_filtered: BTreeMap<EdgeId, LineString<f64>> = edges
        .into_iter()
        .filter(|(_, ls)| {
            let mid = ls.line_interpolate_point_fallback();
            polygon.contains(&mid) || polygon.exterior().contains(&mid)
        })
        .collect();

    let kept_ids: HashSet<EdgeId> = exterior_filtered.keys().copied().collect();
    let vertex_to_edges: BTreeMap<VertexKey, Vec<EdgeId>> = vertex_to_edges
        .into_iter()
        .map(|(k, v)| (k, v.into_iter().filter(|id| kept_ids.contains(id)).collect()))
        .filter(|(_, v): &(VertexKey, Vec<EdgeId>)| !v.is_empty())
        .collect();

    BuiltGraph {
        edges: exterior_filtered,
        vertex_to_edges,
        vertex_points,
    }
}

trait MidpointFallback {
    fn line_interpolate_point_fallback(&self) -> Point<f64>;
}

impl MidpointFallback for LineString<f64> {
    fn line_interpolate_point_fallback(&self) -> Point<f64> {
        use geo::LineInterpolatePoint;
        self.line_interpolate_point(0.5)
            .unwrap_or_else(|| Point::from(self.0[self.0.len() / 2]))
    }
}
