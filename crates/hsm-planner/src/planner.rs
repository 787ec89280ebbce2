//! The outer driver loop: selects the next spine section to walk, steps
//! the arc fitter across it, drains the arc-queue scheduler, and joins
//! consecutive arcs into one emitted path. Exposes the `InsidePocket` /
//! `OutsidePocket` / `OutsidePocketSimple` constructors and the
//! cooperative-stepping `PlanGenerator`.

use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};

use geo::{Area, BooleanOps, BoundingRect, Coord, LineString, MultiPolygon, Point, Polygon};
use hsm_core::{
    boundary_rings, buffer_linestring, create_circle, linestring_length, validate_polygon, Arc,
    PathElement, PlannerConfig, Winding, WindingMode,
};
use hsm_voronoi::{snap_key, EdgeId, VertexKey, VoronoiCenters};

use crate::cut_area::CutAreaBookkeeper;
use crate::error::{PlannerError, PlannerResult};
use crate::fitter::{calculate_arc, FitOutcomeKind, ProportionalController};
use crate::joiner::{complete_arc, join_arcs, next_closest_winding};
use crate::queue::ArcQueueScheduler;
use crate::spine::join_branches;

/// Tessellation density for circles and buffered linestrings. Not a
/// spec-tunable (it trades fidelity for boolean-op cost, not cutting
/// behavior), so it stays a module constant rather than a
/// `PlannerConfig` field.
const CIRCLE_SEGMENTS: usize = 64;

/// Read-only progress and failure counters surfaced after (or during) a
/// plan, independent of re-scanning `path`.
#[derive(Debug, Clone, Default)]
pub struct PlanDiagnostics {
    pub loop_count: u64,
    pub arc_fail_count: u64,
    pub path_fail_count: u64,
    pub path_len_progress: f64,
    pub path_len_total: f64,
    /// `(achieved, desired)` step-over of the worst unconverged arc that
    /// overshot its target, across the whole plan.
    pub worst_oversize_arc: Option<(f64, f64)>,
    /// `(achieved, desired)` step-over of the worst unconverged arc that
    /// undershot its target, across the whole plan.
    pub worst_undersize_arc: Option<(f64, f64)>,
}

impl PlanDiagnostics {
    pub fn progress_ratio(&self) -> f32 {
        if self.path_len_total <= 0.0 {
            1.0
        } else {
            (self.path_len_progress / self.path_len_total).clamp(0.0, 1.0) as f32
        }
    }
}

struct EdgeWalk {
    edge: LineString<f64>,
    edge_length: f64,
    dist: f64,
    best_dist: f64,
    stuck_budget: i64,
}

enum DriverPhase {
    NeedVertex,
    OnEdge(EdgeWalk),
    Finished,
}

/// Owns the whole plan: the medial-axis graph, the rolling cut-area
/// polygons, the arc-queue scheduler, and the emitted path. Construct via
/// [`Planner::inside_pocket`], [`Planner::outside_pocket`], or
/// [`Planner::outside_pocket_simple`] (eager), or the `_generator`
/// variants for cooperative stepping (see [`PlanGenerator`]).
pub struct Planner {
    polygon_to_cut: MultiPolygon<f64>,
    voronoi: VoronoiCenters,
    step: f64,
    winding_mode: WindingMode,
    config: PlannerConfig,
    jitter_zone: MultiPolygon<f64>,

    visited_edges: HashSet<EdgeId>,
    open_paths: BTreeMap<EdgeId, VertexKey>,
    cut_area: CutAreaBookkeeper,
    queue: ArcQueueScheduler,
    last_arc: Option<Arc>,
    last_circle: Option<Arc>,
    path: Vec<PathElement>,
    diagnostics: PlanDiagnostics,

    start_vertex: Option<VertexKey>,
    phase: DriverPhase,
}

fn total_spine_length(voronoi: &VoronoiCenters) -> f64 {
    voronoi.edges().values().map(linestring_length).sum()
}

fn build_jitter_zone(polygon_to_cut: &MultiPolygon<f64>, jitter_filter: f64) -> MultiPolygon<f64> {
    let mut zone = MultiPolygon(Vec::new());
    if jitter_filter <= 0.0 {
        return zone;
    }
    for p in &polygon_to_cut.0 {
        for ring in boundary_rings(&MultiPolygon(vec![p.clone()])) {
            zone = zone.union(&buffer_linestring(&ring, jitter_filter, 16));
        }
    }
    zone
}

impl Planner {
    // ---- InsidePocket -----------------------------------------------

    pub fn inside_pocket(
        polygon: Polygon<f64>,
        step: f64,
        winding: WindingMode,
        config: PlannerConfig,
    ) -> PlannerResult<Planner> {
        let mut planner = Self::build_inside_pocket(polygon, step, winding, config, None)?;
        planner.drain();
        Ok(planner)
    }

    pub fn inside_pocket_with_voronoi(
        polygon: Polygon<f64>,
        step: f64,
        winding: WindingMode,
        config: PlannerConfig,
        voronoi: VoronoiCenters,
    ) -> PlannerResult<Planner> {
        let mut planner = Self::build_inside_pocket(polygon, step, winding, config, Some(voronoi))?;
        planner.drain();
        Ok(planner)
    }

    pub fn inside_pocket_generator(
        polygon: Polygon<f64>,
        step: f64,
        winding: WindingMode,
        config: PlannerConfig,
        timeslice: Duration,
    ) -> PlannerResult<PlanGenerator> {
        let planner = Self::build_inside_pocket(polygon, step, winding, config, None)?;
        Ok(PlanGenerator { planner, timeslice })
    }

    fn build_inside_pocket(
        polygon: Polygon<f64>,
        step: f64,
        winding: WindingMode,
        config: PlannerConfig,
        voronoi: Option<VoronoiCenters>,
    ) -> PlannerResult<Planner> {
        if step <= 0.0 {
            return Err(PlannerError::InvalidGeometry(hsm_core::GeometryError::NonPositiveStep(step)));
        }
        validate_polygon(&polygon)?;

        let voronoi = match voronoi {
            Some(v) => v,
            None => VoronoiCenters::new(polygon.clone(), true, true)?,
        };

        let (start_point, start_radius) =
            voronoi.widest_gap().ok_or(PlannerError::EmptyMedialGraph)?;

        let polygon_to_cut = MultiPolygon(vec![polygon]);
        let jitter_zone = build_jitter_zone(&polygon_to_cut, config.jitter_filter);

        let mut cut_area = CutAreaBookkeeper::new(CIRCLE_SEGMENTS);
        cut_area.seed_with_circle(start_point, start_radius, step);

        let path_len_total = total_spine_length(&voronoi) + std::f64::consts::TAU * start_radius;

        let start_vertex = snap_key(Coord { x: start_point.x(), y: start_point.y() });

        let mut planner = Planner {
            polygon_to_cut,
            voronoi,
            step,
            winding_mode: winding,
            config,
            jitter_zone,
            visited_edges: HashSet::new(),
            open_paths: BTreeMap::new(),
            cut_area,
            queue: ArcQueueScheduler::new(step),
            last_arc: None,
            last_circle: None,
            path: Vec::new(),
            diagnostics: PlanDiagnostics {
                path_len_total,
                ..Default::default()
            },
            start_vertex: Some(start_vertex),
            phase: DriverPhase::NeedVertex,
        };

        let starting_ring = create_circle(start_point, start_radius, CIRCLE_SEGMENTS);
        planner.last_circle = Some(Arc::new_fragment(start_point, start_radius, starting_ring.clone()));
        planner.emit_raw_arc(Arc::new_fragment(start_point, start_radius, starting_ring));

        Ok(planner)
    }

    // ---- OutsidePocket -----------------------------------------------

    pub fn outside_pocket(
        obstacles: MultiPolygon<f64>,
        material: Polygon<f64>,
        step: f64,
        winding: WindingMode,
        config: PlannerConfig,
    ) -> PlannerResult<Planner> {
        let mut planner = Self::build_outside_pocket(obstacles, material, step, winding, config)?;
        planner.drain();
        Ok(planner)
    }

    pub fn outside_pocket_generator(
        obstacles: MultiPolygon<f64>,
        material: Polygon<f64>,
        step: f64,
        winding: WindingMode,
        config: PlannerConfig,
        timeslice: Duration,
    ) -> PlannerResult<PlanGenerator> {
        let planner = Self::build_outside_pocket(obstacles, material, step, winding, config)?;
        Ok(PlanGenerator { planner, timeslice })
    }

    pub fn outside_pocket_simple(
        polygon: Polygon<f64>,
        step: f64,
        winding: WindingMode,
        config: PlannerConfig,
    ) -> PlannerResult<Planner> {
        let (obstacles, material) = split_simple(polygon);
        Self::outside_pocket(obstacles, material, step, winding, config)
    }

    pub fn outside_pocket_simple_generator(
        polygon: Polygon<f64>,
        step: f64,
        winding: WindingMode,
        config: PlannerConfig,
        timeslice: Duration,
    ) -> PlannerResult<PlanGenerator> {
        let (obstacles, material) = split_simple(polygon);
        Self::outside_pocket_generator(obstacles, material, step, winding, config, timeslice)
    }

    fn build_outside_pocket(
        obstacles: MultiPolygon<f64>,
        material: Polygon<f64>,
        step: f64,
        winding: WindingMode,
        config: PlannerConfig,
    ) -> PlannerResult<Planner> {
        if step <= 0.0 {
            return Err(PlannerError::InvalidGeometry(hsm_core::GeometryError::NonPositiveStep(step)));
        }
        validate_polygon(&material)?;

        let bbox = BoundingRect::bounding_rect(&material)
            .ok_or_else(|| PlannerError::InvalidGeometry(hsm_core::GeometryError::EmptyPolygon))?;
        let pad = 4.0 * step;
        let outer_ring = LineString::new(vec![
            Coord { x: bbox.min().x - pad, y: bbox.min().y - pad },
            Coord { x: bbox.max().x + pad, y: bbox.min().y - pad },
            Coord { x: bbox.max().x + pad, y: bbox.max().y + pad },
            Coord { x: bbox.min().x - pad, y: bbox.max().y + pad },
            Coord { x: bbox.min().x - pad, y: bbox.min().y - pad },
        ]);
        let outer_box = Polygon::new(outer_ring, vec![]);

        let working_candidates = MultiPolygon(vec![outer_box.clone()]).difference(&obstacles);
        let working_polygon = working_candidates
            .0
            .into_iter()
            .max_by(|a, b| a.unsigned_area().partial_cmp(&b.unsigned_area()).unwrap())
            .ok_or(PlannerError::EmptyMedialGraph)?;

        let polygon_to_cut = MultiPolygon(vec![material.clone()]).difference(&obstacles);
        let jitter_zone = build_jitter_zone(&polygon_to_cut, config.jitter_filter);

        let voronoi = VoronoiCenters::new(working_polygon, true, true)?;
        let seed_point = voronoi
            .vertex_on_perimeter()
            .or_else(|| voronoi.widest_gap().map(|(p, _)| p))
            .ok_or(PlannerError::EmptyMedialGraph)?;

        let mut cut_area = CutAreaBookkeeper::new(CIRCLE_SEGMENTS);
        let initial_cut = MultiPolygon(vec![outer_box]).difference(&MultiPolygon(vec![material]));
        cut_area.set_cut_area(initial_cut.clone());
        cut_area.set_cut_area_swept(initial_cut);

        let path_len_total = total_spine_length(&voronoi);
        let start_vertex = snap_key(Coord { x: seed_point.x(), y: seed_point.y() });

        Ok(Planner {
            polygon_to_cut,
            voronoi,
            step,
            winding_mode: winding,
            config,
            jitter_zone,
            visited_edges: HashSet::new(),
            open_paths: BTreeMap::new(),
            cut_area,
            queue: ArcQueueScheduler::new(step),
            last_arc: None,
            last_circle: None,
            path: Vec::new(),
            diagnostics: PlanDiagnostics {
                path_len_total,
                ..Default::default()
            },
            start_vertex: Some(start_vertex),
            phase: DriverPhase::NeedVertex,
        })
    }

    // ---- accessors -----------------------------------------------

    pub fn path(&self) -> &[PathElement] {
        &self.path
    }

    pub fn into_path(self) -> Vec<PathElement> {
        self.path
    }

    pub fn diagnostics(&self) -> &PlanDiagnostics {
        &self.diagnostics
    }

    pub fn voronoi(&self) -> &VoronoiCenters {
        &self.voronoi
    }

    pub fn polygon_to_cut(&self) -> &MultiPolygon<f64> {
        &self.polygon_to_cut
    }

    /// The rolling union of every emitted arc's swept path, buffered by
    /// `step/2`. Exposes how much of the pocket has actually been
    /// covered, independent of `path_len_progress`'s spine-distance
    /// accounting.
    pub fn covered_area(&self) -> &MultiPolygon<f64> {
        self.cut_area.cut_area_swept()
    }

    fn is_finished(&self) -> bool {
        matches!(self.phase, DriverPhase::Finished) && self.start_vertex.is_none()
    }

    /// Drains the driver loop to completion, as the eager (`generate =
    /// false`) constructors do. Shares `step_once` with `PlanGenerator`
    /// so the two call styles cannot drift apart.
    fn drain(&mut self) {
        while !self.step_once() {}
    }

    /// Picks the next spine section to walk. `open_paths` is a
    /// `BTreeMap` keyed by `EdgeId`, so both the `current == None` case
    /// and ties in the nearest-vertex search below resolve to the
    /// smallest `EdgeId` deterministically rather than to whatever a
    /// `HashMap`'s randomized iteration order happens to yield first.
    fn choose_next_path(&mut self, current: Option<Point<f64>>) -> Option<VertexKey> {
        let visited = &self.visited_edges;
        self.open_paths.retain(|edge_id, _| !visited.contains(edge_id));
        if self.open_paths.is_empty() {
            return None;
        }

        let chosen_edge_id = match current {
            None => *self.open_paths.keys().next().unwrap(),
            Some(cur) => {
                let voronoi = &self.voronoi;
                *self
                    .open_paths
                    .iter()
                    .min_by(|(_, va), (_, vb)| {
                        let pa = voronoi.vertex_point(**va).unwrap_or(cur);
                        let pb = voronoi.vertex_point(**vb).unwrap_or(cur);
                        pa.euclidean_distance_to(cur)
                            .partial_cmp(&pb.euclidean_distance_to(cur))
                            .unwrap()
                    })
                    .map(|(k, _)| k)
                    .unwrap()
            }
        };

        let vertex = self.open_paths.remove(&chosen_edge_id).unwrap();
        self.last_circle = None;
        Some(vertex)
    }

    fn emit_raw_arc(&mut self, raw: Arc) {
        let winding = match self.winding_mode {
            WindingMode::Cw => Winding::Cw,
            WindingMode::Ccw => Winding::Ccw,
            WindingMode::Closest => next_closest_winding(self.last_arc.as_ref()),
        };
        let completed = complete_arc(raw, winding);

        if let Some(last) = self.last_arc.clone() {
            let lines = join_arcs(
                last.end.expect("last_arc is completed"),
                &completed,
                &self.polygon_to_cut,
                self.cut_area.cut_area_swept(),
                self.step,
            );
            for line in lines {
                self.diagnostics.path_len_progress += linestring_length(&line.path);
                self.path.push(PathElement::Line(line));
            }
        }

        self.cut_area.record_swept_arc(&completed.path, self.step);
        self.diagnostics.path_len_progress =
            (self.diagnostics.path_len_progress + linestring_length(&completed.path))
                .min(self.diagnostics.path_len_total.max(self.diagnostics.path_len_progress));
        self.path.push(PathElement::Arc(completed.clone()));
        self.last_arc = Some(completed);
    }

    fn record_unconverged(&mut self, achieved: f64, desired: f64) {
        let gap = achieved - desired;
        if gap >= 0.0 {
            let better = self
                .diagnostics
                .worst_oversize_arc
                .map(|(a, d)| (a - d) < gap)
                .unwrap_or(true);
            if better {
                self.diagnostics.worst_oversize_arc = Some((achieved, desired));
            }
        } else {
            let better = self
                .diagnostics
                .worst_undersize_arc
                .map(|(a, d)| (d - a) < -gap)
                .unwrap_or(true);
            if better {
                self.diagnostics.worst_undersize_arc = Some((achieved, desired));
            }
        }
    }

    /// Runs one unit of driver work (roughly: one `calculate_arc` call,
    /// or one vertex/edge transition) and reports whether the whole plan
    /// is finished. The timeslice/progress-yield bookkeeping lives in
    /// `PlanGenerator`, which calls this in a loop.
    fn step_once(&mut self) -> bool {
        self.diagnostics.loop_count += 1;
        match std::mem::replace(&mut self.phase, DriverPhase::Finished) {
            DriverPhase::Finished => true,
            DriverPhase::NeedVertex => match self.start_vertex {
                None => true,
                Some(v) => {
                    let edge = join_branches(
                        &self.voronoi,
                        &mut self.visited_edges,
                        &mut self.open_paths,
                        v,
                        self.config.breadth_first,
                    );
                    if edge.0.len() < 2 {
                        self.start_vertex = self.choose_next_path(None);
                        self.phase = DriverPhase::NeedVertex;
                    } else {
                        let edge_length = linestring_length(&edge);
                        let stuck_budget = ((edge_length * 10.0 / self.step) + 10.0) as i64;
                        self.phase = DriverPhase::OnEdge(EdgeWalk {
                            edge,
                            edge_length,
                            dist: 0.0,
                            best_dist: 0.0,
                            stuck_budget,
                        });
                    }
                    false
                }
            },
            DriverPhase::OnEdge(mut walk) => {
                let at_end = (walk.dist - walk.edge_length).abs() <= self.step / 20.0;
                if at_end || walk.stuck_budget <= 0 {
                    if !at_end && walk.stuck_budget <= 0 {
                        self.diagnostics.path_fail_count += 1;
                        tracing::warn!(
                            dist = walk.dist,
                            edge_length = walk.edge_length,
                            "spine edge exhausted its stuck budget before converging"
                        );
                    }
                    let last_coord = *walk.edge.0.last().unwrap();
                    let drained = self.queue.flush();
                    for arc in drained {
                        self.emit_raw_arc(arc);
                    }
                    self.start_vertex = self.choose_next_path(Some(Point::from(last_coord)));
                    self.phase = DriverPhase::NeedVertex;
                    false
                } else {
                    walk.stuck_budget -= 1;

                    let voronoi = &self.voronoi;
                    let radius_at = |p: Point<f64>| voronoi.distance_from_geom(p);
                    let mut controller = ProportionalController { kp: self.config.kp };

                    let outcome = calculate_arc(
                        &walk.edge,
                        walk.dist,
                        walk.best_dist,
                        walk.edge_length,
                        self.step,
                        &self.config,
                        &mut controller,
                        &mut self.cut_area,
                        &mut self.last_circle,
                        &radius_at,
                        Some(&self.jitter_zone),
                        CIRCLE_SEGMENTS,
                    );

                    match outcome.kind {
                        FitOutcomeKind::Unconverged => {
                            self.diagnostics.arc_fail_count += 1;
                            if let Some((achieved, desired)) = outcome.shortfall {
                                tracing::warn!(achieved, desired, "arc fitter did not converge within the iteration budget");
                                self.record_unconverged(achieved, desired);
                            }
                        }
                        FitOutcomeKind::EmptyFragment | FitOutcomeKind::BackwardsDrift => {
                            tracing::debug!(kind = ?outcome.kind, "fitter made no progress at this distance");
                        }
                        FitOutcomeKind::Converged => {}
                    }

                    let mut arcs = outcome.arcs;
                    if outcome.kind == FitOutcomeKind::Unconverged {
                        if let Some((achieved, desired)) = outcome.shortfall {
                            let tag = if achieved >= desired { "red" } else { "orange" };
                            for a in arcs.iter_mut() {
                                a.debug = Some(tag.to_string());
                            }
                        }
                    }

                    if outcome.new_distance < walk.best_dist {
                        walk.stuck_budget /= 2;
                    }
                    walk.best_dist = walk.best_dist.max(outcome.new_distance);
                    walk.dist = outcome.new_distance;

                    let drained = self.queue.queue_arcs(arcs);
                    for arc in drained {
                        self.emit_raw_arc(arc);
                    }

                    self.phase = DriverPhase::OnEdge(walk);
                    false
                }
            }
        }
    }
}

fn split_simple(polygon: Polygon<f64>) -> (MultiPolygon<f64>, Polygon<f64>) {
    let obstacles = MultiPolygon(
        polygon
            .interiors()
            .iter()
            .map(|ring| Polygon::new(ring.clone(), vec![]))
            .collect(),
    );
    let material = Polygon::new(polygon.exterior().clone(), vec![]);
    (obstacles, material)
}

/// A tiny local extension so `choose_next_path`'s nearest-vertex search
/// reads as plain Euclidean distance without importing `geo`'s trait
/// under a name that collides with `hsm_core`'s re-export.
trait PointDistance {
    fn euclidean_distance_to(&self, other: Point<f64>) -> f64;
}

impl PointDistance for Point<f64> {
    fn euclidean_distance_to(&self, other: Point<f64>) -> f64 {
        use geo::EuclideanDistance;
        self.euclidean_distance(&other)
    }
}

/// Cooperative-stepping handle returned by the `_generator` constructors.
/// Each call to `.next()` runs driver work until either `timeslice`
/// elapses (yielding the current progress ratio) or the whole plan
/// completes (yielding `1.0` once, then `None` thereafter). The eager
/// constructors build one of these internally and drain it to
/// exhaustion, so both call styles run through the same `step_once`.
pub struct PlanGenerator {
    planner: Planner,
    timeslice: Duration,
}

impl PlanGenerator {
    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn into_planner(self) -> Planner {
        self.planner
    }
}

impl Iterator for PlanGenerator {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.planner.is_finished() {
            return None;
        }

        let slice_start = Instant::now();
        loop {
            let finished = self.planner.step_once();
            if finished {
                self.planner.diagnostics.path_len_progress = self.planner.diagnostics.path_len_total;
                return Some(1.0);
            }
            if slice_start.elapsed() >= self.timeslice {
                return Some(self.planner.diagnostics.progress_ratio().min(0.999));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hsm_core::MoveStyle;

    fn unit_square() -> Polygon<f64> {
        Polygon::new(
            LineString::new(vec![
                Coord { x: 0.0, y: 0.0 },
                Coord { x: 1.0, y: 0.0 },
                Coord { x: 1.0, y: 1.0 },
                Coord { x: 0.0, y: 1.0 },
                Coord { x: 0.0, y: 0.0 },
            ]),
            vec![],
        )
    }

    #[test]
    fn rejects_non_positive_step() {
        let result = Planner::inside_pocket(unit_square(), 0.0, WindingMode::Cw, PlannerConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn inside_pocket_unit_square_seeds_at_centroid() {
        let planner =
            Planner::inside_pocket(unit_square(), 0.25, WindingMode::Cw, PlannerConfig::default()).unwrap();
        assert!(!planner.path().is_empty());
        let first_arc = planner
            .path()
            .iter()
            .find_map(|e| match e {
                PathElement::Arc(a) => Some(a),
                _ => None,
            })
            .expect("at least one arc emitted");
        assert!((first_arc.origin.x() - 0.5).abs() < 1e-2);
        assert!((first_arc.origin.y() - 0.5).abs() < 1e-2);
        assert!((first_arc.radius - 0.5).abs() < 1e-2);
    }

    #[test]
    fn generator_reaches_terminal_progress_of_one() {
        let mut generator = Planner::inside_pocket_generator(
            unit_square(),
            0.25,
            WindingMode::Cw,
            PlannerConfig::default(),
            Duration::from_micros(1),
        )
        .unwrap();
        let mut last = 0.0f32;
        for ratio in &mut generator {
            assert!(ratio <= 1.0);
            assert!(ratio >= last || ratio == 1.0);
            last = ratio;
        }
        assert_eq!(last, 1.0);
    }

    #[test]
    fn no_rapid_outside_lines_for_inside_pocket() {
        let planner =
            Planner::inside_pocket(unit_square(), 0.2, WindingMode::Closest, PlannerConfig::default()).unwrap();
        for element in planner.path() {
            if let PathElement::Line(line) = element {
                assert_ne!(line.move_style, MoveStyle::RapidOutside);
            }
        }
    }
}
