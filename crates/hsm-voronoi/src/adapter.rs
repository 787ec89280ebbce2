use std::collections::BTreeMap;

use geo::{BoundingRect, EuclideanDistance, Point, Polygon};
use hsm_core::{GeometryError, GeometryResult};

use crate::build::{build_medial_graph, BuiltGraph};

pub type EdgeId = u32;

/// Integer-snapped coordinate key used to identify graph vertices by
/// position rather than by floating-point identity. Ordered so every
/// vertex collection keyed on it iterates in a fixed, input-independent
/// order: seed and next-vertex selection (`widest_gap`,
/// `vertex_on_perimeter`, `choose_next_path`) must not depend on a
/// particular `HashMap`'s randomized iteration order, or re-running a
/// plan on identical input could emit a different path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexKey(pub i64, pub i64);

/// Canonicalizes a coordinate into the same snapped key scheme the
/// graph builder uses, so callers can map an edge's raw endpoint
/// coordinates back onto `VertexKey`s without re-deriving the scale.
pub fn snap_key(c: geo::Coord<f64>) -> VertexKey {
    VertexKey((c.x * SNAP_SCALE).round() as i64, (c.y * SNAP_SCALE).round() as i64)
}

/// Thin façade over a polygon's filtered, discretized medial-axis graph.
///
/// Owns the raw Voronoi construction and filtering (see `build.rs`);
/// everything this type exposes is what the spine walker and driver
/// consume: vertex/edge adjacency, the widest local clearance, and
/// point-to-boundary distance queries.
pub struct VoronoiCenters {
    polygon: Polygon<f64>,
    edges: BTreeMap<EdgeId, geo::LineString<f64>>,
    vertex_to_edges: BTreeMap<VertexKey, Vec<EdgeId>>,
    vertex_points: BTreeMap<VertexKey, Point<f64>>,
    max_dist: f64,
}

impl VoronoiCenters {
    /// Builds the medial-axis graph of `polygon`. `preserve_widest` and
    /// `preserve_edge` mirror the external service's constructor
    /// signature; this implementation always preserves both (the
    /// filtering pass already keeps every interior primary edge), so
    /// the flags exist for API compatibility with callers that may want
    /// to request a cheaper, partially-filtered build in the future.
    pub fn new(
        polygon: Polygon<f64>,
        _preserve_widest: bool,
        _preserve_edge: bool,
    ) -> GeometryResult<Self> {
        hsm_core::validate_polygon(&polygon)?;

        let bbox = BoundingRect::bounding_rect(&polygon)
            .ok_or_else(|| GeometryError::InvalidRing("no bounding rect".to_string()))?;
        let max_dist = ((bbox.width()).powi(2) + (bbox.height()).powi(2)).sqrt();

        let BuiltGraph {
            edges,
            vertex_to_edges,
            vertex_points,
        } = build_medial_graph(&polygon);

        if edges.is_empty() {
            tracing::warn!("medial-axis graph is empty; pocket may be degenerate");
        }

        Ok(VoronoiCenters {
            polygon,
            edges,
            vertex_to_edges,
            vertex_points,
            max_dist,
        })
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    pub fn edges(&self) -> &BTreeMap<EdgeId, geo::LineString<f64>> {
        &self.edges
    }

    pub fn vertex_to_edges(&self) -> &BTreeMap<VertexKey, Vec<EdgeId>> {
        &self.vertex_to_edges
    }

    pub fn vertex_point(&self, key: VertexKey) -> Option<Point<f64>> {
        self.vertex_points.get(&key).copied()
    }

    pub fn vertices(&self) -> impl Iterator<Item = (VertexKey, Point<f64>)> + '_ {
        self.vertex_points.iter().map(|(k, v)| (*k, *v))
    }

    pub fn max_dist(&self) -> f64 {
        self.max_dist
    }

    /// Distance from `point` to the nearest pocket boundary ring
    /// (exterior or any hole). This is the local clearance radius used
    /// to size the tangent circle at a given spine location.
    pub fn distance_from_geom(&self, point: Point<f64>) -> f64 {
        let mut best = point.euclidean_distance(self.polygon.exterior());
        for hole in self.polygon.interiors() {
            best = best.min(point.euclidean_distance(hole));
        }
        best
    }

    /// The graph vertex with the largest local clearance, and that
    /// clearance radius. Used to seed an inside-pocket plan at the
    /// pocket's widest point. Ties (common on symmetric pockets) resolve
    /// to the smallest `VertexKey`, since `vertex_points` is a
    /// `BTreeMap` and this folds over `.values()` in key order.
    pub fn widest_gap(&self) -> Option<(Point<f64>, f64)> {
        self.vertex_points
            .values()
            .map(|&p| (p, self.distance_from_geom(p)))
            .fold(None, |best: Option<(Point<f64>, f64)>, cand| match best {
                None => Some(cand),
                Some(b) if cand.1 > b.1 => Some(cand),
                Some(b) => Some(b),
            })
    }

    /// A graph vertex lying on (within tolerance of) the pocket
    /// perimeter, used to seed outside-pocket plans. `None` if no
    /// vertex touches the boundary within tolerance, in which case
    /// callers should fall back to `widest_gap()`. Among several
    /// perimeter vertices, the smallest `VertexKey` is returned, again
    /// because `vertex_points` iterates in key order.
    pub fn vertex_on_perimeter(&self) -> Option<Point<f64>> {
        const TOLERANCE: f64 = 1e-3;
        self.vertex_points
            .values()
            .find(|&&p| self.distance_from_geom(p) <= TOLERANCE)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, LineString};

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
    fn rejects_degenerate_polygon() {
        let empty = Polygon::new(LineString::new(vec![]), vec![]);
        assert!(VoronoiCenters::new(empty, true, true).is_err());
    }

    #[test]
    fn builds_graph_for_unit_square() {
        let centers = VoronoiCenters::new(unit_square(), true, true).unwrap();
        assert!(centers.max_dist() > 0.0);
        // a unit square's medial axis has exactly one vertex at its
        // center, with four spokes to the midpoints of each edge.
        if let Some((p, r)) = centers.widest_gap() {
            assert!((p.x() - 0.5).abs() < 1e-2);
            assert!((p.y() - 0.5).abs() < 1e-2);
            assert!((r - 0.5).abs() < 1e-2);
        }
    }

    #[test]
    fn distance_from_geom_matches_inscribed_radius_at_center() {
        let centers = VoronoiCenters::new(unit_square(), true, true).unwrap();
        let d = centers.distance_from_geom(Point::new(0.5, 0.5));
        assert!((d - 0.5).abs() < 1e-9);
    }
}
