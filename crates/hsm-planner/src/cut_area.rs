//! Tracks the two evolving "already cut" polygons the fitter and joiner
//! each need: `cut_area` (union of every proposed circle, regardless of
//! whether it was ultimately emitted) and `cut_area_swept` (union of
//! emitted arc paths buffered by `step/2`). Both grow monotonically and
//! are never shrunk.

use geo::{LineString, MultiPolygon, Point, Polygon};
use hsm_core::{buffer_linestring, buffer_multipolygon, create_circle, validated_union};

#[derive(Debug, Clone)]
pub struct CutAreaBookkeeper {
    cut_area: MultiPolygon<f64>,
    cut_area_swept: MultiPolygon<f64>,
    circle_segments: usize,
}

impl CutAreaBookkeeper {
    pub fn new(circle_segments: usize) -> Self {
        CutAreaBookkeeper {
            cut_area: MultiPolygon(Vec::new()),
            cut_area_swept: MultiPolygon(Vec::new()),
            circle_segments,
        }
    }

    pub fn seed_with_circle(&mut self, origin: Point<f64>, radius: f64, step: f64) {
        let ring = create_circle(origin, radius, self.circle_segments);
        let poly = MultiPolygon(vec![Polygon::new(ring, vec![])]);
        self.cut_area = validated_union(&self.cut_area, &poly);
        let swept_poly = validated_union(&poly, &buffer_multipolygon(&poly, step / 2.0));
        self.cut_area_swept = validated_union(&self.cut_area_swept, &swept_poly);
    }

    /// Unions a newly proposed circle into `cut_area`. §7's numerical-
    /// robustness rule requires an `is_valid` check precede every union
    /// feeding an accumulating cut-area polygon; `validated_union` does
    /// that on both operands.
    pub fn record_circle(&mut self, origin: Point<f64>, radius: f64) {
        let ring = create_circle(origin, radius, self.circle_segments);
        let poly = MultiPolygon(vec![Polygon::new(ring, vec![])]);
        self.cut_area = validated_union(&self.cut_area, &poly);
    }

    /// Unions an emitted arc's swept path (buffered by `step/2`) into
    /// `cut_area_swept`.
    pub fn record_swept_arc(&mut self, arc_path: &LineString<f64>, step: f64) {
        let buffered = buffer_linestring(arc_path, step / 2.0, self.circle_segments);
        self.cut_area_swept = validated_union(&self.cut_area_swept, &buffered);
    }

    pub fn cut_area(&self) -> &MultiPolygon<f64> {
        &self.cut_area
    }

    pub fn cut_area_swept(&self) -> &MultiPolygon<f64> {
        &self.cut_area_swept
    }

    pub fn set_cut_area(&mut self, area: MultiPolygon<f64>) {
        self.cut_area = area;
    }

    pub fn set_cut_area_swept(&mut self, area: MultiPolygon<f64>) {
        self.cut_area_swept = area;
    }
}
