//! A thin rectangle forces corner-zoom to shrink the step-over near both
//! narrow ends, without blowing out the unconverged-arc ratio.

use geo::{Area, BooleanOps, Coord, LineString, Polygon};
use hsm_core::PathElement;
use hsm_planner::{Planner, PlannerConfig, WindingMode};

fn thin_rectangle() -> Polygon<f64> {
    Polygon::new(
        LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 20.0, y: 0.0 },
            Coord { x: 20.0, y: 0.8 },
            Coord { x: 0.0, y: 0.8 },
            Coord { x: 0.0, y: 0.0 },
        ]),
        vec![],
    )
}

#[test]
fn corner_zoom_activates_without_excessive_failure() {
    let planner =
        Planner::inside_pocket(thin_rectangle(), 0.5, WindingMode::Cw, PlannerConfig::default())
            .expect("thin rectangle is a valid pocket");

    let arc_count = planner
        .path()
        .iter()
        .filter(|e| matches!(e, PathElement::Arc(_)))
        .count();
    assert!(arc_count > 0);

    let small_radius_arcs = planner
        .path()
        .iter()
        .filter_map(|e| match e {
            PathElement::Arc(a) => Some(a),
            _ => None,
        })
        .filter(|a| a.radius < 1.0)
        .count();
    assert!(small_radius_arcs > 0, "corner-zoom should shrink at least one arc below radius 1.0");

    let diagnostics = planner.diagnostics();
    assert!(
        (diagnostics.arc_fail_count as f64) <= 0.2 * (arc_count as f64),
        "arc_fail_count {} exceeds 20% of {arc_count} arcs",
        diagnostics.arc_fail_count
    );

    let total_area = thin_rectangle().unsigned_area();
    let covered = planner
        .covered_area()
        .intersection(planner.polygon_to_cut())
        .unsigned_area();
    assert!(
        covered >= 0.95 * total_area,
        "covered area {covered} should clear the rectangle within tolerance at both ends"
    );
}
