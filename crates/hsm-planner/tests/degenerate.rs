//! A pocket whose widest inscribed circle is narrower than half the
//! requested step-over must still terminate and emit the starting
//! circle, never panic or hang.

use geo::{Coord, LineString, Polygon};
use hsm_core::PathElement;
use hsm_planner::{Planner, PlannerConfig, WindingMode};

fn sliver() -> Polygon<f64> {
    // 4x0.3 rectangle: widest inscribed circle has radius 0.15.
    Polygon::new(
        LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 4.0, y: 0.0 },
            Coord { x: 4.0, y: 0.3 },
            Coord { x: 0.0, y: 0.3 },
            Coord { x: 0.0, y: 0.0 },
        ]),
        vec![],
    )
}

#[test]
fn terminates_and_emits_starting_circle() {
    // step=1.0 puts step/2 = 0.5 well above the 0.15 widest-gap radius.
    let planner = Planner::inside_pocket(sliver(), 1.0, WindingMode::Cw, PlannerConfig::default())
        .expect("a narrow sliver is still a valid, if degenerate, pocket");

    let arc_count = planner
        .path()
        .iter()
        .filter(|e| matches!(e, PathElement::Arc(_)))
        .count();
    assert!(arc_count >= 1, "the starting circle must be emitted even when it can't step over");
}
