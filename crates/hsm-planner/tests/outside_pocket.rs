//! Clearing material around a single square obstacle must never route a
//! cutting move through the obstacle, and must leave the obstacle's
//! interior uncut.

use geo::{Contains, Coord, LineString, MultiPolygon, Point, Polygon};
use hsm_core::{MoveStyle, PathElement};
use hsm_planner::{Planner, PlannerConfig, WindingMode};

fn obstacle() -> Polygon<f64> {
    Polygon::new(
        LineString::new(vec![
            Coord { x: 4.0, y: 4.0 },
            Coord { x: 6.0, y: 4.0 },
            Coord { x: 6.0, y: 6.0 },
            Coord { x: 4.0, y: 6.0 },
            Coord { x: 4.0, y: 4.0 },
        ]),
        vec![],
    )
}

fn material() -> Polygon<f64> {
    Polygon::new(
        LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 10.0, y: 0.0 },
            Coord { x: 10.0, y: 10.0 },
            Coord { x: 0.0, y: 10.0 },
            Coord { x: 0.0, y: 0.0 },
        ]),
        vec![],
    )
}

#[test]
fn clears_material_around_a_single_obstacle() {
    let planner = Planner::outside_pocket(
        MultiPolygon(vec![obstacle()]),
        material(),
        1.0,
        WindingMode::Ccw,
        PlannerConfig::default(),
    )
    .expect("a square obstacle inside square material is a valid outside-pocket job");

    let has_rapid_outside = planner.path().iter().any(|e| {
        matches!(e, PathElement::Line(l) if l.move_style == MoveStyle::RapidOutside)
    });
    assert!(has_rapid_outside, "clearing outside a finite obstacle requires leaving the pocket at least once");

    let obstacle_center = Point::new(5.0, 5.0);
    assert!(
        !planner.covered_area().contains(&obstacle_center),
        "the obstacle's interior must remain uncut"
    );
}
