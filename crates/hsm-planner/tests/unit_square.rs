//! A unit square clears almost entirely from a single widest-gap seed.

use geo::{Area, BooleanOps, Coord, LineString, Polygon};
use hsm_core::PathElement;
use hsm_planner::{Planner, PlannerConfig, WindingMode};

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
fn clears_unit_square_from_centroid_seed() {
    let planner =
        Planner::inside_pocket(unit_square(), 0.25, WindingMode::Cw, PlannerConfig::default())
            .expect("unit square is a valid pocket");

    let first_arc = planner
        .path()
        .iter()
        .find_map(|e| match e {
            PathElement::Arc(a) => Some(a),
            _ => None,
        })
        .expect("at least one arc is emitted");

    assert!((first_arc.origin.x() - 0.5).abs() < 1e-2);
    assert!((first_arc.origin.y() - 0.5).abs() < 1e-2);
    assert!((first_arc.radius - 0.5).abs() < 1e-2);

    for element in planner.path() {
        let coords = match element {
            PathElement::Arc(a) => &a.path.0,
            PathElement::Line(l) => &l.path.0,
        };
        for c in coords {
            assert!(c.x >= -1e-6 && c.x <= 1.0 + 1e-6, "x out of bounds: {}", c.x);
            assert!(c.y >= -1e-6 && c.y <= 1.0 + 1e-6, "y out of bounds: {}", c.y);
        }
    }

    let covered = planner
        .covered_area()
        .intersection(planner.polygon_to_cut())
        .unsigned_area();
    assert!(covered >= 0.99, "covered area {covered} should clear ~all of the unit square");
}
