//! A square pocket with a circular obstacle hole must never route an arc
//! through the hole's interior.

use geo::{Coord, EuclideanDistance, LineString, Point, Polygon};
use hsm_core::PathElement;
use hsm_planner::{Planner, PlannerConfig, WindingMode};

fn square_with_hole() -> Polygon<f64> {
    let exterior = LineString::new(vec![
        Coord { x: 0.0, y: 0.0 },
        Coord { x: 10.0, y: 0.0 },
        Coord { x: 10.0, y: 10.0 },
        Coord { x: 0.0, y: 10.0 },
        Coord { x: 0.0, y: 0.0 },
    ]);

    let hole_center = Point::new(5.0, 5.0);
    let hole_radius = 1.0;
    let segments = 64;
    let hole: Vec<Coord<f64>> = (0..=segments)
        .map(|i| {
            let theta = 2.0 * std::f64::consts::PI * (i as f64) / (segments as f64);
            Coord {
                x: hole_center.x() + hole_radius * theta.cos(),
                y: hole_center.y() + hole_radius * theta.sin(),
            }
        })
        .collect();

    Polygon::new(exterior, vec![LineString::new(hole)])
}

#[test]
fn never_cuts_through_the_hole() {
    let planner =
        Planner::inside_pocket(square_with_hole(), 0.5, WindingMode::Cw, PlannerConfig::default())
            .expect("square with a circular hole is a valid pocket");

    let hole_center = Point::new(5.0, 5.0);
    let hole_radius = 1.0;

    for element in planner.path() {
        let coords = match element {
            PathElement::Arc(a) => &a.path.0,
            PathElement::Line(l) => &l.path.0,
        };
        for c in coords {
            let d = Point::from(*c).euclidean_distance(&hole_center);
            assert!(
                d >= hole_radius - 1e-6,
                "path point ({}, {}) at distance {d} intrudes into the hole",
                c.x,
                c.y
            );
        }
    }

    assert_eq!(planner.diagnostics().path_fail_count, 0);
}
