//! An L-shaped pocket under `WindingMode::Closest` should alternate arc
//! winding across successive emissions and never need to leave the
//! pocket to connect two arcs.

use geo::{Coord, LineString, Polygon};
use hsm_core::{MoveStyle, PathElement, Winding};
use hsm_planner::{Planner, PlannerConfig, WindingMode};

fn l_shape() -> Polygon<f64> {
    Polygon::new(
        LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 10.0, y: 0.0 },
            Coord { x: 10.0, y: 3.0 },
            Coord { x: 3.0, y: 3.0 },
            Coord { x: 3.0, y: 10.0 },
            Coord { x: 0.0, y: 10.0 },
            Coord { x: 0.0, y: 0.0 },
        ]),
        vec![],
    )
}

#[test]
fn alternates_winding_and_joins_stay_inside() {
    let planner =
        Planner::inside_pocket(l_shape(), 0.4, WindingMode::Closest, PlannerConfig::default())
            .expect("the L-shape is a valid pocket");

    let windings: Vec<Winding> = planner
        .path()
        .iter()
        .filter_map(|e| match e {
            PathElement::Arc(a) => a.winding,
            _ => None,
        })
        .collect();
    assert!(windings.len() >= 2, "at least two arcs are needed to observe alternation");

    let alternates = windings.windows(2).any(|w| w[0] != w[1]);
    assert!(alternates, "Closest winding mode should alternate direction across successive arcs");

    for element in planner.path() {
        if let PathElement::Line(l) = element {
            assert_ne!(
                l.move_style,
                MoveStyle::RapidOutside,
                "every join in an inside-pocket plan must stay inside the pocket"
            );
        }
    }
}
