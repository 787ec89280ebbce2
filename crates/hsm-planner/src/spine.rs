//! Medial-graph traversal: concatenates adjacent, unvisited edges into
//! one combined line string the arc fitter sweeps along.

use std::collections::{BTreeMap, HashSet};

use geo::{Coord, LineString};
use hsm_core::dedupe_consecutive_points;
use hsm_voronoi::{snap_key, EdgeId, VertexKey, VoronoiCenters};

fn edge_length(coords: &LineString<f64>) -> f64 {
    use geo::EuclideanLength;
    coords.euclidean_length()
}

/// Greedily walks the medial graph starting at `start_vertex`, marking
/// each traversed edge visited exactly once, and returns the
/// concatenated path. Branch selection is breadth-first (shortest
/// branch) or depth-first (longest branch) per `breadth_first`.
///
/// Every edge incident to a vertex visited along the way, other than
/// the one chosen to continue on, is recorded into `open_paths` keyed
/// by the vertex it was seen from — the driver consumes these later via
/// `choose_next_path`.
pub fn join_branches(
    voronoi: &VoronoiCenters,
    visited_edges: &mut HashSet<EdgeId>,
    open_paths: &mut BTreeMap<EdgeId, VertexKey>,
    start_vertex: VertexKey,
    breadth_first: bool,
) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = Vec::new();
    let mut current_vertex = start_vertex;

    loop {
        let candidates: Vec<EdgeId> = voronoi
            .vertex_to_edges()
            .get(&current_vertex)
            .into_iter()
            .flatten()
            .copied()
            .filter(|id| !visited_edges.contains(id))
            .collect();

        if candidates.is_empty() {
            break;
        }

        for &c in &candidates {
            open_paths.entry(c).or_insert(current_vertex);
        }

        let chosen = *candidates
            .iter()
            .map(|id| (id, voronoi.edges().get(id).map(edge_length).unwrap_or(0.0)))
            .reduce(|best, cand| {
                let better = if breadth_first {
                    cand.1 < best.1
                } else {
                    cand.1 > best.1
                };
                if better {
                    cand
                } else {
                    best
                }
            })
            .map(|(id, _)| id)
            .expect("candidates is non-empty");

        visited_edges.insert(chosen);
        open_paths.remove(&chosen);

        let edge_line = voronoi
            .edges()
            .get(&chosen)
            .expect("chosen edge exists in the graph")
            .clone();

        let first_key = snap_key(*edge_line.0.first().unwrap());
        let oriented: Vec<Coord<f64>> = if first_key == current_vertex {
            edge_line.0.clone()
        } else {
            edge_line.0.iter().rev().copied().collect()
        };

        let next_vertex = snap_key(*oriented.last().unwrap());

        if coords.is_empty() {
            coords.extend(oriented);
        } else {
            coords.extend(oriented.into_iter().skip(1));
        }

        current_vertex = next_vertex;
    }

    dedupe_consecutive_points(&LineString::new(coords), 1e-9)
}
