//! # hsm-voronoi
//!
//! Medial-axis adapter: wraps a polygon's segment Voronoi diagram
//! (computed by `boostvoronoi`) with the filtering and curved-edge
//! discretization needed to expose it as the graph `hsm-planner`
//! traverses.

mod adapter;
mod build;

pub use adapter::{snap_key, EdgeId, VertexKey, VoronoiCenters, SNAP_SCALE};
