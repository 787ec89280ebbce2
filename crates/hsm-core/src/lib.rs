//! # hsm-core
//!
//! Shared geometry primitives, error types and tunable configuration for
//! the HSM peeling toolpath planner.
//!
//! ## Included
//!
//! - **Geometry**: `Arc`, `Line`, `PathElement` value types, plus the
//!   small geometry helpers the consumed `geo` toolkit doesn't expose
//!   verbatim (line-vs-polygon clipping, linestring buffering, boundary
//!   extraction, line-merge, a pragmatic validity check).
//! - **Error**: the one fatal, construction-time error kind a caller
//!   must handle.
//! - **Config**: `PlannerConfig`, the runtime-overridable tunables.

pub mod config;
pub mod error;
pub mod geometry;

pub use config::PlannerConfig;
pub use error::{GeometryError, GeometryResult};
pub use geometry::{
    arcs_from_circle_diff, boundary_rings, buffer_linestring, buffer_multipolygon,
    clip_linestring_by_polygon, create_circle, dedupe_consecutive_points, extrapolate_line,
    interpolate_at_distance, is_valid, linemerge, linestring_length, validate_polygon,
    validated_union, Arc, Line, MoveStyle, PathElement, Winding, WindingMode,
};
