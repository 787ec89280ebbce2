//! The planner's one fatal error kind. Everything else the design talks
//! about (stuck edges, unconverged arcs, empty fragments, backwards
//! drift) is a non-fatal, internal control-flow outcome folded into
//! `PlanDiagnostics` rather than unwound as a `Result::Err` — see
//! `crate::planner::PlanDiagnostics`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlannerError {
    /// The pocket polygon (or an obstacle/material polygon, in the
    /// outside-pocket constructors) was rejected at construction time.
    #[error("invalid pocket geometry: {0}")]
    InvalidGeometry(#[from] hsm_core::GeometryError),

    /// The medial-axis graph for the (possibly obstacle-clipped) working
    /// polygon came back with no vertices at all — there is nowhere to
    /// seed a spine walk.
    #[error("medial-axis graph is empty; pocket has no interior spine")]
    EmptyMedialGraph,
}

pub type PlannerResult<T> = Result<T, PlannerError>;
