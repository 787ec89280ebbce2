use thiserror::Error;

/// Fatal, construction-time rejection of a pocket definition.
///
/// Every other error kind the planner's design talks about (stuck edges,
/// unconverged arcs, empty fragments, backwards drift) is a non-fatal,
/// internal control-flow outcome recorded into the planner's diagnostic
/// counters rather than unwound as a `Result::Err` — see `hsm-planner`'s
/// `PlanDiagnostics`. `GeometryError` is the only variant a caller is ever
/// required to handle.
#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("polygon has fewer than 3 distinct vertices: {0}")]
    TooFewVertices(String),

    #[error("polygon ring is self-intersecting or otherwise invalid: {0}")]
    InvalidRing(String),

    #[error("polygon is empty")]
    EmptyPolygon,

    #[error("step-over must be positive, got {0}")]
    NonPositiveStep(f64),

    #[error("boolean operation produced no geometry: {0}")]
    EmptyBooleanResult(String),
}

pub type GeometryResult<T> = Result<T, GeometryError>;
