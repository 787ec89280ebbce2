//! # hsm-planner
//!
//! The HSM peeling toolpath planner: walks a pocket polygon's medial
//! axis, fits a chain of tangent arcs along each spine section with an
//! iterative proportional controller, schedules the resulting fragments
//! through a FIFO arc queue, and joins consecutive arcs into cut or
//! rapid connector moves.
//!
//! ## Included
//!
//! - **Spine walking** ([`spine`]): concatenates adjacent unvisited
//!   medial-graph edges into one combined line per pass.
//! - **Arc fitting** ([`fitter`]): the proportional-controller loop that
//!   converges a candidate distance along the spine to the desired
//!   step-over.
//! - **Cut-area bookkeeping** ([`cut_area`]): the two monotonically
//!   growing polygons the fitter and joiner each consult.
//! - **Arc-queue scheduling** ([`queue`]): keeps split fragments in
//!   coherent lobes before they're emitted.
//! - **Arc completion and joining** ([`joiner`]): resolves winding,
//!   start/end/span angles, and the connector move between arcs.
//! - **The driver** ([`planner`]): `Planner`, the three pocket
//!   constructors, and the cooperative-stepping `PlanGenerator`.

pub mod cut_area;
pub mod error;
pub mod fitter;
pub mod joiner;
pub mod planner;
pub mod queue;
pub mod spine;

pub use error::{PlannerError, PlannerResult};
pub use hsm_core::{PlannerConfig, WindingMode};
pub use planner::{PlanDiagnostics, PlanGenerator, Planner};
