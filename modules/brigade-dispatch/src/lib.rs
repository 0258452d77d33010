pub mod dispatcher;
pub mod persist;
pub mod scorer;
pub mod service;
pub mod state;
pub mod telemetry;
pub mod traits;
pub mod trigger;

pub use dispatcher::{DispatchOutcome, DispatchedUnit, Dispatcher};
pub use scorer::score;
pub use service::{spawn_route_repair_loop, PlannerRouteService};
pub use state::{apply_transition, plan_transition, RouteTarget, TransitionEffect};
pub use telemetry::{TelemetryIngestor, TelemetryUpdate};
pub use traits::{CandidateSource, DispatchBackend, DispatchCommit, RouteService};
pub use trigger::{spawn_dispatch_loop, IncidentFeed, StoreFeed};
