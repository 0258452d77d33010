pub mod cache;
pub mod http;
pub mod planner;
pub mod progress;
pub mod provider;

#[cfg(feature = "test-utils")]
pub mod memory;

pub use cache::{RouteCache, RouteKey};
pub use http::HttpRoutingProvider;
pub use planner::RoutePlanner;
pub use progress::{ProgressTracker, RoutePosition, RouteStore};
pub use provider::{PlannedRoute, RouteError, RoutingProvider};
