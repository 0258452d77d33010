//! The routing-provider boundary.
//!
//! The actual shortest-path search lives in an external road-graph service.
//! This crate only defines the narrow request/response contract and the
//! machinery built around it (cache, planner, progress interpolation).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use brigade_common::GeoPoint;

/// A computed road route between two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedRoute {
    pub geometry: Vec<GeoPoint>,
    pub length_meters: f64,
    pub duration_seconds: f64,
}

#[derive(Error, Debug)]
pub enum RouteError {
    /// The provider failed, timed out, or found no path. Non-fatal:
    /// callers keep the unit moving and retry later (route repair).
    #[error("No route available")]
    Unavailable,

    #[error("Routing provider error: {0}")]
    Provider(String),
}

/// Computes road routes. Implemented by the HTTP client against the
/// road-graph service; tests use counting/static fakes.
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn plan(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<PlannedRoute, RouteError>;
}
