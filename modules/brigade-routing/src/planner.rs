//! Cache-fronted route planning.

use std::sync::Arc;

use tracing::debug;

use brigade_common::GeoPoint;

use crate::cache::RouteCache;
use crate::provider::{PlannedRoute, RouteError, RoutingProvider};

pub struct RoutePlanner {
    provider: Arc<dyn RoutingProvider>,
    cache: Arc<RouteCache>,
}

impl RoutePlanner {
    pub fn new(provider: Arc<dyn RoutingProvider>, cache: Arc<RouteCache>) -> Self {
        Self { provider, cache }
    }

    /// Plan a route, serving from the cache when the rounded coordinate
    /// pair is already known. Cached road conditions may be stale; that is
    /// accepted here and `plan_fresh` exists for callers that care.
    pub async fn plan(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<Arc<PlannedRoute>, RouteError> {
        if let Some(route) = self.cache.get(origin, destination) {
            debug!(length_m = route.length_meters, "Route cache hit");
            return Ok(route);
        }

        let route = self.provider.plan(origin, destination).await?;
        debug!(
            length_m = route.length_meters,
            duration_s = route.duration_seconds,
            "Route cache miss, provider call done"
        );
        Ok(self.cache.insert(origin, destination, route))
    }

    /// Bypass the cache (route repair), then repopulate it with the fresh
    /// result.
    pub async fn plan_fresh(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<Arc<PlannedRoute>, RouteError> {
        let route = self.provider.plan(origin, destination).await?;
        Ok(self.cache.insert(origin, destination, route))
    }
}
