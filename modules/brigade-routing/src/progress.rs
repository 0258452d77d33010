//! Percentage-based route progress and position interpolation.
//!
//! A unit's displayed position is not raw GPS: it is the point a given
//! percentage along its stored route geometry. All derived quantities in a
//! `RoutePosition` come from the same fraction, so position, remaining
//! distance, and remaining time never disagree within one update.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use brigade_common::{haversine_m, BrigadeError, GeoPoint, Route};

use crate::provider::PlannedRoute;

/// Persistence seam for the single active route per unit. Implemented by
/// the Postgres store; tests use the in-memory variant.
#[async_trait]
pub trait RouteStore: Send + Sync {
    /// Upsert the unit's active route.
    async fn save_route(&self, route: &Route) -> Result<(), BrigadeError>;

    async fn load_route(&self, unit_id: Uuid) -> Result<Option<Route>, BrigadeError>;

    async fn set_progress(&self, unit_id: Uuid, percent: f64) -> Result<(), BrigadeError>;

    async fn delete_route(&self, unit_id: Uuid) -> Result<(), BrigadeError>;
}

/// Interpolated snapshot of a unit's position along its route.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePosition {
    pub position: GeoPoint,
    pub progress_percent: f64,
    pub remaining_meters: f64,
    pub remaining_seconds: f64,
}

pub struct ProgressTracker {
    store: Arc<dyn RouteStore>,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn RouteStore>) -> Self {
        Self { store }
    }

    /// Persist a freshly planned route as the unit's active route, with
    /// progress reset to zero.
    pub async fn save(
        &self,
        unit_id: Uuid,
        intervention_id: Option<Uuid>,
        planned: &PlannedRoute,
    ) -> Result<Route, BrigadeError> {
        let route = Route {
            unit_id,
            intervention_id,
            geometry: planned.geometry.clone(),
            length_meters: planned.length_meters,
            duration_seconds: planned.duration_seconds,
            progress_percent: 0.0,
        };
        self.store.save_route(&route).await?;
        Ok(route)
    }

    /// Clamp, persist, and interpolate. Returns the position derived from
    /// the clamped percentage.
    pub async fn update_progress(
        &self,
        unit_id: Uuid,
        percent: f64,
    ) -> Result<RoutePosition, BrigadeError> {
        let route = self.load_required(unit_id).await?;
        let clamped = percent.clamp(0.0, 100.0);
        self.store.set_progress(unit_id, clamped).await?;
        interpolate(&route, clamped)
    }

    /// Pure read: where would the unit be at `percent`? Stored progress is
    /// left untouched (what-if previews, tests).
    pub async fn position_at(
        &self,
        unit_id: Uuid,
        percent: f64,
    ) -> Result<RoutePosition, BrigadeError> {
        let route = self.load_required(unit_id).await?;
        interpolate(&route, percent.clamp(0.0, 100.0))
    }

    /// Drop the unit's active route. Called on every transition out of the
    /// en-route phase so no stale geometry keeps interpolating.
    pub async fn delete(&self, unit_id: Uuid) -> Result<(), BrigadeError> {
        self.store.delete_route(unit_id).await
    }

    async fn load_required(&self, unit_id: Uuid) -> Result<Route, BrigadeError> {
        self.store
            .load_route(unit_id)
            .await?
            .ok_or_else(|| BrigadeError::NotFound(format!("route for unit {unit_id}")))
    }
}

/// Interpolate a position at `percent` of the route. The fraction walks
/// the polyline by cumulative great-circle arclength, so equal or growing
/// percentages can never move a position backwards along the path.
pub fn interpolate(route: &Route, percent: f64) -> Result<RoutePosition, BrigadeError> {
    let fraction = (percent / 100.0).min(1.0);
    let position = point_at_fraction(&route.geometry, fraction).ok_or_else(|| {
        BrigadeError::Validation(format!("route for unit {} has no geometry", route.unit_id))
    })?;

    Ok(RoutePosition {
        position,
        progress_percent: percent,
        remaining_meters: route.length_meters * (1.0 - fraction),
        remaining_seconds: route.duration_seconds * (1.0 - fraction),
    })
}

fn point_at_fraction(geometry: &[GeoPoint], fraction: f64) -> Option<GeoPoint> {
    let first = *geometry.first()?;
    if geometry.len() == 1 || fraction <= 0.0 {
        return Some(first);
    }
    let last = *geometry.last()?;
    if fraction >= 1.0 {
        return Some(last);
    }

    let total: f64 = geometry
        .windows(2)
        .map(|pair| haversine_m(pair[0], pair[1]))
        .sum();
    if total <= 0.0 {
        return Some(first);
    }

    let target = fraction * total;
    let mut walked = 0.0;

    for pair in geometry.windows(2) {
        let segment = haversine_m(pair[0], pair[1]);
        if segment <= 0.0 {
            continue;
        }
        if walked + segment >= target {
            let t = (target - walked) / segment;
            return Some(GeoPoint::new(
                pair[0].lat + (pair[1].lat - pair[0].lat) * t,
                pair[0].lon + (pair[1].lon - pair[0].lon) * t,
            ));
        }
        walked += segment;
    }

    Some(last)
}
