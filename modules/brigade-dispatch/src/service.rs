//! `RouteService` over the planner + tracker pair.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use brigade_common::{BrigadeError, GeoPoint};
use brigade_routing::{ProgressTracker, RouteError, RoutePlanner};
use brigade_store::Store;

use crate::traits::RouteService;

pub struct PlannerRouteService {
    planner: Arc<RoutePlanner>,
    tracker: Arc<ProgressTracker>,
}

impl PlannerRouteService {
    pub fn new(planner: Arc<RoutePlanner>, tracker: Arc<ProgressTracker>) -> Self {
        Self { planner, tracker }
    }

    /// Route repair: re-plan past the cache and overwrite the stored
    /// route. Used when an earlier plan came back unavailable.
    pub async fn repair(
        &self,
        unit_id: Uuid,
        origin: GeoPoint,
        destination: GeoPoint,
        intervention_id: Uuid,
    ) -> Result<(), BrigadeError> {
        let planned = self
            .planner
            .plan_fresh(origin, destination)
            .await
            .map_err(map_route_error)?;
        self.tracker
            .save(unit_id, Some(intervention_id), &planned)
            .await?;
        info!(unit_id = %unit_id, "Route repaired");
        Ok(())
    }
}

#[async_trait]
impl RouteService for PlannerRouteService {
    async fn plan_and_save(
        &self,
        unit_id: Uuid,
        origin: GeoPoint,
        destination: GeoPoint,
        intervention_id: Uuid,
    ) -> Result<(), BrigadeError> {
        let planned = self
            .planner
            .plan(origin, destination)
            .await
            .map_err(map_route_error)?;
        self.tracker
            .save(unit_id, Some(intervention_id), &planned)
            .await?;
        info!(
            unit_id = %unit_id,
            length_m = planned.length_meters,
            duration_s = planned.duration_seconds,
            "Route planned and saved"
        );
        Ok(())
    }

    async fn drop_route(&self, unit_id: Uuid) -> Result<(), BrigadeError> {
        self.tracker.delete(unit_id).await
    }
}

fn map_route_error(e: RouteError) -> BrigadeError {
    match e {
        RouteError::Unavailable => BrigadeError::RouteUnavailable,
        RouteError::Provider(msg) => {
            warn!(error = msg.as_str(), "Routing provider misbehaved");
            BrigadeError::RouteUnavailable
        }
    }
}

/// Spawn the route-repair sweep: every `interval`, re-plan routes for
/// units that are under way without stored geometry. The retry lives
/// here, on a timer, never in a tight loop inside the failed call.
pub fn spawn_route_repair_loop(
    store: Store,
    service: Arc<PlannerRouteService>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    info!(interval_secs = interval.as_secs(), "Route repair loop started");

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            let jobs = match store.route_repair_jobs().await {
                Ok(jobs) => jobs,
                Err(e) => {
                    warn!(error = %e, "Failed to scan for missing routes");
                    continue;
                }
            };

            for job in jobs {
                match service
                    .repair(job.unit_id, job.origin, job.destination, job.intervention_id)
                    .await
                {
                    Ok(()) => {}
                    Err(BrigadeError::RouteUnavailable) => {
                        debug!(unit_id = %job.unit_id, "Route still unavailable, will retry");
                    }
                    Err(e) => {
                        warn!(unit_id = %job.unit_id, error = %e, "Route repair failed");
                    }
                }
            }
        }
    })
}
