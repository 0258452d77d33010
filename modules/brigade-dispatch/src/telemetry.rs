//! Out-of-band unit telemetry.
//!
//! Field radios and simulated vehicles both land here. Updates carry a
//! per-unit sequence number; anything at or below the last applied one is
//! dropped without comment, so late packets can never rewind a unit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use brigade_common::{BrigadeError, GeoPoint, UnitStatus};
use brigade_routing::{ProgressTracker, RoutePosition};

use crate::state::apply_transition;
use crate::traits::{DispatchBackend, RouteService};

#[derive(Debug, Clone)]
pub struct TelemetryUpdate {
    pub unit_id: Uuid,
    pub seq: u64,
    pub recorded_at: DateTime<Utc>,
    pub progress_percent: Option<f64>,
    pub location: Option<GeoPoint>,
}

pub struct TelemetryIngestor {
    backend: Arc<dyn DispatchBackend>,
    routes: Arc<dyn RouteService>,
    tracker: Arc<ProgressTracker>,
    last_applied: Mutex<HashMap<Uuid, u64>>,
}

impl TelemetryIngestor {
    pub fn new(
        backend: Arc<dyn DispatchBackend>,
        routes: Arc<dyn RouteService>,
        tracker: Arc<ProgressTracker>,
    ) -> Self {
        Self {
            backend,
            routes,
            tracker,
            last_applied: Mutex::new(HashMap::new()),
        }
    }

    /// Apply one telemetry update. Returns the interpolated position when
    /// the update carried progress, `None` when it was stale or
    /// position-only.
    pub async fn ingest(
        &self,
        update: TelemetryUpdate,
    ) -> Result<Option<RoutePosition>, BrigadeError> {
        if self.is_stale(&update) {
            debug!(unit_id = %update.unit_id, seq = update.seq, "Dropping stale telemetry");
            return Ok(None);
        }

        if let Some(location) = update.location {
            self.backend
                .update_unit_location(update.unit_id, location, update.recorded_at)
                .await?;
        }

        let Some(percent) = update.progress_percent else {
            return Ok(None);
        };

        let position = self.tracker.update_progress(update.unit_id, percent).await?;

        // Reaching the end of the route is the arrival signal.
        if position.progress_percent >= 100.0 {
            let unit = self.backend.unit(update.unit_id).await?;
            if unit.status == UnitStatus::UnderWay {
                apply_transition(&self.backend, &self.routes, &unit, UnitStatus::OnSite, None)
                    .await?;
            }
        }

        Ok(Some(position))
    }

    fn is_stale(&self, update: &TelemetryUpdate) -> bool {
        let mut last = self
            .last_applied
            .lock()
            .expect("telemetry seq map poisoned");
        match last.get(&update.unit_id) {
            Some(&applied) if update.seq <= applied => true,
            _ => {
                last.insert(update.unit_id, update.seq);
                false
            }
        }
    }
}
