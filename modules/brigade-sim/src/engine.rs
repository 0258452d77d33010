//! Simulated vehicle movement.
//!
//! Every tick, each tracked vehicle advances its route progress by
//! elapsed-time over estimated-duration and reports the result as
//! telemetry, exactly like a field unit would. Arrival and release then
//! flow through the same state machine as live operations.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use brigade_common::{AssignmentStatus, BrigadeError, UnitStatus};
use brigade_dispatch::{TelemetryIngestor, TelemetryUpdate};
use brigade_routing::RouteStore;
use brigade_store::Store;

struct SimVehicle {
    assignment_id: Uuid,
    intervention_id: Option<Uuid>,
    duration_seconds: f64,
    progress_percent: f64,
    seq: u64,
    arrived_at: Option<Instant>,
}

impl SimVehicle {
    /// Progress gained over `delta`: share of the estimated duration, as
    /// a percentage. No duration means instant arrival.
    fn progress_increment(&self, delta: Duration) -> f64 {
        if self.duration_seconds <= 0.0 {
            return 100.0;
        }
        delta.as_secs_f64() / self.duration_seconds * 100.0
    }
}

pub struct SimEngine {
    store: Store,
    ingestor: TelemetryIngestor,
    tick: Duration,
    dwell: Duration,
    vehicles: Mutex<HashMap<Uuid, SimVehicle>>,
}

impl SimEngine {
    pub fn new(store: Store, ingestor: TelemetryIngestor, tick: Duration, dwell: Duration) -> Self {
        Self {
            store,
            ingestor,
            tick,
            dwell,
            vehicles: Mutex::new(HashMap::new()),
        }
    }

    /// One simulation step: pick up newly dispatched units, advance every
    /// moving vehicle, release crews that finished their on-site dwell.
    pub async fn tick(&self) -> Result<(), BrigadeError> {
        self.adopt_dispatched_units().await?;
        self.advance_vehicles().await?;
        self.release_finished_crews().await?;
        Ok(())
    }

    /// Track units the dispatcher has sent under way since the last tick.
    async fn adopt_dispatched_units(&self) -> Result<(), BrigadeError> {
        let units = self.store.list_units().await?;

        for unit in units {
            if unit.status != UnitStatus::UnderWay {
                continue;
            }
            let Some(assignment_id) = unit.current_assignment_id else {
                continue;
            };

            let already_tracked = {
                let vehicles = self.vehicles.lock().expect("sim vehicles poisoned");
                vehicles
                    .get(&unit.id)
                    .is_some_and(|v| v.assignment_id == assignment_id)
            };
            if already_tracked {
                continue;
            }

            // No route yet (provider unavailable at dispatch) — wait for
            // repair; the unit is adopted on a later tick.
            let Some(route) = self.store.load_route(unit.id).await? else {
                continue;
            };

            info!(
                call_sign = unit.call_sign.as_str(),
                duration_s = route.duration_seconds,
                "Simulating vehicle movement"
            );
            self.vehicles.lock().expect("sim vehicles poisoned").insert(
                unit.id,
                SimVehicle {
                    assignment_id,
                    intervention_id: route.intervention_id,
                    duration_seconds: route.duration_seconds,
                    progress_percent: route.progress_percent,
                    seq: 0,
                    arrived_at: None,
                },
            );
        }

        Ok(())
    }

    async fn advance_vehicles(&self) -> Result<(), BrigadeError> {
        let moving: Vec<(Uuid, f64, u64)> = {
            let mut vehicles = self.vehicles.lock().expect("sim vehicles poisoned");
            vehicles
                .iter_mut()
                .filter(|(_, v)| v.arrived_at.is_none())
                .map(|(id, v)| {
                    v.progress_percent =
                        (v.progress_percent + v.progress_increment(self.tick)).min(100.0);
                    v.seq += 1;
                    (*id, v.progress_percent, v.seq)
                })
                .collect()
        };

        for (unit_id, percent, seq) in moving {
            let update = TelemetryUpdate {
                unit_id,
                seq,
                recorded_at: Utc::now(),
                progress_percent: Some(percent),
                location: None,
            };

            let position = match self.ingestor.ingest(update).await {
                Ok(Some(position)) => position,
                Ok(None) => continue,
                Err(BrigadeError::NotFound(_)) => {
                    // Route vanished mid-flight (preemption); the unit will
                    // be re-adopted under its new assignment.
                    self.forget(unit_id);
                    continue;
                }
                Err(e) => {
                    warn!(unit_id = %unit_id, error = %e, "Telemetry ingest failed");
                    continue;
                }
            };

            self.store
                .update_unit_location(unit_id, position.position, Utc::now())
                .await?;
            self.store
                .record_telemetry(unit_id, position.position, Utc::now(), None)
                .await?;

            if position.progress_percent >= 100.0 {
                let mut vehicles = self.vehicles.lock().expect("sim vehicles poisoned");
                if let Some(vehicle) = vehicles.get_mut(&unit_id) {
                    vehicle.arrived_at = Some(Instant::now());
                }
                info!(unit_id = %unit_id, "Simulated vehicle arrived on site");
            }
        }

        Ok(())
    }

    /// After the on-site dwell, release the crew and close out the
    /// intervention when it has no active assignments left.
    async fn release_finished_crews(&self) -> Result<(), BrigadeError> {
        let due: Vec<(Uuid, Uuid, Option<Uuid>)> = {
            let vehicles = self.vehicles.lock().expect("sim vehicles poisoned");
            vehicles
                .iter()
                .filter(|(_, v)| {
                    v.arrived_at
                        .is_some_and(|arrived| arrived.elapsed() >= self.dwell)
                })
                .map(|(id, v)| (*id, v.assignment_id, v.intervention_id))
                .collect()
        };

        for (unit_id, assignment_id, intervention_id) in due {
            match self
                .store
                .release_assignment(assignment_id, AssignmentStatus::Released)
                .await
            {
                Ok(()) => info!(unit_id = %unit_id, "Simulated crew released"),
                Err(BrigadeError::NotFound(_)) => {
                    // Already released elsewhere (preemption race); nothing
                    // left to do for this assignment.
                }
                Err(e) => {
                    warn!(unit_id = %unit_id, error = %e, "Failed to release simulated crew");
                    continue;
                }
            }
            self.forget(unit_id);

            if let Some(intervention_id) = intervention_id {
                self.complete_if_idle(intervention_id).await?;
            }
        }

        Ok(())
    }

    async fn complete_if_idle(&self, intervention_id: Uuid) -> Result<(), BrigadeError> {
        sqlx::query(
            r#"
            UPDATE interventions SET status = 'completed'
            WHERE id = $1
              AND NOT EXISTS (
                  SELECT 1 FROM assignments a
                  WHERE a.intervention_id = interventions.id
                    AND a.status IN ('dispatched', 'arrived')
              )
            "#,
        )
        .bind(intervention_id)
        .execute(self.store.pool())
        .await
        .map_err(|e| BrigadeError::Database(e.to_string()))?;
        Ok(())
    }

    fn forget(&self, unit_id: Uuid) {
        self.vehicles
            .lock()
            .expect("sim vehicles poisoned")
            .remove(&unit_id);
    }
}
