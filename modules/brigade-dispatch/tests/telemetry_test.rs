//! Telemetry ingestion: stale-drop ordering and the arrival transition.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use brigade_common::{
    Assignment, AssignmentStatus, BrigadeError, GeoPoint, InterventionBrief, Unit, UnitStatus,
};
use brigade_dispatch::{
    DispatchBackend, DispatchCommit, RouteService, TelemetryIngestor, TelemetryUpdate,
};
use brigade_routing::memory::MemoryRouteStore;
use brigade_routing::{PlannedRoute, ProgressTracker};

// ---------------------------------------------------------------------------
// Minimal backend fake: just enough for the ingestor's paths.
// ---------------------------------------------------------------------------

#[derive(Default)]
struct UnitsBackend {
    units: Mutex<HashMap<Uuid, Unit>>,
    arrived: Mutex<Vec<Uuid>>,
}

impl UnitsBackend {
    fn add_unit(&self, unit: Unit) {
        self.units.lock().unwrap().insert(unit.id, unit);
    }

    fn status_of(&self, id: Uuid) -> UnitStatus {
        self.units.lock().unwrap()[&id].status
    }

    fn arrived_assignments(&self) -> Vec<Uuid> {
        self.arrived.lock().unwrap().clone()
    }
}

#[async_trait]
impl DispatchBackend for UnitsBackend {
    async fn commit_dispatch(&self, _: &DispatchCommit) -> Result<Assignment, BrigadeError> {
        unreachable!("not exercised by telemetry tests")
    }

    async fn release_assignment(
        &self,
        _: Uuid,
        _: AssignmentStatus,
    ) -> Result<(), BrigadeError> {
        unreachable!("not exercised by telemetry tests")
    }

    async fn unit(&self, id: Uuid) -> Result<Unit, BrigadeError> {
        self.units
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| BrigadeError::NotFound(format!("unit {id}")))
    }

    async fn update_unit_status(&self, id: Uuid, status: UnitStatus) -> Result<(), BrigadeError> {
        self.units.lock().unwrap().get_mut(&id).unwrap().status = status;
        Ok(())
    }

    async fn update_unit_location(
        &self,
        id: Uuid,
        location: GeoPoint,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), BrigadeError> {
        let mut units = self.units.lock().unwrap();
        let unit = units.get_mut(&id).unwrap();
        unit.location = location;
        unit.last_contact_at = Some(recorded_at);
        Ok(())
    }

    async fn mark_assignment_arrived(&self, assignment_id: Uuid) -> Result<(), BrigadeError> {
        self.arrived.lock().unwrap().push(assignment_id);
        Ok(())
    }

    async fn stamp_return_since(&self, unit_id: Uuid) -> Result<(), BrigadeError> {
        self.units.lock().unwrap().get_mut(&unit_id).unwrap().return_since = Some(Utc::now());
        Ok(())
    }

    async fn pending_interventions(&self) -> Result<Vec<InterventionBrief>, BrigadeError> {
        Ok(vec![])
    }
}

struct TrackerRouteService {
    tracker: Arc<ProgressTracker>,
}

#[async_trait]
impl RouteService for TrackerRouteService {
    async fn plan_and_save(
        &self,
        _: Uuid,
        _: GeoPoint,
        _: GeoPoint,
        _: Uuid,
    ) -> Result<(), BrigadeError> {
        unreachable!("not exercised by telemetry tests")
    }

    async fn drop_route(&self, unit_id: Uuid) -> Result<(), BrigadeError> {
        self.tracker.delete(unit_id).await
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn en_route_unit() -> Unit {
    Unit {
        id: Uuid::new_v4(),
        call_sign: "A-4".into(),
        unit_type_code: "ambulance".into(),
        home_base: Some("central".into()),
        status: UnitStatus::UnderWay,
        location: GeoPoint::new(47.20, -1.60),
        current_assignment_id: Some(Uuid::new_v4()),
        last_contact_at: None,
        return_since: None,
    }
}

fn planned() -> PlannedRoute {
    PlannedRoute {
        geometry: vec![GeoPoint::new(47.20, -1.60), GeoPoint::new(47.25, -1.50)],
        length_meters: 9500.0,
        duration_seconds: 684.0,
    }
}

fn harness() -> (Arc<UnitsBackend>, Arc<MemoryRouteStore>, TelemetryIngestor) {
    let backend = Arc::new(UnitsBackend::default());
    let route_store = Arc::new(MemoryRouteStore::new());
    let tracker = Arc::new(ProgressTracker::new(route_store.clone()));
    let routes = Arc::new(TrackerRouteService {
        tracker: tracker.clone(),
    });
    let ingestor = TelemetryIngestor::new(backend.clone(), routes, tracker);
    (backend, route_store, ingestor)
}

fn update(unit_id: Uuid, seq: u64, percent: f64) -> TelemetryUpdate {
    TelemetryUpdate {
        unit_id,
        seq,
        recorded_at: Utc::now(),
        progress_percent: Some(percent),
        location: None,
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn progress_updates_interpolate_and_persist() {
    let (backend, route_store, ingestor) = harness();
    let unit = en_route_unit();
    let unit_id = unit.id;
    backend.add_unit(unit);

    let tracker = ProgressTracker::new(route_store.clone());
    tracker.save(unit_id, None, &planned()).await.unwrap();

    let position = ingestor
        .ingest(update(unit_id, 1, 50.0))
        .await
        .unwrap()
        .expect("position for progress update");

    assert_eq!(position.progress_percent, 50.0);
    assert_eq!(route_store.stored_progress(unit_id), Some(50.0));
}

#[tokio::test]
async fn stale_sequence_numbers_are_silently_dropped() {
    let (backend, route_store, ingestor) = harness();
    let unit = en_route_unit();
    let unit_id = unit.id;
    backend.add_unit(unit);

    let tracker = ProgressTracker::new(route_store.clone());
    tracker.save(unit_id, None, &planned()).await.unwrap();

    ingestor.ingest(update(unit_id, 5, 60.0)).await.unwrap();

    // A delayed, older packet arrives after a newer one was applied.
    let dropped = ingestor.ingest(update(unit_id, 3, 20.0)).await.unwrap();
    assert!(dropped.is_none());
    assert_eq!(route_store.stored_progress(unit_id), Some(60.0));

    // Replay of the same seq is also ignored.
    let replayed = ingestor.ingest(update(unit_id, 5, 99.0)).await.unwrap();
    assert!(replayed.is_none());
    assert_eq!(route_store.stored_progress(unit_id), Some(60.0));
}

#[tokio::test]
async fn reaching_the_end_of_the_route_is_an_arrival() {
    let (backend, route_store, ingestor) = harness();
    let unit = en_route_unit();
    let unit_id = unit.id;
    let assignment_id = unit.current_assignment_id.unwrap();
    backend.add_unit(unit);

    let tracker = ProgressTracker::new(route_store.clone());
    tracker.save(unit_id, None, &planned()).await.unwrap();

    ingestor.ingest(update(unit_id, 1, 100.0)).await.unwrap();

    assert_eq!(backend.status_of(unit_id), UnitStatus::OnSite);
    assert_eq!(backend.arrived_assignments(), vec![assignment_id]);
    // The route is gone, so nothing can keep interpolating it.
    assert_eq!(route_store.route_count(), 0);
}

#[tokio::test]
async fn location_only_updates_touch_the_unit_not_the_route() {
    let (backend, route_store, ingestor) = harness();
    let unit = en_route_unit();
    let unit_id = unit.id;
    backend.add_unit(unit);

    let tracker = ProgressTracker::new(route_store.clone());
    tracker.save(unit_id, None, &planned()).await.unwrap();

    let result = ingestor
        .ingest(TelemetryUpdate {
            unit_id,
            seq: 1,
            recorded_at: Utc::now(),
            progress_percent: None,
            location: Some(GeoPoint::new(47.22, -1.57)),
        })
        .await
        .unwrap();

    assert!(result.is_none());
    assert_eq!(route_store.stored_progress(unit_id), Some(0.0));

    let stored = backend.unit(unit_id).await.unwrap();
    assert_eq!(stored.location, GeoPoint::new(47.22, -1.57));
    assert!(stored.last_contact_at.is_some());
}
