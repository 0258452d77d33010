//! Behavior of the ProgressTracker against an in-memory route store.

use std::sync::Arc;

use uuid::Uuid;

use brigade_common::{BrigadeError, GeoPoint};
use brigade_routing::memory::MemoryRouteStore;
use brigade_routing::{PlannedRoute, ProgressTracker};

fn planned() -> PlannedRoute {
    PlannedRoute {
        geometry: vec![
            GeoPoint::new(47.20, -1.60),
            GeoPoint::new(47.21, -1.58),
            GeoPoint::new(47.22, -1.56),
        ],
        length_meters: 3200.0,
        duration_seconds: 230.0,
    }
}

#[tokio::test]
async fn save_then_position_at_zero_returns_the_origin() {
    let store = Arc::new(MemoryRouteStore::new());
    let tracker = ProgressTracker::new(store.clone());
    let unit = Uuid::new_v4();

    tracker.save(unit, Some(Uuid::new_v4()), &planned()).await.unwrap();
    let pos = tracker.position_at(unit, 0.0).await.unwrap();

    assert!((pos.position.lat - 47.20).abs() < 1e-9);
    assert!((pos.position.lon - (-1.60)).abs() < 1e-9);
    assert_eq!(store.stored_progress(unit), Some(0.0));
}

#[tokio::test]
async fn update_progress_is_idempotent() {
    let tracker = ProgressTracker::new(Arc::new(MemoryRouteStore::new()));
    let unit = Uuid::new_v4();

    tracker.save(unit, None, &planned()).await.unwrap();
    let first = tracker.update_progress(unit, 37.5).await.unwrap();
    let second = tracker.update_progress(unit, 37.5).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn update_progress_clamps_and_persists() {
    let store = Arc::new(MemoryRouteStore::new());
    let tracker = ProgressTracker::new(store.clone());
    let unit = Uuid::new_v4();

    tracker.save(unit, None, &planned()).await.unwrap();

    let over = tracker.update_progress(unit, 150.0).await.unwrap();
    assert_eq!(over.progress_percent, 100.0);
    assert_eq!(over.remaining_meters, 0.0);
    assert_eq!(store.stored_progress(unit), Some(100.0));

    let under = tracker.update_progress(unit, -3.0).await.unwrap();
    assert_eq!(under.progress_percent, 0.0);
    assert_eq!(store.stored_progress(unit), Some(0.0));
}

#[tokio::test]
async fn position_at_does_not_mutate_stored_progress() {
    let store = Arc::new(MemoryRouteStore::new());
    let tracker = ProgressTracker::new(store.clone());
    let unit = Uuid::new_v4();

    tracker.save(unit, None, &planned()).await.unwrap();
    tracker.update_progress(unit, 40.0).await.unwrap();
    tracker.position_at(unit, 90.0).await.unwrap();

    assert_eq!(store.stored_progress(unit), Some(40.0));
}

#[tokio::test]
async fn position_and_remaining_agree_with_each_other() {
    let tracker = ProgressTracker::new(Arc::new(MemoryRouteStore::new()));
    let unit = Uuid::new_v4();
    let route = planned();

    tracker.save(unit, None, &route).await.unwrap();
    let pos = tracker.update_progress(unit, 25.0).await.unwrap();

    assert!((pos.remaining_meters - route.length_meters * 0.75).abs() < 1e-6);
    assert!((pos.remaining_seconds - route.duration_seconds * 0.75).abs() < 1e-6);
}

#[tokio::test]
async fn saving_again_resets_progress() {
    let store = Arc::new(MemoryRouteStore::new());
    let tracker = ProgressTracker::new(store.clone());
    let unit = Uuid::new_v4();

    tracker.save(unit, None, &planned()).await.unwrap();
    tracker.update_progress(unit, 80.0).await.unwrap();
    tracker.save(unit, None, &planned()).await.unwrap();

    assert_eq!(store.stored_progress(unit), Some(0.0));
}

#[tokio::test]
async fn deleted_route_stops_interpolating() {
    let store = Arc::new(MemoryRouteStore::new());
    let tracker = ProgressTracker::new(store.clone());
    let unit = Uuid::new_v4();

    tracker.save(unit, None, &planned()).await.unwrap();
    tracker.delete(unit).await.unwrap();

    assert_eq!(store.route_count(), 0);
    assert!(matches!(
        tracker.update_progress(unit, 10.0).await,
        Err(BrigadeError::NotFound(_))
    ));
}
