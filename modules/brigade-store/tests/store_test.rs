//! Integration tests for the Postgres store.
//! Requires a PostGIS-enabled instance. Set DATABASE_TEST_URL or these
//! tests are skipped.

use sqlx::PgPool;
use uuid::Uuid;

use brigade_common::{
    AssignmentStatus, BrigadeError, GeoPoint, Route, UnitStatus, AVERAGE_SPEED_M_PER_S,
};
use brigade_routing::RouteStore;
use brigade_store::Store;

// ---------------------------------------------------------------------------
// Test harness
// ---------------------------------------------------------------------------

const SCHEMA: &[&str] = &[
    "CREATE EXTENSION IF NOT EXISTS postgis",
    r#"
    CREATE TABLE IF NOT EXISTS incidents (
        id UUID PRIMARY KEY,
        severity INT4 NOT NULL,
        recommended_unit_types TEXT[] NOT NULL DEFAULT '{}',
        latitude FLOAT8 NOT NULL,
        longitude FLOAT8 NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS interventions (
        id UUID PRIMARY KEY,
        incident_id UUID NOT NULL REFERENCES incidents(id),
        status TEXT NOT NULL DEFAULT 'created',
        priority INT4 NOT NULL DEFAULT 1,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS units (
        id UUID PRIMARY KEY,
        call_sign TEXT NOT NULL,
        unit_type_code TEXT NOT NULL,
        home_base TEXT,
        status TEXT NOT NULL DEFAULT 'available',
        latitude FLOAT8 NOT NULL,
        longitude FLOAT8 NOT NULL,
        current_assignment_id UUID,
        last_contact_at TIMESTAMPTZ,
        return_since TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS assignments (
        id UUID PRIMARY KEY,
        intervention_id UUID NOT NULL REFERENCES interventions(id),
        unit_id UUID NOT NULL REFERENCES units(id),
        status TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'lead',
        dispatched_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        arrived_at TIMESTAMPTZ,
        released_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS unit_routes (
        unit_id UUID PRIMARY KEY REFERENCES units(id),
        intervention_id UUID,
        geometry JSONB NOT NULL,
        length_meters FLOAT8 NOT NULL,
        duration_seconds FLOAT8 NOT NULL,
        progress_percent FLOAT8 NOT NULL DEFAULT 0,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS dispatch_config (
        key TEXT PRIMARY KEY,
        value FLOAT8 NOT NULL,
        min_value FLOAT8,
        max_value FLOAT8,
        description TEXT,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS unit_telemetry (
        id BIGSERIAL PRIMARY KEY,
        unit_id UUID NOT NULL REFERENCES units(id),
        latitude FLOAT8 NOT NULL,
        longitude FLOAT8 NOT NULL,
        recorded_at TIMESTAMPTZ NOT NULL,
        speed_kmh FLOAT8
    )
    "#,
];

async fn test_store() -> Option<Store> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;

    for ddl in SCHEMA {
        sqlx::query(ddl).execute(&pool).await.ok()?;
    }

    sqlx::query(
        "TRUNCATE unit_telemetry, unit_routes, assignments, units, interventions, \
         incidents, dispatch_config CASCADE",
    )
    .execute(&pool)
    .await
    .ok()?;

    Some(Store::new(pool))
}

async fn seed_unit(store: &Store, call_sign: &str, lat: f64, lon: f64, base: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO units (id, call_sign, unit_type_code, home_base, status, latitude, longitude)
        VALUES ($1, $2, 'fire_engine', $3, 'available', $4, $5)
        "#,
    )
    .bind(id)
    .bind(call_sign)
    .bind(base)
    .bind(lat)
    .bind(lon)
    .execute(store.pool())
    .await
    .unwrap();
    id
}

async fn seed_intervention(store: &Store, severity: i32, lat: f64, lon: f64) -> Uuid {
    let incident_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO incidents (id, severity, recommended_unit_types, latitude, longitude)
        VALUES ($1, $2, '{fire_engine}', $3, $4)
        "#,
    )
    .bind(incident_id)
    .bind(severity)
    .bind(lat)
    .bind(lon)
    .execute(store.pool())
    .await
    .unwrap();

    let intervention_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO interventions (id, incident_id, status, priority) VALUES ($1, $2, 'created', $3)",
    )
    .bind(intervention_id)
    .bind(incident_id)
    .bind(severity)
    .execute(store.pool())
    .await
    .unwrap();

    intervention_id
}

async fn active_assignment_count(store: &Store, unit_id: Uuid) -> i64 {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM assignments WHERE unit_id = $1 AND status IN ('dispatched','arrived')",
    )
    .bind(unit_id)
    .fetch_one(store.pool())
    .await
    .unwrap();
    count
}

fn sample_route(unit_id: Uuid, intervention_id: Option<Uuid>) -> Route {
    Route {
        unit_id,
        intervention_id,
        geometry: vec![
            GeoPoint::new(47.21, -1.56),
            GeoPoint::new(47.22, -1.55),
            GeoPoint::new(47.23, -1.54),
        ],
        length_meters: 2800.0,
        duration_seconds: 202.0,
        progress_percent: 0.0,
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn commit_dispatch_assigns_a_free_unit() {
    let Some(store) = test_store().await else {
        return;
    };

    let unit_id = seed_unit(&store, "E-1", 47.21, -1.55, "north").await;
    let intervention_id = seed_intervention(&store, 3, 47.20, -1.55).await;

    let assignment = store
        .commit_dispatch(intervention_id, unit_id, "lead", None)
        .await
        .unwrap();

    assert_eq!(assignment.status, AssignmentStatus::Dispatched);
    assert_eq!(assignment.role, "lead");

    let unit = store.unit(unit_id).await.unwrap();
    assert_eq!(unit.status, UnitStatus::UnderWay);
    assert_eq!(unit.current_assignment_id, Some(assignment.id));
}

#[tokio::test]
async fn second_commit_with_stale_expectation_conflicts() {
    let Some(store) = test_store().await else {
        return;
    };

    let unit_id = seed_unit(&store, "E-1", 47.21, -1.55, "north").await;
    let first = seed_intervention(&store, 3, 47.20, -1.55).await;
    let second = seed_intervention(&store, 4, 47.25, -1.50).await;

    store
        .commit_dispatch(first, unit_id, "lead", None)
        .await
        .unwrap();

    // A competing dispatcher still believes the unit is free.
    let err = store
        .commit_dispatch(second, unit_id, "lead", None)
        .await
        .unwrap_err();
    assert!(matches!(err, BrigadeError::AssignmentConflict));

    // The losing transaction left nothing behind.
    assert_eq!(active_assignment_count(&store, unit_id).await, 1);
}

#[tokio::test]
async fn preemption_is_one_atomic_swap() {
    let Some(store) = test_store().await else {
        return;
    };

    let unit_id = seed_unit(&store, "E-1", 47.21, -1.55, "north").await;
    let minor = seed_intervention(&store, 2, 47.30, -1.60).await;
    let major = seed_intervention(&store, 5, 47.20, -1.55).await;

    let old = store
        .commit_dispatch(minor, unit_id, "lead", None)
        .await
        .unwrap();
    store.save_route(&sample_route(unit_id, Some(minor))).await.unwrap();

    let new = store
        .commit_dispatch(major, unit_id, "lead", Some(old.id))
        .await
        .unwrap();

    // Old assignment released with a timestamp, old route gone.
    let (status, released_at): (String, Option<chrono::DateTime<chrono::Utc>>) =
        sqlx::query_as("SELECT status, released_at FROM assignments WHERE id = $1")
            .bind(old.id)
            .fetch_one(store.pool())
            .await
            .unwrap();
    assert_eq!(status, "released");
    assert!(released_at.is_some());
    assert!(store.load_route(unit_id).await.unwrap().is_none());

    // Never two active assignments.
    assert_eq!(active_assignment_count(&store, unit_id).await, 1);
    let unit = store.unit(unit_id).await.unwrap();
    assert_eq!(unit.current_assignment_id, Some(new.id));
}

#[tokio::test]
async fn release_returns_the_unit_to_available() {
    let Some(store) = test_store().await else {
        return;
    };

    let unit_id = seed_unit(&store, "E-1", 47.21, -1.55, "north").await;
    let intervention_id = seed_intervention(&store, 3, 47.20, -1.55).await;

    let assignment = store
        .commit_dispatch(intervention_id, unit_id, "lead", None)
        .await
        .unwrap();
    store
        .save_route(&sample_route(unit_id, Some(intervention_id)))
        .await
        .unwrap();

    store
        .release_assignment(assignment.id, AssignmentStatus::Released)
        .await
        .unwrap();

    let unit = store.unit(unit_id).await.unwrap();
    assert_eq!(unit.status, UnitStatus::Available);
    assert_eq!(unit.current_assignment_id, None);
    assert!(unit.return_since.is_some());
    assert!(store.load_route(unit_id).await.unwrap().is_none());
}

#[tokio::test]
async fn candidates_come_back_distance_ordered_with_coverage_counts() {
    let Some(store) = test_store().await else {
        return;
    };

    // Two units share the north base; one lonely unit in the south.
    let near = seed_unit(&store, "E-1", 47.205, -1.55, "north").await;
    seed_unit(&store, "E-2", 47.26, -1.55, "north").await;
    let far = seed_unit(&store, "E-3", 47.35, -1.55, "south").await;
    let intervention_id = seed_intervention(&store, 3, 47.20, -1.55).await;

    let candidates = store
        .dispatch_candidates(intervention_id, &["fire_engine".to_string()], 10)
        .await
        .unwrap();

    assert_eq!(candidates.len(), 3);
    assert_eq!(candidates[0].unit_id, near);
    assert_eq!(candidates[2].unit_id, far);
    assert!(candidates[0].distance_meters < candidates[1].distance_meters);

    // Travel estimate is distance over the flat average speed.
    let expected = candidates[0].distance_meters / AVERAGE_SPEED_M_PER_S;
    assert!((candidates[0].travel_time_seconds - expected).abs() < 0.5);

    // E-1 has one available sibling at its base, E-3 has none.
    assert_eq!(candidates[0].other_units_at_base, 1);
    assert_eq!(candidates[2].other_units_at_base, 0);

    // Free units carry no current-assignment metadata.
    assert!(candidates[0].current_assignment_id.is_none());
    assert!(candidates[0].current_intervention_severity.is_none());
}

#[tokio::test]
async fn busy_candidate_carries_its_current_severity() {
    let Some(store) = test_store().await else {
        return;
    };

    let unit_id = seed_unit(&store, "E-1", 47.21, -1.55, "north").await;
    let current = seed_intervention(&store, 2, 47.30, -1.60).await;
    let assignment = store
        .commit_dispatch(current, unit_id, "lead", None)
        .await
        .unwrap();

    let target = seed_intervention(&store, 5, 47.20, -1.55).await;
    let candidates = store
        .dispatch_candidates(target, &[], 10)
        .await
        .unwrap();

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].status, UnitStatus::UnderWay);
    assert_eq!(candidates[0].current_assignment_id, Some(assignment.id));
    assert_eq!(candidates[0].current_intervention_id, Some(current));
    assert_eq!(candidates[0].current_intervention_severity, Some(2));
}

#[tokio::test]
async fn max_candidates_caps_the_result() {
    let Some(store) = test_store().await else {
        return;
    };

    for i in 0..5 {
        seed_unit(&store, &format!("E-{i}"), 47.21 + i as f64 * 0.01, -1.55, "north").await;
    }
    let intervention_id = seed_intervention(&store, 3, 47.20, -1.55).await;

    let candidates = store
        .dispatch_candidates(intervention_id, &[], 3)
        .await
        .unwrap();
    assert_eq!(candidates.len(), 3);
}

#[tokio::test]
async fn route_rows_round_trip_and_reset_progress() {
    let Some(store) = test_store().await else {
        return;
    };

    let unit_id = seed_unit(&store, "E-1", 47.21, -1.55, "north").await;
    let route = sample_route(unit_id, None);

    store.save_route(&route).await.unwrap();
    store.set_progress(unit_id, 62.5).await.unwrap();

    let loaded = store.load_route(unit_id).await.unwrap().unwrap();
    assert_eq!(loaded.geometry, route.geometry);
    assert_eq!(loaded.progress_percent, 62.5);

    // Re-saving (reassignment) starts the new route at zero.
    store.save_route(&route).await.unwrap();
    let reset = store.load_route(unit_id).await.unwrap().unwrap();
    assert_eq!(reset.progress_percent, 0.0);

    store.delete_route(unit_id).await.unwrap();
    assert!(store.load_route(unit_id).await.unwrap().is_none());
}

#[tokio::test]
async fn config_rows_round_trip() {
    let Some(store) = test_store().await else {
        return;
    };

    sqlx::query(
        r#"
        INSERT INTO dispatch_config (key, value, min_value, max_value)
        VALUES ('weight_travel_time', 1.5, 0.0, 10.0)
        "#,
    )
    .execute(store.pool())
    .await
    .unwrap();

    let entries = store.list_config_entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key, "weight_travel_time");
    assert_eq!(entries[0].value, 1.5);
    assert_eq!(entries[0].min_value, Some(0.0));

    store.update_config_value("weight_travel_time", 2.0).await.unwrap();
    let entries = store.list_config_entries().await.unwrap();
    assert_eq!(entries[0].value, 2.0);

    let err = store.update_config_value("no_such_key", 1.0).await.unwrap_err();
    assert!(matches!(err, BrigadeError::NotFound(_)));
}

#[tokio::test]
async fn pending_interventions_reflect_wanted_units() {
    let Some(store) = test_store().await else {
        return;
    };

    let unit_id = seed_unit(&store, "E-1", 47.21, -1.55, "north").await;
    let intervention_id = seed_intervention(&store, 2, 47.20, -1.55).await;

    let pending = store.pending_interventions().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].severity, 2);
    assert_eq!(pending[0].units_wanted(), 2);

    store
        .commit_dispatch(intervention_id, unit_id, "lead", None)
        .await
        .unwrap();

    let pending = store.pending_interventions().await.unwrap();
    assert_eq!(pending[0].assigned_units_count, 1);
    assert_eq!(pending[0].units_wanted(), 1);
}
