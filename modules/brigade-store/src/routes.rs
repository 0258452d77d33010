//! `RouteStore` backed by the `unit_routes` table.
//!
//! Geometry is stored as a JSONB array of points. One row per unit,
//! upserted on save with progress reset to zero.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use brigade_common::{BrigadeError, GeoPoint, Route};
use brigade_routing::RouteStore;

use crate::store::{db_err, Store};

/// A dispatched unit that is moving without stored geometry: its route
/// plan came back unavailable and needs another attempt.
#[derive(Debug, Clone)]
pub struct RouteRepairJob {
    pub unit_id: Uuid,
    pub intervention_id: Uuid,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
}

impl<'r> sqlx::FromRow<'r, PgRow> for RouteRepairJob {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(RouteRepairJob {
            unit_id: row.try_get("unit_id")?,
            intervention_id: row.try_get("intervention_id")?,
            origin: GeoPoint {
                lat: row.try_get("unit_lat")?,
                lon: row.try_get("unit_lon")?,
            },
            destination: GeoPoint {
                lat: row.try_get("event_lat")?,
                lon: row.try_get("event_lon")?,
            },
        })
    }
}

impl Store {
    /// Units under way with an active assignment but no stored route.
    pub async fn route_repair_jobs(&self) -> Result<Vec<RouteRepairJob>, BrigadeError> {
        sqlx::query_as::<_, RouteRepairJob>(
            r#"
            SELECT
                u.id AS unit_id,
                a.intervention_id,
                u.latitude AS unit_lat, u.longitude AS unit_lon,
                e.latitude AS event_lat, e.longitude AS event_lon
            FROM units u
            JOIN assignments a
                ON a.id = u.current_assignment_id
               AND a.status IN ('dispatched', 'arrived')
            JOIN interventions i ON i.id = a.intervention_id
            JOIN incidents e ON e.id = i.incident_id
            LEFT JOIN unit_routes r ON r.unit_id = u.id
            WHERE u.status = 'under_way'
              AND r.unit_id IS NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }
}

#[async_trait]
impl RouteStore for Store {
    async fn save_route(&self, route: &Route) -> Result<(), BrigadeError> {
        let geometry = serde_json::to_value(&route.geometry)
            .map_err(|e| BrigadeError::Validation(format!("unencodable geometry: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO unit_routes
                (unit_id, intervention_id, geometry, length_meters,
                 duration_seconds, progress_percent, updated_at)
            VALUES ($1, $2, $3, $4, $5, 0, now())
            ON CONFLICT (unit_id) DO UPDATE SET
                intervention_id = EXCLUDED.intervention_id,
                geometry = EXCLUDED.geometry,
                length_meters = EXCLUDED.length_meters,
                duration_seconds = EXCLUDED.duration_seconds,
                progress_percent = 0,
                updated_at = now()
            "#,
        )
        .bind(route.unit_id)
        .bind(route.intervention_id)
        .bind(geometry)
        .bind(route.length_meters)
        .bind(route.duration_seconds)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn load_route(&self, unit_id: Uuid) -> Result<Option<Route>, BrigadeError> {
        sqlx::query_as::<_, Route>(
            r#"
            SELECT unit_id, intervention_id, geometry, length_meters,
                   duration_seconds, progress_percent
            FROM unit_routes
            WHERE unit_id = $1
            "#,
        )
        .bind(unit_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn set_progress(&self, unit_id: Uuid, percent: f64) -> Result<(), BrigadeError> {
        let updated = sqlx::query(
            r#"
            UPDATE unit_routes
            SET progress_percent = $2, updated_at = now()
            WHERE unit_id = $1
            "#,
        )
        .bind(unit_id)
        .bind(percent)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if updated.rows_affected() == 0 {
            return Err(BrigadeError::NotFound(format!("route for unit {unit_id}")));
        }
        Ok(())
    }

    async fn delete_route(&self, unit_id: Uuid) -> Result<(), BrigadeError> {
        sqlx::query("DELETE FROM unit_routes WHERE unit_id = $1")
            .bind(unit_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
