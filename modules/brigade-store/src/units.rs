//! Unit reads, status/location writes, and telemetry appends.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use brigade_common::{BrigadeError, GeoPoint, Unit, UnitStatus};

use crate::store::{db_err, Store};

const UNIT_COLUMNS: &str = "id, call_sign, unit_type_code, home_base, status, \
                            latitude, longitude, current_assignment_id, \
                            last_contact_at, return_since";

impl Store {
    pub async fn unit(&self, id: Uuid) -> Result<Unit, BrigadeError> {
        sqlx::query_as::<_, Unit>(&format!("SELECT {UNIT_COLUMNS} FROM units WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| BrigadeError::NotFound(format!("unit {id}")))
    }

    pub async fn list_units(&self) -> Result<Vec<Unit>, BrigadeError> {
        sqlx::query_as::<_, Unit>(&format!(
            "SELECT {UNIT_COLUMNS} FROM units ORDER BY call_sign"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Persist a status. Legality of the transition is the state
    /// machine's job; the store only writes what it is told.
    pub async fn update_unit_status(
        &self,
        id: Uuid,
        status: UnitStatus,
    ) -> Result<(), BrigadeError> {
        let updated = sqlx::query(
            "UPDATE units SET status = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(status.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if updated.rows_affected() == 0 {
            return Err(BrigadeError::NotFound(format!("unit {id}")));
        }
        Ok(())
    }

    pub async fn update_unit_location(
        &self,
        id: Uuid,
        location: GeoPoint,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), BrigadeError> {
        let updated = sqlx::query(
            r#"
            UPDATE units
            SET latitude = $2, longitude = $3, last_contact_at = $4, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(location.lat)
        .bind(location.lon)
        .bind(recorded_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if updated.rows_affected() == 0 {
            return Err(BrigadeError::NotFound(format!("unit {id}")));
        }
        Ok(())
    }

    pub async fn stamp_return_since(&self, unit_id: Uuid) -> Result<(), BrigadeError> {
        sqlx::query("UPDATE units SET return_since = now(), updated_at = now() WHERE id = $1")
            .bind(unit_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Append one telemetry row. The history table is append-only; the
    /// unit row itself is updated separately by the ingestor.
    pub async fn record_telemetry(
        &self,
        unit_id: Uuid,
        location: GeoPoint,
        recorded_at: DateTime<Utc>,
        speed_kmh: Option<f64>,
    ) -> Result<(), BrigadeError> {
        sqlx::query(
            r#"
            INSERT INTO unit_telemetry (unit_id, latitude, longitude, recorded_at, speed_kmh)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(unit_id)
        .bind(location.lat)
        .bind(location.lon)
        .bind(recorded_at)
        .bind(speed_kmh)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}
