//! `sqlx::FromRow` implementations for the shared domain types.
//!
//! These live alongside the type definitions (rather than in `brigade-store`)
//! so the foreign `FromRow` trait is implemented in the crate that owns the
//! types, satisfying the orphan rule.

use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::{
    Assignment, AssignmentStatus, Candidate, ConfigEntry, GeoPoint, InterventionBrief,
    InterventionStatus, Route, Unit, UnitStatus,
};

fn decode_err(
    column: &str,
    source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: source.into(),
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for Unit {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        Ok(Unit {
            id: row.try_get("id")?,
            call_sign: row.try_get("call_sign")?,
            unit_type_code: row.try_get("unit_type_code")?,
            home_base: row.try_get("home_base")?,
            status: status
                .parse::<UnitStatus>()
                .map_err(|e| decode_err("status", e))?,
            location: GeoPoint {
                lat: row.try_get("latitude")?,
                lon: row.try_get("longitude")?,
            },
            current_assignment_id: row.try_get("current_assignment_id")?,
            last_contact_at: row.try_get("last_contact_at")?,
            return_since: row.try_get("return_since")?,
        })
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for Assignment {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        Ok(Assignment {
            id: row.try_get("id")?,
            intervention_id: row.try_get("intervention_id")?,
            unit_id: row.try_get("unit_id")?,
            status: parse_assignment_status(&status).map_err(|e| decode_err("status", e))?,
            role: row.try_get("role")?,
            dispatched_at: row.try_get("dispatched_at")?,
            arrived_at: row.try_get("arrived_at")?,
            released_at: row.try_get("released_at")?,
        })
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for InterventionBrief {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        Ok(InterventionBrief {
            id: row.try_get("id")?,
            incident_id: row.try_get("incident_id")?,
            status: parse_intervention_status(&status).map_err(|e| decode_err("status", e))?,
            priority: row.try_get("priority")?,
            severity: row.try_get("severity")?,
            recommended_unit_types: row.try_get("recommended_unit_types")?,
            location: GeoPoint {
                lat: row.try_get("latitude")?,
                lon: row.try_get("longitude")?,
            },
            assigned_units_count: row.try_get("assigned_units_count")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for Candidate {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        Ok(Candidate {
            unit_id: row.try_get("id")?,
            call_sign: row.try_get("call_sign")?,
            unit_type_code: row.try_get("unit_type_code")?,
            home_base: row.try_get("home_base")?,
            status: status
                .parse::<UnitStatus>()
                .map_err(|e| decode_err("status", e))?,
            location: GeoPoint {
                lat: row.try_get("latitude")?,
                lon: row.try_get("longitude")?,
            },
            travel_time_seconds: row.try_get("travel_time_seconds")?,
            distance_meters: row.try_get("distance_meters")?,
            other_units_at_base: row.try_get("other_units_at_base")?,
            current_assignment_id: row.try_get("current_assignment_id")?,
            current_intervention_id: row.try_get("current_intervention_id")?,
            current_intervention_severity: row.try_get("current_intervention_severity")?,
        })
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for ConfigEntry {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ConfigEntry {
            key: row.try_get("key")?,
            value: row.try_get("value")?,
            min_value: row.try_get("min_value")?,
            max_value: row.try_get("max_value")?,
        })
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for Route {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let geometry: serde_json::Value = row.try_get("geometry")?;
        Ok(Route {
            unit_id: row.try_get("unit_id")?,
            intervention_id: row.try_get("intervention_id")?,
            geometry: serde_json::from_value(geometry).map_err(|e| decode_err("geometry", e))?,
            length_meters: row.try_get("length_meters")?,
            duration_seconds: row.try_get("duration_seconds")?,
            progress_percent: row.try_get("progress_percent")?,
        })
    }
}

fn parse_assignment_status(s: &str) -> Result<AssignmentStatus, String> {
    match s {
        "dispatched" => Ok(AssignmentStatus::Dispatched),
        "arrived" => Ok(AssignmentStatus::Arrived),
        "released" => Ok(AssignmentStatus::Released),
        "cancelled" => Ok(AssignmentStatus::Cancelled),
        other => Err(format!("unknown assignment status: {other}")),
    }
}

fn parse_intervention_status(s: &str) -> Result<InterventionStatus, String> {
    match s {
        "created" => Ok(InterventionStatus::Created),
        "on_site" => Ok(InterventionStatus::OnSite),
        "completed" => Ok(InterventionStatus::Completed),
        "cancelled" => Ok(InterventionStatus::Cancelled),
        other => Err(format!("unknown intervention status: {other}")),
    }
}
