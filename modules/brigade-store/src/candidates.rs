//! The spatial candidate query.

use uuid::Uuid;

use brigade_common::{BrigadeError, Candidate, InterventionBrief, AVERAGE_SPEED_M_PER_S};

use crate::store::{db_err, Store};

/// All candidate metadata in one statement: straight-line distance to the
/// incident, the flat-speed travel estimate, the count of available
/// siblings at the candidate's base, and the severity of whatever the
/// unit is currently working (NULL propagated, never defaulted).
const CANDIDATES_SQL: &str = r#"
WITH target AS (
    SELECT e.latitude, e.longitude
    FROM interventions i
    JOIN incidents e ON e.id = i.incident_id
    WHERE i.id = $1
),
cand AS (
    SELECT
        u.id, u.call_sign, u.unit_type_code, u.home_base, u.status,
        u.latitude, u.longitude, u.current_assignment_id,
        ST_DistanceSphere(
            ST_MakePoint(u.longitude, u.latitude),
            ST_MakePoint(t.longitude, t.latitude)
        ) AS distance_meters
    FROM units u
    CROSS JOIN target t
    WHERE u.status IN ('available', 'under_way')
      AND (cardinality($2::text[]) = 0 OR u.unit_type_code = ANY($2::text[]))
)
SELECT
    c.id, c.call_sign, c.unit_type_code, c.home_base, c.status,
    c.latitude, c.longitude,
    c.distance_meters,
    c.distance_meters / $4 AS travel_time_seconds,
    (
        SELECT COUNT(*)::int4 FROM units o
        WHERE o.id <> c.id
          AND o.status = 'available'
          AND o.home_base IS NOT DISTINCT FROM c.home_base
    ) AS other_units_at_base,
    a.id AS current_assignment_id,
    a.intervention_id AS current_intervention_id,
    ce.severity AS current_intervention_severity
FROM cand c
LEFT JOIN assignments a
    ON a.id = c.current_assignment_id
   AND a.status IN ('dispatched', 'arrived')
LEFT JOIN interventions ci ON ci.id = a.intervention_id
LEFT JOIN incidents ce ON ce.id = ci.incident_id
ORDER BY c.distance_meters ASC
LIMIT $3
"#;

const BRIEF_SQL: &str = r#"
SELECT
    i.id, i.incident_id, i.status, i.priority, i.created_at,
    e.severity, e.recommended_unit_types, e.latitude, e.longitude,
    (
        SELECT COUNT(*) FROM assignments a
        WHERE a.intervention_id = i.id
          AND a.status IN ('dispatched', 'arrived')
    ) AS assigned_units_count
FROM interventions i
JOIN incidents e ON e.id = i.incident_id
WHERE i.id = $1
"#;

impl Store {
    /// Up to `max` dispatchable units for the intervention, distance
    /// ascending. Read-only.
    pub async fn dispatch_candidates(
        &self,
        intervention_id: Uuid,
        unit_types: &[String],
        max: i32,
    ) -> Result<Vec<Candidate>, BrigadeError> {
        sqlx::query_as::<_, Candidate>(CANDIDATES_SQL)
            .bind(intervention_id)
            .bind(unit_types)
            .bind(max.max(0) as i64)
            .bind(AVERAGE_SPEED_M_PER_S)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn intervention_brief(
        &self,
        intervention_id: Uuid,
    ) -> Result<InterventionBrief, BrigadeError> {
        sqlx::query_as::<_, InterventionBrief>(BRIEF_SQL)
            .bind(intervention_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| BrigadeError::NotFound(format!("intervention {intervention_id}")))
    }

    /// Interventions in a non-terminal status still wanting units, oldest
    /// first, for the periodic dispatch loop.
    pub async fn pending_interventions(&self) -> Result<Vec<InterventionBrief>, BrigadeError> {
        sqlx::query_as::<_, InterventionBrief>(
            r#"
            SELECT
                i.id, i.incident_id, i.status, i.priority, i.created_at,
                e.severity, e.recommended_unit_types, e.latitude, e.longitude,
                (
                    SELECT COUNT(*) FROM assignments a
                    WHERE a.intervention_id = i.id
                      AND a.status IN ('dispatched', 'arrived')
                ) AS assigned_units_count
            FROM interventions i
            JOIN incidents e ON e.id = i.incident_id
            WHERE i.status IN ('created', 'on_site')
            ORDER BY i.created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }
}
