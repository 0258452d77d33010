//! Assignment commits.
//!
//! The unit's `current_assignment_id` is the contended pointer. Every
//! commit guards its unit update with a compare-and-set on that pointer,
//! so two dispatchers racing for the same unit cannot both win: the loser
//! rolls back whole, leaving no orphaned assignment or route rows.

use tracing::info;
use uuid::Uuid;

use brigade_common::{Assignment, AssignmentStatus, BrigadeError};

use crate::store::{db_err, Store};

impl Store {
    /// Commit one dispatch: release the expected prior assignment (when
    /// preempting), insert the new assignment, and flip the unit to
    /// `under_way` — all in one transaction.
    ///
    /// `expected_assignment` is what the unit is believed to hold. If the
    /// unit's pointer moved in the meantime, the whole transaction rolls
    /// back with `AssignmentConflict`.
    pub async fn commit_dispatch(
        &self,
        intervention_id: Uuid,
        unit_id: Uuid,
        role: &str,
        expected_assignment: Option<Uuid>,
    ) -> Result<Assignment, BrigadeError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        if let Some(old_id) = expected_assignment {
            let released = sqlx::query(
                r#"
                UPDATE assignments
                SET status = 'released', released_at = now()
                WHERE id = $1 AND status IN ('dispatched', 'arrived')
                "#,
            )
            .bind(old_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

            if released.rows_affected() == 0 {
                // Someone else already closed that assignment.
                tx.rollback().await.map_err(db_err)?;
                return Err(BrigadeError::AssignmentConflict);
            }

            sqlx::query("DELETE FROM unit_routes WHERE unit_id = $1")
                .bind(unit_id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        let assignment = sqlx::query_as::<_, Assignment>(
            r#"
            INSERT INTO assignments (id, intervention_id, unit_id, status, role, dispatched_at)
            VALUES ($1, $2, $3, 'dispatched', $4, now())
            RETURNING id, intervention_id, unit_id, status, role,
                      dispatched_at, arrived_at, released_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(intervention_id)
        .bind(unit_id)
        .bind(role)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        let updated = sqlx::query(
            r#"
            UPDATE units
            SET status = 'under_way', current_assignment_id = $1, updated_at = now()
            WHERE id = $2 AND current_assignment_id IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(assignment.id)
        .bind(unit_id)
        .bind(expected_assignment)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(db_err)?;
            return Err(BrigadeError::AssignmentConflict);
        }

        tx.commit().await.map_err(db_err)?;

        info!(
            unit_id = %unit_id,
            intervention_id = %intervention_id,
            assignment_id = %assignment.id,
            preempted = expected_assignment.is_some(),
            "Assignment committed"
        );
        Ok(assignment)
    }

    /// Close an assignment with a terminal status, clear the unit's
    /// pointer, drop its route, and return it to `available` — one
    /// transaction. Assignment rows are never deleted.
    pub async fn release_assignment(
        &self,
        assignment_id: Uuid,
        status: AssignmentStatus,
    ) -> Result<(), BrigadeError> {
        debug_assert!(!status.active(), "release must use a terminal status");

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let unit_id: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE assignments
            SET status = $2, released_at = now()
            WHERE id = $1 AND status IN ('dispatched', 'arrived')
            RETURNING unit_id
            "#,
        )
        .bind(assignment_id)
        .bind(status.to_string())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let Some((unit_id,)) = unit_id else {
            tx.rollback().await.map_err(db_err)?;
            return Err(BrigadeError::NotFound(format!(
                "active assignment {assignment_id}"
            )));
        };

        sqlx::query("DELETE FROM unit_routes WHERE unit_id = $1")
            .bind(unit_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        sqlx::query(
            r#"
            UPDATE units
            SET status = 'available', current_assignment_id = NULL,
                return_since = now(), updated_at = now()
            WHERE id = $1 AND current_assignment_id = $2
            "#,
        )
        .bind(unit_id)
        .bind(assignment_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        info!(assignment_id = %assignment_id, status = %status, "Assignment released");
        Ok(())
    }

    pub async fn mark_assignment_arrived(&self, assignment_id: Uuid) -> Result<(), BrigadeError> {
        sqlx::query(
            r#"
            UPDATE assignments
            SET status = 'arrived', arrived_at = now()
            WHERE id = $1 AND status = 'dispatched'
            "#,
        )
        .bind(assignment_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}
