//! Seam implementations for the Postgres store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use brigade_common::{
    Assignment, AssignmentStatus, BrigadeError, Candidate, GeoPoint, InterventionBrief, Unit,
    UnitStatus,
};
use brigade_store::Store;

use crate::traits::{CandidateSource, DispatchBackend, DispatchCommit};

#[async_trait]
impl CandidateSource for Store {
    async fn intervention(&self, id: Uuid) -> Result<InterventionBrief, BrigadeError> {
        self.intervention_brief(id).await
    }

    async fn candidates(
        &self,
        intervention_id: Uuid,
        unit_types: &[String],
        max: i32,
    ) -> Result<Vec<Candidate>, BrigadeError> {
        self.dispatch_candidates(intervention_id, unit_types, max).await
    }
}

#[async_trait]
impl DispatchBackend for Store {
    async fn commit_dispatch(&self, commit: &DispatchCommit) -> Result<Assignment, BrigadeError> {
        Store::commit_dispatch(
            self,
            commit.intervention_id,
            commit.unit_id,
            &commit.role,
            commit.expected_assignment,
        )
        .await
    }

    async fn release_assignment(
        &self,
        assignment_id: Uuid,
        status: AssignmentStatus,
    ) -> Result<(), BrigadeError> {
        Store::release_assignment(self, assignment_id, status).await
    }

    async fn unit(&self, id: Uuid) -> Result<Unit, BrigadeError> {
        Store::unit(self, id).await
    }

    async fn update_unit_status(&self, id: Uuid, status: UnitStatus) -> Result<(), BrigadeError> {
        Store::update_unit_status(self, id, status).await
    }

    async fn update_unit_location(
        &self,
        id: Uuid,
        location: GeoPoint,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), BrigadeError> {
        Store::update_unit_location(self, id, location, recorded_at).await
    }

    async fn mark_assignment_arrived(&self, assignment_id: Uuid) -> Result<(), BrigadeError> {
        Store::mark_assignment_arrived(self, assignment_id).await
    }

    async fn stamp_return_since(&self, unit_id: Uuid) -> Result<(), BrigadeError> {
        Store::stamp_return_since(self, unit_id).await
    }

    async fn pending_interventions(&self) -> Result<Vec<InterventionBrief>, BrigadeError> {
        Store::pending_interventions(self).await
    }
}
