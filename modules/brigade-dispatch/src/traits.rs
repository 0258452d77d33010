//! Seams between the dispatcher and its collaborators.
//!
//! The Postgres store implements `CandidateSource` and `DispatchBackend`;
//! `RouteService` is implemented over the route planner and progress
//! tracker. Tests swap all three for in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use brigade_common::{
    Assignment, AssignmentStatus, BrigadeError, Candidate, GeoPoint, InterventionBrief, Unit,
    UnitStatus,
};

/// Read-only candidate retrieval from the spatial store.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn intervention(&self, id: Uuid) -> Result<InterventionBrief, BrigadeError>;

    /// Up to `max` dispatchable units for the intervention, distance
    /// ascending, with coverage and current-assignment metadata attached.
    async fn candidates(
        &self,
        intervention_id: Uuid,
        unit_types: &[String],
        max: i32,
    ) -> Result<Vec<Candidate>, BrigadeError>;
}

/// One dispatch commit. `expected_assignment` is the assignment the unit
/// is believed to hold right now: `None` for a free unit, `Some` when
/// preempting. The backend uses it as the compare-and-set guard, so a
/// concurrent dispatch that got there first makes this commit fail with
/// `AssignmentConflict` instead of silently double-booking the unit.
#[derive(Debug, Clone)]
pub struct DispatchCommit {
    pub intervention_id: Uuid,
    pub unit_id: Uuid,
    pub role: String,
    pub expected_assignment: Option<Uuid>,
}

/// Mutations the dispatcher and state machine need from the store. Every
/// method is atomic as observed by concurrent readers.
#[async_trait]
pub trait DispatchBackend: Send + Sync {
    /// Release the expected assignment (if any), create the new one, and
    /// flip the unit to `under_way` — one logical operation, exactly one
    /// winner under contention.
    async fn commit_dispatch(&self, commit: &DispatchCommit) -> Result<Assignment, BrigadeError>;

    /// Terminal-status an assignment, clear the unit's pointer, drop its
    /// route, and return the unit to `available`.
    async fn release_assignment(
        &self,
        assignment_id: Uuid,
        status: AssignmentStatus,
    ) -> Result<(), BrigadeError>;

    async fn unit(&self, id: Uuid) -> Result<Unit, BrigadeError>;

    async fn update_unit_status(&self, id: Uuid, status: UnitStatus) -> Result<(), BrigadeError>;

    async fn update_unit_location(
        &self,
        id: Uuid,
        location: GeoPoint,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), BrigadeError>;

    async fn mark_assignment_arrived(&self, assignment_id: Uuid) -> Result<(), BrigadeError>;

    async fn stamp_return_since(&self, unit_id: Uuid) -> Result<(), BrigadeError>;

    /// Interventions still wanting units, for the periodic trigger loop.
    async fn pending_interventions(&self) -> Result<Vec<InterventionBrief>, BrigadeError>;
}

/// Route planning plus persistence for a dispatched unit.
#[async_trait]
pub trait RouteService: Send + Sync {
    /// Plan origin→destination and store it as the unit's active route.
    /// Fails with `RouteUnavailable` when the provider cannot help; the
    /// caller treats that as non-fatal and leaves the unit routeless
    /// until repair.
    async fn plan_and_save(
        &self,
        unit_id: Uuid,
        origin: GeoPoint,
        destination: GeoPoint,
        intervention_id: Uuid,
    ) -> Result<(), BrigadeError>;

    async fn drop_route(&self, unit_id: Uuid) -> Result<(), BrigadeError>;
}
