//! Unit status state machine.
//!
//! Normal cycle: available → under_way → on_site → available. A unit can
//! drop back to available from under_way when its assignment is cancelled
//! before arrival, and on_site units can go to maintenance/offline.
//! Unavailable and offline require an external action to return.
//!
//! `on_site → under_way` is deliberately absent: redeploying a unit that
//! is working a scene must go through the dispatcher's preemption path,
//! which releases the current assignment first.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use brigade_common::{BrigadeError, GeoPoint, Unit, UnitStatus};

use crate::traits::{DispatchBackend, RouteService};

/// Side effects a legal transition carries. The executor runs them in
/// order after persisting the status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
    /// Plan a road route to `destination` and save it as the active route.
    PlanRoute,
    /// Drop the active route so nothing keeps interpolating stale geometry.
    DropRoute,
    /// Stamp the assignment's arrival time.
    MarkArrived,
    /// Stamp the unit's return-to-quarters time.
    StampReturnSince,
}

/// Validate a status change and return the effects it entails.
pub fn plan_transition(
    unit: &Unit,
    to: UnitStatus,
) -> Result<Vec<TransitionEffect>, BrigadeError> {
    use TransitionEffect::*;
    use UnitStatus::*;

    let effects = match (unit.status, to) {
        (Available, UnderWay) => {
            if unit.current_assignment_id.is_none() {
                return Err(BrigadeError::Validation(format!(
                    "unit {} cannot go under way without an active assignment",
                    unit.id
                )));
            }
            vec![PlanRoute]
        }
        (UnderWay, OnSite) => vec![DropRoute, MarkArrived],
        // Assignment cancelled before arrival.
        (UnderWay, Available) => vec![DropRoute, StampReturnSince],
        (OnSite, Available) => vec![StampReturnSince],
        (OnSite, Unavailable) | (OnSite, Offline) => vec![],
        (Available, Unavailable) | (Available, Offline) => vec![],
        // External action brings a parked unit back.
        (Unavailable, Available) | (Offline, Available) => vec![],
        (from, to) => {
            return Err(BrigadeError::IllegalTransition {
                from: from.to_string(),
                to: to.to_string(),
            })
        }
    };

    Ok(effects)
}

/// Destination for a transition that plans a route.
#[derive(Debug, Clone, Copy)]
pub struct RouteTarget {
    pub intervention_id: Uuid,
    pub destination: GeoPoint,
}

/// Persist a transition and run its effects.
///
/// `target` is required only for transitions that plan a route
/// (available → under_way).
pub async fn apply_transition(
    backend: &Arc<dyn DispatchBackend>,
    routes: &Arc<dyn RouteService>,
    unit: &Unit,
    to: UnitStatus,
    target: Option<RouteTarget>,
) -> Result<(), BrigadeError> {
    let effects = plan_transition(unit, to)?;

    backend.update_unit_status(unit.id, to).await?;
    info!(unit_id = %unit.id, from = %unit.status, to = %to, "Unit status transition");

    for effect in effects {
        match effect {
            TransitionEffect::PlanRoute => {
                let target = target.ok_or_else(|| {
                    BrigadeError::Validation(format!(
                        "transition to under_way for unit {} needs a route target",
                        unit.id
                    ))
                })?;
                // A missing route is survivable; the repair path fills it in.
                match routes
                    .plan_and_save(
                        unit.id,
                        unit.location,
                        target.destination,
                        target.intervention_id,
                    )
                    .await
                {
                    Ok(()) => {}
                    Err(BrigadeError::RouteUnavailable) => {
                        tracing::warn!(unit_id = %unit.id, "Route unavailable at dispatch, will repair later");
                    }
                    Err(e) => return Err(e),
                }
            }
            TransitionEffect::DropRoute => routes.drop_route(unit.id).await?,
            TransitionEffect::MarkArrived => {
                if let Some(assignment_id) = unit.current_assignment_id {
                    backend.mark_assignment_arrived(assignment_id).await?;
                }
            }
            TransitionEffect::StampReturnSince => backend.stamp_return_since(unit.id).await?,
        }
    }

    Ok(())
}
