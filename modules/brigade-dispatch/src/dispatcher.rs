//! Dispatch orchestration: retrieve candidates, score, commit the best
//! eligible units, preempting lower-severity work when the scorer allows.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use brigade_common::{
    Assignment, BrigadeError, ConfigHandle, DispatchConfig, InterventionBrief, ScoredCandidate,
};

use crate::scorer::score;
use crate::traits::{CandidateSource, DispatchBackend, DispatchCommit, RouteService};

#[derive(Debug, Clone)]
pub struct DispatchedUnit {
    pub assignment: Assignment,
    pub call_sign: String,
    pub score: f64,
    /// Intervention the unit was pulled off, when this dispatch preempted.
    pub preempted_from: Option<Uuid>,
}

/// What a dispatch request actually delivered. `assigned` may be shorter
/// than `requested`; it is never padded with ineligible units.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub intervention_id: Uuid,
    pub requested: usize,
    pub assigned: Vec<DispatchedUnit>,
}

impl DispatchOutcome {
    pub fn fully_satisfied(&self) -> bool {
        self.assigned.len() >= self.requested
    }

    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.assigned.len())
    }
}

pub struct Dispatcher {
    candidates: Arc<dyn CandidateSource>,
    backend: Arc<dyn DispatchBackend>,
    routes: Arc<dyn RouteService>,
    config: Arc<ConfigHandle>,
}

impl Dispatcher {
    pub fn new(
        candidates: Arc<dyn CandidateSource>,
        backend: Arc<dyn DispatchBackend>,
        routes: Arc<dyn RouteService>,
        config: Arc<ConfigHandle>,
    ) -> Self {
        Self {
            candidates,
            backend,
            routes,
            config,
        }
    }

    /// Dispatch as many units as the intervention still wants.
    pub async fn dispatch(&self, intervention_id: Uuid) -> Result<DispatchOutcome, BrigadeError> {
        let brief = self.candidates.intervention(intervention_id).await?;
        let wanted = brief.units_wanted();
        self.dispatch_n(&brief, wanted).await
    }

    /// Dispatch up to `wanted` units to the intervention.
    ///
    /// Walks the ranked eligible candidates, committing one at a time. A
    /// commit lost to a concurrent dispatcher drops that unit and
    /// re-scores against the refreshed pool, so the loser never
    /// overwrites the winner's assignment.
    pub async fn dispatch_n(
        &self,
        brief: &InterventionBrief,
        wanted: usize,
    ) -> Result<DispatchOutcome, BrigadeError> {
        let mut outcome = DispatchOutcome {
            intervention_id: brief.id,
            requested: wanted,
            assigned: Vec::new(),
        };
        if wanted == 0 {
            return Ok(outcome);
        }

        // One snapshot of the weights for the whole dispatch; a reload
        // mid-flight does not mix scoring regimes.
        let config = self.config.current();
        let mut pool = self.ranked_candidates(brief, &config).await?;
        let mut attempted: HashSet<Uuid> = HashSet::new();

        while outcome.assigned.len() < wanted {
            let Some(next) = pool
                .iter()
                .find(|sc| !attempted.contains(&sc.candidate.unit_id))
                .cloned()
            else {
                break;
            };
            attempted.insert(next.candidate.unit_id);

            let role = if outcome.assigned.is_empty() {
                "lead"
            } else {
                "support"
            };

            match self.commit(brief, &next, role).await {
                Ok(dispatched) => outcome.assigned.push(dispatched),
                Err(BrigadeError::AssignmentConflict) => {
                    warn!(
                        unit_id = %next.candidate.unit_id,
                        intervention_id = %brief.id,
                        "Lost dispatch race for unit, refreshing candidate pool"
                    );
                    pool = self.ranked_candidates(brief, &config).await?;
                }
                Err(e) => return Err(e),
            }
        }

        if outcome.fully_satisfied() {
            info!(
                intervention_id = %brief.id,
                assigned = outcome.assigned.len(),
                "Dispatch complete"
            );
        } else {
            warn!(
                intervention_id = %brief.id,
                assigned = outcome.assigned.len(),
                requested = wanted,
                "Partial dispatch: not enough eligible candidates"
            );
        }

        Ok(outcome)
    }

    async fn ranked_candidates(
        &self,
        brief: &InterventionBrief,
        config: &DispatchConfig,
    ) -> Result<Vec<ScoredCandidate>, BrigadeError> {
        let raw = self
            .candidates
            .candidates(
                brief.id,
                &brief.recommended_unit_types,
                config.max_candidates_per_dispatch,
            )
            .await?;

        let mut scored: Vec<ScoredCandidate> = raw
            .iter()
            .map(|c| score(c, brief.severity, config))
            .collect();
        let ineligible = scored.iter().filter(|sc| !sc.eligible).count();
        scored.retain(|sc| sc.eligible);
        scored.sort_by(|a, b| a.rank_cmp(b));

        debug!(
            intervention_id = %brief.id,
            eligible = scored.len(),
            ineligible,
            "Candidate pool scored"
        );
        Ok(scored)
    }

    async fn commit(
        &self,
        brief: &InterventionBrief,
        scored: &ScoredCandidate,
        role: &str,
    ) -> Result<DispatchedUnit, BrigadeError> {
        let candidate = &scored.candidate;

        if scored.requires_preemption() {
            info!(
                call_sign = candidate.call_sign.as_str(),
                from_intervention = ?candidate.current_intervention_id,
                to_intervention = %brief.id,
                "Preempting unit"
            );
        }

        let assignment = self
            .backend
            .commit_dispatch(&DispatchCommit {
                intervention_id: brief.id,
                unit_id: candidate.unit_id,
                role: role.to_string(),
                expected_assignment: candidate.current_assignment_id,
            })
            .await?;

        // The unit is committed; a failed route plan must not undo that.
        match self
            .routes
            .plan_and_save(candidate.unit_id, candidate.location, brief.location, brief.id)
            .await
        {
            Ok(()) => {}
            Err(BrigadeError::RouteUnavailable) => {
                warn!(
                    call_sign = candidate.call_sign.as_str(),
                    "Route unavailable, unit dispatched without geometry"
                );
            }
            Err(e) => {
                warn!(
                    call_sign = candidate.call_sign.as_str(),
                    error = %e,
                    "Failed to store route, unit dispatched without geometry"
                );
            }
        }

        info!(
            call_sign = candidate.call_sign.as_str(),
            intervention_id = %brief.id,
            score = scored.score,
            eta_s = candidate.travel_time_seconds,
            role,
            "Dispatched unit"
        );

        Ok(DispatchedUnit {
            assignment,
            call_sign: candidate.call_sign.clone(),
            score: scored.score,
            preempted_from: candidate.current_intervention_id,
        })
    }
}
