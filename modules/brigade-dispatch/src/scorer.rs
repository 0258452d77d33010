//! Multi-objective candidate scoring.
//!
//! Score formula (lower = better):
//!   score = w_travel × travel_time_seconds
//!         + w_coverage × base_shortage × 100
//!         + w_capability (negative = bonus, available units only)
//!         + w_preemption_delta × severity_delta + w_reassignment_cost
//!           (only when the candidate is mid-assignment)
//!
//! Disqualification is an explicit `eligible = false` flag, never a
//! sentinel score: summing weights onto a sentinel risks overflow and can
//! silently re-qualify a candidate when bonus terms are negative.

use tracing::debug;

use brigade_common::{Candidate, DispatchConfig, ScoredCandidate, UnitStatus};

/// Score one candidate for an intervention of `target_severity`.
///
/// Pure in-memory computation; never suspends. Config values arrive
/// already bounds-checked.
pub fn score(
    candidate: &Candidate,
    target_severity: i32,
    config: &DispatchConfig,
) -> ScoredCandidate {
    let travel = config.weight_travel_time * candidate.travel_time_seconds;
    let coverage = coverage_penalty(candidate, config);
    let capability = if candidate.status == UnitStatus::Available {
        config.weight_capability_match
    } else {
        0.0
    };

    let mut total = travel + coverage + capability;
    let mut eligible = true;

    if candidate.currently_assigned() {
        match candidate.current_intervention_severity {
            // Unknown severity of the current job: never assume it is
            // safe to pull the unit off it.
            None => {
                debug!(
                    call_sign = candidate.call_sign.as_str(),
                    "Disqualified: current intervention severity unknown"
                );
                eligible = false;
            }
            Some(current) => {
                let severity_delta = target_severity - current;
                if severity_delta < config.preemption_severity_threshold {
                    debug!(
                        call_sign = candidate.call_sign.as_str(),
                        severity_delta,
                        threshold = config.preemption_severity_threshold,
                        "Disqualified: severity delta below preemption threshold"
                    );
                    eligible = false;
                } else {
                    total += config.weight_preemption_delta * severity_delta as f64
                        + config.weight_reassignment_cost;
                }
            }
        }
    }

    debug!(
        call_sign = candidate.call_sign.as_str(),
        travel,
        coverage,
        score = total,
        eligible,
        "Scored candidate"
    );

    ScoredCandidate {
        candidate: candidate.clone(),
        score: total,
        eligible,
    }
}

/// Penalty for pulling a unit out of a base that would drop below its
/// minimum standing reserve of available units.
fn coverage_penalty(candidate: &Candidate, config: &DispatchConfig) -> f64 {
    if candidate.other_units_at_base < config.min_reserve_per_base {
        let shortage = config.min_reserve_per_base - candidate.other_units_at_base;
        config.weight_coverage_penalty * shortage as f64 * 100.0
    } else {
        0.0
    }
}
