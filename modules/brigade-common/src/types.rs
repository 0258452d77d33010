use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Geo Types ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Haversine great-circle distance between two points in meters.
pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();
    EARTH_RADIUS_M * c
}

// --- Unit ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Available,
    UnderWay,
    OnSite,
    Unavailable,
    Offline,
}

impl UnitStatus {
    /// Statuses a dispatch candidate may be in. A unit already moving can
    /// be redirected; everything else is untouchable.
    pub fn dispatchable(self) -> bool {
        matches!(self, UnitStatus::Available | UnitStatus::UnderWay)
    }
}

impl std::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitStatus::Available => write!(f, "available"),
            UnitStatus::UnderWay => write!(f, "under_way"),
            UnitStatus::OnSite => write!(f, "on_site"),
            UnitStatus::Unavailable => write!(f, "unavailable"),
            UnitStatus::Offline => write!(f, "offline"),
        }
    }
}

impl std::str::FromStr for UnitStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(UnitStatus::Available),
            "under_way" => Ok(UnitStatus::UnderWay),
            "on_site" => Ok(UnitStatus::OnSite),
            "unavailable" => Ok(UnitStatus::Unavailable),
            "offline" => Ok(UnitStatus::Offline),
            other => Err(format!("unknown unit status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: Uuid,
    pub call_sign: String,
    pub unit_type_code: String,
    pub home_base: Option<String>,
    pub status: UnitStatus,
    pub location: GeoPoint,
    pub current_assignment_id: Option<Uuid>,
    pub last_contact_at: Option<DateTime<Utc>>,
    pub return_since: Option<DateTime<Utc>>,
}

// --- Assignment ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Dispatched,
    Arrived,
    Released,
    Cancelled,
}

impl AssignmentStatus {
    pub fn active(self) -> bool {
        matches!(self, AssignmentStatus::Dispatched | AssignmentStatus::Arrived)
    }
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignmentStatus::Dispatched => write!(f, "dispatched"),
            AssignmentStatus::Arrived => write!(f, "arrived"),
            AssignmentStatus::Released => write!(f, "released"),
            AssignmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Append-only dispatch record. Rows are never deleted; preemption and
/// completion flip the status and stamp the matching timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub intervention_id: Uuid,
    pub unit_id: Uuid,
    pub status: AssignmentStatus,
    pub role: String,
    pub dispatched_at: DateTime<Utc>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
}

// --- Intervention ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionStatus {
    Created,
    OnSite,
    Completed,
    Cancelled,
}

impl InterventionStatus {
    pub fn terminal(self) -> bool {
        matches!(self, InterventionStatus::Completed | InterventionStatus::Cancelled)
    }
}

/// The read model the dispatcher needs: intervention joined with its
/// incident's severity and recommended unit types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionBrief {
    pub id: Uuid,
    pub incident_id: Uuid,
    pub status: InterventionStatus,
    pub priority: i32,
    pub severity: i32,
    pub recommended_unit_types: Vec<String>,
    pub location: GeoPoint,
    pub assigned_units_count: i64,
    pub created_at: DateTime<Utc>,
}

impl InterventionBrief {
    /// How many units this intervention still wants. Severity doubles as
    /// the default crew size target.
    pub fn units_wanted(&self) -> usize {
        let target = self.severity.max(1) as i64;
        (target - self.assigned_units_count).max(0) as usize
    }
}

// --- Candidates ---

/// A unit under evaluation for one dispatch request. Built once per
/// request from the spatial candidate query; never persisted.
///
/// `current_intervention_severity` stays `None` when the store cannot
/// resolve it. The scorer treats unknown severity as disqualifying, so
/// this must never be defaulted to a number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub unit_id: Uuid,
    pub call_sign: String,
    pub unit_type_code: String,
    pub home_base: Option<String>,
    pub status: UnitStatus,
    pub location: GeoPoint,
    pub travel_time_seconds: f64,
    pub distance_meters: f64,
    pub other_units_at_base: i32,
    pub current_assignment_id: Option<Uuid>,
    pub current_intervention_id: Option<Uuid>,
    pub current_intervention_severity: Option<i32>,
}

impl Candidate {
    pub fn currently_assigned(&self) -> bool {
        self.current_assignment_id.is_some()
    }
}

/// A candidate with its score attached. Lower is better. Ineligible
/// candidates carry the explicit flag and must never be selected, whatever
/// their numeric score says.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
    pub eligible: bool,
}

impl ScoredCandidate {
    pub fn requires_preemption(&self) -> bool {
        self.candidate.currently_assigned()
    }

    /// Ranking order: score ascending, unit id as the deterministic
    /// tiebreak. Only meaningful among eligible candidates.
    pub fn rank_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.candidate.unit_id.cmp(&other.candidate.unit_id))
    }
}

// --- Route ---

/// A unit's active road route. One per unit at most; deleted the moment
/// the unit leaves the en-route phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub unit_id: Uuid,
    pub intervention_id: Option<Uuid>,
    pub geometry: Vec<GeoPoint>,
    pub length_meters: f64,
    pub duration_seconds: f64,
    pub progress_percent: f64,
}
