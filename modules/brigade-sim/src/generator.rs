//! Random incident generation for training exercises.

use rand::Rng;
use tracing::info;
use uuid::Uuid;

use brigade_common::{BrigadeError, GeoPoint};
use brigade_store::Store;

const UNIT_TYPE_POOLS: &[&[&str]] = &[
    &["fire_engine"],
    &["fire_engine", "ladder"],
    &["ambulance"],
    &["ambulance", "fire_engine"],
    &["rescue"],
];

/// Produces incidents at random points inside the exercise area, with
/// severity skewed toward the low end the way real call volume is.
pub struct IncidentGenerator {
    center: GeoPoint,
    radius_km: f64,
}

impl IncidentGenerator {
    pub fn new(center: GeoPoint, radius_km: f64) -> Self {
        Self { center, radius_km }
    }

    /// Insert one incident and its intervention. The simulation plays the
    /// role of the external incident creator here; the dispatch loop
    /// picks the intervention up on its next pass.
    pub async fn spawn_incident(&self, store: &Store) -> Result<Uuid, BrigadeError> {
        let severity = self.roll_severity();
        let location = self.roll_location();
        let unit_types = self.roll_unit_types();

        let incident_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO incidents (id, severity, recommended_unit_types, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(incident_id)
        .bind(severity)
        .bind(&unit_types)
        .bind(location.lat)
        .bind(location.lon)
        .execute(store.pool())
        .await
        .map_err(|e| BrigadeError::Database(e.to_string()))?;

        let intervention_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO interventions (id, incident_id, status, priority)
            VALUES ($1, $2, 'created', $3)
            "#,
        )
        .bind(intervention_id)
        .bind(incident_id)
        .bind(severity)
        .execute(store.pool())
        .await
        .map_err(|e| BrigadeError::Database(e.to_string()))?;

        info!(
            intervention_id = %intervention_id,
            severity,
            lat = location.lat,
            lon = location.lon,
            "Simulated incident created"
        );
        Ok(intervention_id)
    }

    /// 1–5, weighted toward minor incidents.
    fn roll_severity(&self) -> i32 {
        let roll: u32 = rand::rng().random_range(0..100);
        match roll {
            0..=39 => 1,
            40..=64 => 2,
            65..=84 => 3,
            85..=94 => 4,
            _ => 5,
        }
    }

    /// Uniform point on the disk around the exercise center.
    fn roll_location(&self) -> GeoPoint {
        let mut rng = rand::rng();
        let bearing: f64 = rng.random_range(0.0..std::f64::consts::TAU);
        let distance_km = self.radius_km * rng.random_range(0.0f64..1.0).sqrt();

        let d_lat = (distance_km / 111.32) * bearing.cos();
        let d_lon =
            (distance_km / (111.32 * self.center.lat.to_radians().cos())) * bearing.sin();
        GeoPoint::new(self.center.lat + d_lat, self.center.lon + d_lon)
    }

    fn roll_unit_types(&self) -> Vec<String> {
        let pool = UNIT_TYPE_POOLS[rand::rng().random_range(0..UNIT_TYPE_POOLS.len())];
        pool.iter().map(|s| s.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use brigade_common::haversine_m;

    use super::*;

    #[test]
    fn generated_points_stay_inside_the_radius() {
        let center = GeoPoint::new(47.218, -1.5536);
        let generator = IncidentGenerator::new(center, 10.0);
        for _ in 0..200 {
            let p = generator.roll_location();
            let d = haversine_m(center, p);
            assert!(d <= 10_050.0, "point {d} m from center");
        }
    }

    #[test]
    fn severity_stays_in_band() {
        let generator = IncidentGenerator::new(GeoPoint::new(47.0, -1.5), 5.0);
        for _ in 0..200 {
            let s = generator.roll_severity();
            assert!((1..=5).contains(&s));
        }
    }
}
