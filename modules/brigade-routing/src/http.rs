//! HTTP client for the road-graph routing service.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use brigade_common::GeoPoint;

use crate::provider::{PlannedRoute, RouteError, RoutingProvider};

pub struct HttpRoutingProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct CalculateRouteRequest {
    from_lat: f64,
    from_lon: f64,
    to_lat: f64,
    to_lon: f64,
}

#[derive(Deserialize)]
struct CalculateRouteResponse {
    route_geojson: String,
    route_length_meters: f64,
    estimated_duration_seconds: f64,
}

/// GeoJSON LineString wire shape. Coordinates are [lon, lat] pairs,
/// possibly with a trailing altitude component.
#[derive(Deserialize)]
struct LineString {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Vec<Vec<f64>>,
}

impl HttpRoutingProvider {
    /// Build a provider with a hard per-request timeout. A provider call
    /// that exceeds it resolves to `Unavailable` rather than hanging the
    /// dispatcher.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RoutingProvider for HttpRoutingProvider {
    async fn plan(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<PlannedRoute, RouteError> {
        let url = format!("{}/v1/routing/calculate", self.base_url);
        let body = CalculateRouteRequest {
            from_lat: origin.lat,
            from_lon: origin.lon,
            to_lat: destination.lat,
            to_lon: destination.lon,
        };

        let response = match self.client.post(&url).json(&body).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Routing provider unreachable");
                return Err(RouteError::Unavailable);
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "Routing provider returned non-OK status");
            return Err(RouteError::Unavailable);
        }

        let parsed: CalculateRouteResponse = response
            .json()
            .await
            .map_err(|e| RouteError::Provider(e.to_string()))?;

        let geometry = parse_linestring(&parsed.route_geojson)?;
        if geometry.len() < 2 || parsed.route_length_meters <= 0.0 {
            warn!("Routing provider returned empty geometry");
            return Err(RouteError::Unavailable);
        }

        Ok(PlannedRoute {
            geometry,
            length_meters: parsed.route_length_meters,
            duration_seconds: parsed.estimated_duration_seconds,
        })
    }
}

fn parse_linestring(geojson: &str) -> Result<Vec<GeoPoint>, RouteError> {
    if geojson.is_empty() {
        return Err(RouteError::Unavailable);
    }

    let line: LineString =
        serde_json::from_str(geojson).map_err(|e| RouteError::Provider(e.to_string()))?;

    if line.kind != "LineString" {
        return Err(RouteError::Provider(format!(
            "expected LineString geometry, got {}",
            line.kind
        )));
    }

    let mut points = Vec::with_capacity(line.coordinates.len());
    for pair in &line.coordinates {
        if pair.len() < 2 {
            return Err(RouteError::Provider("malformed coordinate pair".into()));
        }
        points.push(GeoPoint::new(pair[1], pair[0]));
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_linestring_as_lat_lon() {
        let geojson = r#"{"type":"LineString","coordinates":[[-1.55,47.21],[-1.54,47.22]]}"#;
        let points = parse_linestring(geojson).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].lat, 47.21);
        assert_eq!(points[0].lon, -1.55);
    }

    #[test]
    fn rejects_non_linestring_geometry() {
        let geojson = r#"{"type":"Point","coordinates":[[-1.55,47.21]]}"#;
        assert!(matches!(
            parse_linestring(geojson),
            Err(RouteError::Provider(_))
        ));
    }

    #[test]
    fn empty_geojson_is_unavailable() {
        assert!(matches!(parse_linestring(""), Err(RouteError::Unavailable)));
    }
}
