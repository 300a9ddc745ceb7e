//! Directions providers for the coordinate dispatch variant.
//!
//! The engine only depends on [`DirectionsProvider`]. Two backends are
//! provided:
//!
//! - [`StraightLineDirections`]: great-circle estimate at a fixed speed, no
//!   network access.
//! - [`OsrmDirections`]: blocking HTTP client for an OSRM `route` endpoint.
//!
//! Provider failures are returned as errors; callers treat them as "no route
//! available" and never retry automatically.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::geo::{haversine_distance_km, LatLng};
use crate::path::{RoutePath, RouteResult};

/// Average city driving speed used by the straight-line estimate.
pub const DEFAULT_SPEED_KMH: f64 = 40.0;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Driving directions between two coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directions {
    /// Human readable distance, e.g. `"12.4 km"`.
    pub distance_text: String,
    /// Human readable duration, e.g. `"19 mins"`.
    pub duration_text: String,
    /// Encoded polyline of the route geometry.
    pub polyline: String,
    pub distance_km: f64,
    pub duration_minutes: f64,
    /// Untouched provider payload, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl Directions {
    /// Build directions from numeric totals, deriving the display texts.
    pub fn from_totals(distance_km: f64, duration_minutes: f64, polyline: String) -> Self {
        Self {
            distance_text: format_distance(distance_km),
            duration_text: format_duration(duration_minutes),
            polyline,
            distance_km,
            duration_minutes,
            raw: None,
        }
    }

    /// Convert into the engine's route representation.
    pub fn to_route(&self) -> RouteResult {
        RouteResult {
            path: RoutePath::Polyline(self.polyline.clone()),
            distance: self.distance_km,
            estimated_time: self.duration_minutes.round().max(0.0) as u64,
        }
    }
}

/// Source of driving directions between two coordinates.
pub trait DirectionsProvider: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    fn directions(&self, origin: LatLng, destination: LatLng) -> Result<Directions>;
}

/// Straight-line directions at a constant speed.
#[derive(Debug, Clone)]
pub struct StraightLineDirections {
    pub speed_kmh: f64,
}

impl Default for StraightLineDirections {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl DirectionsProvider for StraightLineDirections {
    fn name(&self) -> &'static str {
        "straight-line"
    }

    fn directions(&self, origin: LatLng, destination: LatLng) -> Result<Directions> {
        if self.speed_kmh <= 0.0 {
            return Err(Error::provider(format!(
                "speed must be positive, got {}",
                self.speed_kmh
            )));
        }
        let distance_km = haversine_distance_km(origin, destination);
        let duration_minutes = distance_km / self.speed_kmh * 60.0;
        Ok(Directions::from_totals(
            distance_km,
            duration_minutes,
            encode_polyline(&[origin, destination]),
        ))
    }
}

/// Directions from an OSRM HTTP endpoint (e.g. `http://localhost:5000`).
#[derive(Debug, Clone)]
pub struct OsrmDirections {
    client: Client,
    endpoint: String,
}

impl OsrmDirections {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn route_url(&self, origin: LatLng, destination: LatLng) -> String {
        format!(
            "{}/route/v1/driving/{:.6},{:.6};{:.6},{:.6}?overview=full&geometries=polyline",
            self.endpoint, origin.lng, origin.lat, destination.lng, destination.lat,
        )
    }
}

impl DirectionsProvider for OsrmDirections {
    fn name(&self) -> &'static str {
        "osrm"
    }

    fn directions(&self, origin: LatLng, destination: LatLng) -> Result<Directions> {
        let url = self.route_url(origin, destination);
        debug!(%url, "requesting OSRM route");
        let payload: serde_json::Value = self
            .client
            .get(&url)
            .send()?
            .error_for_status()?
            .json()?;
        parse_osrm_route(payload)
    }
}

#[derive(Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    /// Metres.
    distance: f64,
    /// Seconds.
    duration: f64,
    geometry: String,
}

/// Interpret an OSRM `route` response, keeping the payload as `raw`.
pub fn parse_osrm_route(payload: serde_json::Value) -> Result<Directions> {
    let response: OsrmResponse = serde_json::from_value(payload.clone())?;
    if response.code != "Ok" {
        return Err(Error::provider(format!(
            "OSRM returned {}{}",
            response.code,
            response
                .message
                .map(|message| format!(": {message}"))
                .unwrap_or_default()
        )));
    }
    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| Error::provider("OSRM returned no routes"))?;

    let mut directions =
        Directions::from_totals(route.distance / 1000.0, route.duration / 60.0, route.geometry);
    directions.raw = Some(payload);
    Ok(directions)
}

/// Encode coordinates with the Google polyline algorithm (precision 5).
pub fn encode_polyline(points: &[LatLng]) -> String {
    let mut encoded = String::new();
    let (mut previous_lat, mut previous_lng) = (0i64, 0i64);
    for point in points {
        let lat = (point.lat * 1e5).round() as i64;
        let lng = (point.lng * 1e5).round() as i64;
        encode_value(lat - previous_lat, &mut encoded);
        encode_value(lng - previous_lng, &mut encoded);
        previous_lat = lat;
        previous_lng = lng;
    }
    encoded
}

fn encode_value(value: i64, out: &mut String) {
    let mut chunk = if value < 0 { !(value << 1) } else { value << 1 };
    while chunk >= 0x20 {
        out.push(char::from((((chunk & 0x1f) | 0x20) + 63) as u8));
        chunk >>= 5;
    }
    out.push(char::from((chunk + 63) as u8));
}

fn format_distance(distance_km: f64) -> String {
    if distance_km < 1.0 {
        format!("{} m", (distance_km * 1000.0).round() as i64)
    } else {
        format!("{:.1} km", distance_km)
    }
}

fn format_duration(minutes: f64) -> String {
    let total = minutes.round().max(1.0) as i64;
    let (hours, mins) = (total / 60, total % 60);
    match (hours, mins) {
        (0, m) => format!("{m} min{}", plural(m)),
        (h, 0) => format!("{h} hour{}", plural(h)),
        (h, m) => format!("{h} hour{} {m} min{}", plural(h), plural(m)),
    }
}

fn plural(count: i64) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
