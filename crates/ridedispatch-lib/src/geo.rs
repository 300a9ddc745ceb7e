//! Great-circle helpers for the coordinate dispatch variant, where drivers and
//! riders are placed by latitude/longitude instead of graph nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::drivers::{DriverRegistry, Location, NearbyDriver};
use crate::error::{Error, Result};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Reject non-finite or out-of-range coordinates.
    pub fn validate(&self) -> Result<()> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(Error::invalid_request(format!(
                "latitude {} is outside -90..=90",
                self.lat
            )));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(Error::invalid_request(format!(
                "longitude {} is outside -180..=180",
                self.lng
            )));
        }
        Ok(())
    }

    /// Distance to `other` in kilometres.
    pub fn distance_km(&self, other: &LatLng) -> f64 {
        haversine_distance_km(*self, *other)
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.lat, self.lng)
    }
}

/// Haversine great-circle distance between two points in kilometres.
pub fn haversine_distance_km(a: LatLng, b: LatLng) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Linear scan for available drivers within `max_distance_km` of `pickup`,
/// closest first. Drivers placed on graph nodes are ignored.
pub fn nearest_available_drivers_by_coordinate(
    pickup: LatLng,
    registry: &DriverRegistry,
    max_distance_km: f64,
) -> Vec<NearbyDriver> {
    let mut nearby: Vec<NearbyDriver> = registry
        .iter()
        .filter(|driver| driver.available)
        .filter_map(|driver| match &driver.location {
            Location::Coordinate(position) => Some(NearbyDriver {
                driver_id: driver.id.clone(),
                distance: haversine_distance_km(pickup, *position),
            }),
            Location::Node(_) => None,
        })
        .filter(|candidate| candidate.distance <= max_distance_km)
        .collect();

    nearby.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    nearby
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONNAUGHT_PLACE: LatLng = LatLng::new(28.6315, 77.2167);
    const INDIA_GATE: LatLng = LatLng::new(28.6129, 77.2295);

    #[test]
    fn identical_points_are_zero_apart() {
        assert_eq!(haversine_distance_km(INDIA_GATE, INDIA_GATE), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let there = haversine_distance_km(CONNAUGHT_PLACE, INDIA_GATE);
        let back = haversine_distance_km(INDIA_GATE, CONNAUGHT_PLACE);
        assert!((there - back).abs() < 1e-12);
        assert!(there > 2.0 && there < 3.0, "got {there}");
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = haversine_distance_km(LatLng::new(0.0, 0.0), LatLng::new(1.0, 0.0));
        assert!((d - 111.19).abs() < 0.01, "got {d}");
    }

    #[test]
    fn validate_rejects_out_of_range() {
        assert!(LatLng::new(91.0, 0.0).validate().is_err());
        assert!(LatLng::new(0.0, -181.0).validate().is_err());
        assert!(LatLng::new(f64::NAN, 0.0).validate().is_err());
        assert!(INDIA_GATE.validate().is_ok());
    }
}
