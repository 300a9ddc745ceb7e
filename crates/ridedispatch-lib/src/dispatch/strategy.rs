//! Matching and routing strategies for the dispatch engine.
//!
//! Each dispatch variant is a [`DispatchStrategy`]: it validates locations,
//! picks a driver for a pending ride and computes the routes the engine
//! stores. The engine owns all state; strategies only read it.

use serde::Serialize;
use tracing::debug;

use crate::config::{DispatchConfig, DispatchMode};
use crate::directions::DirectionsProvider;
use crate::drivers::{Driver, DriverId, DriverRegistry, Location};
use crate::error::{Error, Result};
use crate::geo::{nearest_available_drivers_by_coordinate, LatLng};
use crate::graph::Graph;
use crate::ledger::RideRequest;
use crate::path::{shortest_path, RouteResult};

/// Driver chosen for a ride.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub driver_id: DriverId,
    /// Distance from the pickup (graph weight units or kilometres).
    pub distance: f64,
    /// Score for scored matching; `None` for pure proximity matching.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Dispatch variant plugged into the engine.
pub trait DispatchStrategy: Send + Sync {
    fn mode(&self) -> DispatchMode;

    /// Reject locations this variant cannot serve.
    fn validate_locations(&self, pickup: &Location, destination: &Location) -> Result<()>;

    /// Choose an available driver for `ride`, if any.
    fn select_driver(
        &self,
        ride: &RideRequest,
        drivers: &DriverRegistry,
        config: &DispatchConfig,
    ) -> Option<MatchCandidate>;

    /// Route stored when `driver` is assigned to `ride`.
    fn assignment_route(&self, ride: &RideRequest, driver: &Driver) -> Result<RouteResult>;

    /// When `true`, a failed [`Self::assignment_route`] prevents the match.
    fn route_required_for_assignment(&self) -> bool;

    /// Pickup to destination route for display.
    fn trip_route(&self, ride: &RideRequest) -> Result<RouteResult>;
}

/// Proximity matching and Dijkstra routing over a road graph.
#[derive(Debug, Clone)]
pub struct GraphDispatch {
    graph: Graph,
}

impl GraphDispatch {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub(crate) fn route_between(&self, start: &str, goal: &str) -> Result<RouteResult> {
        shortest_path(&self.graph, start, goal).ok_or_else(|| Error::RouteNotFound {
            start: start.to_string(),
            goal: goal.to_string(),
        })
    }

    fn node_location<'a>(&self, location: &'a Location) -> Result<&'a str> {
        let node = location.as_node().ok_or_else(|| {
            Error::invalid_request(format!(
                "graph dispatch needs node locations, got coordinate {location}"
            ))
        })?;
        if !self.graph.contains_node(node) {
            return Err(self.graph.unknown_node(node));
        }
        Ok(node)
    }
}

impl DispatchStrategy for GraphDispatch {
    fn mode(&self) -> DispatchMode {
        DispatchMode::Graph
    }

    fn validate_locations(&self, pickup: &Location, destination: &Location) -> Result<()> {
        self.node_location(pickup)?;
        self.node_location(destination)?;
        Ok(())
    }

    fn select_driver(
        &self,
        ride: &RideRequest,
        drivers: &DriverRegistry,
        config: &DispatchConfig,
    ) -> Option<MatchCandidate> {
        let pickup = ride.pickup.as_node()?;
        let nearby =
            config
                .proximity_search
                .search(&self.graph, pickup, drivers, config.graph_max_distance);
        debug!(ride = %ride.id, candidates = nearby.len(), "graph proximity search");

        nearby
            .into_iter()
            .find(|candidate| {
                drivers
                    .get(&candidate.driver_id)
                    .is_some_and(|driver| driver.available)
            })
            .map(|candidate| MatchCandidate {
                driver_id: candidate.driver_id,
                distance: candidate.distance,
                score: None,
            })
    }

    /// Driver to pickup followed by pickup to destination. Both legs must
    /// exist.
    fn assignment_route(&self, ride: &RideRequest, driver: &Driver) -> Result<RouteResult> {
        let driver_node = self.node_location(&driver.location)?;
        let pickup = self.node_location(&ride.pickup)?;
        let destination = self.node_location(&ride.destination)?;

        let to_pickup = self.route_between(driver_node, pickup)?;
        let trip = self.route_between(pickup, destination)?;
        to_pickup.join(trip).ok_or_else(|| Error::RouteNotFound {
            start: driver_node.to_string(),
            goal: destination.to_string(),
        })
    }

    fn route_required_for_assignment(&self) -> bool {
        true
    }

    fn trip_route(&self, ride: &RideRequest) -> Result<RouteResult> {
        let pickup = self.node_location(&ride.pickup)?;
        let destination = self.node_location(&ride.destination)?;
        self.route_between(pickup, destination)
    }
}

/// Score a coordinate candidate: up to 10 points for proximity plus twice
/// the rating. Higher is better.
pub fn driver_score(distance_km: f64, rating: f64) -> f64 {
    (10.0 - distance_km).max(0.0) + rating * 2.0
}

/// Scored matching over coordinates with routes from a directions provider.
pub struct CoordinateDispatch {
    provider: Box<dyn DirectionsProvider>,
}

impl CoordinateDispatch {
    pub fn new(provider: Box<dyn DirectionsProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &dyn DirectionsProvider {
        self.provider.as_ref()
    }

    /// Score every available driver within `radius_km` of `pickup`, closest
    /// first.
    pub fn scored_candidates(
        &self,
        pickup: LatLng,
        drivers: &DriverRegistry,
        radius_km: f64,
    ) -> Vec<MatchCandidate> {
        nearest_available_drivers_by_coordinate(pickup, drivers, radius_km)
            .into_iter()
            .filter_map(|nearby| {
                let driver = drivers.get(&nearby.driver_id)?;
                Some(MatchCandidate {
                    score: Some(driver_score(nearby.distance, driver.rating)),
                    driver_id: nearby.driver_id,
                    distance: nearby.distance,
                })
            })
            .collect()
    }

    fn coordinate(location: &Location) -> Result<LatLng> {
        let point = location.as_coordinate().ok_or_else(|| {
            Error::invalid_request(format!(
                "coordinate dispatch needs lat/lng locations, got node {location}"
            ))
        })?;
        point.validate()?;
        Ok(point)
    }
}

impl std::fmt::Debug for CoordinateDispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinateDispatch")
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl DispatchStrategy for CoordinateDispatch {
    fn mode(&self) -> DispatchMode {
        DispatchMode::Coordinate
    }

    fn validate_locations(&self, pickup: &Location, destination: &Location) -> Result<()> {
        Self::coordinate(pickup)?;
        Self::coordinate(destination)?;
        Ok(())
    }

    /// Highest score wins; on an exact tie the closer candidate is kept.
    fn select_driver(
        &self,
        ride: &RideRequest,
        drivers: &DriverRegistry,
        config: &DispatchConfig,
    ) -> Option<MatchCandidate> {
        let pickup = ride.pickup.as_coordinate()?;
        let candidates = self.scored_candidates(pickup, drivers, config.coordinate_radius_km);
        debug!(ride = %ride.id, candidates = candidates.len(), "scored coordinate search");

        candidates.into_iter().fold(None, |best, candidate| match best {
            Some(current) if candidate.score <= current.score => Some(current),
            _ => Some(candidate),
        })
    }

    fn assignment_route(&self, ride: &RideRequest, _driver: &Driver) -> Result<RouteResult> {
        self.trip_route(ride)
    }

    fn route_required_for_assignment(&self) -> bool {
        false
    }

    fn trip_route(&self, ride: &RideRequest) -> Result<RouteResult> {
        let pickup = Self::coordinate(&ride.pickup)?;
        let destination = Self::coordinate(&ride.destination)?;
        self.provider
            .directions(pickup, destination)
            .map(|directions| directions.to_route())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closer_well_rated_driver_scores_higher() {
        let near = driver_score(3.0, 4.9);
        let far = driver_score(8.0, 4.5);
        assert!((near - 16.8).abs() < 1e-9);
        assert!((far - 11.0).abs() < 1e-9);
    }

    #[test]
    fn distance_score_never_negative() {
        assert!((driver_score(14.0, 4.0) - 8.0).abs() < 1e-9);
    }
}
