//! Common test utilities and fixture helpers.
//!
//! Builders for small road graphs, driver fleets and engines shared by the
//! integration tests.

use std::time::Duration;

use ridedispatch_lib::{
    DirectionsProvider, Directions, DispatchConfig, DispatchEngine, DispatchEvent, Driver,
    DriverRegistry, Edge, Error, GraphDispatch, LatLng, Location, Node, RideId, RideSubmission,
    Scenario,
};

/// Kilometres per degree of latitude on the haversine sphere.
#[allow(dead_code)]
pub const KM_PER_DEGREE_LAT: f64 = 6371.0 * std::f64::consts::PI / 180.0;

/// A–B (5) and B–C (7) plus an isolated node `X`.
#[allow(dead_code)]
pub fn abc_scenario(drivers: Vec<Driver>) -> Scenario {
    Scenario {
        nodes: vec![
            Node::intersection("A", "Downtown", 0.0, 0.0),
            Node::intersection("B", "Mall", 1.0, 0.0),
            Node::intersection("C", "Airport", 2.0, 0.0),
            Node::intersection("X", "Island", 5.0, 5.0),
        ],
        edges: vec![Edge::new("A", "B", 5.0, 5.0), Edge::new("B", "C", 7.0, 7.0)],
        drivers,
    }
}

/// Demo city engine with default graph settings and a fixed start time.
#[allow(dead_code)]
pub fn demo_city_engine() -> DispatchEngine<GraphDispatch> {
    demo_city_engine_with(DispatchConfig::default())
}

#[allow(dead_code)]
pub fn demo_city_engine_with(config: DispatchConfig) -> DispatchEngine<GraphDispatch> {
    Scenario::demo_city()
        .graph_engine(config)
        .expect("demo city builds")
        .with_start_time(1_700_000_000_000)
}

#[allow(dead_code)]
pub fn node_ride(pickup: &str, destination: &str) -> RideSubmission {
    RideSubmission::new(
        "passenger_1",
        "Asha Verma",
        Location::node(pickup),
        Location::node(destination),
    )
}

#[allow(dead_code)]
pub fn coordinate_ride(pickup: LatLng, destination: LatLng) -> RideSubmission {
    RideSubmission::new(
        "passenger_1",
        "Asha Verma",
        Location::Coordinate(pickup),
        Location::Coordinate(destination),
    )
}

/// Point `km` kilometres due north of `origin` (south when negative).
#[allow(dead_code)]
pub fn north_of(origin: LatLng, km: f64) -> LatLng {
    LatLng::new(origin.lat + km / KM_PER_DEGREE_LAT, origin.lng)
}

/// Driver matched to `ride_id` in `events`, if any.
#[allow(dead_code)]
pub fn matched_driver(events: &[DispatchEvent], ride_id: &RideId) -> Option<String> {
    events.iter().find_map(|event| match event {
        DispatchEvent::Matched {
            ride_id: id,
            driver_id,
            ..
        } if id == ride_id => Some(driver_id.clone()),
        _ => None,
    })
}

#[allow(dead_code)]
pub fn seconds(n: u64) -> Duration {
    Duration::from_secs(n)
}

#[allow(dead_code)]
pub fn registry(drivers: Vec<Driver>) -> DriverRegistry {
    DriverRegistry::from_drivers(drivers).expect("valid drivers")
}

/// Directions provider that always fails, like an unreachable network.
#[allow(dead_code)]
pub struct FailingDirections;

impl DirectionsProvider for FailingDirections {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn directions(&self, _origin: LatLng, _destination: LatLng) -> Result<Directions, Error> {
        Err(Error::Provider {
            message: "connection refused".to_string(),
        })
    }
}
