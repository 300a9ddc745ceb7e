//! Ride dispatch library entry points.
//!
//! This crate matches ride requests to nearby drivers, routes them over a
//! weighted road graph or between geographic coordinates, and tracks every
//! ride through `pending → matched → in-progress → completed`. Front ends
//! (the CLI, tests, benchmarks) drive a [`DispatchEngine`] and should only
//! depend on the items exported here.
//!
//! Two dispatch variants share the engine:
//!
//! - [`GraphDispatch`]: drivers and riders sit on graph nodes; matching picks
//!   the nearest available driver and routes with Dijkstra.
//! - [`CoordinateDispatch`]: drivers and riders are placed by latitude and
//!   longitude; matching scores candidates by distance and rating and routes
//!   through a [`DirectionsProvider`].

pub mod config;
pub mod directions;
pub mod dispatch;
pub mod drivers;
pub mod error;
pub mod geo;
pub mod graph;
pub mod ledger;
pub mod output;
pub mod path;
pub mod places;
pub mod scenario;
pub mod scheduler;
pub mod store;

pub use config::{DispatchConfig, DispatchMode};
pub use directions::{Directions, DirectionsProvider, OsrmDirections, StraightLineDirections};
pub use dispatch::{
    CoordinateDispatch, DispatchEngine, DispatchEvent, DispatchSnapshot, DispatchStrategy,
    Dispatcher, GraphDispatch, MatchCandidate, RideSubmission, UnmatchedReason,
};
pub use drivers::{Driver, DriverId, DriverRegistry, Location, NearbyDriver};
pub use error::{Error, Result};
pub use geo::{haversine_distance_km, nearest_available_drivers_by_coordinate, LatLng};
pub use graph::{Edge, Graph, Node, NodeId, NodeKind, Position};
pub use ledger::{RideId, RideLedger, RideRequest, RideStatus};
pub use output::{RouteOutputKind, RouteSummary};
pub use path::{
    nearest_available_drivers, nearest_available_drivers_exact, shortest_path, ProximitySearch,
    RoutePath, RouteResult,
};
pub use places::{Gazetteer, Geocoder, Place};
pub use scenario::Scenario;
pub use scheduler::TaskKind;
pub use store::{default_store_dir, JsonRideStore, RideStore};
