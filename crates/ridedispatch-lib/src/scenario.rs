//! City and fleet fixtures.
//!
//! A [`Scenario`] bundles the road graph and the driver fleet an engine is
//! built from. Scenarios load from JSON:
//!
//! ```json
//! {
//!   "nodes": [{ "id": "A", "name": "Downtown", "position": { "x": 100, "y": 100 } }],
//!   "edges": [{ "from": "A", "to": "B", "weight": 5, "distance": 5 }],
//!   "drivers": [{ "id": "driver1", "name": "Alice", "location": { "node": "A" },
//!                 "available": true, "rating": 4.8 }]
//! }
//! ```
//!
//! Two built-in scenarios are provided: [`Scenario::demo_city`] for graph
//! dispatch and [`Scenario::demo_fleet`] for coordinate dispatch.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{DispatchConfig, DispatchMode};
use crate::directions::DirectionsProvider;
use crate::dispatch::{CoordinateDispatch, DispatchEngine, GraphDispatch};
use crate::drivers::{Driver, DriverRegistry, Location};
use crate::error::{Error, Result};
use crate::geo::LatLng;
use crate::graph::{Edge, Graph, Node};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub drivers: Vec<Driver>,
}

impl Scenario {
    /// Load and validate a scenario file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let scenario = Self::from_json(&contents)?;
        debug!(
            path = %path.display(),
            nodes = scenario.nodes.len(),
            edges = scenario.edges.len(),
            drivers = scenario.drivers.len(),
            "scenario loaded"
        );
        Ok(scenario)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(contents)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Built-in scenario for a mode.
    pub fn demo(mode: DispatchMode) -> Self {
        match mode {
            DispatchMode::Graph => Self::demo_city(),
            DispatchMode::Coordinate => Self::demo_fleet(),
        }
    }

    /// Ten intersections joined by eighteen two-way roads, with five drivers
    /// of which `driver4` is off duty.
    pub fn demo_city() -> Self {
        let nodes = [
            ("A", "Downtown", 100.0, 100.0),
            ("B", "Mall", 300.0, 100.0),
            ("C", "Airport", 500.0, 100.0),
            ("D", "University", 100.0, 250.0),
            ("E", "Hospital", 300.0, 250.0),
            ("F", "Stadium", 500.0, 250.0),
            ("G", "Beach", 100.0, 400.0),
            ("H", "Park", 300.0, 400.0),
            ("I", "Station", 500.0, 400.0),
            ("J", "Office District", 700.0, 250.0),
        ]
        .into_iter()
        .map(|(id, name, x, y)| Node::intersection(id, name, x, y))
        .collect();

        let edges = [
            ("A", "B", 5.0),
            ("B", "C", 7.0),
            ("A", "D", 4.0),
            ("B", "E", 3.0),
            ("C", "F", 6.0),
            ("D", "E", 5.0),
            ("E", "F", 4.0),
            ("D", "G", 8.0),
            ("E", "H", 6.0),
            ("F", "I", 5.0),
            ("G", "H", 4.0),
            ("H", "I", 3.0),
            ("C", "J", 8.0),
            ("F", "J", 5.0),
            ("I", "J", 7.0),
            ("A", "E", 6.0),
            ("B", "H", 8.0),
            ("D", "H", 7.0),
        ]
        .into_iter()
        .map(|(from, to, weight)| Edge::new(from, to, weight, weight))
        .collect();

        let drivers = vec![
            Driver::at_node("driver1", "Alice Johnson", "A", 4.8),
            Driver::at_node("driver2", "Bob Smith", "E", 4.6),
            Driver::at_node("driver3", "Carol Davis", "I", 4.9),
            Driver::at_node("driver4", "David Wilson", "C", 4.7).unavailable(),
            Driver::at_node("driver5", "Eva Brown", "G", 4.5),
        ];

        Self {
            nodes,
            edges,
            drivers,
        }
    }

    /// Eight drivers around central New Delhi; `driver4` and `driver8` are
    /// off duty.
    pub fn demo_fleet() -> Self {
        let drivers = [
            ("driver1", "Rajesh Kumar", 28.6239, 77.209, true, 4.8),
            ("driver2", "Priya Sharma", 28.6139, 77.229, true, 4.6),
            ("driver3", "Amit Singh", 28.6039, 77.199, true, 4.9),
            ("driver4", "Sunita Gupta", 28.6339, 77.219, false, 4.7),
            ("driver5", "Vikram Patel", 28.5939, 77.239, true, 4.5),
            ("driver6", "Meera Joshi", 28.6439, 77.189, true, 4.8),
            ("driver7", "Ravi Agarwal", 28.5839, 77.249, true, 4.4),
            ("driver8", "Kavita Reddy", 28.6539, 77.179, false, 4.9),
        ]
        .into_iter()
        .map(|(id, name, lat, lng, available, rating)| {
            let driver = Driver::at_coordinate(id, name, LatLng::new(lat, lng), rating);
            if available {
                driver
            } else {
                driver.unavailable()
            }
        })
        .collect();

        Self {
            drivers,
            ..Self::default()
        }
    }

    /// Check structural consistency: unique node ids, edges between known
    /// nodes with positive costs, drivers placed on known nodes or valid
    /// coordinates, ratings in range and unique driver ids.
    pub fn validate(&self) -> Result<()> {
        let mut node_ids = HashSet::new();
        for node in &self.nodes {
            if !node_ids.insert(node.id.as_str()) {
                return Err(invalid(format!("duplicate node id {}", node.id)));
            }
        }

        for edge in &self.edges {
            for endpoint in [&edge.from, &edge.to] {
                if !node_ids.contains(endpoint.as_str()) {
                    return Err(invalid(format!(
                        "edge {} -> {} references unknown node {}",
                        edge.from, edge.to, endpoint
                    )));
                }
            }
            if !(edge.weight.is_finite() && edge.weight > 0.0)
                || !(edge.distance.is_finite() && edge.distance > 0.0)
            {
                return Err(invalid(format!(
                    "edge {} -> {} must have positive weight and distance",
                    edge.from, edge.to
                )));
            }
        }

        for driver in &self.drivers {
            match &driver.location {
                Location::Node(node) if !node_ids.contains(node.as_str()) => {
                    return Err(invalid(format!(
                        "driver {} is placed on unknown node {}",
                        driver.id, node
                    )));
                }
                Location::Coordinate(point) => point.validate().map_err(|err| {
                    invalid(format!("driver {} has bad coordinates: {err}", driver.id))
                })?,
                Location::Node(_) => {}
            }
        }

        self.registry().map(|_| ())
    }

    pub fn graph(&self) -> Graph {
        let mut graph = Graph::new();
        for node in &self.nodes {
            graph.add_node(node.clone());
        }
        for edge in &self.edges {
            graph.add_edge(edge.clone());
        }
        graph
    }

    pub fn registry(&self) -> Result<DriverRegistry> {
        DriverRegistry::from_drivers(self.drivers.iter().cloned())
    }

    /// Graph dispatch engine over this scenario's roads and drivers.
    pub fn graph_engine(&self, config: DispatchConfig) -> Result<DispatchEngine<GraphDispatch>> {
        Ok(DispatchEngine::new(
            GraphDispatch::new(self.graph()),
            self.registry()?,
            config,
        ))
    }

    /// Coordinate dispatch engine over this scenario's drivers.
    pub fn coordinate_engine(
        &self,
        provider: Box<dyn DirectionsProvider>,
        config: DispatchConfig,
    ) -> Result<DispatchEngine<CoordinateDispatch>> {
        Ok(DispatchEngine::new(
            CoordinateDispatch::new(provider),
            self.registry()?,
            config,
        ))
    }
}

fn invalid(message: String) -> Error {
    Error::InvalidScenario { message }
}
