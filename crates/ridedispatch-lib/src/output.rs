use std::fmt::Write;

use serde::Serialize;

use crate::drivers::Driver;
use crate::graph::{Graph, NodeId};
use crate::ledger::RideRequest;
use crate::path::{RoutePath, RouteResult};

/// Classifies what a route summary describes.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteOutputKind {
    /// Shortest route between two arbitrary locations.
    Route,
    /// Stored route of a matched ride (driver to pickup to destination).
    Assignment,
    /// Pickup to destination leg of a ride.
    Trip,
}

impl RouteOutputKind {
    /// Human-readable label shown in textual renderings.
    pub fn label(self) -> &'static str {
        match self {
            RouteOutputKind::Route => "Route",
            RouteOutputKind::Assignment => "Assignment",
            RouteOutputKind::Trip => "Trip",
        }
    }
}

/// Node visited by a route.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RouteStep {
    pub index: usize,
    pub id: NodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RouteStep {
    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unknown>")
    }
}

/// Route with node names resolved, ready to serialise or print.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RouteSummary {
    pub kind: RouteOutputKind,
    pub distance: f64,
    pub estimated_minutes: u64,
    pub hops: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<RouteStep>,
    /// Encoded geometry for provider routes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polyline: Option<String>,
}

impl RouteSummary {
    /// Summarise `route`, resolving node names from `graph` when given.
    pub fn from_route(kind: RouteOutputKind, graph: Option<&Graph>, route: &RouteResult) -> Self {
        let steps = route
            .nodes()
            .iter()
            .enumerate()
            .map(|(index, id)| RouteStep {
                index,
                id: id.clone(),
                name: graph
                    .and_then(|graph| graph.node_name(id))
                    .map(str::to_string),
            })
            .collect();
        let polyline = match &route.path {
            RoutePath::Polyline(encoded) => Some(encoded.clone()),
            RoutePath::Nodes(_) => None,
        };

        Self {
            kind,
            distance: route.distance,
            estimated_minutes: route.estimated_time,
            hops: route.hop_count(),
            steps,
            polyline,
        }
    }

    fn endpoints(&self) -> Option<(&RouteStep, &RouteStep)> {
        Some((self.steps.first()?, self.steps.last()?))
    }

    /// Header line with totals, then the visited nodes or the polyline.
    pub fn render(&self) -> String {
        let mut buffer = String::new();
        match self.endpoints() {
            Some((start, goal)) => {
                let _ = writeln!(
                    buffer,
                    "{}: {} -> {} ({} hops, distance {:.1}, ~{} min)",
                    self.kind.label(),
                    start.display_name(),
                    goal.display_name(),
                    self.hops,
                    self.distance,
                    self.estimated_minutes
                );
                let joined = self
                    .steps
                    .iter()
                    .map(|step| format!("{} ({})", step.display_name(), step.id))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                let _ = writeln!(buffer, "{joined}");
            }
            None => {
                let _ = writeln!(
                    buffer,
                    "{}: {:.1} km, ~{} min",
                    self.kind.label(),
                    self.distance,
                    self.estimated_minutes
                );
                if let Some(polyline) = &self.polyline {
                    let _ = writeln!(buffer, "polyline: {polyline}");
                }
            }
        }
        buffer
    }
}

/// One line per ride: id, status, passenger, pickup, destination, driver.
pub fn render_rides(rides: &[RideRequest]) -> String {
    let mut buffer = String::new();
    if rides.is_empty() {
        let _ = writeln!(buffer, "no rides");
        return buffer;
    }
    for ride in rides {
        let _ = writeln!(
            buffer,
            "{:<18} {:<12} {:<16} {} -> {}  driver: {}",
            ride.id,
            ride.status,
            ride.passenger_name,
            ride.pickup_address
                .clone()
                .unwrap_or_else(|| ride.pickup.to_string()),
            ride.destination_address
                .clone()
                .unwrap_or_else(|| ride.destination.to_string()),
            ride.assigned_driver_id.as_deref().unwrap_or("-"),
        );
    }
    buffer
}

/// One line per driver: id, name, availability, rating, location.
pub fn render_drivers(drivers: &[Driver]) -> String {
    let mut buffer = String::new();
    for driver in drivers {
        let _ = writeln!(
            buffer,
            "{:<10} {:<16} {:<11} {:.1}  at {}",
            driver.id,
            driver.name,
            if driver.available { "available" } else { "busy" },
            driver.rating,
            driver.location,
        );
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Node;

    #[test]
    fn plain_text_names_nodes() {
        let mut graph = Graph::new();
        graph.add_node(Node::intersection("A", "Downtown", 0.0, 0.0));
        graph.add_node(Node::intersection("B", "Mall", 1.0, 0.0));
        let route = RouteResult {
            path: RoutePath::Nodes(vec!["A".to_string(), "B".to_string()]),
            distance: 5.0,
            estimated_time: 10,
        };

        let summary = RouteSummary::from_route(RouteOutputKind::Route, Some(&graph), &route);
        let text = summary.render();
        assert!(text.starts_with("Route: Downtown -> Mall (1 hops, distance 5.0, ~10 min)"));
        assert!(text.contains("Downtown (A) -> Mall (B)"));
    }

    #[test]
    fn polyline_route_renders_totals() {
        let route = RouteResult {
            path: RoutePath::Polyline("abc".to_string()),
            distance: 4.31,
            estimated_time: 7,
        };
        let summary = RouteSummary::from_route(RouteOutputKind::Trip, None, &route);
        assert_eq!(summary.hops, 0);
        let text = summary.render();
        assert!(text.starts_with("Trip: 4.3 km, ~7 min"), "{text}");
        assert!(text.contains("polyline: abc"));
    }
}
