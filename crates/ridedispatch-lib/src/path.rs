use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::drivers::{DriverRegistry, NearbyDriver};
use crate::graph::{Graph, NodeId};

/// Minutes of travel assumed per unit of graph distance.
pub const MINUTES_PER_UNIT: f64 = 2.0;

/// Default search radius for graph proximity queries, in weight units.
pub const DEFAULT_MAX_DRIVER_DISTANCE: f64 = 10.0;

/// Convert a graph distance to whole minutes.
pub fn estimated_minutes(distance: f64) -> u64 {
    (distance * MINUTES_PER_UNIT).round().max(0.0) as u64
}

/// Geometry of a computed route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutePath {
    /// Node ids from origin to destination.
    Nodes(Vec<NodeId>),
    /// Encoded polyline returned by a directions provider.
    Polyline(String),
}

/// Route between two locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub path: RoutePath,
    pub distance: f64,
    /// Estimated travel time in minutes.
    pub estimated_time: u64,
}

impl RouteResult {
    /// Node ids along the route; empty for polyline routes.
    pub fn nodes(&self) -> &[NodeId] {
        match &self.path {
            RoutePath::Nodes(nodes) => nodes,
            RoutePath::Polyline(_) => &[],
        }
    }

    /// Number of edges traversed by a node route.
    pub fn hop_count(&self) -> usize {
        self.nodes().len().saturating_sub(1)
    }

    /// Append `next` to this route. The shared joint node is kept once.
    /// Returns `None` when either leg is a polyline or the legs do not meet.
    pub fn join(self, next: RouteResult) -> Option<RouteResult> {
        let (RoutePath::Nodes(mut head), RoutePath::Nodes(tail)) = (self.path, next.path) else {
            return None;
        };
        if head.last() != tail.first() {
            return None;
        }
        head.extend(tail.into_iter().skip(1));
        Some(RouteResult {
            path: RoutePath::Nodes(head),
            distance: self.distance + next.distance,
            estimated_time: self.estimated_time + next.estimated_time,
        })
    }
}

/// Strategy used by graph proximity searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProximitySearch {
    /// FIFO flood fill; the first path to reach a node fixes its distance.
    #[default]
    FloodFill,
    /// Distance-bounded Dijkstra; every recorded distance is minimal.
    Exact,
}

impl ProximitySearch {
    pub fn search(
        self,
        graph: &Graph,
        origin: &str,
        registry: &DriverRegistry,
        max_distance: f64,
    ) -> Vec<NearbyDriver> {
        match self {
            ProximitySearch::FloodFill => {
                nearest_available_drivers(graph, origin, registry, max_distance)
            }
            ProximitySearch::Exact => {
                nearest_available_drivers_exact(graph, origin, registry, max_distance)
            }
        }
    }
}

/// Run Dijkstra's algorithm between two nodes.
///
/// Only nodes registered with [`Graph::add_node`] are traversed, so dangling
/// edges never contribute to a path. `start == goal` always yields a
/// single-node route of distance zero.
pub fn shortest_path(graph: &Graph, start: &str, goal: &str) -> Option<RouteResult> {
    if start == goal {
        return Some(RouteResult {
            path: RoutePath::Nodes(vec![start.to_string()]),
            distance: 0.0,
            estimated_time: 0,
        });
    }
    if !graph.contains_node(start) || !graph.contains_node(goal) {
        return None;
    }

    let mut distances: HashMap<&str, f64> = HashMap::new();
    let mut parents: HashMap<&str, &str> = HashMap::new();
    let mut settled: HashSet<&str> = HashSet::new();
    let mut queue = BinaryHeap::new();

    distances.insert(start, 0.0);
    queue.push(QueueEntry::new(start, 0.0));

    while let Some(entry) = queue.pop() {
        if !settled.insert(entry.node) {
            continue;
        }
        let current_distance = entry.cost.0;

        if entry.node == goal {
            let path = reconstruct_path(&parents, start, goal);
            return Some(RouteResult {
                path: RoutePath::Nodes(path),
                distance: current_distance,
                estimated_time: estimated_minutes(current_distance),
            });
        }

        for edge in graph.neighbours(entry.node) {
            let next = edge.to.as_str();
            if settled.contains(next) || !graph.contains_node(next) {
                continue;
            }

            let next_cost = current_distance + edge.weight;
            if next_cost < *distances.get(next).unwrap_or(&f64::INFINITY) {
                distances.insert(next, next_cost);
                parents.insert(next, entry.node);
                queue.push(QueueEntry::new(next, next_cost));
            }
        }
    }

    None
}

/// Find available drivers reachable from `origin` within `max_distance`,
/// closest first.
///
/// This is a flood fill driven by a FIFO queue: each node keeps the distance
/// of the first path that reached it, which is not necessarily the shortest
/// when edge weights differ. Use [`nearest_available_drivers_exact`] for
/// exact distances.
pub fn nearest_available_drivers(
    graph: &Graph,
    origin: &str,
    registry: &DriverRegistry,
    max_distance: f64,
) -> Vec<NearbyDriver> {
    let by_node = registry.available_by_node();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<(&str, f64)> = VecDeque::new();
    let mut nearby = Vec::new();

    queue.push_back((origin, 0.0));

    while let Some((node, distance)) = queue.pop_front() {
        if visited.contains(node) || distance > max_distance {
            continue;
        }
        visited.insert(node);

        if let Some(drivers) = by_node.get(node) {
            nearby.extend(drivers.iter().map(|driver| NearbyDriver {
                driver_id: driver.id.clone(),
                distance,
            }));
        }

        for edge in graph.neighbours(node) {
            if !visited.contains(edge.to.as_str()) {
                queue.push_back((edge.to.as_str(), distance + edge.weight));
            }
        }
    }

    nearby.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    nearby
}

/// Like [`nearest_available_drivers`] but expands nodes in distance order so
/// every recorded distance is the true shortest-path distance.
pub fn nearest_available_drivers_exact(
    graph: &Graph,
    origin: &str,
    registry: &DriverRegistry,
    max_distance: f64,
) -> Vec<NearbyDriver> {
    let by_node = registry.available_by_node();
    let mut distances: HashMap<&str, f64> = HashMap::new();
    let mut settled: HashSet<&str> = HashSet::new();
    let mut queue = BinaryHeap::new();
    let mut nearby = Vec::new();

    distances.insert(origin, 0.0);
    queue.push(QueueEntry::new(origin, 0.0));

    while let Some(entry) = queue.pop() {
        let distance = entry.cost.0;
        if distance > max_distance || !settled.insert(entry.node) {
            continue;
        }

        if let Some(drivers) = by_node.get(entry.node) {
            nearby.extend(drivers.iter().map(|driver| NearbyDriver {
                driver_id: driver.id.clone(),
                distance,
            }));
        }

        for edge in graph.neighbours(entry.node) {
            let next = edge.to.as_str();
            let next_cost = distance + edge.weight;
            if !settled.contains(next)
                && next_cost < *distances.get(next).unwrap_or(&f64::INFINITY)
            {
                distances.insert(next, next_cost);
                queue.push(QueueEntry::new(next, next_cost));
            }
        }
    }

    nearby.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.driver_id.cmp(&b.driver_id))
    });
    nearby
}

fn reconstruct_path(parents: &HashMap<&str, &str>, start: &str, goal: &str) -> Vec<NodeId> {
    let mut path = Vec::new();
    let mut current = Some(goal);
    while let Some(node) = current {
        path.push(node.to_string());
        if node == start {
            break;
        }
        current = parents.get(node).copied();
    }
    path.reverse();
    path
}

#[derive(Copy, Clone, Debug, Default)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq(&other.0)
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct QueueEntry<'a> {
    node: &'a str,
    cost: FloatOrd,
}

impl<'a> QueueEntry<'a> {
    fn new(node: &'a str, cost: f64) -> Self {
        Self {
            node,
            cost: FloatOrd(cost),
        }
    }
}

impl Ord for QueueEntry<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering so BinaryHeap becomes a min-heap by cost.
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.node.cmp(self.node))
    }
}

impl PartialOrd for QueueEntry<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
