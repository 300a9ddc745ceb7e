//! Ride lifecycle engine.
//!
//! [`DispatchEngine`] is the single writer for the driver registry and the
//! ride ledger. Submitting a ride only records it and queues a matching task
//! on the engine's virtual clock; the task runs when the caller advances the
//! clock with [`DispatchEngine::advance`] or [`DispatchEngine::run_until_idle`].
//! Every deferred task re-checks the ride before acting, so a ride canceled or
//! advanced in the meantime turns the task into a [`DispatchEvent::Stale`]
//! no-op.

mod strategy;

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

pub use strategy::{
    driver_score, CoordinateDispatch, DispatchStrategy, GraphDispatch, MatchCandidate,
};

use crate::config::DispatchConfig;
use crate::drivers::{Driver, DriverId, DriverRegistry, Location};
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::ledger::{RideId, RideLedger, RideRequest, RideStatus};
use crate::path::RouteResult;
use crate::places::Place;
use crate::scheduler::{ScheduledTask, Scheduler, TaskKind};
use crate::store::RideStore;

/// Input for [`DispatchEngine::submit_request`].
#[derive(Debug, Clone, PartialEq)]
pub struct RideSubmission {
    pub passenger_id: String,
    pub passenger_name: String,
    pub pickup: Location,
    pub destination: Location,
    pub pickup_address: Option<String>,
    pub destination_address: Option<String>,
}

impl RideSubmission {
    pub fn new(
        passenger_id: impl Into<String>,
        passenger_name: impl Into<String>,
        pickup: Location,
        destination: Location,
    ) -> Self {
        Self {
            passenger_id: passenger_id.into(),
            passenger_name: passenger_name.into(),
            pickup,
            destination,
            pickup_address: None,
            destination_address: None,
        }
    }

    /// Submission between two geocoded places, keeping their addresses.
    pub fn between_places(
        passenger_id: impl Into<String>,
        passenger_name: impl Into<String>,
        pickup: &Place,
        destination: &Place,
    ) -> Self {
        Self {
            pickup_address: Some(pickup.formatted_address.clone()),
            destination_address: Some(destination.formatted_address.clone()),
            ..Self::new(
                passenger_id,
                passenger_name,
                Location::Coordinate(pickup.position()),
                Location::Coordinate(destination.position()),
            )
        }
    }
}

/// Why a matching attempt left a ride pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedReason {
    /// No available driver within the search radius.
    NoDriver,
    /// A driver was found but the route to serve the ride does not exist.
    NoPath,
}

/// Outcome of a deferred task, returned from [`DispatchEngine::advance`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DispatchEvent {
    Matched {
        ride_id: RideId,
        driver_id: DriverId,
        #[serde(skip_serializing_if = "Option::is_none")]
        route: Option<RouteResult>,
    },
    Unmatched {
        ride_id: RideId,
        reason: UnmatchedReason,
    },
    /// The ride was matched without a stored route.
    RouteUnavailable { ride_id: RideId, reason: String },
    TripStarted { ride_id: RideId },
    /// The task found its ride gone or in another status and did nothing.
    Stale { ride_id: RideId, task: TaskKind },
}

impl DispatchEvent {
    pub fn ride_id(&self) -> &str {
        match self {
            DispatchEvent::Matched { ride_id, .. }
            | DispatchEvent::Unmatched { ride_id, .. }
            | DispatchEvent::RouteUnavailable { ride_id, .. }
            | DispatchEvent::TripStarted { ride_id }
            | DispatchEvent::Stale { ride_id, .. } => ride_id,
        }
    }
}

/// Owned, serializable copy of engine state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchSnapshot {
    pub now_ms: u64,
    pub drivers: Vec<Driver>,
    pub rides: Vec<RideRequest>,
}

/// Operations exposed to front ends regardless of dispatch variant.
pub trait Dispatcher {
    fn submit_request(&mut self, submission: RideSubmission) -> Result<RideId>;
    fn cancel_request(&mut self, ride_id: &str) -> Result<RideRequest>;
    fn complete_request(&mut self, ride_id: &str) -> Result<()>;
    fn show_route(&self, ride_id: &str) -> Result<RouteResult>;
    fn snapshot(&self) -> DispatchSnapshot;
}

/// Single-writer dispatch engine parameterised by its matching strategy.
pub struct DispatchEngine<S> {
    strategy: S,
    config: DispatchConfig,
    drivers: DriverRegistry,
    ledger: RideLedger,
    scheduler: Scheduler,
    store: Option<Box<dyn RideStore>>,
}

impl<S: DispatchStrategy> DispatchEngine<S> {
    pub fn new(strategy: S, drivers: DriverRegistry, config: DispatchConfig) -> Self {
        Self {
            strategy,
            config,
            drivers,
            ledger: RideLedger::new(),
            scheduler: Scheduler::default(),
            store: None,
        }
    }

    /// Start the virtual clock at `now_ms` (e.g. wall-clock epoch millis).
    pub fn with_start_time(mut self, now_ms: u64) -> Self {
        self.scheduler = Scheduler::starting_at(now_ms);
        self
    }

    pub fn with_store(mut self, store: Box<dyn RideStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn drivers(&self) -> &DriverRegistry {
        &self.drivers
    }

    pub fn ledger(&self) -> &RideLedger {
        &self.ledger
    }

    pub fn now_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    /// Number of deferred tasks still queued.
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.len()
    }

    /// Virtual time at which the next queued task falls due.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.scheduler.next_due()
    }

    /// Validate and record a new ride, then queue driver matching.
    ///
    /// Validation failures leave the engine untouched.
    pub fn submit_request(&mut self, submission: RideSubmission) -> Result<RideId> {
        if submission.passenger_id.trim().is_empty() {
            return Err(Error::invalid_request("passenger id is required"));
        }
        if submission.passenger_name.trim().is_empty() {
            return Err(Error::invalid_request("passenger name is required"));
        }
        if submission.pickup == submission.destination {
            return Err(Error::invalid_request(
                "pickup and destination must differ",
            ));
        }
        self.strategy
            .validate_locations(&submission.pickup, &submission.destination)?;

        let now = self.now_ms();
        let ride = RideRequest {
            id: self.ledger.next_id(now),
            passenger_id: submission.passenger_id,
            passenger_name: submission.passenger_name.trim().to_string(),
            pickup: submission.pickup,
            destination: submission.destination,
            pickup_address: submission.pickup_address,
            destination_address: submission.destination_address,
            created_at_ms: now,
            status: RideStatus::Pending,
            assigned_driver_id: None,
        };
        let ride_id = ride.id.clone();
        info!(
            ride = %ride_id,
            passenger = %ride.passenger_name,
            pickup = %ride.pickup,
            destination = %ride.destination,
            mode = %self.strategy.mode(),
            "ride requested"
        );

        self.ledger.insert(ride);
        self.persist(&ride_id);
        self.scheduler.schedule_after(
            self.config.match_delay_ms,
            ride_id.clone(),
            TaskKind::MatchDriver,
        );
        Ok(ride_id)
    }

    /// Remove a ride that has not completed, releasing its driver.
    pub fn cancel_request(&mut self, ride_id: &str) -> Result<RideRequest> {
        let ride = self
            .ledger
            .get(ride_id)
            .ok_or_else(|| Error::UnknownRide {
                id: ride_id.to_string(),
            })?;
        if ride.status == RideStatus::Completed {
            return Err(Error::InvalidTransition {
                id: ride_id.to_string(),
                from: ride.status,
                to: "canceled",
            });
        }

        let ride = self.ledger.remove(ride_id)?;
        if let Some(driver_id) = &ride.assigned_driver_id {
            self.drivers.set_available(driver_id, true)?;
        }
        if let Some(store) = &self.store {
            if let Err(err) = store.remove(ride_id) {
                warn!(ride = %ride_id, error = %err, "failed to remove stored ride");
            }
        }
        info!(ride = %ride_id, from = %ride.status, "ride canceled");
        Ok(ride)
    }

    /// Finish an in-progress ride. The driver becomes available at the
    /// drop-off location.
    pub fn complete_request(&mut self, ride_id: &str) -> Result<()> {
        let ride = self.ledger.get_mut(ride_id)?;
        ride.advance_to(RideStatus::Completed)?;
        let destination = ride.destination.clone();
        let driver_id = ride.assigned_driver_id.clone();

        if let Some(driver_id) = &driver_id {
            self.drivers.release_at(driver_id, destination)?;
        }
        self.persist(ride_id);
        info!(ride = %ride_id, driver = ?driver_id, "ride completed");
        Ok(())
    }

    /// Driver reports the passenger is on board; starts the trip without
    /// waiting for the automatic advance.
    pub fn report_pickup(&mut self, ride_id: &str) -> Result<()> {
        self.ledger
            .get_mut(ride_id)?
            .advance_to(RideStatus::InProgress)?;
        self.persist(ride_id);
        info!(ride = %ride_id, "pickup reported, trip started");
        Ok(())
    }

    /// Recompute the pickup to destination route for display. Ride state is
    /// not touched; the route stored at match time stays available through
    /// [`RideLedger::route`].
    pub fn show_route(&self, ride_id: &str) -> Result<RouteResult> {
        let ride = self.ledger.get(ride_id).ok_or_else(|| Error::UnknownRide {
            id: ride_id.to_string(),
        })?;
        self.strategy.trip_route(ride)
    }

    /// Flip a driver's availability. Drivers serving an active ride cannot
    /// be toggled.
    pub fn toggle_driver_availability(&mut self, driver_id: &str) -> Result<bool> {
        if let Some(ride) = self.ledger.active_ride_for_driver(driver_id) {
            return Err(Error::DriverEngaged {
                id: driver_id.to_string(),
                ride_id: ride.id.clone(),
            });
        }
        let available = self.drivers.toggle_availability(driver_id)?;
        info!(driver = %driver_id, available, "driver availability toggled");
        Ok(available)
    }

    /// Move the clock forward by `elapsed`, running every task that falls
    /// due, in due order.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<DispatchEvent> {
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let until = self.now_ms().saturating_add(elapsed_ms);
        let mut events = Vec::new();
        while let Some(task) = self.scheduler.pop_due(until) {
            events.extend(self.run_task(task));
        }
        self.scheduler.advance_to(until);
        events
    }

    /// Run queued tasks until none are left, or until every remaining task
    /// is a matching retry that keeps finding no driver.
    pub fn run_until_idle(&mut self) -> Vec<DispatchEvent> {
        let mut events = Vec::new();
        let mut fruitless = 0usize;
        while let Some(task) = self.scheduler.pop_due(u64::MAX) {
            let produced = self.run_task(task);
            let made_progress = produced
                .iter()
                .any(|event| !matches!(event, DispatchEvent::Unmatched { .. }));
            events.extend(produced);

            fruitless = if made_progress { 0 } else { fruitless + 1 };
            // Every queued retry has failed once since the last progress and
            // nothing else (such as a trip start) is waiting.
            if fruitless > self.scheduler.len()
                && self.scheduler.only_kind(TaskKind::MatchDriver)
            {
                debug!(
                    queued = self.scheduler.len(),
                    "only unmatched retries remain; stopping"
                );
                break;
            }
        }
        events
    }

    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            now_ms: self.now_ms(),
            drivers: self.drivers.snapshot(),
            rides: self.ledger.snapshot(),
        }
    }

    fn run_task(&mut self, task: ScheduledTask) -> Vec<DispatchEvent> {
        debug!(ride = %task.ride_id, kind = ?task.kind, due_ms = task.due_ms, "running task");
        match task.kind {
            TaskKind::MatchDriver => self.match_driver(&task.ride_id),
            TaskKind::BeginTrip => vec![self.begin_trip(&task.ride_id)],
        }
    }

    fn match_driver(&mut self, ride_id: &str) -> Vec<DispatchEvent> {
        let Some(ride) = self
            .ledger
            .get(ride_id)
            .filter(|ride| ride.status == RideStatus::Pending)
            .cloned()
        else {
            return vec![stale(ride_id, TaskKind::MatchDriver)];
        };

        let driver = self
            .strategy
            .select_driver(&ride, &self.drivers, &self.config)
            .and_then(|candidate| self.drivers.get(&candidate.driver_id))
            .filter(|driver| driver.available)
            .cloned();
        let Some(driver) = driver else {
            info!(ride = %ride_id, "no available driver");
            return vec![self.unmatched(ride_id, UnmatchedReason::NoDriver)];
        };

        let (route, route_error) = match self.strategy.assignment_route(&ride, &driver) {
            Ok(route) => (Some(route), None),
            Err(err) if self.strategy.route_required_for_assignment() => {
                warn!(ride = %ride_id, driver = %driver.id, error = %err, "no route to serve ride");
                return vec![self.unmatched(ride_id, UnmatchedReason::NoPath)];
            }
            Err(err) => {
                warn!(ride = %ride_id, error = %err, "route unavailable, assigning anyway");
                (None, Some(err.to_string()))
            }
        };

        if let Err(err) = self.assign(ride_id, &driver.id, route.clone()) {
            warn!(ride = %ride_id, driver = %driver.id, error = %err, "assignment failed");
            return vec![self.unmatched(ride_id, UnmatchedReason::NoDriver)];
        }

        let mut events = vec![DispatchEvent::Matched {
            ride_id: ride_id.to_string(),
            driver_id: driver.id.clone(),
            route,
        }];
        if let Some(reason) = route_error {
            events.push(DispatchEvent::RouteUnavailable {
                ride_id: ride_id.to_string(),
                reason,
            });
        }
        events
    }

    fn assign(&mut self, ride_id: &str, driver_id: &str, route: Option<RouteResult>) -> Result<()> {
        self.drivers.set_available(driver_id, false)?;
        let ride = self.ledger.get_mut(ride_id)?;
        ride.advance_to(RideStatus::Matched)?;
        ride.assigned_driver_id = Some(driver_id.to_string());
        if let Some(route) = route {
            self.ledger.store_route(ride_id, route);
        }
        self.persist(ride_id);
        info!(ride = %ride_id, driver = %driver_id, "driver matched");

        if self.config.auto_advance {
            self.scheduler.schedule_after(
                self.config.progress_delay_ms,
                ride_id.to_string(),
                TaskKind::BeginTrip,
            );
        }
        Ok(())
    }

    fn begin_trip(&mut self, ride_id: &str) -> DispatchEvent {
        let started = self
            .ledger
            .get_mut(ride_id)
            .and_then(|ride| ride.advance_to(RideStatus::InProgress));
        match started {
            Ok(()) => {
                self.persist(ride_id);
                info!(ride = %ride_id, "trip started");
                DispatchEvent::TripStarted {
                    ride_id: ride_id.to_string(),
                }
            }
            Err(_) => stale(ride_id, TaskKind::BeginTrip),
        }
    }

    fn unmatched(&mut self, ride_id: &str, reason: UnmatchedReason) -> DispatchEvent {
        if let Some(delay) = self.config.retry_unmatched_after_ms {
            debug!(ride = %ride_id, delay_ms = delay, "retrying match later");
            self.scheduler
                .schedule_after(delay, ride_id.to_string(), TaskKind::MatchDriver);
        }
        DispatchEvent::Unmatched {
            ride_id: ride_id.to_string(),
            reason,
        }
    }

    fn persist(&self, ride_id: &str) {
        let (Some(store), Some(ride)) = (&self.store, self.ledger.get(ride_id)) else {
            return;
        };
        if let Err(err) = store.save(ride) {
            warn!(ride = %ride_id, error = %err, "failed to persist ride");
        }
    }
}

impl DispatchEngine<GraphDispatch> {
    pub fn graph(&self) -> &Graph {
        self.strategy.graph()
    }

    /// Shortest route from a ride's pickup to any node of the graph.
    pub fn route_to_node(&self, ride_id: &str, node_id: &str) -> Result<RouteResult> {
        let ride = self.ledger.get(ride_id).ok_or_else(|| Error::UnknownRide {
            id: ride_id.to_string(),
        })?;
        let pickup = ride
            .pickup
            .as_node()
            .ok_or_else(|| Error::invalid_request("ride pickup is not a graph node"))?;
        if !self.graph().contains_node(node_id) {
            return Err(self.graph().unknown_node(node_id));
        }
        self.strategy.route_between(pickup, node_id)
    }
}

impl<S: DispatchStrategy> Dispatcher for DispatchEngine<S> {
    fn submit_request(&mut self, submission: RideSubmission) -> Result<RideId> {
        DispatchEngine::submit_request(self, submission)
    }

    fn cancel_request(&mut self, ride_id: &str) -> Result<RideRequest> {
        DispatchEngine::cancel_request(self, ride_id)
    }

    fn complete_request(&mut self, ride_id: &str) -> Result<()> {
        DispatchEngine::complete_request(self, ride_id)
    }

    fn show_route(&self, ride_id: &str) -> Result<RouteResult> {
        DispatchEngine::show_route(self, ride_id)
    }

    fn snapshot(&self) -> DispatchSnapshot {
        DispatchEngine::snapshot(self)
    }
}

fn stale(ride_id: &str, task: TaskKind) -> DispatchEvent {
    debug!(ride = %ride_id, ?task, "task no longer applies");
    DispatchEvent::Stale {
        ride_id: ride_id.to_string(),
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node};

    fn line_graph() -> Graph {
        let mut graph = Graph::new();
        for (id, x) in [("A", 0.0), ("B", 1.0), ("C", 2.0)] {
            graph.add_node(Node::intersection(id, id, x, 0.0));
        }
        graph.add_edge(Edge::new("A", "B", 2.0, 2.0));
        graph.add_edge(Edge::new("B", "C", 3.0, 3.0));
        graph
    }

    fn engine() -> DispatchEngine<GraphDispatch> {
        let drivers =
            DriverRegistry::from_drivers([Driver::at_node("driver1", "Alice", "A", 4.8)]).unwrap();
        DispatchEngine::new(
            GraphDispatch::new(line_graph()),
            drivers,
            DispatchConfig::default(),
        )
        .with_start_time(10_000)
    }

    #[test]
    fn match_waits_for_delay() {
        let mut engine = engine();
        let id = engine
            .submit_request(RideSubmission::new(
                "p1",
                "Pat",
                Location::node("B"),
                Location::node("C"),
            ))
            .unwrap();
        assert_eq!(id, "ride_10000");

        assert!(engine.advance(Duration::from_millis(999)).is_empty());
        assert_eq!(engine.ledger().get(&id).unwrap().status, RideStatus::Pending);

        let events = engine.advance(Duration::from_millis(1));
        assert!(matches!(
            &events[..],
            [DispatchEvent::Matched { driver_id, .. }] if driver_id == "driver1"
        ));
        assert_eq!(engine.now_ms(), 11_000);
    }

    #[test]
    fn begin_trip_after_pickup_report_is_stale() {
        let mut engine = engine();
        let id = engine
            .submit_request(RideSubmission::new(
                "p1",
                "Pat",
                Location::node("A"),
                Location::node("C"),
            ))
            .unwrap();
        engine.advance(Duration::from_secs(1));
        engine.report_pickup(&id).unwrap();

        let events = engine.advance(Duration::from_secs(2));
        assert_eq!(
            events,
            vec![DispatchEvent::Stale {
                ride_id: id.clone(),
                task: TaskKind::BeginTrip
            }]
        );
        assert_eq!(
            engine.ledger().get(&id).unwrap().status,
            RideStatus::InProgress
        );
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = DispatchEvent::Unmatched {
            ride_id: "ride_1".to_string(),
            reason: UnmatchedReason::NoPath,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "unmatched");
        assert_eq!(json["reason"], "no_path");
    }
}
