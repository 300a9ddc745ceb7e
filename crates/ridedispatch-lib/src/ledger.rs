use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::drivers::{DriverId, Location};
use crate::error::{Error, Result};
use crate::path::RouteResult;

/// Identifier for a ride request (`ride_<millis>`).
pub type RideId = String;

/// Lifecycle status of a ride request.
///
/// Rides move strictly forward through `pending → matched → in-progress →
/// completed`. Cancellation removes the ride from the ledger instead of
/// adding a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RideStatus {
    Pending,
    Matched,
    InProgress,
    Completed,
}

impl RideStatus {
    /// The only status this one may advance to.
    pub fn successor(self) -> Option<RideStatus> {
        match self {
            RideStatus::Pending => Some(RideStatus::Matched),
            RideStatus::Matched => Some(RideStatus::InProgress),
            RideStatus::InProgress => Some(RideStatus::Completed),
            RideStatus::Completed => None,
        }
    }

    /// Whether the ride holds a driver and is not finished.
    pub fn is_active(self) -> bool {
        matches!(self, RideStatus::Matched | RideStatus::InProgress)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RideStatus::Pending => "pending",
            RideStatus::Matched => "matched",
            RideStatus::InProgress => "in-progress",
            RideStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Ride request tracked by the [`RideLedger`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideRequest {
    pub id: RideId,
    pub passenger_id: String,
    pub passenger_name: String,
    pub pickup: Location,
    pub destination: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_address: Option<String>,
    /// Creation time in milliseconds.
    pub created_at_ms: u64,
    pub status: RideStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_driver_id: Option<DriverId>,
}

impl RideRequest {
    /// Move to `next` when it is the status's successor.
    pub(crate) fn advance_to(&mut self, next: RideStatus) -> Result<()> {
        if self.status.successor() != Some(next) {
            return Err(Error::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to: next.as_str(),
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Ordered collection of ride requests and the routes computed for them.
#[derive(Debug, Clone, Default)]
pub struct RideLedger {
    rides: Vec<RideRequest>,
    routes: HashMap<RideId, RouteResult>,
    /// Every id handed out, including rides since canceled.
    issued: HashSet<RideId>,
}

impl RideLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&RideRequest> {
        self.rides.iter().find(|ride| ride.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Rides in submission order.
    pub fn iter(&self) -> impl Iterator<Item = &RideRequest> {
        self.rides.iter()
    }

    /// Rides that have not completed yet.
    pub fn active(&self) -> impl Iterator<Item = &RideRequest> {
        self.rides
            .iter()
            .filter(|ride| ride.status != RideStatus::Completed)
    }

    /// Owned copy of every ride in submission order.
    pub fn snapshot(&self) -> Vec<RideRequest> {
        self.rides.clone()
    }

    pub fn len(&self) -> usize {
        self.rides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rides.is_empty()
    }

    /// Route stored for a ride when it was matched.
    pub fn route(&self, id: &str) -> Option<&RouteResult> {
        self.routes.get(id)
    }

    /// Active ride currently assigned to `driver_id`, if any.
    pub fn active_ride_for_driver(&self, driver_id: &str) -> Option<&RideRequest> {
        self.rides.iter().find(|ride| {
            ride.status.is_active() && ride.assigned_driver_id.as_deref() == Some(driver_id)
        })
    }

    /// Derive a ride id from a millisecond timestamp that was never issued
    /// before, so tasks queued for a canceled ride cannot reach a new one.
    pub(crate) fn next_id(&self, timestamp_ms: u64) -> RideId {
        let base = format!("ride_{timestamp_ms}");
        if !self.issued.contains(&base) {
            return base;
        }
        (1..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| !self.issued.contains(candidate))
            .unwrap_or(base)
    }

    pub(crate) fn insert(&mut self, ride: RideRequest) {
        self.issued.insert(ride.id.clone());
        self.rides.push(ride);
    }

    /// Remove a ride and any route associated with it.
    pub(crate) fn remove(&mut self, id: &str) -> Result<RideRequest> {
        let index = self.index_of(id)?;
        self.routes.remove(id);
        Ok(self.rides.remove(index))
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Result<&mut RideRequest> {
        let index = self.index_of(id)?;
        Ok(&mut self.rides[index])
    }

    pub(crate) fn store_route(&mut self, id: &str, route: RouteResult) {
        self.routes.insert(id.to_string(), route);
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.rides
            .iter()
            .position(|ride| ride.id == id)
            .ok_or_else(|| Error::UnknownRide { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::RoutePath;

    fn ride(id: &str, status: RideStatus) -> RideRequest {
        RideRequest {
            id: id.to_string(),
            passenger_id: "p1".to_string(),
            passenger_name: "Pat".to_string(),
            pickup: Location::node("A"),
            destination: Location::node("C"),
            pickup_address: None,
            destination_address: None,
            created_at_ms: 0,
            status,
            assigned_driver_id: None,
        }
    }

    #[test]
    fn statuses_advance_one_step_at_a_time() {
        assert_eq!(RideStatus::Pending.successor(), Some(RideStatus::Matched));
        assert_eq!(RideStatus::Matched.successor(), Some(RideStatus::InProgress));
        assert_eq!(
            RideStatus::InProgress.successor(),
            Some(RideStatus::Completed)
        );
        assert_eq!(RideStatus::Completed.successor(), None);
    }

    #[test]
    fn status_serializes_kebab_case() {
        let json = serde_json::to_string(&RideStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
    }

    #[test]
    fn next_id_disambiguates_same_millisecond() {
        let mut ledger = RideLedger::new();
        assert_eq!(ledger.next_id(1000), "ride_1000");
        ledger.insert(ride("ride_1000", RideStatus::Pending));
        assert_eq!(ledger.next_id(1000), "ride_1000_1");
        ledger.insert(ride("ride_1000_1", RideStatus::Pending));
        assert_eq!(ledger.next_id(1000), "ride_1000_2");
    }

    #[test]
    fn next_id_never_reuses_removed_ids() {
        let mut ledger = RideLedger::new();
        ledger.insert(ride("ride_1000", RideStatus::Pending));
        ledger.remove("ride_1000").unwrap();
        assert_eq!(ledger.next_id(1000), "ride_1000_1");
    }

    #[test]
    fn advance_to_rejects_skipped_states() {
        let mut request = ride("ride_1", RideStatus::Pending);
        assert!(matches!(
            request.advance_to(RideStatus::InProgress),
            Err(Error::InvalidTransition {
                from: RideStatus::Pending,
                to: "in-progress",
                ..
            })
        ));
        assert_eq!(request.status, RideStatus::Pending);

        request.advance_to(RideStatus::Matched).unwrap();
        request.advance_to(RideStatus::InProgress).unwrap();
        request.advance_to(RideStatus::Completed).unwrap();
        assert!(request.advance_to(RideStatus::Completed).is_err());
    }

    #[test]
    fn remove_discards_route() {
        let mut ledger = RideLedger::new();
        ledger.insert(ride("ride_1", RideStatus::Matched));
        ledger.store_route(
            "ride_1",
            RouteResult {
                path: RoutePath::Nodes(vec!["A".to_string(), "C".to_string()]),
                distance: 3.0,
                estimated_time: 6,
            },
        );

        let removed = ledger.remove("ride_1").unwrap();
        assert_eq!(removed.id, "ride_1");
        assert!(ledger.route("ride_1").is_none());
        assert!(ledger.is_empty());
        assert!(matches!(
            ledger.remove("ride_1"),
            Err(Error::UnknownRide { .. })
        ));
    }

    #[test]
    fn active_excludes_completed() {
        let mut ledger = RideLedger::new();
        ledger.insert(ride("ride_1", RideStatus::Completed));
        ledger.insert(ride("ride_2", RideStatus::Pending));
        let active: Vec<_> = ledger.active().map(|ride| ride.id.as_str()).collect();
        assert_eq!(active, vec!["ride_2"]);
    }
}
