use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geo::LatLng;
use crate::graph::NodeId;

/// Identifier for a driver in the registry.
pub type DriverId = String;

/// Highest rating a driver can hold.
pub const MAX_RATING: f64 = 5.0;

/// Where a driver or rider currently is: a node of the road graph or a
/// geographic coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Node(NodeId),
    Coordinate(LatLng),
}

impl Location {
    pub fn node(id: impl Into<String>) -> Self {
        Location::Node(id.into())
    }

    pub fn as_node(&self) -> Option<&str> {
        match self {
            Location::Node(id) => Some(id),
            Location::Coordinate(_) => None,
        }
    }

    pub fn as_coordinate(&self) -> Option<LatLng> {
        match self {
            Location::Coordinate(point) => Some(*point),
            Location::Node(_) => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Node(id) => f.write_str(id),
            Location::Coordinate(point) => point.fmt(f),
        }
    }
}

/// Driver record held by the [`DriverRegistry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub name: String,
    pub location: Location,
    pub available: bool,
    /// Rating between 0 and [`MAX_RATING`].
    pub rating: f64,
}

impl Driver {
    /// Available driver waiting at a graph node.
    pub fn at_node(
        id: impl Into<String>,
        name: impl Into<String>,
        node: impl Into<String>,
        rating: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: Location::Node(node.into()),
            available: true,
            rating,
        }
    }

    /// Available driver waiting at a geographic coordinate.
    pub fn at_coordinate(
        id: impl Into<String>,
        name: impl Into<String>,
        position: LatLng,
        rating: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: Location::Coordinate(position),
            available: true,
            rating,
        }
    }

    /// Builder-style helper used by fixtures to start a driver off duty.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}

/// Driver found by a proximity search together with its distance from the
/// search origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyDriver {
    pub driver_id: DriverId,
    pub distance: f64,
}

/// Authoritative in-memory driver state.
///
/// Read access is public; mutation is reserved for the dispatch engine so
/// that every change corresponds to a ride transition.
#[derive(Debug, Clone, Default)]
pub struct DriverRegistry {
    drivers: BTreeMap<DriverId, Driver>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry, rejecting duplicate ids and out-of-range ratings.
    pub fn from_drivers(drivers: impl IntoIterator<Item = Driver>) -> Result<Self> {
        let mut registry = Self::new();
        for driver in drivers {
            registry.register(driver)?;
        }
        Ok(registry)
    }

    /// Add a new driver.
    pub fn register(&mut self, driver: Driver) -> Result<()> {
        if !(0.0..=MAX_RATING).contains(&driver.rating) {
            return Err(Error::InvalidScenario {
                message: format!(
                    "driver {} has rating {} outside 0..={}",
                    driver.id, driver.rating, MAX_RATING
                ),
            });
        }
        if self.drivers.contains_key(&driver.id) {
            return Err(Error::InvalidScenario {
                message: format!("duplicate driver id {}", driver.id),
            });
        }
        self.drivers.insert(driver.id.clone(), driver);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Driver> {
        self.drivers.get(id)
    }

    /// Iterate drivers ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &Driver> {
        self.drivers.values()
    }

    /// Owned copy of every driver, ordered by id.
    pub fn snapshot(&self) -> Vec<Driver> {
        self.drivers.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    pub fn available_count(&self) -> usize {
        self.drivers.values().filter(|driver| driver.available).count()
    }

    /// Available drivers grouped by the graph node they wait at.
    pub(crate) fn available_by_node(&self) -> HashMap<&str, Vec<&Driver>> {
        let mut by_node: HashMap<&str, Vec<&Driver>> = HashMap::new();
        for driver in self.drivers.values().filter(|driver| driver.available) {
            if let Location::Node(node) = &driver.location {
                by_node.entry(node.as_str()).or_default().push(driver);
            }
        }
        by_node
    }

    pub(crate) fn set_available(&mut self, id: &str, available: bool) -> Result<()> {
        let driver = self.get_mut(id)?;
        driver.available = available;
        Ok(())
    }

    /// Release a driver at a new location in a single update.
    pub(crate) fn release_at(&mut self, id: &str, location: Location) -> Result<()> {
        let driver = self.get_mut(id)?;
        driver.available = true;
        driver.location = location;
        Ok(())
    }

    /// Flip availability and return the new value.
    pub(crate) fn toggle_availability(&mut self, id: &str) -> Result<bool> {
        let driver = self.get_mut(id)?;
        driver.available = !driver.available;
        Ok(driver.available)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Driver> {
        self.drivers.get_mut(id).ok_or_else(|| Error::UnknownDriver {
            id: id.to_string(),
        })
    }
}
