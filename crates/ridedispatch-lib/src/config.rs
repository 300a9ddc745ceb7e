//! Dispatch engine configuration.
//!
//! Defaults depend on the dispatch mode: the graph variant matches after one
//! second and starts the trip two seconds later, the coordinate variant uses
//! 1.5 and 3 seconds. A JSON file may override any field:
//!
//! ```json
//! { "mode": "coordinate", "coordinate_radius_km": 20.0, "auto_advance": false }
//! ```

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::path::{ProximitySearch, DEFAULT_MAX_DRIVER_DISTANCE};

/// Candidate radius used by scored coordinate matching.
pub const DEFAULT_COORDINATE_RADIUS_KM: f64 = 15.0;

/// Which location model the engine dispatches over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Riders and drivers sit on nodes of a road graph.
    #[default]
    Graph,
    /// Riders and drivers are placed by latitude/longitude.
    Coordinate,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DispatchMode::Graph => "graph",
            DispatchMode::Coordinate => "coordinate",
        })
    }
}

/// Runtime settings for a [`crate::DispatchEngine`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchConfig {
    pub mode: DispatchMode,
    /// Simulated dispatch latency before matching runs.
    pub match_delay_ms: u64,
    /// Delay between a match and the automatic start of the trip.
    pub progress_delay_ms: u64,
    /// Start trips automatically after `progress_delay_ms`. When disabled,
    /// trips start only on an explicit pickup report.
    pub auto_advance: bool,
    /// Search radius for graph proximity queries, in weight units.
    pub graph_max_distance: f64,
    /// Candidate radius for coordinate matching.
    pub coordinate_radius_km: f64,
    pub proximity_search: ProximitySearch,
    /// Reschedule matching for rides left without a driver. `None` leaves them
    /// pending until canceled.
    pub retry_unmatched_after_ms: Option<u64>,
}

impl DispatchConfig {
    /// Defaults for the given mode.
    pub fn for_mode(mode: DispatchMode) -> Self {
        let (match_delay_ms, progress_delay_ms) = match mode {
            DispatchMode::Graph => (1000, 2000),
            DispatchMode::Coordinate => (1500, 3000),
        };
        Self {
            mode,
            match_delay_ms,
            progress_delay_ms,
            auto_advance: true,
            graph_max_distance: DEFAULT_MAX_DRIVER_DISTANCE,
            coordinate_radius_km: DEFAULT_COORDINATE_RADIUS_KM,
            proximity_search: ProximitySearch::FloodFill,
            retry_unmatched_after_ms: None,
        }
    }

    /// Load overrides from a JSON file on top of the mode defaults.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let overrides: ConfigOverrides =
            serde_json::from_str(&contents).map_err(|err| Error::InvalidConfig {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
        let config = overrides.apply();
        config.validate().map_err(|message| Error::InvalidConfig {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if !self.graph_max_distance.is_finite() || self.graph_max_distance < 0.0 {
            return Err(format!(
                "graph_max_distance must be a non-negative number, got {}",
                self.graph_max_distance
            ));
        }
        if !self.coordinate_radius_km.is_finite() || self.coordinate_radius_km < 0.0 {
            return Err(format!(
                "coordinate_radius_km must be a non-negative number, got {}",
                self.coordinate_radius_km
            ));
        }
        Ok(())
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::for_mode(DispatchMode::Graph)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigOverrides {
    #[serde(default)]
    mode: DispatchMode,
    match_delay_ms: Option<u64>,
    progress_delay_ms: Option<u64>,
    auto_advance: Option<bool>,
    graph_max_distance: Option<f64>,
    coordinate_radius_km: Option<f64>,
    proximity_search: Option<ProximitySearch>,
    retry_unmatched_after_ms: Option<u64>,
}

impl ConfigOverrides {
    fn apply(self) -> DispatchConfig {
        let defaults = DispatchConfig::for_mode(self.mode);
        DispatchConfig {
            mode: self.mode,
            match_delay_ms: self.match_delay_ms.unwrap_or(defaults.match_delay_ms),
            progress_delay_ms: self.progress_delay_ms.unwrap_or(defaults.progress_delay_ms),
            auto_advance: self.auto_advance.unwrap_or(defaults.auto_advance),
            graph_max_distance: self
                .graph_max_distance
                .unwrap_or(defaults.graph_max_distance),
            coordinate_radius_km: self
                .coordinate_radius_km
                .unwrap_or(defaults.coordinate_radius_km),
            proximity_search: self.proximity_search.unwrap_or(defaults.proximity_search),
            retry_unmatched_after_ms: self.retry_unmatched_after_ms,
        }
    }
}
