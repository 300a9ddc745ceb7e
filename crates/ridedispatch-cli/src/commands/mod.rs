//! Command handlers for the CLI subcommands.
//!
//! `main.rs` parses arguments and builds a [`DispatchContext`]; each module
//! here handles one subcommand.

pub mod drivers;
pub mod geocode;
pub mod nearest;
pub mod route;
pub mod simulate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use ridedispatch_lib::{
    DirectionsProvider, DispatchConfig, DispatchMode, Gazetteer, Geocoder, LatLng,
    OsrmDirections, Place, Scenario, StraightLineDirections,
};

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    pub scenario: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub mode: Option<DispatchMode>,
    pub osrm_url: Option<String>,
}

/// Scenario, configuration and collaborators resolved from the options.
pub struct DispatchContext {
    pub scenario: Scenario,
    pub config: DispatchConfig,
    pub gazetteer: Gazetteer,
    osrm_url: Option<String>,
}

impl DispatchContext {
    pub fn load(options: &ContextOptions) -> Result<Self> {
        let mut config = match &options.config {
            Some(path) => DispatchConfig::from_path(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => DispatchConfig::for_mode(options.mode.unwrap_or_default()),
        };
        if let Some(mode) = options.mode {
            config.mode = mode;
        }

        let scenario = match &options.scenario {
            Some(path) => load_scenario(path)?,
            None => Scenario::demo(config.mode),
        };
        debug!(mode = %config.mode, drivers = scenario.drivers.len(), "context ready");

        Ok(Self {
            scenario,
            config,
            gazetteer: Gazetteer::new_delhi(),
            osrm_url: options.osrm_url.clone(),
        })
    }

    /// OSRM client when an endpoint is configured, else a straight-line
    /// estimate.
    pub fn directions_provider(&self) -> Result<Box<dyn DirectionsProvider>> {
        match &self.osrm_url {
            Some(url) => {
                let client = OsrmDirections::new(url)
                    .with_context(|| format!("failed to create OSRM client for {url}"))?;
                Ok(Box::new(client))
            }
            None => Ok(Box::new(StraightLineDirections::default())),
        }
    }

    /// Resolve `lat,lng` or a gazetteer place name.
    pub fn resolve_place(&self, query: &str) -> Result<Place> {
        if let Some(point) = parse_coordinate(query) {
            point
                .validate()
                .with_context(|| format!("invalid coordinate '{query}'"))?;
            return Ok(Place::new(point.lat, point.lng, point.to_string()));
        }
        Ok(self.gazetteer.resolve(query)?)
    }
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    Scenario::from_path(path)
        .with_context(|| format!("failed to load scenario from {}", path.display()))
}

/// Parse `"lat,lng"`.
pub fn parse_coordinate(input: &str) -> Option<LatLng> {
    let (lat, lng) = input.split_once(',')?;
    Some(LatLng::new(
        lat.trim().parse().ok()?,
        lng.trim().parse().ok()?,
    ))
}
