use std::path::PathBuf;

use thiserror::Error;

use crate::ledger::RideStatus;

/// Convenient result alias for the ride dispatch library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Raised when a ride submission fails validation. No state is changed.
    #[error("invalid ride request: {reason}")]
    InvalidRequest { reason: String },

    /// Raised when a node id could not be found in the road graph.
    #[error("unknown location: {id}{}", format_suggestions(.suggestions))]
    UnknownNode {
        id: String,
        suggestions: Vec<String>,
    },

    /// Raised when a free-text place could not be resolved by the gazetteer.
    #[error("unknown place: {query}{}", format_suggestions(.suggestions))]
    UnknownPlace {
        query: String,
        suggestions: Vec<String>,
    },

    /// Raised when a ride id is not present in the ledger.
    #[error("unknown ride: {id}")]
    UnknownRide { id: String },

    /// Raised when a driver id is not present in the registry.
    #[error("unknown driver: {id}")]
    UnknownDriver { id: String },

    /// Raised when no route connects the two locations.
    #[error("no route found between {start} and {goal}")]
    RouteNotFound { start: String, goal: String },

    /// Raised when no available driver is within the search radius.
    #[error("no available driver near {pickup}")]
    NoDriverAvailable { pickup: String },

    /// Raised when the external directions or geocoding provider fails.
    #[error("routing provider failed: {message}")]
    Provider { message: String },

    /// Raised when a ride transition is not allowed from its current status.
    #[error("ride {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: RideStatus,
        to: &'static str,
    },

    /// Raised when toggling a driver that is serving an active ride.
    #[error("driver {id} is assigned to active ride {ride_id}")]
    DriverEngaged { id: String, ride_id: String },

    /// Raised when scenario data fails validation.
    #[error("invalid scenario data: {message}")]
    InvalidScenario { message: String },

    /// Raised when the configuration file could not be parsed or validated.
    #[error("invalid configuration in {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    /// No suitable project directories could be resolved for this platform.
    #[error("failed to resolve project directories for the ride store")]
    ProjectDirsUnavailable,

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for JSON (de)serialization errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Wrapper for HTTP client errors.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl Error {
    pub(crate) fn invalid_request(reason: impl Into<String>) -> Self {
        Error::InvalidRequest {
            reason: reason.into(),
        }
    }

    pub(crate) fn provider(message: impl Into<String>) -> Self {
        Error::Provider {
            message: message.into(),
        }
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else if suggestions.len() == 1 {
        format!(". Did you mean '{}'?", suggestions[0])
    } else {
        format!(
            ". Did you mean one of: {}?",
            suggestions
                .iter()
                .map(|s| format!("'{}'", s))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}
