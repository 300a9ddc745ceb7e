//! `nearest` subcommand: available drivers around a pickup location.

use anyhow::{ensure, Result};
use serde::Serialize;

use ridedispatch_lib::{
    CoordinateDispatch, DispatchMode, Error as LibError, MatchCandidate, ProximitySearch,
};

use super::DispatchContext;
use crate::output::{print_json, OutputFormat};

#[derive(Debug, Clone, Default)]
pub struct NearestArgs {
    /// Search radius; falls back to the configured radius for the mode.
    pub radius: Option<f64>,
    /// Use distance-ordered search instead of the flood fill.
    pub exact: bool,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct NearestOutput<'a> {
    pickup: &'a str,
    radius: f64,
    candidates: &'a [MatchCandidate],
}

pub fn handle_nearest(
    context: &DispatchContext,
    pickup: &str,
    args: &NearestArgs,
    format: OutputFormat,
) -> Result<()> {
    let registry = context.scenario.registry()?;
    let (label, radius, mut candidates) = match context.config.mode {
        DispatchMode::Graph => {
            let graph = context.scenario.graph();
            let origin = graph.resolve_node(pickup)?;
            let radius = search_radius(args.radius, context.config.graph_max_distance)?;
            let search = if args.exact {
                ProximitySearch::Exact
            } else {
                context.config.proximity_search
            };
            let candidates = search
                .search(&graph, &origin, &registry, radius)
                .into_iter()
                .map(|nearby| MatchCandidate {
                    driver_id: nearby.driver_id,
                    distance: nearby.distance,
                    score: None,
                })
                .collect::<Vec<_>>();
            (origin, radius, candidates)
        }
        DispatchMode::Coordinate => {
            let place = context.resolve_place(pickup)?;
            let radius = search_radius(args.radius, context.config.coordinate_radius_km)?;
            let strategy = CoordinateDispatch::new(context.directions_provider()?);
            let candidates = strategy.scored_candidates(place.position(), &registry, radius);
            (place.formatted_address, radius, candidates)
        }
    };

    if candidates.is_empty() {
        return Err(LibError::NoDriverAvailable { pickup: label }.into());
    }
    if let Some(limit) = args.limit {
        candidates.truncate(limit);
    }

    match format {
        OutputFormat::Json => print_json(&NearestOutput {
            pickup: &label,
            radius,
            candidates: &candidates,
        }),
        OutputFormat::Text => {
            println!("Drivers near {label} (radius {radius:.1}):");
            for candidate in &candidates {
                let name = registry
                    .get(&candidate.driver_id)
                    .map(|driver| driver.name.as_str())
                    .unwrap_or("?");
                match candidate.score {
                    Some(score) => println!(
                        "- {} ({name}) distance {:.2}, score {score:.2}",
                        candidate.driver_id, candidate.distance
                    ),
                    None => println!(
                        "- {} ({name}) distance {:.1}",
                        candidate.driver_id, candidate.distance
                    ),
                }
            }
            Ok(())
        }
    }
}

/// `requested` when given, else the configured default. Flood fill is only
/// bounded by a finite, non-negative radius.
fn search_radius(requested: Option<f64>, default: f64) -> Result<f64> {
    let radius = requested.unwrap_or(default);
    ensure!(
        radius.is_finite() && radius >= 0.0,
        "radius must be a non-negative number, got {radius}"
    );
    Ok(radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_falls_back_to_default() {
        assert_eq!(search_radius(None, 10.0).unwrap(), 10.0);
        assert_eq!(search_radius(Some(2.5), 10.0).unwrap(), 2.5);
    }

    #[test]
    fn radius_must_be_finite_and_non_negative() {
        assert!(search_radius(Some(f64::NAN), 10.0).is_err());
        assert!(search_radius(Some(f64::INFINITY), 10.0).is_err());
        assert!(search_radius(Some(-1.0), 10.0).is_err());
    }
}
