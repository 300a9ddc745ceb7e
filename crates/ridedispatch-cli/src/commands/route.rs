//! `route` subcommand: shortest path between two locations.

use anyhow::{Context, Result};
use tracing::debug;

use ridedispatch_lib::{
    shortest_path, DispatchMode, Error as LibError, RouteOutputKind, RouteSummary,
};

use super::DispatchContext;
use crate::output::{print_route, OutputFormat};

/// Print the route from `from` to `to`.
///
/// Graph mode resolves node ids (with fuzzy suggestions on a miss) and runs
/// Dijkstra. Coordinate mode resolves places or `lat,lng` pairs and asks the
/// configured directions provider.
pub fn handle_route(
    context: &DispatchContext,
    from: &str,
    to: &str,
    format: OutputFormat,
) -> Result<()> {
    let summary = match context.config.mode {
        DispatchMode::Graph => graph_route(context, from, to)?,
        DispatchMode::Coordinate => coordinate_route(context, from, to)?,
    };
    print_route(&summary, format)
}

fn graph_route(context: &DispatchContext, from: &str, to: &str) -> Result<RouteSummary> {
    let graph = context.scenario.graph();
    let start = graph.resolve_node(from)?;
    let goal = graph.resolve_node(to)?;

    let route = shortest_path(&graph, &start, &goal).ok_or_else(|| LibError::RouteNotFound {
        start: start.clone(),
        goal: goal.clone(),
    })?;
    debug!(%start, %goal, distance = route.distance, "graph route computed");
    Ok(RouteSummary::from_route(
        RouteOutputKind::Route,
        Some(&graph),
        &route,
    ))
}

fn coordinate_route(context: &DispatchContext, from: &str, to: &str) -> Result<RouteSummary> {
    let origin = context.resolve_place(from)?;
    let destination = context.resolve_place(to)?;
    let provider = context.directions_provider()?;

    let directions = provider
        .directions(origin.position(), destination.position())
        .with_context(|| {
            format!(
                "{} directions failed for {} -> {}",
                provider.name(),
                origin.formatted_address,
                destination.formatted_address
            )
        })?;
    debug!(provider = provider.name(), distance_km = directions.distance_km, "directions fetched");
    Ok(RouteSummary::from_route(
        RouteOutputKind::Trip,
        None,
        &directions.to_route(),
    ))
}
