//! `simulate` subcommand: run one ride through the dispatch engine.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use ridedispatch_lib::output::{render_drivers, render_rides};
use ridedispatch_lib::{
    DispatchEngine, DispatchEvent, DispatchMode, DispatchSnapshot, DispatchStrategy, Dispatcher,
    Graph, JsonRideStore, Location, RideId, RideStatus, RideSubmission, RouteOutputKind,
    RouteSummary,
};

use super::DispatchContext;
use crate::output::{print_json, render_event, OutputFormat};
use crate::terminal::ColorPalette;

#[derive(Debug, Clone)]
pub struct SimulateArgs {
    pub pickup: String,
    pub destination: String,
    pub passenger_id: String,
    pub passenger_name: String,
    /// Finish the trip once the ride has a driver.
    pub complete: bool,
    /// Cancel the ride after the queued tasks ran.
    pub cancel: bool,
    /// Persist rides as JSON files in this directory.
    pub store: Option<PathBuf>,
}

/// What happened to the ride after the clock ran out of tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Outcome {
    Left,
    Completed,
    Canceled,
}

#[derive(Debug, Serialize)]
struct TimedEvent {
    offset_ms: u64,
    #[serde(flatten)]
    event: DispatchEvent,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    ride_id: RideId,
    events: Vec<TimedEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    route: Option<RouteSummary>,
    outcome: Outcome,
    snapshot: DispatchSnapshot,
}

pub fn handle_simulate(
    context: &DispatchContext,
    args: &SimulateArgs,
    format: OutputFormat,
) -> Result<()> {
    let started_at = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
    let config = context.config.clone();

    let report = match config.mode {
        DispatchMode::Graph => {
            let graph = context.scenario.graph();
            let pickup = graph.resolve_node(&args.pickup)?;
            let destination = graph.resolve_node(&args.destination)?;
            let submission = RideSubmission::new(
                args.passenger_id.as_str(),
                args.passenger_name.as_str(),
                Location::node(pickup),
                Location::node(destination),
            );
            let engine = context
                .scenario
                .graph_engine(config)?
                .with_start_time(started_at);
            run(engine, submission, Some(&graph), args, format)?
        }
        DispatchMode::Coordinate => {
            let pickup = context.resolve_place(&args.pickup)?;
            let destination = context.resolve_place(&args.destination)?;
            let submission = RideSubmission::between_places(
                args.passenger_id.as_str(),
                args.passenger_name.as_str(),
                &pickup,
                &destination,
            );
            let engine = context
                .scenario
                .coordinate_engine(context.directions_provider()?, config)?
                .with_start_time(started_at);
            run(engine, submission, None, args, format)?
        }
    };

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            println!();
            println!("Rides:");
            print!("{}", render_rides(&report.snapshot.rides));
            println!("Drivers:");
            print!("{}", render_drivers(&report.snapshot.drivers));
            Ok(())
        }
    }
}

fn run<S: DispatchStrategy>(
    engine: DispatchEngine<S>,
    submission: RideSubmission,
    graph: Option<&Graph>,
    args: &SimulateArgs,
    format: OutputFormat,
) -> Result<SimulationReport> {
    let mut engine = match &args.store {
        Some(dir) => {
            let store = JsonRideStore::open(dir)
                .with_context(|| format!("failed to open ride store at {}", dir.display()))?;
            engine.with_store(Box::new(store))
        }
        None => engine,
    };
    let palette = ColorPalette::detect();
    let submitted_at = engine.now_ms();

    let ride_id = engine.submit_request(submission)?;
    if format == OutputFormat::Text {
        println!("Submitted {ride_id}");
    }

    let mut events = Vec::new();
    while let Some(due) = engine.next_due_ms() {
        let step = engine.advance(Duration::from_millis(due.saturating_sub(engine.now_ms())));
        let offset_ms = engine.now_ms().saturating_sub(submitted_at);
        let unmatched = step
            .iter()
            .any(|event| matches!(event, DispatchEvent::Unmatched { .. }));
        for event in step {
            if format == OutputFormat::Text {
                println!("{}", render_event(&event, offset_ms, &palette));
            }
            events.push(TimedEvent { offset_ms, event });
        }
        // Nothing in a one-ride run can free up a driver, so retries would
        // only repeat the same outcome.
        if unmatched {
            break;
        }
    }

    let kind = if graph.is_some() {
        RouteOutputKind::Assignment
    } else {
        RouteOutputKind::Trip
    };
    let route = engine
        .ledger()
        .route(&ride_id)
        .map(|route| RouteSummary::from_route(kind, graph, route));
    if format == OutputFormat::Text {
        match &route {
            Some(summary) => print!("{}", summary.render()),
            None => println!("No route stored for {ride_id}"),
        }
    }

    let outcome = if args.complete {
        if engine
            .ledger()
            .get(&ride_id)
            .is_some_and(|ride| ride.status == RideStatus::Matched)
        {
            engine.report_pickup(&ride_id)?;
        }
        finish(&mut engine, &ride_id, Outcome::Completed)?
    } else if args.cancel {
        finish(&mut engine, &ride_id, Outcome::Canceled)?
    } else {
        Outcome::Left
    };
    if format == OutputFormat::Text && outcome != Outcome::Left {
        println!("{ride_id} {}", outcome_label(outcome));
    }

    Ok(SimulationReport {
        ride_id,
        events,
        route,
        outcome,
        snapshot: Dispatcher::snapshot(&engine),
    })
}

fn finish(dispatcher: &mut dyn Dispatcher, ride_id: &str, outcome: Outcome) -> Result<Outcome> {
    match outcome {
        Outcome::Completed => dispatcher.complete_request(ride_id)?,
        Outcome::Canceled => {
            dispatcher.cancel_request(ride_id)?;
        }
        Outcome::Left => {}
    }
    info!(ride = %ride_id, ?outcome, "simulation finished");
    Ok(outcome)
}

fn outcome_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Left => "left as is",
        Outcome::Completed => "completed",
        Outcome::Canceled => "canceled",
    }
}
