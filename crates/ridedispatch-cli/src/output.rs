//! Output formatting for CLI results.

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;

use ridedispatch_lib::{DispatchEvent, RouteSummary, UnmatchedReason};

use crate::terminal::{format_offset, ColorPalette};

/// Output format selected with `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON on stdout.
    Json,
}

/// Write `value` to stdout as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to serialise output")?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}").context("failed to write to stdout")?;
    Ok(())
}

/// Print a route summary in the requested format.
pub fn print_route(summary: &RouteSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            print!("{}", summary.render());
            Ok(())
        }
        OutputFormat::Json => print_json(summary),
    }
}

/// One-line description of a dispatch event, `offset_ms` after submission.
pub fn render_event(event: &DispatchEvent, offset_ms: u64, palette: &ColorPalette) -> String {
    let p = palette;
    let when = format!("{}[{:>6}]{}", p.gray, format_offset(offset_ms), p.reset);
    let ride = format!("{}{}{}", p.white_bold, event.ride_id(), p.reset);
    match event {
        DispatchEvent::Matched {
            driver_id, route, ..
        } => {
            let route_note = route
                .as_ref()
                .map(|route| {
                    format!(
                        " (route {:.1}, ~{} min)",
                        route.distance, route.estimated_time
                    )
                })
                .unwrap_or_default();
            format!(
                "{when} {}matched{} {ride} with {}{driver_id}{}{route_note}",
                p.green, p.reset, p.white_bold, p.reset
            )
        }
        DispatchEvent::Unmatched { reason, .. } => {
            let reason = match reason {
                UnmatchedReason::NoDriver => "no available driver nearby",
                UnmatchedReason::NoPath => "no route to serve the ride",
            };
            format!("{when} {}unmatched{} {ride}: {reason}", p.yellow, p.reset)
        }
        DispatchEvent::RouteUnavailable { reason, .. } => {
            format!("{when} {}route unavailable{} for {ride}: {reason}", p.red, p.reset)
        }
        DispatchEvent::TripStarted { .. } => {
            format!("{when} {}trip started{} for {ride}", p.cyan, p.reset)
        }
        DispatchEvent::Stale { task, .. } => {
            format!("{when} {}skipped{} {task:?} for {ride}", p.gray, p.reset)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridedispatch_lib::{RoutePath, RouteResult};

    #[test]
    fn renders_match_with_route_totals() {
        let event = DispatchEvent::Matched {
            ride_id: "ride_1".to_string(),
            driver_id: "driver2".to_string(),
            route: Some(RouteResult {
                path: RoutePath::Nodes(vec!["E".to_string(), "B".to_string()]),
                distance: 3.0,
                estimated_time: 6,
            }),
        };
        let line = render_event(&event, 1000, &ColorPalette::plain());
        assert_eq!(
            line,
            "[   +1s] matched ride_1 with driver2 (route 3.0, ~6 min)"
        );
    }

    #[test]
    fn renders_unmatched_reason() {
        let event = DispatchEvent::Unmatched {
            ride_id: "ride_1".to_string(),
            reason: UnmatchedReason::NoDriver,
        };
        let line = render_event(&event, 1500, &ColorPalette::plain());
        assert_eq!(line, "[ +1.5s] unmatched ride_1: no available driver nearby");
    }
}
