//! `drivers` subcommand: list the scenario's fleet.

use anyhow::Result;

use ridedispatch_lib::output::render_drivers;

use super::DispatchContext;
use crate::output::{print_json, OutputFormat};

pub fn handle_drivers(
    context: &DispatchContext,
    available_only: bool,
    format: OutputFormat,
) -> Result<()> {
    let registry = context.scenario.registry()?;
    let drivers: Vec<_> = registry
        .snapshot()
        .into_iter()
        .filter(|driver| driver.available || !available_only)
        .collect();

    match format {
        OutputFormat::Json => print_json(&drivers),
        OutputFormat::Text => {
            print!("{}", render_drivers(&drivers));
            println!(
                "{} of {} drivers available",
                registry.available_count(),
                registry.len()
            );
            Ok(())
        }
    }
}
