//! `geocode` subcommand.

use anyhow::Result;

use super::DispatchContext;
use crate::output::{print_json, OutputFormat};

/// Resolve a place name (or `lat,lng`) and print its position.
pub fn handle_geocode(context: &DispatchContext, query: &str, format: OutputFormat) -> Result<()> {
    let place = context.resolve_place(query)?;
    match format {
        OutputFormat::Json => print_json(&place),
        OutputFormat::Text => {
            println!("{}", place.formatted_address);
            println!("{}", place.position());
            Ok(())
        }
    }
}
