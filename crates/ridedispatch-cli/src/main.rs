use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use ridedispatch_cli::commands::{
    drivers::handle_drivers,
    geocode::handle_geocode,
    nearest::{handle_nearest, NearestArgs},
    route::handle_route,
    simulate::{handle_simulate, SimulateArgs},
    ContextOptions, DispatchContext,
};
use ridedispatch_cli::logging::{init_logging, LogFormat, LoggingConfig};
use ridedispatch_cli::output::OutputFormat;
use ridedispatch_lib::DispatchMode;

#[derive(Parser, Debug)]
#[command(author, version, about = "Ride dispatch and routing simulator")]
struct Cli {
    /// Scenario JSON with nodes, edges and drivers. Defaults to the built-in
    /// demo for the selected mode.
    #[arg(long, global = true, env = "RIDEDISPATCH_SCENARIO")]
    scenario: Option<PathBuf>,

    /// Dispatch configuration file (JSON).
    #[arg(long, global = true, env = "RIDEDISPATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Dispatch variant; overrides the mode in the configuration file.
    #[arg(long, global = true, value_enum)]
    mode: Option<ModeArg>,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Log format on stderr. Falls back to `LOG_FORMAT`.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormatArg>,

    /// OSRM endpoint for coordinate directions. Straight-line estimates are
    /// used when unset.
    #[arg(long, global = true, env = "RIDEDISPATCH_OSRM_URL")]
    osrm_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Graph,
    Coordinate,
}

impl From<ModeArg> for DispatchMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Graph => DispatchMode::Graph,
            ModeArg::Coordinate => DispatchMode::Coordinate,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Shortest route between two nodes, or directions between two places.
    Route {
        /// Start node id or place.
        #[arg(long = "from")]
        from: String,
        /// Destination node id or place.
        #[arg(long = "to")]
        to: String,
    },
    /// Available drivers around a pickup location.
    Nearest {
        /// Pickup node id or place.
        #[arg(long)]
        pickup: String,
        /// Search radius (graph weight units or km).
        #[arg(long)]
        radius: Option<f64>,
        /// Exact shortest-path distances instead of the flood fill.
        #[arg(long)]
        exact: bool,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Submit one ride and run the dispatch clock until it settles.
    Simulate {
        #[arg(long)]
        pickup: String,
        #[arg(long)]
        destination: String,
        #[arg(long, default_value = "passenger_1")]
        passenger_id: String,
        #[arg(long, default_value = "Guest")]
        passenger_name: String,
        /// Complete the trip after it starts.
        #[arg(long, conflicts_with = "cancel")]
        complete: bool,
        /// Cancel the ride after the clock settles.
        #[arg(long)]
        cancel: bool,
        /// Directory for persisted ride records.
        #[arg(long)]
        store: Option<PathBuf>,
    },
    /// Resolve a place name to coordinates.
    Geocode {
        query: String,
    },
    /// List the drivers in the scenario.
    Drivers {
        #[arg(long)]
        available: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env();
    if let Some(format) = cli.log_format {
        logging = logging.with_format(format.into());
    }
    init_logging(&logging);

    let context = DispatchContext::load(&ContextOptions {
        scenario: cli.scenario,
        config: cli.config,
        mode: cli.mode.map(Into::into),
        osrm_url: cli.osrm_url,
    })?;
    let format = cli.format;

    match cli.command {
        Command::Route { from, to } => handle_route(&context, &from, &to, format),
        Command::Nearest {
            pickup,
            radius,
            exact,
            limit,
        } => handle_nearest(
            &context,
            &pickup,
            &NearestArgs {
                radius,
                exact,
                limit,
            },
            format,
        ),
        Command::Simulate {
            pickup,
            destination,
            passenger_id,
            passenger_name,
            complete,
            cancel,
            store,
        } => handle_simulate(
            &context,
            &SimulateArgs {
                pickup,
                destination,
                passenger_id,
                passenger_name,
                complete,
                cancel,
                store,
            },
            format,
        ),
        Command::Geocode { query } => handle_geocode(&context, &query, format),
        Command::Drivers { available } => handle_drivers(&context, available, format),
    }
}
