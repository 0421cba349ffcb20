//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod batch;
mod show;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::config::{load_config, merge_cli_overrides, CliOverrides, FigConfig};
use crate::figure::Figure;

pub use batch::BatchMode;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Figbatch - apply batched property edits to plotting figures
#[derive(Parser)]
#[command(name = "figb")]
#[command(about = "Figbatch - apply batched, coalesced property edits to plotting figures")]
#[command(version)]
pub struct Cli {
    /// Path to figbatch.toml (default: discovered from the working directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply an edit script inside one animate scope and print the message
    ///
    /// The scope is flushed even when an edit is rejected, so stdout may
    /// hold the message for the edits applied before the failure while the
    /// exit code reports the failure.
    Animate {
        /// Figure JSON file ({"data": [...], "layout": {...}, "frames": [...]})
        figure: PathBuf,

        /// Edit script (.jsonl, one edit object per line or JSON5 objects)
        edits: PathBuf,

        /// Easing curve (e.g. "elastic", "cubic-in-out")
        #[arg(long)]
        easing: Option<String>,

        /// Transition duration in milliseconds
        #[arg(long)]
        duration: Option<u64>,

        /// Write the edited figure to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Accept unknown property paths with a warning
        #[arg(long)]
        lenient: bool,
    },

    /// Apply an edit script inside one update scope and print the message
    ///
    /// The scope is flushed even when an edit is rejected, so stdout may
    /// hold the message for the edits applied before the failure while the
    /// exit code reports the failure.
    Update {
        /// Figure JSON file
        figure: PathBuf,

        /// Edit script (.jsonl)
        edits: PathBuf,

        /// Write the edited figure to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Accept unknown property paths with a warning
        #[arg(long)]
        lenient: bool,
    },

    /// Print one property of a figure as JSON
    Get {
        /// Figure JSON file
        figure: PathBuf,

        /// Node: layout, trace:N or frame:N
        node: String,

        /// Property path (e.g. marker.color)
        path: String,
    },

    /// Validate a figure against the property schema
    Validate {
        /// Figure JSON file(s)
        #[arg(required = true)]
        figures: Vec<PathBuf>,

        /// Accept unknown property paths with a warning
        #[arg(long)]
        lenient: bool,
    },
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins over the configured level. Calling this twice is harmless.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Load a figure file, printing the error on failure.
pub(crate) fn read_figure(path: &Path, config: &FigConfig) -> Result<Figure, ExitCode> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: Cannot read '{}': {}", path.display(), e);
            return Err(ExitCode::from(EXIT_ERROR));
        }
    };

    let value = match serde_json::from_str(&contents) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: '{}' is not valid JSON: {}", path.display(), e);
            return Err(ExitCode::from(EXIT_ERROR));
        }
    };

    Figure::from_value_with(value, config.validate.validation()).map_err(|e| {
        eprintln!("Error: {}: {}", path.display(), e);
        ExitCode::from(EXIT_ERROR)
    })
}

fn resolve_config(cli: &Cli, overrides: CliOverrides) -> Result<FigConfig, ExitCode> {
    let mut config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Err(ExitCode::from(EXIT_ERROR));
        }
    };

    let overrides = CliOverrides { log_level: cli.log_level.clone(), ..overrides };
    if let Err(e) = merge_cli_overrides(&mut config, &overrides) {
        eprintln!("Error: {}", e);
        return Err(ExitCode::from(EXIT_INVALID_ARGS));
    }
    Ok(config)
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let overrides = match &cli.command {
        Commands::Animate { easing, duration, lenient, .. } => CliOverrides {
            easing: easing.clone(),
            duration: *duration,
            strict: lenient.then_some(false),
            ..Default::default()
        },
        Commands::Update { lenient, .. } | Commands::Validate { lenient, .. } => {
            CliOverrides { strict: lenient.then_some(false), ..Default::default() }
        }
        Commands::Get { .. } => CliOverrides::default(),
    };

    let config = match resolve_config(&cli, overrides) {
        Ok(c) => c,
        Err(code) => return code,
    };
    init_logging(&config.logging.level);

    match cli.command {
        Commands::Animate { figure, edits, output, .. } => {
            batch::run_batch(BatchMode::Animate, &figure, &edits, output.as_deref(), &config)
        }
        Commands::Update { figure, edits, output, .. } => {
            batch::run_batch(BatchMode::Update, &figure, &edits, output.as_deref(), &config)
        }
        Commands::Get { figure, node, path } => show::run_get(&figure, &node, &path, &config),
        Commands::Validate { figures, .. } => show::run_validate(&figures, &config),
    }
}
