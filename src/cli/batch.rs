//! Batch command implementations (animate, update)

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::process::ExitCode;

use tracing::info;

use crate::batch::{BatchError, BatchScope};
use crate::config::FigConfig;
use crate::parser::{parse_stream, EditCommand};
use crate::path::PropertyPath;
use crate::transport::JsonlTransport;

use super::{read_figure, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Which kind of scope the edit script runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    Animate,
    Update,
}

/// Apply every edit in order, stopping at the first rejected one.
fn apply_edits(scope: &mut BatchScope<'_>, edits: &[EditCommand]) -> Result<usize, String> {
    for edit in edits {
        let node = edit.node().map_err(|e| e.to_string())?;
        let path = PropertyPath::parse(&edit.path)
            .map_err(|e| format!("line {}: {}", edit.line, e))?;
        scope
            .set_path(node, path, edit.value.clone())
            .map_err(|e| format!("line {}: {}", edit.line, e))?;
    }
    Ok(edits.len())
}

/// Execute the animate/update command
pub fn run_batch(
    mode: BatchMode,
    figure_path: &Path,
    edits_path: &Path,
    output: Option<&Path>,
    config: &FigConfig,
) -> ExitCode {
    let options = match config.animation.to_options() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let figure = match read_figure(figure_path, config) {
        Ok(f) => f,
        Err(code) => return code,
    };

    let file = match File::open(edits_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: Cannot open '{}': {}", edits_path.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let parsed = parse_stream(BufReader::new(file));
    if let Some(warning) = parsed.warnings.first() {
        eprintln!("Error: {}: line {}: {}", edits_path.display(), warning.line, warning.message);
        return ExitCode::from(EXIT_ERROR);
    }

    let mut figure = figure.with_transport(JsonlTransport::new(io::stdout().lock()));
    let result = match mode {
        BatchMode::Animate => {
            figure.with_batch_animate(options, |scope| apply_edits(scope, &parsed.edits))
        }
        BatchMode::Update => figure.with_batch_update(|scope| apply_edits(scope, &parsed.edits)),
    };

    match result {
        Ok(count) => info!(edits = count, "edit script applied"),
        Err(BatchError::Body(e)) => {
            eprintln!("Error: {}: {}", edits_path.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
        Err(BatchError::Transport(e)) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    }

    if let Some(out) = output {
        let json = match figure.to_json_pretty() {
            Ok(j) => j,
            Err(e) => {
                eprintln!("Error: Cannot encode figure: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        };
        if let Err(e) = std::fs::write(out, json) {
            eprintln!("Error: Cannot write '{}': {}", out.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    }

    ExitCode::from(EXIT_SUCCESS)
}
