//! Inspection commands (get, validate)

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::FigConfig;
use crate::models::NodeRef;

use super::{read_figure, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Execute the get command
pub fn run_get(figure_path: &Path, node: &str, path: &str, config: &FigConfig) -> ExitCode {
    let node: NodeRef = match node.parse() {
        Ok(n) => n,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let figure = match read_figure(figure_path, config) {
        Ok(f) => f,
        Err(code) => return code,
    };

    match figure.get(node, path) {
        Ok(Some(value)) => match serde_json::to_string_pretty(value) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::from(EXIT_SUCCESS)
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::from(EXIT_ERROR)
            }
        },
        Ok(None) => {
            println!("null");
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Execute the validate command
pub fn run_validate(figures: &[PathBuf], config: &FigConfig) -> ExitCode {
    let mut failed = 0;

    for path in figures {
        match read_figure(path, config) {
            Ok(figure) => println!(
                "{}: ok ({} traces, {} frames)",
                path.display(),
                figure.data().len(),
                figure.frames().len()
            ),
            Err(_) => failed += 1,
        }
    }

    if failed > 0 {
        eprintln!("{} of {} figure(s) failed validation", failed, figures.len());
        ExitCode::from(EXIT_ERROR)
    } else {
        ExitCode::from(EXIT_SUCCESS)
    }
}
