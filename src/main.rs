//! figb - apply batched property edits to plotting figures from the command line

use std::process::ExitCode;

use figbatch::cli;

fn main() -> ExitCode {
    cli::run()
}
