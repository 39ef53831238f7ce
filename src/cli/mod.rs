//! The topexpect command-line interface.
//!
//! This module is the entry point for all CLI commands and orchestrates the
//! core library functions.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::warn;

use crate::cli::args::{Command, EvalArgs, Format, TopexpectArgs};
use crate::cli::output::{print_json, ReportPrinter};
use crate::diagnostics::print_error;
use crate::driver::{discover_scripts, run_file, run_script, RunConfig};
use crate::logging;
use crate::report::{FileReport, RunSummary};

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() -> ExitCode {
    logging::init();
    let args = TopexpectArgs::parse();

    match args.command {
        Command::Check {
            paths,
            eval,
            promote,
            no_diff,
            format,
        } => {
            let config = RunConfig {
                mode: eval.mode(),
                flags: eval.flags(),
                promote,
                show_diff: !no_diff,
                ..RunConfig::default()
            };
            handle_check(&paths, &config, format)
        }
        Command::Run { file, eval } => handle_run(&file, &eval),
    }
}

/// Handles the `check` subcommand. Fails if any script changed or failed.
fn handle_check(paths: &[PathBuf], config: &RunConfig, format: Format) -> ExitCode {
    let scripts = match discover_scripts(paths) {
        Ok(scripts) => scripts,
        Err(e) => {
            print_error(e);
            return ExitCode::FAILURE;
        }
    };

    let text = format == Format::Text;
    let mut printer = ReportPrinter::new(config.use_colors, config.show_diff);
    let mut summary = RunSummary::default();

    for path in &scripts {
        match run_file(path, config) {
            Ok(outcome) => {
                let report = FileReport::from_outcome(&outcome);
                if text {
                    printer.file(&report, Some(&outcome));
                }
                summary.record(report);
            }
            Err(e) => {
                warn!(path = %path.display(), "{e}");
                let report = FileReport::from_error(path, &e);
                if text {
                    printer.file(&report, None);
                    print_error(e);
                }
                summary.record(report);
            }
        }
    }

    if text {
        printer.summary(&summary);
    } else {
        print_json(&summary);
    }

    if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Handles the `run` subcommand.
fn handle_run(path: &Path, eval: &EvalArgs) -> ExitCode {
    match run_script(path, eval.flags()) {
        Ok(None) => ExitCode::SUCCESS,
        Ok(Some(_)) => ExitCode::FAILURE,
        Err(e) => {
            print_error(e);
            ExitCode::FAILURE
        }
    }
}
