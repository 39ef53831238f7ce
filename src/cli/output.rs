//! Handles all user-facing output of `check`.
//!
//! Text mode prints one colored status line per script, followed by a line
//! diff of the script against its corrected copy when it changed. JSON mode
//! prints the whole [`RunSummary`] once at the end.

use std::io::Write;

use difference::{Changeset, Difference};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::driver::FileOutcome;
use crate::report::{FileReport, FileStatus, RunSummary};

pub struct ReportPrinter {
    stdout: StandardStream,
    show_diff: bool,
}

impl ReportPrinter {
    pub fn new(use_colors: bool, show_diff: bool) -> Self {
        let choice = if use_colors {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        Self {
            stdout: StandardStream::stdout(choice),
            show_diff,
        }
    }

    /// Prints the status line of a checked script and, if it changed, its diff.
    pub fn file(&mut self, report: &FileReport, outcome: Option<&FileOutcome>) {
        let (label, color) = match report.status {
            FileStatus::Passed => ("PASS", Color::Green),
            FileStatus::Changed => ("CHANGED", Color::Yellow),
            FileStatus::Failed => ("FAIL", Color::Red),
        };
        let _ = self
            .stdout
            .set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
        let _ = write!(self.stdout, "{label}");
        let _ = self.stdout.reset();
        let _ = write!(self.stdout, ": {}", report.path.display());
        match (&report.status, &report.written_to) {
            (FileStatus::Changed, Some(target)) => {
                let _ = writeln!(
                    self.stdout,
                    " ({} correction(s){}, written to {})",
                    report.corrections,
                    if report.trailing_block {
                        " + trailing block"
                    } else {
                        ""
                    },
                    target.display()
                );
            }
            _ => {
                let _ = writeln!(self.stdout);
            }
        }

        if let (true, FileStatus::Changed, Some(outcome)) =
            (self.show_diff, report.status, outcome)
        {
            let changeset = Changeset::new(&outcome.original, &outcome.corrected_text(), "\n");
            print_diff(&mut self.stdout, &changeset.diffs);
        }
    }

    pub fn summary(&mut self, summary: &RunSummary) {
        let _ = writeln!(self.stdout);
        let _ = write!(self.stdout, "{} script(s): ", summary.total());
        self.count("passed", summary.passed, Color::Green);
        let _ = write!(self.stdout, ", ");
        self.count("changed", summary.changed, Color::Yellow);
        let _ = write!(self.stdout, ", ");
        self.count("failed", summary.failed, Color::Red);
        let _ = writeln!(self.stdout);
    }

    fn count(&mut self, label: &str, n: usize, color: Color) {
        if n > 0 {
            let _ = self.stdout.set_color(ColorSpec::new().set_fg(Some(color)));
        }
        let _ = write!(self.stdout, "{n} {label}");
        let _ = self.stdout.reset();
    }
}

/// Prints the summary as pretty JSON on stdout.
pub fn print_json(summary: &RunSummary) {
    match serde_json::to_string_pretty(summary) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error: could not serialize report: {e}"),
    }
}

fn print_diff(stdout: &mut StandardStream, diffs: &[Difference]) {
    for diff in diffs {
        match diff {
            Difference::Same(ref x) => {
                let _ = stdout.reset();
                for line in x.split('\n') {
                    let _ = writeln!(stdout, " {line}");
                }
            }
            Difference::Add(ref x) => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
                for line in x.split('\n') {
                    let _ = writeln!(stdout, "+{line}");
                }
            }
            Difference::Rem(ref x) => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
                for line in x.split('\n') {
                    let _ = writeln!(stdout, "-{line}");
                }
            }
        }
    }
    let _ = stdout.reset();
}
