//! Output channels seen by evaluated programs.

use std::io::Write;

/// Where a piece of text was printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Program output (`print_string`, ...).
    Stdout,
    /// Program error output (`prerr_endline`).
    Stderr,
    /// Toplevel responses, warnings and errors.
    Toplevel,
}

pub trait OutputSink {
    fn emit(&mut self, channel: Channel, text: &str);

    /// Pushes out anything still buffered.
    fn flush(&mut self) {}
}

/// StdioSink: writes program output and toplevel responses to stdout, error output to stderr.
pub struct StdioSink;

impl OutputSink for StdioSink {
    fn emit(&mut self, channel: Channel, text: &str) {
        match channel {
            Channel::Stdout | Channel::Toplevel => print!("{text}"),
            Channel::Stderr => eprint!("{text}"),
        }
    }

    fn flush(&mut self) {
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
    }
}
