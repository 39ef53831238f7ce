//! The toplevel: executes statements one at a time and reports results the
//! way an interactive session would.
//!
//! The expect runner only depends on the [`Evaluator`] trait and on the
//! [`OutputSink`] channels; [`Toplevel`] is the bundled implementation.

use std::fmt;

use crate::syntax::{Location, Statement};

pub mod eval;
pub mod output;
pub mod value;

pub use eval::{EvalFlags, Toplevel};
pub use output::{Channel, OutputSink, StdioSink};
pub use value::{Builtin, Value};

/// Executes one statement at a time, keeping whatever state earlier
/// statements established.
pub trait Evaluator {
    /// Runs `stmt`, writing everything it prints to `out`.
    fn execute(&mut self, stmt: &Statement, out: &mut dyn OutputSink) -> Result<(), Fault>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Rejected before or during evaluation (unbound name, type mismatch, ...).
    Error,
    /// A warning promoted to an error by warnings-as-errors.
    FatalWarning { number: u32, name: &'static str },
    /// An uncaught exception raised by the program.
    Exception,
}

/// Why a statement did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub kind: FaultKind,
    pub message: String,
    pub location: Option<Location>,
}

impl Fault {
    pub fn error(message: impl Into<String>, location: Location) -> Self {
        Self {
            kind: FaultKind::Error,
            message: message.into(),
            location: Some(location),
        }
    }

    pub fn exception(message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Exception,
            message: message.into(),
            location: None,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FaultKind::Error => write!(f, "Error: {}", self.message),
            FaultKind::FatalWarning { number, name } => {
                write!(f, "Error (warning {number} [{name}]): {}", self.message)
            }
            FaultKind::Exception => write!(f, "Exception: {}.", self.message),
        }
    }
}

impl std::error::Error for Fault {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_display() {
        let loc = Location::default();
        assert_eq!(
            Fault::error("Unbound value y", loc).to_string(),
            "Error: Unbound value y"
        );
        assert_eq!(
            Fault::exception("Failure \"boom\"").to_string(),
            "Exception: Failure \"boom\"."
        );
        let fatal = Fault {
            kind: FaultKind::FatalWarning {
                number: 10,
                name: "non-unit-statement",
            },
            message: "this expression should have type unit.".into(),
            location: Some(loc),
        };
        assert_eq!(
            fatal.to_string(),
            "Error (warning 10 [non-unit-statement]): this expression should have type unit."
        );
    }
}
