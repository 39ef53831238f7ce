//! Runs one statement group and captures what it prints.

use tracing::debug;

use super::capture::CaptureBuffer;
use crate::syntax::{relocate_to_first_line, Statement};
use crate::toplevel::{Channel, Evaluator, Fault, OutputSink};

/// Executes statement groups against an evaluator, one capture at a time.
#[derive(Debug, Default)]
pub struct ExecutionEngine {
    capture: CaptureBuffer,
}

impl ExecutionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `statements` in order and returns their normalized output.
    ///
    /// Line numbers are renumbered so the group starts at line 1. The first
    /// fault is rendered into the output and ends the group.
    pub fn run_group(&mut self, evaluator: &mut dyn Evaluator, statements: &[Statement]) -> String {
        let mut statements = statements.to_vec();
        relocate_to_first_line(&mut statements);

        let mut scope = self.capture.begin();
        for (index, stmt) in statements.iter().enumerate() {
            if let Err(fault) = evaluator.execute(stmt, &mut scope) {
                debug!(
                    statement = index,
                    skipped = statements.len() - index - 1,
                    "fault: {fault}"
                );
                report_fault(&fault, &mut scope);
                break;
            }
        }
        scope.finish()
    }
}

/// Writes a fault the way the toplevel reports it: the location header on
/// its own line, then the message.
pub fn report_fault(fault: &Fault, out: &mut dyn OutputSink) {
    let text = match &fault.location {
        Some(loc) => format!("{loc}:\n{fault}\n"),
        None => format!("{fault}\n"),
    };
    out.emit(Channel::Toplevel, &text);
}
