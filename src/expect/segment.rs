//! Splits a script into chunks, each ending with its expectation.

use super::extract::{extract, Expectation};
use crate::diagnostics::{ExpectError, SourceContext};
use crate::syntax::{Statement, StatementKind};

/// Statements up to, and the expectation that closes them.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub statements: Vec<Statement>,
    pub expectation: Expectation,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Segments {
    pub chunks: Vec<Chunk>,
    /// Statements after the last expectation, if any.
    pub trailing: Option<Vec<Statement>>,
}

pub fn segment(statements: Vec<Statement>, source: &SourceContext) -> Result<Segments, ExpectError> {
    let mut chunks = Vec::new();
    let mut pending = Vec::new();

    for stmt in statements {
        match &stmt.kind {
            StatementKind::Empty => continue,
            StatementKind::Extension(ext) => {
                if let Some(expectation) = extract(ext, source)? {
                    chunks.push(Chunk {
                        statements: std::mem::take(&mut pending),
                        expectation,
                    });
                    continue;
                }
            }
            _ => {}
        }
        pending.push(stmt);
    }

    let trailing = (!pending.is_empty()).then_some(pending);
    Ok(Segments { chunks, trailing })
}
