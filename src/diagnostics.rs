//! Diagnostics for topexpect.
//!
//! Every fatal condition of a run (a script that does not parse, a malformed
//! `[%%expect]` payload, a file that cannot be read or written) is an
//! [`ExpectError`]. Errors carry an [`ErrorContext`] with the named source and
//! the offending span so that `miette` can render a source excerpt.
//!
//! Evaluation faults are *not* errors in this sense: they are recovered per
//! chunk and end up as text inside the corrected expectation blocks. See
//! [`crate::toplevel::Fault`].
//!
//! # Construction
//!
//! - Use `err_ctx!` when you have a source and a span:
//!   `err_ctx!(Parse, "unexpected token", &source, span)`
//! - Append a help text as a fifth argument:
//!   `err_ctx!(Structure, "bad payload", &source, span, "use {|...|}")`

use std::path::PathBuf;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, Report, SourceCode};
use thiserror::Error;

use crate::syntax::Span;

pub type SourceArc = Arc<NamedSource<String>>;

/// Source text of a script together with the name used in diagnostics.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Convert to a NamedSource for use with miette error reporting
    pub fn to_named_source(&self) -> SourceArc {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }
}

/// Where an error points to, and how to help.
#[derive(Debug, Default)]
pub struct ErrorContext {
    pub source: Option<SourceArc>,
    pub span: Option<Span>,
    pub help: Option<String>,
}

/// Fatal failure modes of an expect run.
#[derive(Debug, Error)]
pub enum ExpectError {
    #[error("Parse error: {message}")]
    Parse { message: String, ctx: ErrorContext },

    /// The payload of an expectation node has a shape we do not understand.
    #[error("Malformed expectation: {message}")]
    Structure { message: String, ctx: ErrorContext },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExpectError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExpectError::Io {
            path: path.into(),
            source,
        }
    }

    fn ctx(&self) -> Option<&ErrorContext> {
        match self {
            ExpectError::Parse { ctx, .. } | ExpectError::Structure { ctx, .. } => Some(ctx),
            ExpectError::Io { .. } => None,
        }
    }

    /// Short machine-readable category, used for diagnostic codes and JSON reports.
    pub const fn code(&self) -> &'static str {
        match self {
            ExpectError::Parse { .. } => "topexpect::parse",
            ExpectError::Structure { .. } => "topexpect::structure",
            ExpectError::Io { .. } => "topexpect::io",
        }
    }

    fn primary_label(&self) -> &'static str {
        match self {
            ExpectError::Parse { .. } => "syntax error here",
            ExpectError::Structure { .. } => "expectation marker",
            ExpectError::Io { .. } => "",
        }
    }
}

impl Diagnostic for ExpectError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(self.code()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.ctx()
            .and_then(|ctx| ctx.help.as_ref())
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.ctx()
            .and_then(|ctx| ctx.source.as_ref())
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.ctx()?.span?;
        let len = span.len().max(1);
        let label = LabeledSpan::new(Some(self.primary_label().to_string()), span.start, len);
        Some(Box::new(std::iter::once(label)))
    }
}

/// Constructs an ExpectError variant with a message, a source and a span.
#[macro_export]
macro_rules! err_ctx {
    // Message, src, span, help
    ($variant:ident, $msg:expr, $src:expr, $span:expr, $help:expr) => {
        $crate::ExpectError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext {
                source: Some($crate::diagnostics::SourceContext::to_named_source($src)),
                span: Some($span),
                help: Some(format!("{}", $help)),
            },
        }
    };
    // Message, src, span
    ($variant:ident, $msg:expr, $src:expr, $span:expr) => {
        $crate::ExpectError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext {
                source: Some($crate::diagnostics::SourceContext::to_named_source($src)),
                span: Some($span),
                help: None,
            },
        }
    };
}

/// Prints an ExpectError with full miette diagnostics
pub fn print_error(error: ExpectError) {
    let report = Report::new(error);
    eprintln!("{report:?}");
}
