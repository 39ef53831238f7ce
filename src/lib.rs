//! topexpect: an expect-test runner for toplevel scripts.
//!
//! A script interleaves toplevel phrases with `[%%expect {|...|}]` blocks.
//! Running it executes the phrases chunk by chunk, compares what each chunk
//! printed with the block that follows it, and writes a corrected copy of the
//! script in which every stale block holds the actual output.

pub use crate::diagnostics::{ErrorContext, ExpectError, SourceContext};

pub mod cli;
pub mod diagnostics;
pub mod driver;
pub mod expect;
pub mod logging;
pub mod report;
pub mod syntax;
pub mod toplevel;
