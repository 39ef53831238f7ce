//! The expect-test core: segment a script, run each chunk, compare against
//! the stored expectations and splice corrections back into the file.

pub mod capture;
pub mod compare;
pub mod correct;
pub mod exec;
pub mod extract;
pub mod segment;

pub use capture::{normalize, CaptureBuffer, CaptureScope};
pub use compare::{compare, Mode};
pub use correct::{correct, Correction, CorrectionSet};
pub use exec::{report_fault, ExecutionEngine};
pub use extract::{extract, is_expect_marker, Expectation, MARKER_NAMES, STRICT_VARIANT};
pub use segment::{segment, Chunk, Segments};
