//! Rebuilds a script with corrected expectation payloads.
//!
//! This is a byte splice over the original file: untouched ranges are copied
//! verbatim and only payload spans are replaced. Payloads are written as
//! `{tag|text|tag}` with the tag they had before; the text is never escaped.

use super::extract::{Expectation, STRICT_VARIANT};
use crate::syntax::{Span, StringConstant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub payload_span: Span,
    pub normal: StringConstant,
    pub strict: StringConstant,
}

impl From<Expectation> for Correction {
    fn from(expectation: Expectation) -> Self {
        Self {
            payload_span: expectation.payload_span,
            normal: expectation.normal,
            strict: expectation.strict,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrectionSet {
    /// In document order.
    pub corrections: Vec<Correction>,
    /// Output of the statements after the last expectation; empty if none.
    pub trailing_output: String,
}

impl CorrectionSet {
    /// True when the corrected file is the original file.
    pub fn is_clean(&self) -> bool {
        self.corrections.is_empty() && self.trailing_output.is_empty()
    }
}

pub fn correct(original: &[u8], set: &CorrectionSet) -> Vec<u8> {
    let mut out = Vec::with_capacity(original.len() + set.trailing_output.len() + 32);
    let mut cursor = 0;

    for correction in &set.corrections {
        let Span { start, end } = correction.payload_span;
        debug_assert!(cursor <= start && start <= end && end <= original.len());
        out.extend_from_slice(&original[cursor..start]);
        out.extend_from_slice(payload(correction).as_bytes());
        cursor = end;
    }
    out.extend_from_slice(&original[cursor..]);

    if !set.trailing_output.is_empty() {
        out.extend_from_slice(format!("\n[%%expect{{|{}|}}]\n", set.trailing_output).as_bytes());
    }
    out
}

fn payload(correction: &Correction) -> String {
    if correction.normal.text == correction.strict.text {
        correction.normal.to_string()
    } else {
        format!("{}, {STRICT_VARIANT} {}", correction.normal, correction.strict)
    }
}
