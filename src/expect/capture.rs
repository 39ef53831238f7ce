//! Output capture for one statement group.
//!
//! A [`CaptureBuffer`] is reused across groups. [`CaptureBuffer::begin`]
//! hands out a [`CaptureScope`], an [`OutputSink`] that merges every channel
//! into the buffer. The scope releases the buffer on every exit path: either
//! through [`CaptureScope::finish`], which returns the normalized text, or
//! by being dropped, which discards whatever was captured.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::toplevel::{Channel, OutputSink};

static TRAILING_BLANKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)[ \t\r]+$").expect("trailing blank pattern is valid"));

#[derive(Debug, Default)]
pub struct CaptureBuffer {
    buffer: String,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts capturing into an empty buffer.
    pub fn begin(&mut self) -> CaptureScope<'_> {
        self.buffer.clear();
        CaptureScope {
            buffer: &mut self.buffer,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

pub struct CaptureScope<'a> {
    buffer: &'a mut String,
}

impl CaptureScope<'_> {
    /// Ends the capture and returns the normalized output.
    pub fn finish(mut self) -> String {
        self.flush();
        let raw = std::mem::take(&mut *self.buffer);
        normalize(&raw)
    }
}

impl OutputSink for CaptureScope<'_> {
    fn emit(&mut self, _channel: Channel, text: &str) {
        self.buffer.push_str(text);
    }
}

impl Drop for CaptureScope<'_> {
    fn drop(&mut self) {
        self.buffer.clear();
    }
}

/// Shapes raw captured text for comparison with an expectation: a leading
/// newline, a final newline when there is any text, no trailing blanks on
/// any line.
pub fn normalize(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len() + 2);
    text.push('\n');
    text.push_str(raw);
    if !raw.is_empty() && !raw.ends_with('\n') {
        text.push('\n');
    }
    strip_trailing_blanks(&text)
}

pub fn strip_trailing_blanks(text: &str) -> String {
    TRAILING_BLANKS.replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(""), "\n");
        assert_eq!(normalize("2"), "\n2\n");
        assert_eq!(normalize("2\n"), "\n2\n");
        assert_eq!(normalize("a  \nb\t\n"), "\na\nb\n");
        assert_eq!(normalize("a\r\nb\r\n"), "\na\nb\n");
    }

    #[test]
    fn test_finish_returns_and_clears() {
        let mut capture = CaptureBuffer::new();
        let mut scope = capture.begin();
        scope.emit(Channel::Stdout, "hi");
        scope.emit(Channel::Stderr, " there ");
        scope.emit(Channel::Toplevel, "\n- : unit = ()");
        assert_eq!(scope.finish(), "\nhi there\n- : unit = ()\n");
        assert!(capture.is_empty());
    }

    #[test]
    fn test_dropped_scope_leaves_nothing_behind() {
        let mut capture = CaptureBuffer::new();
        {
            let mut scope = capture.begin();
            scope.emit(Channel::Stdout, "partial");
        }
        assert!(capture.is_empty());
        assert_eq!(capture.begin().finish(), "\n");
    }

    proptest! {
        #[test]
        fn prop_normalized_output_is_stable(raw in "[a-z \t\n]{0,40}") {
            let once = normalize(&raw);
            prop_assert!(once.starts_with('\n'));
            prop_assert!(once.ends_with('\n'));
            prop_assert!(once.lines().all(|l| !l.ends_with(' ') && !l.ends_with('\t')));
            prop_assert_eq!(strip_trailing_blanks(&once), once.clone());
        }
    }
}
