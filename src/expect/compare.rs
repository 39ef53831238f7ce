//! Checks captured output against the stored expectation.

use serde::Serialize;

use super::extract::Expectation;

/// Which expectation variant a run compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Normal,
    Strict,
}

/// Returns an updated copy of `expectation` when `output` differs from the
/// variant selected by `mode`.
///
/// The other variant is carried over untouched, unless both variants held
/// the same text: a single-constant payload stays a single constant.
pub fn compare(expectation: &Expectation, output: &str, mode: Mode) -> Option<Expectation> {
    let expected = match mode {
        Mode::Normal => &expectation.normal,
        Mode::Strict => &expectation.strict,
    };
    if expected.text == output {
        return None;
    }

    let mut updated = expectation.clone();
    if expectation.normal.text == expectation.strict.text {
        updated.normal.text = output.to_string();
        updated.strict.text = output.to_string();
        return Some(updated);
    }
    let slot = match mode {
        Mode::Normal => &mut updated.normal,
        Mode::Strict => &mut updated.strict,
    };
    slot.text = output.to_string();
    Some(updated)
}
