//! Per-file results of a `check` run and their summary.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::diagnostics::ExpectError;
use crate::driver::FileOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// The corrected file is identical to the script.
    Passed,
    /// At least one expectation was rewritten or a trailing block added.
    Changed,
    /// The script could not be checked at all.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportedError {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
    pub corrections: usize,
    pub trailing_block: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written_to: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ReportedError>,
}

impl FileReport {
    pub fn from_outcome(outcome: &FileOutcome) -> Self {
        let status = if outcome.changed() {
            FileStatus::Changed
        } else {
            FileStatus::Passed
        };
        Self {
            path: outcome.path.clone(),
            status,
            corrections: outcome.corrections.corrections.len(),
            trailing_block: !outcome.corrections.trailing_output.is_empty(),
            written_to: Some(outcome.written_to.clone()),
            error: None,
        }
    }

    pub fn from_error(path: &Path, error: &ExpectError) -> Self {
        Self {
            path: path.to_path_buf(),
            status: FileStatus::Failed,
            corrections: 0,
            trailing_block: false,
            written_to: None,
            error: Some(ReportedError {
                code: error.code(),
                message: error.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub passed: usize,
    pub changed: usize,
    pub failed: usize,
    pub files: Vec<FileReport>,
}

impl RunSummary {
    pub fn record(&mut self, report: FileReport) {
        match report.status {
            FileStatus::Passed => self.passed += 1,
            FileStatus::Changed => self.changed += 1,
            FileStatus::Failed => self.failed += 1,
        }
        self.files.push(report);
    }

    pub fn total(&self) -> usize {
        self.files.len()
    }

    /// True when every script passed unchanged.
    pub fn is_success(&self) -> bool {
        self.changed == 0 && self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expect::CorrectionSet;

    fn outcome(original: &str, corrected: &str) -> FileOutcome {
        FileOutcome {
            path: PathBuf::from("a.expect"),
            written_to: PathBuf::from("a.expect.corrected"),
            original: original.into(),
            corrected: corrected.as_bytes().to_vec(),
            corrections: CorrectionSet::default(),
        }
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = RunSummary::default();
        summary.record(FileReport::from_outcome(&outcome("x", "x")));
        assert!(summary.is_success());
        summary.record(FileReport::from_outcome(&outcome("x", "y")));
        summary.record(FileReport::from_error(
            Path::new("b.expect"),
            &ExpectError::io("b.expect", std::io::ErrorKind::NotFound.into()),
        ));
        assert_eq!((summary.passed, summary.changed, summary.failed), (1, 1, 1));
        assert_eq!(summary.total(), 3);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_json_shape() {
        let mut summary = RunSummary::default();
        summary.record(FileReport::from_error(
            Path::new("b.expect"),
            &ExpectError::io("b.expect", std::io::ErrorKind::NotFound.into()),
        ));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["failed"], 1);
        assert_eq!(json["files"][0]["status"], "failed");
        assert_eq!(json["files"][0]["error"]["code"], "topexpect::io");
        assert!(json["files"][0].get("written_to").is_none());
    }
}
