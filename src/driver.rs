//! Runs whole scripts: read, parse, segment, execute every chunk in order,
//! then write the corrected file.
//!
//! A script is parsed and segmented completely before the first statement
//! runs, so a parse error or a malformed expectation anywhere in the file
//! aborts it without side effects.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::diagnostics::{ExpectError, SourceContext};
use crate::expect::{
    compare, correct, is_expect_marker, report_fault, segment, CorrectionSet, ExecutionEngine,
    Mode,
};
use crate::syntax::{self, StatementKind};
use crate::toplevel::{EvalFlags, Evaluator, Fault, OutputSink, StdioSink, Toplevel};

/// Extension of the scripts picked up when walking a directory.
pub const SCRIPT_EXTENSION: &str = "expect";

/// Suffix appended to a script's file name for its corrected copy.
pub const CORRECTED_SUFFIX: &str = ".corrected";

/// Configuration for checking scripts.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: Mode,
    pub flags: EvalFlags,
    /// Overwrite the script itself instead of writing `<script>.corrected`.
    pub promote: bool,
    pub show_diff: bool,
    pub use_colors: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Normal,
            flags: EvalFlags::default(),
            promote: false,
            show_diff: true,
            use_colors: atty::is(atty::Stream::Stdout),
        }
    }
}

impl RunConfig {
    /// A fresh toplevel for one script. Strict mode always evaluates strictly.
    pub fn toplevel(&self) -> Toplevel {
        let mut flags = self.flags.clone();
        flags.strict |= self.mode == Mode::Strict;
        Toplevel::new(flags)
    }
}

/// The result of checking one script.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: PathBuf,
    /// Where the corrected bytes were written.
    pub written_to: PathBuf,
    pub original: String,
    pub corrected: Vec<u8>,
    pub corrections: CorrectionSet,
}

impl FileOutcome {
    /// A script passes when its corrected text is byte-identical to it.
    pub fn changed(&self) -> bool {
        self.corrected != self.original.as_bytes()
    }

    pub fn corrected_text(&self) -> String {
        String::from_utf8_lossy(&self.corrected).into_owned()
    }
}

/// Runs every chunk of `source` against `evaluator` and collects the
/// corrections, without touching the filesystem.
pub fn evaluate_source(
    source: &SourceContext,
    evaluator: &mut dyn Evaluator,
    mode: Mode,
) -> Result<CorrectionSet, ExpectError> {
    let statements = syntax::parse(source)?;
    let segments = segment(statements, source)?;
    debug!(
        chunks = segments.chunks.len(),
        trailing = segments.trailing.is_some(),
        "segmented {}",
        source.name
    );

    let mut engine = ExecutionEngine::new();
    let mut set = CorrectionSet::default();
    for (index, chunk) in segments.chunks.iter().enumerate() {
        let output = engine.run_group(evaluator, &chunk.statements);
        match compare(&chunk.expectation, &output, mode) {
            Some(updated) => {
                debug!(chunk = index, "expectation differs");
                set.corrections.push(updated.into());
            }
            None => debug!(chunk = index, "expectation matches"),
        }
    }
    if let Some(trailing) = &segments.trailing {
        set.trailing_output = engine.run_group(evaluator, trailing);
    }
    Ok(set)
}

/// Checks one script with a fresh toplevel and writes the corrected file.
pub fn run_file(path: &Path, config: &RunConfig) -> Result<FileOutcome, ExpectError> {
    info!(path = %path.display(), mode = ?config.mode, "checking");
    let content = fs::read_to_string(path).map_err(|e| ExpectError::io(path, e))?;
    let source = SourceContext::from_file(path.display().to_string(), content);

    let mut toplevel = config.toplevel().with_script_dir(script_dir(path));
    let corrections = evaluate_source(&source, &mut toplevel, config.mode)?;
    let corrected = correct(source.content.as_bytes(), &corrections);

    let written_to = if config.promote {
        path.to_path_buf()
    } else {
        corrected_path(path)
    };
    let outcome = FileOutcome {
        path: path.to_path_buf(),
        written_to,
        original: source.content,
        corrected,
        corrections,
    };

    if !config.promote || outcome.changed() {
        fs::write(&outcome.written_to, &outcome.corrected)
            .map_err(|e| ExpectError::io(&outcome.written_to, e))?;
    }
    info!(
        path = %path.display(),
        changed = outcome.changed(),
        corrections = outcome.corrections.corrections.len(),
        "checked"
    );
    Ok(outcome)
}

fn script_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// `<path>.corrected`, next to the script.
pub fn corrected_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(CORRECTED_SUFFIX);
    PathBuf::from(name)
}

/// Runs a script straight against the terminal, skipping expectation nodes.
///
/// Returns the fault that stopped the script, if any.
pub fn run_script(path: &Path, flags: EvalFlags) -> Result<Option<Fault>, ExpectError> {
    let content = fs::read_to_string(path).map_err(|e| ExpectError::io(path, e))?;
    let source = SourceContext::from_file(path.display().to_string(), content);
    let statements = syntax::parse(&source)?;

    let mut toplevel = Toplevel::new(flags).with_script_dir(script_dir(path));
    let mut out = StdioSink;
    let mut fault = None;
    for stmt in &statements {
        if let StatementKind::Extension(ext) = &stmt.kind {
            if is_expect_marker(&ext.name) {
                continue;
            }
        }
        if let Err(f) = toplevel.execute(stmt, &mut out) {
            report_fault(&f, &mut out);
            fault = Some(f);
            break;
        }
    }
    out.flush();
    Ok(fault)
}

/// Expands `paths` into the list of scripts to check.
///
/// Files are taken as given; directories are walked for `*.expect` files,
/// sorted by path. A missing path or an unreadable directory is an I/O error.
pub fn discover_scripts(paths: &[PathBuf]) -> Result<Vec<PathBuf>, ExpectError> {
    let mut scripts = Vec::new();
    for root in paths {
        if root.is_file() {
            scripts.push(root.clone());
            continue;
        }
        let mut found = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root.as_path()).to_path_buf();
                ExpectError::io(path, io::Error::from(e))
            })?;
            let is_script = entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext == SCRIPT_EXTENSION)
                    .unwrap_or(false);
            if is_script {
                found.push(entry.into_path());
            }
        }
        found.sort();
        debug!(root = %root.display(), count = found.len(), "discovered scripts");
        scripts.extend(found);
    }
    Ok(scripts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrected_path_appends_suffix() {
        assert_eq!(
            corrected_path(Path::new("dir/a.expect")),
            PathBuf::from("dir/a.expect.corrected")
        );
        assert_eq!(corrected_path(Path::new("noext")), PathBuf::from("noext.corrected"));
    }

    #[test]
    fn test_strict_mode_forces_strict_flag() {
        let config = RunConfig {
            mode: Mode::Strict,
            ..RunConfig::default()
        };
        assert!(config.toplevel().flags().strict);
        assert!(!RunConfig::default().toplevel().flags().strict);
    }

    #[test]
    fn test_evaluate_source_collects_in_document_order() {
        let source = SourceContext::from_file(
            "t",
            "1;;\n[%%expect {|wrong|}]\n2;;\n[%%expect {|\n- : int = 2\n|}]\n3;;\n[%%expect]\n",
        );
        let mut top = Toplevel::default();
        let set = evaluate_source(&source, &mut top, Mode::Normal).unwrap();
        assert_eq!(set.corrections.len(), 2);
        assert_eq!(set.corrections[0].normal.text, "\n- : int = 1\n");
        assert_eq!(set.corrections[1].normal.text, "\n- : int = 3\n");
        assert!(set.corrections[0].payload_span.start < set.corrections[1].payload_span.start);
        assert!(set.trailing_output.is_empty());
    }

    #[test]
    fn test_malformed_expectation_aborts_before_running() {
        struct Panicking;
        impl Evaluator for Panicking {
            fn execute(
                &mut self,
                _stmt: &syntax::Statement,
                _out: &mut dyn OutputSink,
            ) -> Result<(), Fault> {
                panic!("nothing may run when the script is malformed");
            }
        }

        let source = SourceContext::from_file("t", "1;;\n[%%expect {|a|}]\n2;;\n[%%expect 42]\n");
        let err = evaluate_source(&source, &mut Panicking, Mode::Normal).unwrap_err();
        assert!(matches!(err, ExpectError::Structure { .. }));
    }
}
