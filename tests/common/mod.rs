//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use topexpect::syntax::{ExprKind, Statement, StatementKind};
use topexpect::toplevel::{Channel, Evaluator, Fault, OutputSink};

/// Directory holding the checked-in `.expect` fixtures.
pub fn scripts_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("scripts")
}

/// Copies every fixture (and `lib/`) into a fresh temporary directory, so
/// runs can write `.corrected` files freely.
pub fn copy_fixtures() -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    copy_dir(&scripts_dir(), dir.path());
    dir
}

fn copy_dir(from: &Path, to: &Path) {
    for entry in fs::read_dir(from).expect("read fixtures") {
        let entry = entry.expect("fixture entry");
        let target = to.join(entry.file_name());
        if entry.path().is_dir() {
            fs::create_dir_all(&target).expect("create fixture dir");
            copy_dir(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), &target).expect("copy fixture");
        }
    }
}

/// Writes `content` to `name` inside `dir` and returns the path.
pub fn write_script(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write script");
    path
}

/// An evaluator that only produces program output: `"s";;` and `f "s";;`
/// print `s`, and `fail;;` faults. It prints no toplevel responses.
#[derive(Default)]
pub struct EchoEvaluator {
    pub executed: usize,
}

impl Evaluator for EchoEvaluator {
    fn execute(&mut self, stmt: &Statement, out: &mut dyn OutputSink) -> Result<(), Fault> {
        self.executed += 1;
        let StatementKind::Eval(expr) = &stmt.kind else {
            return Ok(());
        };
        match &expr.kind {
            ExprKind::Str(s) => out.emit(Channel::Stdout, s),
            ExprKind::Apply(_, args) => {
                if let [topexpect::syntax::Expr { kind: ExprKind::Str(s), .. }] = args.as_slice() {
                    out.emit(Channel::Stdout, s);
                }
            }
            ExprKind::Var(name) if name == "fail" => {
                return Err(Fault::error("stub failure", expr.loc));
            }
            _ => {}
        }
        Ok(())
    }
}
