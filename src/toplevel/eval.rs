//! The bundled toplevel evaluator.

use std::path::{Path, PathBuf};

use im::HashMap;
use tracing::debug;

use super::{Builtin, Channel, Evaluator, Fault, FaultKind, OutputSink, Value};
use crate::diagnostics::SourceContext;
use crate::syntax::{self, BinOp, Binding, Expr, ExprKind, Location, Statement, StatementKind};

const MAX_USE_DEPTH: usize = 32;

/// Evaluation flags chosen on the command line.
#[derive(Debug, Clone, Default)]
pub struct EvalFlags {
    /// Overflow-checked integer arithmetic.
    pub strict: bool,
    /// Turn warnings into errors.
    pub warn_error: bool,
    /// Searched by `#use` before the current directory.
    pub include_dirs: Vec<PathBuf>,
}

struct Warning {
    number: u32,
    name: &'static str,
    message: &'static str,
}

const NON_UNIT_STATEMENT: Warning = Warning {
    number: 10,
    name: "non-unit-statement",
    message: "this expression should have type unit.",
};

/// Toplevel session state: the flags and every binding made so far.
pub struct Toplevel {
    flags: EvalFlags,
    env: HashMap<String, Value>,
    use_depth: usize,
    /// Directory of the script being run; searched first by `#use`.
    script_dir: Option<PathBuf>,
}

impl Toplevel {
    pub fn new(flags: EvalFlags) -> Self {
        Self {
            flags,
            env: HashMap::new(),
            use_depth: 0,
            script_dir: None,
        }
    }

    pub fn with_script_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.script_dir = Some(dir.into());
        self
    }

    pub fn flags(&self) -> &EvalFlags {
        &self.flags
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.env
            .get(name)
            .cloned()
            .or_else(|| Builtin::lookup(name).map(Value::Builtin))
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    /// All right-hand sides see the environment from before the group; the
    /// bindings become visible together, and only if every one succeeded.
    fn define(&mut self, bindings: &[Binding], out: &mut dyn OutputSink) -> Result<(), Fault> {
        for (i, binding) in bindings.iter().enumerate() {
            if binding.name != "_" && bindings[..i].iter().any(|b| b.name == binding.name) {
                return Err(Fault::error(
                    format!(
                        "Variable {} is bound several times in this matching",
                        binding.name
                    ),
                    binding.name_loc,
                ));
            }
        }

        let mut values = Vec::with_capacity(bindings.len());
        for binding in bindings {
            values.push(self.eval(&binding.expr, out)?);
        }

        let mut next = self.env.clone();
        for (binding, value) in bindings.iter().zip(values) {
            if binding.name == "_" {
                out.emit(
                    Channel::Toplevel,
                    &format!("- : {} = {}\n", value.type_name(), value),
                );
                continue;
            }
            out.emit(
                Channel::Toplevel,
                &format!("val {} : {} = {}\n", binding.name, value.type_name(), value),
            );
            next.insert(binding.name.clone(), value);
        }
        self.env = next;
        Ok(())
    }

    fn directive(
        &mut self,
        name: &str,
        arg: Option<&Expr>,
        loc: Location,
        out: &mut dyn OutputSink,
    ) -> Result<(), Fault> {
        match (name, arg.map(|a| &a.kind)) {
            ("show", Some(ExprKind::Var(ident))) => {
                let value = self.lookup(ident).ok_or_else(|| {
                    Fault::error(format!("Unknown element {ident}."), arg.map_or(loc, |a| a.loc))
                })?;
                out.emit(
                    Channel::Toplevel,
                    &format!("val {ident} : {} = {value}\n", value.type_name()),
                );
                Ok(())
            }
            ("use", Some(ExprKind::Str(file))) => self.use_file(file, loc, out),
            ("use", Some(ExprKind::Quoted(file))) => self.use_file(&file.text, loc, out),
            ("warn_error", Some(ExprKind::Bool(enabled))) => {
                self.flags.warn_error = *enabled;
                Ok(())
            }
            ("show" | "use" | "warn_error", _) => Err(Fault::error(
                format!("Wrong type of argument for directive `{name}'."),
                loc,
            )),
            _ => Err(Fault::error(format!("Unknown directive `{name}'."), loc)),
        }
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let candidate = Path::new(name);
        if candidate.is_absolute() {
            return candidate.is_file().then(|| candidate.to_path_buf());
        }
        self.script_dir
            .iter()
            .chain(&self.flags.include_dirs)
            .map(|dir| dir.join(candidate))
            .chain(std::iter::once(candidate.to_path_buf()))
            .find(|path| path.is_file())
    }

    /// `#use "file"`: runs every statement of another script in this session.
    /// Extension nodes in the used file are ignored.
    fn use_file(&mut self, name: &str, loc: Location, out: &mut dyn OutputSink) -> Result<(), Fault> {
        if self.use_depth >= MAX_USE_DEPTH {
            return Err(Fault::error(
                format!("#use nesting too deep while loading {name}."),
                loc,
            ));
        }
        let path = self
            .resolve(name)
            .ok_or_else(|| Fault::error(format!("Cannot find file {name}."), loc))?;
        debug!(path = %path.display(), "loading script");

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Fault::error(format!("Cannot read file {}: {e}", path.display()), loc))?;
        let source = SourceContext::from_file(path.display().to_string(), content);
        let statements = syntax::parse(&source)
            .map_err(|e| Fault::error(format!("Cannot parse file {}: {e}", path.display()), loc))?;

        self.use_depth += 1;
        let result = statements
            .iter()
            .filter(|s| !matches!(s.kind, StatementKind::Extension(_)))
            .try_for_each(|s| self.execute(s, out));
        self.use_depth -= 1;
        result
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn eval(&self, expr: &Expr, out: &mut dyn OutputSink) -> Result<Value, Fault> {
        match &expr.kind {
            ExprKind::Int(n) => Ok(Value::Int(*n)),
            ExprKind::Str(s) => Ok(Value::Str(s.clone())),
            ExprKind::Quoted(c) => Ok(Value::Str(c.text.clone())),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Unit => Ok(Value::Unit),
            ExprKind::Var(name) => self
                .lookup(name)
                .ok_or_else(|| Fault::error(format!("Unbound value {name}"), expr.loc)),
            ExprKind::Constructor(name, _) => {
                Err(Fault::error(format!("Unbound constructor {name}"), expr.loc))
            }
            ExprKind::Tuple(items) => items
                .iter()
                .map(|item| self.eval(item, out))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Tuple),
            ExprKind::Sequence(lhs, rhs) => {
                let first = self.eval(lhs, out)?;
                if !first.is_unit() {
                    self.warn(&NON_UNIT_STATEMENT, lhs.loc, out)?;
                }
                self.eval(rhs, out)
            }
            ExprKind::Apply(func, args) => self.apply(expr, func, args, out),
            ExprKind::Binary(op, lhs, rhs) => self.binary(expr, *op, lhs, rhs, out),
        }
    }

    fn apply(
        &self,
        expr: &Expr,
        func: &Expr,
        args: &[Expr],
        out: &mut dyn OutputSink,
    ) -> Result<Value, Fault> {
        let callee = self.eval(func, out)?;
        let Value::Builtin(builtin) = callee else {
            return Err(Fault::error(
                format!(
                    "This expression has type {}\n       This is not a function; it cannot be applied.",
                    callee.type_name()
                ),
                func.loc,
            ));
        };
        let [arg] = args else {
            return Err(Fault::error(
                format!(
                    "This function has type {}\n       It is applied to too many arguments; maybe you forgot a `;'.",
                    builtin.signature()
                ),
                expr.loc,
            ));
        };
        let value = self.eval(arg, out)?;
        expect_type(&value, builtin.param_type(), arg.loc)?;

        match (builtin, value) {
            (Builtin::PrintString, Value::Str(s)) => {
                out.emit(Channel::Stdout, &s);
                Ok(Value::Unit)
            }
            (Builtin::PrintEndline, Value::Str(s)) => {
                out.emit(Channel::Stdout, &format!("{s}\n"));
                Ok(Value::Unit)
            }
            (Builtin::PrerrEndline, Value::Str(s)) => {
                out.emit(Channel::Stderr, &format!("{s}\n"));
                Ok(Value::Unit)
            }
            (Builtin::PrintInt, Value::Int(n)) => {
                out.emit(Channel::Stdout, &n.to_string());
                Ok(Value::Unit)
            }
            (Builtin::PrintNewline, _) => {
                out.emit(Channel::Stdout, "\n");
                Ok(Value::Unit)
            }
            (Builtin::StringOfInt, Value::Int(n)) => Ok(Value::Str(n.to_string())),
            (Builtin::IntOfString, Value::Str(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| Fault::exception("Failure \"int_of_string\"")),
            (Builtin::Failwith, Value::Str(s)) => Err(Fault::exception(format!(
                "Failure \"{}\"",
                super::value::escape(&s)
            ))),
            (builtin, value) => Err(Fault::error(
                format!(
                    "This expression has type {} but an expression was expected of type {}",
                    value.type_name(),
                    builtin.param_type()
                ),
                arg.loc,
            )),
        }
    }

    fn binary(
        &self,
        expr: &Expr,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
        out: &mut dyn OutputSink,
    ) -> Result<Value, Fault> {
        let left = self.eval(lhs, out)?;
        let right = self.eval(rhs, out)?;

        match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
                let (Value::Int(a), Value::Int(b)) = (&left, &right) else {
                    let (value, loc) = if matches!(left, Value::Int(_)) {
                        (&right, rhs.loc)
                    } else {
                        (&left, lhs.loc)
                    };
                    return Err(type_mismatch(value, "int", loc));
                };
                self.arith(op, *a, *b, expr.loc).map(Value::Int)
            }
            BinOp::Concat => match (left, right) {
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
                (Value::Str(_), other) => Err(type_mismatch(&other, "string", rhs.loc)),
                (other, _) => Err(type_mismatch(&other, "string", lhs.loc)),
            },
            BinOp::Eq | BinOp::Neq | BinOp::Lt | BinOp::Gt => {
                expect_type(&right, &left.type_name(), rhs.loc)?;
                if matches!(left, Value::Builtin(_)) {
                    return Err(Fault::exception(
                        "Invalid_argument \"compare: functional value\"",
                    ));
                }
                let result = match op {
                    BinOp::Eq => left == right,
                    BinOp::Neq => left != right,
                    BinOp::Lt | BinOp::Gt => {
                        let ordering = compare(&left, &right);
                        if op == BinOp::Lt {
                            ordering.is_lt()
                        } else {
                            ordering.is_gt()
                        }
                    }
                    _ => unreachable!("arithmetic handled above"),
                };
                Ok(Value::Bool(result))
            }
        }
    }

    /// Wrapping arithmetic normally; overflow is an error under strict evaluation.
    fn arith(&self, op: BinOp, a: i64, b: i64, loc: Location) -> Result<i64, Fault> {
        if op == BinOp::Div && b == 0 {
            return Err(Fault::exception("Division_by_zero"));
        }
        let result = if self.flags.strict {
            match op {
                BinOp::Add => a.checked_add(b),
                BinOp::Sub => a.checked_sub(b),
                BinOp::Mul => a.checked_mul(b),
                _ => a.checked_div(b),
            }
        } else {
            Some(match op {
                BinOp::Add => a.wrapping_add(b),
                BinOp::Sub => a.wrapping_sub(b),
                BinOp::Mul => a.wrapping_mul(b),
                _ => a.wrapping_div(b),
            })
        };
        result.ok_or_else(|| Fault::error("Integer overflow", loc))
    }

    fn warn(&self, warning: &Warning, loc: Location, out: &mut dyn OutputSink) -> Result<(), Fault> {
        if self.flags.warn_error {
            return Err(Fault {
                kind: FaultKind::FatalWarning {
                    number: warning.number,
                    name: warning.name,
                },
                message: warning.message.to_string(),
                location: Some(loc),
            });
        }
        out.emit(
            Channel::Toplevel,
            &format!(
                "{loc}:\nWarning {} [{}]: {}\n",
                warning.number, warning.name, warning.message
            ),
        );
        Ok(())
    }
}

impl Default for Toplevel {
    fn default() -> Self {
        Self::new(EvalFlags::default())
    }
}

impl Evaluator for Toplevel {
    fn execute(&mut self, stmt: &Statement, out: &mut dyn OutputSink) -> Result<(), Fault> {
        match &stmt.kind {
            StatementKind::Empty => Ok(()),
            StatementKind::Eval(expr) => {
                let value = self.eval(expr, out)?;
                out.emit(
                    Channel::Toplevel,
                    &format!("- : {} = {}\n", value.type_name(), value),
                );
                Ok(())
            }
            StatementKind::Definition(bindings) => self.define(bindings, out),
            StatementKind::Directive { name, arg } => {
                self.directive(name, arg.as_ref(), stmt.loc, out)
            }
            StatementKind::Extension(ext) => Err(Fault::error(
                format!("Uninterpreted extension '{}'.", ext.name),
                ext.name_loc,
            )),
        }
    }
}

fn expect_type(value: &Value, expected: &str, loc: Location) -> Result<(), Fault> {
    if expected == "'a" || value.type_name() == expected {
        return Ok(());
    }
    Err(type_mismatch(value, expected, loc))
}

fn type_mismatch(value: &Value, expected: &str, loc: Location) -> Fault {
    Fault::error(
        format!(
            "This expression has type {} but an expression was expected of type {}",
            value.type_name(),
            expected
        ),
        loc,
    )
}

fn compare(a: &Value, b: &Value) -> std::cmp::Ordering {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Tuple(xs), Value::Tuple(ys)) => xs
            .iter()
            .zip(ys)
            .map(|(x, y)| compare(x, y))
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal),
        _ => std::cmp::Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Collects everything, tagging stderr so tests can tell channels apart.
    #[derive(Default)]
    struct Collect(String);

    impl OutputSink for Collect {
        fn emit(&mut self, channel: Channel, text: &str) {
            if channel == Channel::Stderr {
                self.0.push_str("[err]");
            }
            self.0.push_str(text);
        }
    }

    fn run(top: &mut Toplevel, text: &str) -> (String, Option<Fault>) {
        let stmts = syntax::parse(&SourceContext::from_file("test", text)).unwrap();
        let mut out = Collect::default();
        let fault = stmts
            .iter()
            .try_for_each(|s| top.execute(s, &mut out))
            .err();
        (out.0, fault)
    }

    #[test]
    fn test_definitions_and_expressions() {
        let mut top = Toplevel::default();
        let (out, fault) = run(&mut top, "let x = 1 + 1;;\nx * 3;;\n\"a\" ^ \"b\";;");
        assert!(fault.is_none());
        assert_eq!(out, "val x : int = 2\n- : int = 6\n- : string = \"ab\"\n");
    }

    #[test]
    fn test_program_output_precedes_response() {
        let mut top = Toplevel::default();
        let (out, _) = run(&mut top, "print_string \"hi\";;\nprerr_endline \"oops\";;");
        assert_eq!(out, "hi- : unit = ()\n[err]oops\n- : unit = ()\n");
    }

    #[test]
    fn test_unbound_value_has_location() {
        let mut top = Toplevel::default();
        let (_, fault) = run(&mut top, "let x = 1 + y;;");
        let fault = fault.unwrap();
        assert_eq!(fault.message, "Unbound value y");
        assert_eq!(fault.location.unwrap().to_string(), "Line 1, characters 12-13");
    }

    #[test]
    fn test_definition_group_is_atomic() {
        let mut top = Toplevel::default();
        let (out, fault) = run(&mut top, "let a = 1 and b = failwith \"boom\";;");
        assert_eq!(out, "");
        assert_eq!(fault.unwrap().to_string(), "Exception: Failure \"boom\".");
        assert!(top.env.get("a").is_none());
    }

    #[test]
    fn test_rhs_does_not_see_sibling_bindings() {
        let mut top = Toplevel::default();
        let (_, fault) = run(&mut top, "let a = 1 and b = a;;");
        assert_eq!(fault.unwrap().message, "Unbound value a");
    }

    #[test]
    fn test_division_by_zero() {
        let mut top = Toplevel::default();
        let (_, fault) = run(&mut top, "1 / 0;;");
        assert_eq!(fault.unwrap().to_string(), "Exception: Division_by_zero.");
    }

    #[test]
    fn test_strict_arithmetic_checks_overflow() {
        let text = "9223372036854775807 + 1;;";

        let mut normal = Toplevel::default();
        let (out, fault) = run(&mut normal, text);
        assert!(fault.is_none());
        assert_eq!(out, "- : int = -9223372036854775808\n");

        let mut strict = Toplevel::new(EvalFlags {
            strict: true,
            ..EvalFlags::default()
        });
        let (_, fault) = run(&mut strict, text);
        assert_eq!(fault.unwrap().message, "Integer overflow");
    }

    #[test]
    fn test_non_unit_statement_warning() {
        let mut top = Toplevel::default();
        let (out, fault) = run(&mut top, "1; 2;;");
        assert!(fault.is_none());
        assert_eq!(
            out,
            "Line 1, characters 0-1:\nWarning 10 [non-unit-statement]: this expression should have type unit.\n- : int = 2\n"
        );

        let (_, fault) = run(&mut top, "#warn_error true;;\n1; 2;;");
        let fault = fault.unwrap();
        assert!(matches!(fault.kind, FaultKind::FatalWarning { number: 10, .. }));
    }

    #[test]
    fn test_type_errors() {
        let mut top = Toplevel::default();
        let (_, fault) = run(&mut top, "print_int \"a\";;");
        assert_eq!(
            fault.unwrap().message,
            "This expression has type string but an expression was expected of type int"
        );
        let (_, fault) = run(&mut top, "1 = \"a\";;");
        assert!(fault.unwrap().message.contains("expected of type int"));
        let (_, fault) = run(&mut top, "3 4;;");
        assert!(fault.unwrap().message.contains("This is not a function"));
    }

    #[test]
    fn test_directives() {
        let mut top = Toplevel::default();
        let (out, fault) = run(&mut top, "let x = (1, \"a\");;\n#show x;;");
        assert!(fault.is_none());
        assert!(out.ends_with("val x : int * string = (1, \"a\")\n"));

        let (_, fault) = run(&mut top, "#frobnicate;;");
        assert_eq!(fault.unwrap().message, "Unknown directive `frobnicate'.");
    }

    #[test]
    fn test_use_searches_include_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("lib.expect"),
            "let base = 40;;\n[%%expect {|ignored|}]\n",
        )
        .unwrap();
        let mut top = Toplevel::new(EvalFlags {
            include_dirs: vec![dir.path().to_path_buf()],
            ..EvalFlags::default()
        });
        let (out, fault) = run(&mut top, "#use \"lib.expect\";;\nbase + 2;;");
        assert!(fault.is_none());
        assert_eq!(out, "val base : int = 40\n- : int = 42\n");

        let (_, fault) = run(&mut top, "#use \"missing.expect\";;");
        assert_eq!(fault.unwrap().message, "Cannot find file missing.expect.");
    }

    #[test]
    fn test_use_prefers_the_script_directory() {
        let script_dir = tempfile::tempdir().unwrap();
        let include = tempfile::tempdir().unwrap();
        std::fs::write(script_dir.path().join("lib.ml"), "let origin = \"script\";;\n").unwrap();
        std::fs::write(include.path().join("lib.ml"), "let origin = \"include\";;\n").unwrap();

        let mut top = Toplevel::new(EvalFlags {
            include_dirs: vec![include.path().to_path_buf()],
            ..EvalFlags::default()
        })
        .with_script_dir(script_dir.path());
        let (out, fault) = run(&mut top, "#use \"lib.ml\";;");
        assert!(fault.is_none());
        assert_eq!(out, "val origin : string = \"script\"\n");

        let (_, fault) = run(&mut top, "#use \"missing.expect\";;");
        assert_eq!(fault.unwrap().message, "Cannot find file missing.expect.");
    }

    #[test]
    fn test_uninterpreted_extension() {
        let mut top = Toplevel::default();
        let (_, fault) = run(&mut top, "[%%other]");
        assert_eq!(fault.unwrap().message, "Uninterpreted extension 'other'.");
    }
}
