//! Syntax of toplevel scripts.
//!
//! A script is a flat sequence of [`Statement`]s. Every statement and every
//! expression carries a [`Location`], which pairs byte offsets (used to splice
//! corrected files) with line/column positions (used in diagnostics).

use std::fmt;

pub mod parser;

pub use parser::parse;

/// A half-open byte range `[start, end)` into the source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Zero-width span at `offset`.
    pub fn empty_at(offset: usize) -> Self {
        Span {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A point in the source: 1-based line, 0-based column, absolute byte offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Location {
    pub start: Position,
    pub end: Position,
}

impl Location {
    pub fn span(&self) -> Span {
        Span {
            start: self.start.offset,
            end: self.end.offset,
        }
    }

    /// Moves both ends `delta` lines up. Byte offsets are left alone.
    pub fn shift_lines(&mut self, delta: usize) {
        self.start.line = self.start.line.saturating_sub(delta);
        self.end.line = self.end.line.saturating_sub(delta);
    }
}

/// Toplevel-style location header, e.g. `Line 2, characters 4-9`.
impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(f, "Line {}", self.start.line)?;
        } else {
            write!(f, "Lines {}-{}", self.start.line, self.end.line)?;
        }
        write!(f, ", characters {}-{}", self.start.column, self.end.column)
    }
}

/// A quoted string `{tag|text|tag}`. The tag is kept so the text can be
/// written back verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringConstant {
    pub text: String,
    pub tag: String,
}

impl StringConstant {
    pub fn new(text: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tag: tag.into(),
        }
    }
}

impl fmt::Display for StringConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{tag}|{}|{tag}}}", self.text, tag = self.tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Concat,
    Eq,
    Neq,
    Lt,
    Gt,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Concat => "^",
            BinOp::Eq => "=",
            BinOp::Neq => "<>",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i64),
    /// A `"..."` literal, escapes already resolved.
    Str(String),
    /// A `{tag|...|tag}` literal.
    Quoted(StringConstant),
    Bool(bool),
    Unit,
    Var(String),
    Constructor(String, Option<Box<Expr>>),
    Apply(Box<Expr>, Vec<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Tuple(Vec<Expr>),
    Sequence(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub loc: Location,
}

impl Expr {
    pub fn new(kind: ExprKind, loc: Location) -> Self {
        Self { kind, loc }
    }

    pub fn shift_lines(&mut self, delta: usize) {
        self.loc.shift_lines(delta);
        match &mut self.kind {
            ExprKind::Int(_)
            | ExprKind::Str(_)
            | ExprKind::Quoted(_)
            | ExprKind::Bool(_)
            | ExprKind::Unit
            | ExprKind::Var(_)
            | ExprKind::Constructor(_, None) => {}
            ExprKind::Constructor(_, Some(arg)) => arg.shift_lines(delta),
            ExprKind::Apply(func, args) => {
                func.shift_lines(delta);
                args.iter_mut().for_each(|a| a.shift_lines(delta));
            }
            ExprKind::Binary(_, lhs, rhs) | ExprKind::Sequence(lhs, rhs) => {
                lhs.shift_lines(delta);
                rhs.shift_lines(delta);
            }
            ExprKind::Tuple(items) => items.iter_mut().for_each(|e| e.shift_lines(delta)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub name_loc: Location,
    pub expr: Expr,
}

/// An extension node `[%%name payload]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Extension {
    pub name: String,
    pub name_loc: Location,
    pub payload: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// `let a = e and b = e`
    Definition(Vec<Binding>),
    /// `e;;`
    Eval(Expr),
    /// `#name arg`
    Directive { name: String, arg: Option<Expr> },
    Extension(Extension),
    /// A lone `;;`.
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub loc: Location,
}

impl Statement {
    pub fn first_line(&self) -> usize {
        self.loc.start.line
    }

    pub fn shift_lines(&mut self, delta: usize) {
        self.loc.shift_lines(delta);
        match &mut self.kind {
            StatementKind::Definition(bindings) => {
                for binding in bindings {
                    binding.name_loc.shift_lines(delta);
                    binding.expr.shift_lines(delta);
                }
            }
            StatementKind::Eval(expr) => expr.shift_lines(delta),
            StatementKind::Directive { arg, .. } => {
                if let Some(arg) = arg {
                    arg.shift_lines(delta);
                }
            }
            StatementKind::Extension(ext) => {
                ext.name_loc.shift_lines(delta);
                if let Some(payload) = &mut ext.payload {
                    payload.shift_lines(delta);
                }
            }
            StatementKind::Empty => {}
        }
    }
}

/// Renumbers a group of statements so that the first one starts at line 1.
pub fn relocate_to_first_line(statements: &mut [Statement]) {
    let Some(first) = statements.first() else {
        return;
    };
    let delta = first.first_line().saturating_sub(1);
    if delta == 0 {
        return;
    }
    for stmt in statements {
        stmt.shift_lines(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::SourceContext;

    fn parse_str(text: &str) -> Vec<Statement> {
        parse(&SourceContext::from_file("test", text)).unwrap()
    }

    #[test]
    fn test_location_display() {
        let loc = Location {
            start: Position { line: 1, column: 8, offset: 8 },
            end: Position { line: 1, column: 9, offset: 9 },
        };
        assert_eq!(loc.to_string(), "Line 1, characters 8-9");

        let loc = Location {
            start: Position { line: 2, column: 0, offset: 20 },
            end: Position { line: 3, column: 5, offset: 40 },
        };
        assert_eq!(loc.to_string(), "Lines 2-3, characters 0-5");
    }

    #[test]
    fn test_relocate_moves_every_nested_position() {
        let mut stmts = parse_str("\n\n\nlet x =\n  (1 + y);;\n2;;\n");
        assert_eq!(stmts[0].first_line(), 4);
        let offset_before = stmts[0].loc.start.offset;

        relocate_to_first_line(&mut stmts);

        assert_eq!(stmts[0].first_line(), 1);
        assert_eq!(stmts[0].loc.start.offset, offset_before);
        assert_eq!(stmts[1].first_line(), 3);
        let StatementKind::Definition(bindings) = &stmts[0].kind else {
            panic!("expected a definition");
        };
        let ExprKind::Binary(_, _, rhs) = &bindings[0].expr.kind else {
            panic!("expected a binary expression");
        };
        assert_eq!(rhs.loc.start.line, 2);
    }

    #[test]
    fn test_relocate_empty_group_is_noop() {
        let mut stmts: Vec<Statement> = Vec::new();
        relocate_to_first_line(&mut stmts);
        assert!(stmts.is_empty());
    }

    #[test]
    fn test_string_constant_display() {
        assert_eq!(StringConstant::new("a|b", "x").to_string(), "{x|a|b|x}");
        assert_eq!(StringConstant::new("", "").to_string(), "{||}");
    }
}
