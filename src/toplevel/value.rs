//! Runtime values and their toplevel rendering.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    PrintString,
    PrintEndline,
    PrintInt,
    PrintNewline,
    PrerrEndline,
    StringOfInt,
    IntOfString,
    Failwith,
}

impl Builtin {
    pub fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "print_string" => Builtin::PrintString,
            "print_endline" => Builtin::PrintEndline,
            "print_int" => Builtin::PrintInt,
            "print_newline" => Builtin::PrintNewline,
            "prerr_endline" => Builtin::PrerrEndline,
            "string_of_int" => Builtin::StringOfInt,
            "int_of_string" => Builtin::IntOfString,
            "failwith" => Builtin::Failwith,
            _ => return None,
        })
    }

    /// Type of the expected argument.
    pub fn param_type(&self) -> &'static str {
        match self {
            Builtin::PrintString
            | Builtin::PrintEndline
            | Builtin::PrerrEndline
            | Builtin::IntOfString
            | Builtin::Failwith => "string",
            Builtin::PrintInt | Builtin::StringOfInt => "int",
            Builtin::PrintNewline => "unit",
        }
    }

    pub fn signature(&self) -> &'static str {
        match self {
            Builtin::PrintString | Builtin::PrintEndline | Builtin::PrerrEndline => {
                "string -> unit"
            }
            Builtin::PrintInt => "int -> unit",
            Builtin::PrintNewline => "unit -> unit",
            Builtin::StringOfInt => "int -> string",
            Builtin::IntOfString => "string -> int",
            Builtin::Failwith => "string -> 'a",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Str(String),
    Bool(bool),
    Unit,
    Tuple(Vec<Value>),
    Builtin(Builtin),
}

impl Value {
    /// Toplevel type, e.g. `int * string`.
    pub fn type_name(&self) -> String {
        match self {
            Value::Int(_) => "int".into(),
            Value::Str(_) => "string".into(),
            Value::Bool(_) => "bool".into(),
            Value::Unit => "unit".into(),
            Value::Builtin(b) => b.signature().into(),
            Value::Tuple(items) => items
                .iter()
                .map(|v| match v {
                    Value::Tuple(_) | Value::Builtin(_) => format!("({})", v.type_name()),
                    _ => v.type_name(),
                })
                .collect::<Vec<_>>()
                .join(" * "),
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Value::Unit)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "\"{}\"", escape(s)),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Unit => write!(f, "()"),
            Value::Builtin(_) => write!(f, "<fun>"),
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Escapes a string the way it is written as a `"..."` literal.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out
}
