//! Toplevel script parser.
//!
//! Converts script text into [`Statement`]s with full location tracking.
//! Purely syntactic: no name resolution, no typing.

use pest::{error::Error, iterators::Pair, Parser};
use pest_derive::Parser;

use super::{
    BinOp, Binding, Expr, ExprKind, Extension, Location, Position, Span, Statement, StatementKind,
    StringConstant,
};
use crate::diagnostics::{ExpectError, SourceContext};
use crate::err_ctx;

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct ScriptParser;

type ParseResult<T> = Result<T, ExpectError>;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parse a whole script into statements, in document order.
pub fn parse(source: &SourceContext) -> ParseResult<Vec<Statement>> {
    let mut pairs = ScriptParser::parse(Rule::program, &source.content)
        .map_err(|e| convert_parse_error(e, source))?;

    let Some(program) = pairs.next() else {
        return Ok(Vec::new());
    };

    program
        .into_inner()
        .filter(|p| p.as_rule() != Rule::EOI)
        .map(|p| build_statement(p, source))
        .collect()
}

// ============================================================================
// STATEMENTS
// ============================================================================

fn build_statement(pair: Pair<Rule>, source: &SourceContext) -> ParseResult<Statement> {
    let loc = location(&pair);
    let kind = match pair.as_rule() {
        Rule::empty => StatementKind::Empty,

        Rule::eval_phrase => {
            let expr = required(pair.into_inner().next(), "expression", loc, source)?;
            StatementKind::Eval(build_expr(expr, source)?)
        }

        Rule::definition => {
            let bindings = pair
                .into_inner()
                .filter(|p| p.as_rule() == Rule::binding)
                .map(|p| build_binding(p, source))
                .collect::<ParseResult<Vec<_>>>()?;
            StatementKind::Definition(bindings)
        }

        Rule::directive => {
            let mut inner = pair.into_inner();
            let name = required(inner.next(), "directive name", loc, source)?;
            let arg = inner.next().map(|p| build_expr(p, source)).transpose()?;
            StatementKind::Directive {
                name: name.as_str().to_string(),
                arg,
            }
        }

        Rule::extension => {
            let mut inner = pair.into_inner();
            let name = required(inner.next(), "extension name", loc, source)?;
            let payload = inner.next().map(|p| build_expr(p, source)).transpose()?;
            StatementKind::Extension(Extension {
                name: name.as_str().to_string(),
                name_loc: location(&name),
                payload,
            })
        }

        rule => {
            return Err(err_ctx!(
                Parse,
                format!("unexpected phrase: {rule:?}"),
                source,
                loc.span()
            ))
        }
    };
    Ok(Statement { kind, loc })
}

fn build_binding(pair: Pair<Rule>, source: &SourceContext) -> ParseResult<Binding> {
    let loc = location(&pair);
    let mut inner = pair.into_inner();
    let name = required(inner.next(), "binding name", loc, source)?;
    let expr = required(inner.next(), "binding expression", loc, source)?;
    Ok(Binding {
        name: name.as_str().to_string(),
        name_loc: location(&name),
        expr: build_expr(expr, source)?,
    })
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

fn build_expr(pair: Pair<Rule>, source: &SourceContext) -> ParseResult<Expr> {
    let loc = location(&pair);
    match pair.as_rule() {
        Rule::expr => {
            // `a; b; c` nests to the right.
            let items = pair
                .into_inner()
                .map(|p| build_expr(p, source))
                .collect::<ParseResult<Vec<_>>>()?;
            let mut items = items.into_iter().rev();
            let mut acc = items
                .next()
                .ok_or_else(|| err_ctx!(Parse, "missing expression", source, loc.span()))?;
            for lhs in items {
                let loc = Location {
                    start: lhs.loc.start,
                    end: acc.loc.end,
                };
                acc = Expr::new(ExprKind::Sequence(Box::new(lhs), Box::new(acc)), loc);
            }
            Ok(acc)
        }

        Rule::tuple => {
            let mut items = pair
                .into_inner()
                .map(|p| build_expr(p, source))
                .collect::<ParseResult<Vec<_>>>()?;
            if items.len() == 1 {
                return Ok(items.remove(0));
            }
            let loc = covering(&items[0], &items[items.len() - 1]);
            Ok(Expr::new(ExprKind::Tuple(items), loc))
        }

        Rule::comparison | Rule::concat | Rule::sum | Rule::product => {
            build_binary_chain(pair, source)
        }

        Rule::application => {
            let mut items = pair
                .into_inner()
                .map(|p| build_expr(p, source))
                .collect::<ParseResult<Vec<_>>>()?;
            if items.len() == 1 {
                return Ok(items.remove(0));
            }
            let func = items.remove(0);
            let loc = covering(&func, &items[items.len() - 1]);
            Ok(Expr::new(ExprKind::Apply(Box::new(func), items), loc))
        }

        Rule::constructor_app => {
            let mut inner = pair.into_inner();
            let name = required(inner.next(), "constructor", loc, source)?;
            let arg = inner
                .next()
                .map(|p| build_expr(p, source).map(Box::new))
                .transpose()?;
            let mut loc = location(&name);
            if let Some(arg) = &arg {
                loc.end = arg.loc.end;
            }
            Ok(Expr::new(
                ExprKind::Constructor(name.as_str().to_string(), arg),
                loc,
            ))
        }

        Rule::paren => {
            let inner = required(pair.into_inner().next(), "expression", loc, source)?;
            build_expr(inner, source)
        }

        Rule::unit => Ok(Expr::new(ExprKind::Unit, loc)),

        Rule::int => {
            let text = pair.as_str();
            let value = text.parse::<i64>().map_err(|_| {
                err_ctx!(
                    Parse,
                    format!("integer literal {text} exceeds the representable range"),
                    source,
                    loc.span()
                )
            })?;
            Ok(Expr::new(ExprKind::Int(value), loc))
        }

        Rule::boolean => Ok(Expr::new(ExprKind::Bool(pair.as_str() == "true"), loc)),

        Rule::string => {
            let raw = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
            Ok(Expr::new(ExprKind::Str(unescape_string(raw)), loc))
        }

        Rule::quoted_string => {
            let mut inner = pair.into_inner();
            let tag = required(inner.next(), "quoted string tag", loc, source)?;
            let body = required(inner.next(), "quoted string body", loc, source)?;
            Ok(Expr::new(
                ExprKind::Quoted(StringConstant::new(body.as_str(), tag.as_str())),
                loc,
            ))
        }

        Rule::constructor => Ok(Expr::new(
            ExprKind::Constructor(pair.as_str().to_string(), None),
            loc,
        )),

        Rule::ident => Ok(Expr::new(ExprKind::Var(pair.as_str().to_string()), loc)),

        rule => Err(err_ctx!(
            Parse,
            format!("unsupported expression: {rule:?}"),
            source,
            loc.span()
        )),
    }
}

/// Folds `operand (op operand)*` to the left.
fn build_binary_chain(pair: Pair<Rule>, source: &SourceContext) -> ParseResult<Expr> {
    let loc = location(&pair);
    let mut inner = pair.into_inner();
    let first = required(inner.next(), "operand", loc, source)?;
    let mut acc = build_expr(first, source)?;

    while let Some(op) = inner.next() {
        let op = binop(op.as_str(), location(&op), source)?;
        let rhs = required(inner.next(), "right operand", loc, source)?;
        let rhs = build_expr(rhs, source)?;
        let loc = Location {
            start: acc.loc.start,
            end: rhs.loc.end,
        };
        acc = Expr::new(ExprKind::Binary(op, Box::new(acc), Box::new(rhs)), loc);
    }
    Ok(acc)
}

fn binop(symbol: &str, loc: Location, source: &SourceContext) -> ParseResult<BinOp> {
    Ok(match symbol {
        "+" => BinOp::Add,
        "-" => BinOp::Sub,
        "*" => BinOp::Mul,
        "/" => BinOp::Div,
        "^" => BinOp::Concat,
        "=" => BinOp::Eq,
        "<>" => BinOp::Neq,
        "<" => BinOp::Lt,
        ">" => BinOp::Gt,
        other => {
            return Err(err_ctx!(
                Parse,
                format!("unknown operator {other}"),
                source,
                loc.span()
            ))
        }
    })
}

// ============================================================================
// UTILITIES
// ============================================================================

fn location(pair: &Pair<Rule>) -> Location {
    let span = pair.as_span();
    Location {
        start: position(span.start_pos()),
        end: position(span.end_pos()),
    }
}

/// Location from the start of `first` to the end of `last`. Pair spans of
/// non-atomic rules may run over trailing whitespace; leaf spans never do.
fn covering(first: &Expr, last: &Expr) -> Location {
    Location {
        start: first.loc.start,
        end: last.loc.end,
    }
}

/// Columns count bytes from the start of the line, like offsets do.
fn position(pos: pest::Position<'_>) -> Position {
    let (line, col) = pos.line_col();
    let column = pos
        .line_of()
        .chars()
        .take(col - 1)
        .map(char::len_utf8)
        .sum();
    Position {
        line,
        column,
        offset: pos.pos(),
    }
}

fn required<'i>(
    pair: Option<Pair<'i, Rule>>,
    element: &str,
    loc: Location,
    source: &SourceContext,
) -> ParseResult<Pair<'i, Rule>> {
    pair.ok_or_else(|| err_ctx!(Parse, format!("missing {element}"), source, loc.span()))
}

fn unescape_string(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }

    result
}

fn convert_parse_error(error: Error<Rule>, source: &SourceContext) -> ExpectError {
    let span = match error.location {
        pest::error::InputLocation::Pos(pos) => Span::empty_at(pos),
        pest::error::InputLocation::Span((start, end)) => Span { start, end },
    };
    let message = match &error.variant {
        pest::error::ErrorVariant::ParsingError { positives, .. }
            if positives.contains(&Rule::quoted_body) || positives.contains(&Rule::string_inner) =>
        {
            "unterminated string literal".to_string()
        }
        variant => format!("syntax error: {}", variant.message()),
    };
    err_ctx!(Parse, message, source, span)
}
