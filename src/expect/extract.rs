//! Recognizes `[%%expect ...]` nodes and reads their payload.

use crate::diagnostics::{ExpectError, SourceContext};
use crate::err_ctx;
use crate::syntax::{Expr, ExprKind, Extension, Span, StringConstant};

/// Accepted spellings of the expectation marker.
pub const MARKER_NAMES: [&str; 2] = ["expect", "toplevel.expect"];

/// Constructor introducing the strict-mode variant of a payload.
pub const STRICT_VARIANT: &str = "Strict";

const PAYLOAD_HELP: &str =
    "write the payload as {|text|}, as {|text|}, Strict {|text|}, or leave it empty";

/// The stored expected output of one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    /// The marker name token.
    pub annotation_span: Span,
    /// The whole payload, delimiters included. Zero-width for `[%%expect]`.
    pub payload_span: Span,
    pub normal: StringConstant,
    pub strict: StringConstant,
}

pub fn is_expect_marker(name: &str) -> bool {
    MARKER_NAMES.contains(&name)
}

/// Reads an extension node as an expectation.
///
/// Returns `Ok(None)` when the node is some other extension, and a
/// structural error when it is an expectation with a payload of the wrong
/// shape.
pub fn extract(ext: &Extension, source: &SourceContext) -> Result<Option<Expectation>, ExpectError> {
    if !is_expect_marker(&ext.name) {
        return Ok(None);
    }
    let annotation_span = ext.name_loc.span();

    let Some(payload) = &ext.payload else {
        return Ok(Some(Expectation {
            annotation_span,
            payload_span: Span::empty_at(annotation_span.end),
            normal: StringConstant::default(),
            strict: StringConstant::default(),
        }));
    };

    let malformed = || {
        err_ctx!(
            Structure,
            format!("invalid payload for [%%{}]", ext.name),
            source,
            annotation_span,
            PAYLOAD_HELP
        )
    };

    let (normal, strict) = match &payload.kind {
        ExprKind::Tuple(items) => match items.as_slice() {
            [first, Expr {
                kind: ExprKind::Constructor(variant, Some(second)),
                ..
            }] if variant == STRICT_VARIANT => {
                let normal = string_constant(first).ok_or_else(malformed)?;
                let strict = string_constant(second).ok_or_else(malformed)?;
                (normal, strict)
            }
            _ => return Err(malformed()),
        },
        _ => {
            let constant = string_constant(payload).ok_or_else(malformed)?;
            (constant.clone(), constant)
        }
    };

    Ok(Some(Expectation {
        annotation_span,
        payload_span: payload.loc.span(),
        normal,
        strict,
    }))
}

fn string_constant(expr: &Expr) -> Option<StringConstant> {
    match &expr.kind {
        ExprKind::Quoted(constant) => Some(constant.clone()),
        ExprKind::Str(text) => Some(StringConstant::new(text.clone(), "")),
        _ => None,
    }
}
