//! Source text for synthesized markup pieces
//!
//! The printer calls into these helpers for attributes and text that have no
//! original source to copy.

use crate::ast::*;

/// HTML void elements, always emitted self-closing when synthesized
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

/// Escape characters that markup text cannot hold literally
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Attribute value text for a string, including the `=` sign.
///
/// Keeps the preferred quote when possible, then tries the other quote and
/// finally falls back to a JSON string inside braces.
pub fn string_value(value: &StringValue) -> String {
    let other = if value.quote == '\'' { '"' } else { '\'' };
    if !value.value.contains(value.quote) {
        format!("={q}{}{q}", value.value, q = value.quote)
    } else if !value.value.contains(other) {
        format!("={q}{}{q}", value.value, q = other)
    } else {
        let json = serde_json::to_string(&value.value).unwrap_or_else(|_| format!("{:?}", value.value));
        format!("={{{}}}", json)
    }
}

/// Template literal text, backticks included
pub fn template_literal(template: &TemplateValue) -> String {
    let mut out = String::from("`");
    for chunk in &template.chunks {
        match chunk {
            TemplateChunk::Text(text) => out.push_str(text),
            TemplateChunk::Substitution(expr) => {
                out.push_str("${");
                out.push_str(expr);
                out.push('}');
            }
        }
    }
    out.push('`');
    out
}

/// Call expression text from its shape
pub fn call_expression(call: &CallShape) -> String {
    let args: Vec<&str> = call.args.iter().map(|arg| arg.raw.as_str()).collect();
    format!("{}({})", call.callee, args.join(", "))
}

/// Source text of a string literal argument
pub fn string_literal(value: &StringValue) -> String {
    if !value.value.contains(value.quote) {
        format!("{q}{}{q}", value.value, q = value.quote)
    } else {
        serde_json::to_string(&value.value).unwrap_or_else(|_| format!("{:?}", value.value))
    }
}
