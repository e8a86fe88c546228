//! Classification of attribute expression text
//!
//! These scanners work on raw expression text and only need to understand
//! brackets, quotes and template literals.

use crate::ast::{CallArgument, CallShape, StringValue, TemplateChunk};

/// Chunks of `text` when it is exactly one template literal
pub fn template_chunks(text: &str) -> Option<Vec<TemplateChunk>> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'`') || skip_template(bytes, 0)? != bytes.len() {
        return None;
    }

    let last = bytes.len() - 1;
    let mut chunks = Vec::new();
    let mut text_start = 1;
    let mut i = 1;
    while i < last {
        match bytes[i] {
            b'\\' => i += 2,
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                if text_start < i {
                    chunks.push(TemplateChunk::Text(text[text_start..i].to_string()));
                }
                let end = skip_balanced(bytes, i + 1)?;
                chunks.push(TemplateChunk::Substitution(text[i + 2..end - 1].to_string()));
                i = end;
                text_start = end;
            }
            _ => i += 1,
        }
    }
    if text_start < last {
        chunks.push(TemplateChunk::Text(text[text_start..last].to_string()));
    }
    Some(chunks)
}

/// `callee(args)` when `text` is a single call expression
pub fn call_shape(text: &str) -> Option<CallShape> {
    let bytes = text.as_bytes();
    let first = *bytes.first()?;
    if !(first.is_ascii_alphabetic() || first == b'_' || first == b'$') {
        return None;
    }

    let callee_end = bytes
        .iter()
        .position(|b| !(b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'.')))
        .unwrap_or(bytes.len());
    if bytes.get(callee_end) != Some(&b'(') {
        return None;
    }
    if skip_balanced(bytes, callee_end)? != bytes.len() {
        return None;
    }

    let inner = &text[callee_end + 1..text.len() - 1];
    let args = split_top_level(inner)
        .into_iter()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| CallArgument {
            raw: raw.to_string(),
            literal: string_literal(raw),
        })
        .collect();

    Some(CallShape {
        callee: text[..callee_end].to_string(),
        args,
    })
}

/// A plain `'...'` or `"..."` literal
pub fn string_literal(text: &str) -> Option<StringValue> {
    let bytes = text.as_bytes();
    let quote = *bytes.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    if skip_string(bytes, 0, quote)? != bytes.len() {
        return None;
    }
    Some(StringValue {
        value: text[1..text.len() - 1].to_string(),
        quote: quote as char,
    })
}

/// Split on commas that are not nested in brackets, strings or templates
pub fn split_top_level(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let next = match bytes[i] {
            b'(' | b'[' | b'{' => skip_balanced(bytes, i),
            q @ (b'"' | b'\'') => skip_string(bytes, i, q),
            b'`' => skip_template(bytes, i),
            b',' => {
                parts.push(&text[start..i]);
                start = i + 1;
                Some(i + 1)
            }
            _ => Some(i + 1),
        };
        // Unbalanced input: treat the rest as one part
        i = next.unwrap_or(bytes.len());
    }
    parts.push(&text[start..]);
    parts
}

/// Index just past the bracket matching the one at `open`
pub fn skip_balanced(bytes: &[u8], open: usize) -> Option<usize> {
    let mut stack: Vec<u8> = Vec::new();
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => stack.push(b')'),
            b'[' => stack.push(b']'),
            b'{' => stack.push(b'}'),
            closer @ (b')' | b']' | b'}') => {
                if stack.pop() != Some(closer) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i + 1);
                }
            }
            q @ (b'"' | b'\'') => {
                i = skip_string(bytes, i, q)?;
                continue;
            }
            b'`' => {
                i = skip_template(bytes, i)?;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn skip_string(bytes: &[u8], start: usize, quote: u8) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn skip_template(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return Some(i + 1),
            b'$' if bytes.get(i + 1) == Some(&b'{') => i = skip_balanced(bytes, i + 1)?,
            _ => i += 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_chunks() {
        let chunks = template_chunks("`p-4 ${active ? 'on' : 'off'} m-2`").unwrap();
        assert_eq!(
            chunks,
            vec![
                TemplateChunk::Text("p-4 ".to_string()),
                TemplateChunk::Substitution("active ? 'on' : 'off'".to_string()),
                TemplateChunk::Text(" m-2".to_string()),
            ]
        );

        assert!(template_chunks("`a` + `b`").is_none());
        assert!(template_chunks("value").is_none());
    }

    #[test]
    fn test_call_shape() {
        let call = call_shape("cn('flex gap-2', active && \"ring\", props.className)").unwrap();
        assert_eq!(call.callee, "cn");
        assert_eq!(call.args.len(), 3);
        assert_eq!(call.args[0].literal.as_ref().unwrap().value, "flex gap-2");
        assert!(call.args[1].literal.is_none());
        assert_eq!(call.args[2].raw, "props.className");

        assert!(call_shape("cn('a') + b").is_none());
        assert!(call_shape("styles.root").is_none());
    }

    #[test]
    fn test_split_top_level_respects_nesting() {
        let parts = split_top_level("a, f(b, c), [d, e], 'x,y'");
        assert_eq!(parts, vec!["a", " f(b, c)", " [d, e]", " 'x,y'"]);
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(
            string_literal("'a b'"),
            Some(StringValue {
                value: "a b".to_string(),
                quote: '\''
            })
        );
        assert!(string_literal("'a' + 'b'").is_none());
    }
}
