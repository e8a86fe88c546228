//! `className` editing across the value shapes found in real components:
//! string literals, template literals, `cn(...)`-style calls and arbitrary
//! expressions.

use tessera_parser::ast::*;
use tessera_parser::codegen;

const CLASS_ATTRIBUTE: &str = "className";

/// One change to an element's class list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassEdit<'a> {
    /// Add classes that are not already present
    Merge(&'a str),
    /// Replace the whole value with a string literal
    Override(&'a str),
    /// Replace any background image utility with one for `url`
    SetImage(&'a str),
    RemoveImage,
}

/// Append the classes of `addition` missing from `existing`, keeping order
pub fn merge_classes(existing: &str, addition: &str) -> String {
    let missing = missing_classes(existing, addition);
    if missing.is_empty() {
        return existing.to_string();
    }

    let trimmed = existing.trim_end();
    if trimmed.is_empty() {
        missing.join(" ")
    } else {
        format!("{} {}", trimmed, missing.join(" "))
    }
}

fn missing_classes<'a>(existing: &str, addition: &'a str) -> Vec<&'a str> {
    let present: Vec<&str> = existing.split_whitespace().collect();
    let mut missing: Vec<&'a str> = Vec::new();
    for class in addition.split_whitespace() {
        if !present.contains(&class) && !missing.contains(&class) {
            missing.push(class);
        }
    }
    missing
}

pub fn is_background_image(class: &str) -> bool {
    class.starts_with("bg-[url(")
}

pub fn background_image_class(url: &str) -> String {
    format!("bg-[url({})]", url)
}

/// Drop matching classes, keeping the whitespace at either end of `text`
fn remove_classes(text: &str, predicate: impl Fn(&str) -> bool) -> String {
    let kept: Vec<&str> = text.split_whitespace().filter(|c| !predicate(c)).collect();
    if kept.is_empty() {
        return if text.trim().is_empty() { text.to_string() } else { String::new() };
    }

    let mut out = String::new();
    if text.starts_with(char::is_whitespace) {
        out.push(' ');
    }
    out.push_str(&kept.join(" "));
    if text.ends_with(char::is_whitespace) {
        out.push(' ');
    }
    out
}

/// Apply a class edit, returning the span ids to regenerate.
///
/// An empty result means the element was left as it was.
pub fn apply_class_edit(element: &mut Element, edit: ClassEdit<'_>) -> Vec<String> {
    let changed = match edit {
        ClassEdit::Override(value) => {
            let replaced = element.set_string_attribute(CLASS_ATTRIBUTE, value);
            return dirty_ids(element, replaced);
        }
        ClassEdit::Merge(classes) => merge_into(element, classes),
        ClassEdit::SetImage(url) => {
            let removed = remove_from(element, is_background_image);
            let merged = merge_into(element, &background_image_class(url));
            removed || merged
        }
        ClassEdit::RemoveImage => remove_from(element, is_background_image),
    };

    if !changed {
        return Vec::new();
    }
    let attr_id = element.attribute(CLASS_ATTRIBUTE).map(|attr| attr.span.id.clone());
    dirty_ids(element, attr_id)
}

fn dirty_ids(element: &Element, attr_id: Option<String>) -> Vec<String> {
    let mut ids = vec![element.span.id.clone()];
    ids.extend(attr_id.filter(|id| !id.is_empty()));
    ids
}

fn merge_into(element: &mut Element, classes: &str) -> bool {
    if classes.split_whitespace().next().is_none() {
        return false;
    }

    let Some(attr) = element.attribute_mut(CLASS_ATTRIBUTE) else {
        element.set_string_attribute(CLASS_ATTRIBUTE, &merge_classes("", classes));
        return true;
    };

    match &mut attr.value {
        AttributeValue::String(value) => {
            let merged = merge_classes(&value.value, classes);
            if merged == value.value {
                return false;
            }
            value.value = merged;
            true
        }
        AttributeValue::Template(template) => merge_into_template(template, classes),
        AttributeValue::Expression(expr) => {
            if let Some(call) = expr.call.as_mut() {
                if !merge_into_call(call, classes) {
                    return false;
                }
                let text = codegen::call_expression(call);
                expr.script = Script::generated(text.clone());
                expr.raw = text;
                true
            } else {
                // `${expr} classes`
                let missing = missing_classes("", classes).join(" ");
                attr.value = AttributeValue::Template(TemplateValue {
                    chunks: vec![
                        TemplateChunk::Substitution(expr.raw.trim().to_string()),
                        TemplateChunk::Text(format!(" {}", missing)),
                    ],
                });
                true
            }
        }
        AttributeValue::Absent | AttributeValue::Element { .. } => {
            attr.value = AttributeValue::String(StringValue {
                value: merge_classes("", classes),
                quote: '"',
            });
            true
        }
    }
}

fn merge_into_template(template: &mut TemplateValue, classes: &str) -> bool {
    let existing: String = template
        .chunks
        .iter()
        .filter_map(|chunk| match chunk {
            TemplateChunk::Text(text) => Some(text.as_str()),
            TemplateChunk::Substitution(_) => None,
        })
        .collect::<Vec<_>>()
        .join(" ");
    let missing = missing_classes(&existing, classes);
    if missing.is_empty() {
        return false;
    }

    let addition = missing.join(" ");
    match template.chunks.last_mut() {
        Some(TemplateChunk::Text(text)) => {
            if !text.is_empty() && !text.ends_with(char::is_whitespace) {
                text.push(' ');
            }
            text.push_str(&addition);
        }
        _ => template.chunks.push(TemplateChunk::Text(format!(" {}", addition))),
    }
    true
}

fn merge_into_call(call: &mut CallShape, classes: &str) -> bool {
    let first_literal = call.args.iter().position(|arg| arg.literal.is_some());

    match first_literal {
        Some(index) => {
            let arg = &mut call.args[index];
            let Some(literal) = arg.literal.as_mut() else {
                return false;
            };
            let merged = merge_classes(&literal.value, classes);
            if merged == literal.value {
                return false;
            }
            literal.value = merged;
            arg.raw = codegen::string_literal(literal);
            true
        }
        None => {
            let literal = StringValue {
                value: merge_classes("", classes),
                quote: '"',
            };
            call.args.push(CallArgument {
                raw: codegen::string_literal(&literal),
                literal: Some(literal),
            });
            true
        }
    }
}

fn remove_from(element: &mut Element, predicate: fn(&str) -> bool) -> bool {
    let Some(attr) = element.attribute_mut(CLASS_ATTRIBUTE) else {
        return false;
    };

    match &mut attr.value {
        AttributeValue::String(value) => replace_if_changed(&mut value.value, predicate),
        AttributeValue::Template(template) => {
            let mut changed = false;
            for chunk in &mut template.chunks {
                if let TemplateChunk::Text(text) = chunk {
                    changed |= replace_if_changed(text, predicate);
                }
            }
            changed
        }
        AttributeValue::Expression(expr) => {
            let Some(call) = expr.call.as_mut() else {
                return false;
            };
            let mut changed = false;
            for arg in &mut call.args {
                if let Some(literal) = arg.literal.as_mut() {
                    if replace_if_changed(&mut literal.value, predicate) {
                        arg.raw = codegen::string_literal(literal);
                        changed = true;
                    }
                }
            }
            if changed {
                let text = codegen::call_expression(call);
                expr.script = Script::generated(text.clone());
                expr.raw = text;
            }
            changed
        }
        AttributeValue::Absent | AttributeValue::Element { .. } => false,
    }
}

fn replace_if_changed(text: &mut String, predicate: fn(&str) -> bool) -> bool {
    let updated = remove_classes(text, predicate);
    if updated == *text {
        return false;
    }
    *text = updated;
    true
}
