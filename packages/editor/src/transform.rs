//! # Action Transform Engine
//!
//! Applies a batch of edit requests to one parsed module. For each element
//! whose identity has a request, in order:
//!
//! 1. class edit (merge, or replace when `overrideClasses` is set)
//! 2. text edit on the first direct text child
//! 3. each structural action in sequence
//!
//! Each request is consumed by the first element carrying its identity, and
//! the walk stops as soon as every request has been consumed.

use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;

use tessera_common::{walk_element_mut, VisitorMut};
use tessera_parser::ast::*;
use tessera_parser::{codegen, Printer};

use crate::actions::{self, ActionContext};
use crate::classes::{self, ClassEdit};
use crate::errors::{TransformError, TransformWarning};
use crate::ids;
use crate::request::{EditRequest, StructureAction};

/// Outcome of transforming one module
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformReport {
    /// Identities whose request was applied, in tree order
    pub applied: Vec<String>,
    /// Identities with a request but no element in the tree
    pub not_found: Vec<String>,
    pub warnings: Vec<TransformWarning>,
    /// Span ids the printer must regenerate
    pub dirty: Vec<String>,
}

struct Transformer<'r> {
    pending: HashMap<&'r str, &'r EditRequest>,
    taken: HashSet<String>,
    report: TransformReport,
}

impl<'r> Transformer<'r> {
    fn apply_request(&mut self, element: &mut Element, request: &EditRequest) {
        tracing::debug!(oid = %request.oid, tag = %element.name, "applying edit request");

        if let Some(class_name) = request.attributes.as_ref().and_then(|a| a.class_name.as_deref()) {
            let edit = if request.override_classes {
                ClassEdit::Override(class_name)
            } else {
                ClassEdit::Merge(class_name)
            };
            let dirty = classes::apply_class_edit(element, edit);
            self.report.dirty.extend(dirty);
        }

        if let Some(text) = request.text_content.as_deref() {
            set_text(element, text);
        }

        for action in &request.structure_changes {
            match action {
                StructureAction::InsertImage(image) => {
                    let dirty = classes::apply_class_edit(element, ClassEdit::SetImage(&image.url));
                    self.report.dirty.extend(dirty);
                }
                StructureAction::RemoveImage => {
                    let dirty = classes::apply_class_edit(element, ClassEdit::RemoveImage);
                    self.report.dirty.extend(dirty);
                }
                _ => {
                    let mut ctx = ActionContext {
                        oid: &request.oid,
                        taken: &mut self.taken,
                        warnings: &mut self.report.warnings,
                        dirty: &mut self.report.dirty,
                    };
                    actions::apply(element, action, &mut ctx);
                }
            }
        }
    }
}

impl VisitorMut for Transformer<'_> {
    fn visit_element_mut(&mut self, element: &mut Element) -> ControlFlow<()> {
        let request = ids::element_oid(element).and_then(|oid| self.pending.remove(oid));

        if let Some(request) = request {
            self.apply_request(element, request);
            self.report.applied.push(request.oid.clone());
            if self.pending.is_empty() {
                return ControlFlow::Break(());
            }
        }

        walk_element_mut(self, element)
    }
}

/// Replace the first non-layout text child, keeping its surrounding
/// whitespace, or insert a text child in front of the others
fn set_text(element: &mut Element, text: &str) {
    let escaped = codegen::escape_text(text);
    let existing = element.children.iter_mut().find_map(|child| match child {
        JsxChild::Text(run) if !run.raw.trim().is_empty() => Some(run),
        _ => None,
    });

    match existing {
        Some(run) => {
            let leading = &run.raw[..run.raw.len() - run.raw.trim_start().len()];
            let trailing = &run.raw[run.raw.trim_end().len()..];
            let raw = format!("{}{}{}", leading, escaped, trailing);
            *run = Text {
                raw,
                span: Span::detached(),
            };
        }
        None => element.children.insert(
            0,
            JsxChild::Text(Text {
                raw: escaped,
                span: Span::detached(),
            }),
        ),
    }
}

/// Apply `requests` to `module`. When several requests share an identity,
/// the last one wins.
pub fn transform(module: &mut Module, requests: &[EditRequest]) -> TransformReport {
    let mut pending = HashMap::with_capacity(requests.len());
    for request in requests {
        pending.insert(request.oid.as_str(), request);
    }
    if pending.is_empty() {
        return TransformReport::default();
    }

    let mut transformer = Transformer {
        pending,
        taken: ids::collect_oids(module),
        report: TransformReport::default(),
    };
    let _ = transformer.visit_module_mut(module);

    let mut not_found: Vec<String> = transformer.pending.keys().map(|oid| oid.to_string()).collect();
    not_found.sort();
    for oid in &not_found {
        tracing::warn!(oid = %oid, "no element with this identity");
    }

    let mut report = transformer.report;
    report.not_found = not_found;
    report
}

/// Before and after text of one source file
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEdit {
    pub original: String,
    pub generated: String,
    pub report: TransformReport,
}

/// Parse, transform and print one source file
pub fn transform_source(
    source: &str,
    path: &str,
    requests: &[EditRequest],
) -> Result<SourceEdit, TransformError> {
    let mut module = tessera_parser::parse_with_path(source, path)?;

    // Printed with the same printer as the result so only edits differ
    let original = Printer::new(source).print(&module);

    let report = transform(&mut module, requests);
    let mut printer = Printer::new(source);
    printer.mark_dirty_many(report.dirty.iter().cloned());
    let generated = printer.print(&module);

    Ok(SourceEdit {
        original,
        generated,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::AttributeEdits;

    fn class_request(oid: &str, class_name: &str, override_classes: bool) -> EditRequest {
        EditRequest {
            oid: oid.to_string(),
            attributes: Some(AttributeEdits {
                class_name: Some(class_name.to_string()),
            }),
            override_classes,
            ..Default::default()
        }
    }

    #[test]
    fn test_class_merge_and_override() {
        let source = "const a = <div data-oid=\"d1\" className=\"a b\" />;";

        let merged = transform_source(source, "/a.tsx", &[class_request("d1", "c", false)]).unwrap();
        assert_eq!(merged.generated, "const a = <div data-oid=\"d1\" className=\"a b c\" />;");
        assert_eq!(merged.original, source);
        assert_eq!(merged.report.applied, vec!["d1".to_string()]);

        let replaced = transform_source(source, "/a.tsx", &[class_request("d1", "c", true)]).unwrap();
        assert_eq!(replaced.generated, "const a = <div data-oid=\"d1\" className=\"c\" />;");
    }

    #[test]
    fn test_text_edit() {
        let source = "const a = <p data-oid=\"p1\">\n  Hello\n</p>;";
        let request = EditRequest {
            oid: "p1".to_string(),
            text_content: Some("Bye {now}".to_string()),
            ..Default::default()
        };
        let edit = transform_source(source, "/a.tsx", &[request]).unwrap();
        assert_eq!(edit.generated, "const a = <p data-oid=\"p1\">\n  Bye &#123;now&#125;\n</p>;");
    }

    #[test]
    fn test_text_edit_inserts_first_child() {
        let source = "const a = <p data-oid=\"p1\"><b>x</b></p>;";
        let request = EditRequest {
            oid: "p1".to_string(),
            text_content: Some("Hi".to_string()),
            ..Default::default()
        };
        let edit = transform_source(source, "/a.tsx", &[request]).unwrap();
        assert_eq!(edit.generated, "const a = <p data-oid=\"p1\">Hi<b>x</b></p>;");
    }

    #[test]
    fn test_missing_identity_reported() {
        let source = "const a = <div data-oid=\"d1\" />;";
        let edit = transform_source(source, "/a.tsx", &[class_request("zzz", "c", false)]).unwrap();
        assert_eq!(edit.generated, source);
        assert!(edit.report.applied.is_empty());
        assert_eq!(edit.report.not_found, vec!["zzz".to_string()]);
    }

    #[test]
    fn test_latest_request_wins() {
        let source = "const a = <div data-oid=\"d1\" className=\"a\" />;";
        let requests = [class_request("d1", "first", true), class_request("d1", "second", true)];
        let edit = transform_source(source, "/a.tsx", &requests).unwrap();
        assert_eq!(edit.generated, "const a = <div data-oid=\"d1\" className=\"second\" />;");
        assert_eq!(edit.report.applied.len(), 1);
    }

    #[test]
    fn test_parse_failure_is_error() {
        let result = transform_source("const a = <div>;", "/a.tsx", &[class_request("d1", "c", false)]);
        assert!(matches!(result, Err(TransformError::Parse(_))));
    }
}
