//! # Structural Actions
//!
//! Operators on the child list of the element an edit request targets.
//!
//! ## Indexing
//!
//! Every index counts element and fragment children only. A Move's
//! `targetIndex` is the index the element ends up at, so moving the first of
//! `[A, B, C]` to index 2 yields `[B, C, A]`.
//!
//! ## Failure
//!
//! Actions never fail the transform. A missing or negative insert position
//! degrades to append, an index that names no existing child skips the
//! action; both are reported as warnings.

use std::collections::HashSet;

use tessera_parser::ast::*;
use tessera_parser::codegen;

use crate::errors::TransformWarning;
use crate::ids::{self, MOVE_KEY_ATTRIBUTE, OID_ATTRIBUTE};
use crate::layout;
use crate::request::*;

/// Shared state for the actions of one request
pub(crate) struct ActionContext<'a> {
    pub oid: &'a str,
    /// Identities in use in the file, grown as new ones are assigned
    pub taken: &'a mut HashSet<String>,
    pub warnings: &'a mut Vec<TransformWarning>,
    pub dirty: &'a mut Vec<String>,
}

impl ActionContext<'_> {
    fn fresh_oid(&mut self) -> String {
        let oid = ids::generate_oid(self.taken);
        self.taken.insert(oid.clone());
        oid
    }

    fn claim_oid(&mut self, preferred: Option<&str>) -> String {
        match preferred {
            Some(oid) if !oid.is_empty() && !self.taken.contains(oid) => {
                self.taken.insert(oid.to_string());
                oid.to_string()
            }
            _ => self.fresh_oid(),
        }
    }

    fn invalid_position(&mut self, action: &str, detail: impl Into<String>) {
        let warning = TransformWarning::InvalidPosition {
            oid: self.oid.to_string(),
            action: action.to_string(),
            detail: detail.into(),
        };
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    fn invalid_index(&mut self, action: &str, index: i64) {
        let warning = TransformWarning::InvalidIndex {
            oid: self.oid.to_string(),
            action: action.to_string(),
            index,
        };
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    fn set_attribute(&mut self, element: &mut Element, name: &str, value: &str) {
        if let Some(attr_id) = element.set_string_attribute(name, value) {
            self.dirty.push(attr_id);
            self.dirty.push(element.span.id.clone());
        }
    }
}

/// Where a new child goes
enum Placement {
    Append,
    Prepend,
    Before(usize),
}

fn placement(position: Option<TargetPosition>, action: &str, ctx: &mut ActionContext<'_>) -> Placement {
    match position {
        Some(TargetPosition::Append) => Placement::Append,
        Some(TargetPosition::Prepend) => Placement::Prepend,
        Some(TargetPosition::Index { index }) if index >= 0 => Placement::Before(index as usize),
        Some(TargetPosition::Index { index }) => {
            ctx.invalid_position(action, format!("negative index {}", index));
            Placement::Append
        }
        None => {
            ctx.invalid_position(action, "no target position");
            Placement::Append
        }
    }
}

fn place(children: &mut Vec<JsxChild>, placement: Placement, child: JsxChild) {
    match placement {
        Placement::Append => layout::append_node(children, child),
        Placement::Prepend => layout::prepend_node(children, child),
        Placement::Before(index) => layout::insert_node(children, index, child),
    }
}

/// Index of an existing child named by a position
fn existing_index(position: TargetPosition, len: usize) -> Result<usize, i64> {
    match position {
        TargetPosition::Prepend if len > 0 => Ok(0),
        TargetPosition::Append if len > 0 => Ok(len - 1),
        TargetPosition::Index { index } if index >= 0 && (index as usize) < len => {
            Ok(index as usize)
        }
        TargetPosition::Index { index } => Err(index),
        TargetPosition::Prepend => Err(0),
        TargetPosition::Append => Err(len as i64),
    }
}

/// Apply one structural action to `element`'s children.
///
/// Class-list actions (`InsertImage`, `RemoveImage`) are handled by the
/// caller.
pub(crate) fn apply(element: &mut Element, action: &StructureAction, ctx: &mut ActionContext<'_>) {
    let changed = match action {
        StructureAction::Move(action) => move_child(&mut element.children, action, ctx),
        StructureAction::Insert(action) => insert_child(&mut element.children, action, ctx),
        StructureAction::Remove(action) => remove_child(&mut element.children, action, ctx),
        StructureAction::Group(action) => group_children(&mut element.children, action, ctx),
        StructureAction::Ungroup(action) => ungroup_child(&mut element.children, action, ctx),
        StructureAction::InsertImage(_) | StructureAction::RemoveImage => false,
    };

    if changed {
        ctx.dirty.push(element.span.id.clone());
    }
}

fn move_child(children: &mut Vec<JsxChild>, action: &MoveAction, ctx: &mut ActionContext<'_>) -> bool {
    let Some(moved) = layout::remove_node(children, action.original_index) else {
        ctx.invalid_index("move", action.original_index as i64);
        return false;
    };

    tracing::debug!(
        oid = ctx.oid,
        from = action.original_index,
        to = action.target_index,
        "moving child"
    );
    layout::insert_node(children, action.target_index, moved);
    true
}

fn insert_child(children: &mut Vec<JsxChild>, action: &InsertAction, ctx: &mut ActionContext<'_>) -> bool {
    let node = match action.code_fragment.as_deref() {
        Some(fragment) => match tessera_parser::parse_markup(fragment) {
            Ok(mut node) => {
                ids::inject_node(&mut node, ctx.taken);
                if let JsxNode::Element(element) = &mut node {
                    if element.attribute(MOVE_KEY_ATTRIBUTE).is_none() && !element.is_fragment() {
                        let key = ctx.fresh_oid();
                        element.set_string_attribute(MOVE_KEY_ATTRIBUTE, &key);
                    }
                }
                node
            }
            Err(err) => {
                let warning = TransformWarning::InvalidCodeFragment {
                    oid: ctx.oid.to_string(),
                    message: err.to_string(),
                };
                tracing::warn!("{}", warning);
                ctx.warnings.push(warning);
                if action.element.tag_name.is_empty() {
                    return false;
                }
                JsxNode::Element(build_element(&action.element, ctx, true))
            }
        },
        None => JsxNode::Element(build_element(&action.element, ctx, true)),
    };

    let at = placement(action.target_position, "insert", ctx);
    place(children, at, node.into_child());
    true
}

fn remove_child(children: &mut Vec<JsxChild>, action: &RemoveAction, ctx: &mut ActionContext<'_>) -> bool {
    let Some(position) = action.target_position else {
        ctx.invalid_index("remove", -1);
        return false;
    };

    match existing_index(position, layout::node_count(children)) {
        Ok(index) => layout::remove_node(children, index).is_some(),
        Err(index) => {
            ctx.invalid_index("remove", index);
            false
        }
    }
}

fn group_children(children: &mut Vec<JsxChild>, action: &GroupAction, ctx: &mut ActionContext<'_>) -> bool {
    let len = layout::node_count(children);
    let mut targets: Vec<&GroupTarget> = Vec::with_capacity(action.targets.len());
    for target in &action.targets {
        if target.index >= len {
            ctx.invalid_index("group", target.index as i64);
        } else if !targets.iter().any(|t| t.index == target.index) {
            targets.push(target);
        }
    }
    if targets.is_empty() {
        return false;
    }
    targets.sort_by_key(|target| target.index);

    // Highest index first so lower indices stay valid
    let mut grouped = Vec::with_capacity(targets.len());
    for target in targets.iter().rev() {
        if let Some(mut child) = layout::remove_node(children, target.index) {
            if let JsxChild::Element(element) = &mut child {
                retag(element, &target.uuid, ctx);
            }
            grouped.push(child);
        }
    }
    grouped.reverse();

    let mut container = build_element(&action.container, ctx, false);
    container.self_closing = false;
    container.children = grouped;

    let at = placement(action.target_position, "group", ctx);
    place(children, at, JsxChild::Element(container));
    true
}

fn ungroup_child(children: &mut Vec<JsxChild>, action: &UngroupAction, ctx: &mut ActionContext<'_>) -> bool {
    let index = match existing_index(action.container_position, layout::node_count(children)) {
        Ok(index) => index,
        Err(index) => {
            ctx.invalid_index("ungroup", index);
            return false;
        }
    };
    let Some(container) = layout::remove_node(children, index) else {
        return false;
    };

    let lifted: Vec<JsxChild> = match container {
        JsxChild::Element(element) => element.children,
        JsxChild::Fragment(fragment) => fragment.children,
        JsxChild::Text(_) | JsxChild::Expression(_) => Vec::new(),
    }
    .into_iter()
    .filter(JsxChild::is_node)
    .collect();

    let mut targets: Vec<&GroupTarget> = action.targets.iter().collect();
    targets.sort_by_key(|target| target.index);

    let mut next_index = index;
    for (i, mut child) in lifted.into_iter().enumerate() {
        let target_index = match targets.get(i) {
            Some(target) => {
                if let JsxChild::Element(element) = &mut child {
                    retag(element, &target.uuid, ctx);
                }
                target.index
            }
            None => next_index,
        };
        layout::insert_node(children, target_index, child);
        next_index = target_index + 1;
    }
    true
}

/// Give a regrouped element its new identity and a move key
fn retag(element: &mut Element, uuid: &str, ctx: &mut ActionContext<'_>) {
    if element.is_fragment() {
        return;
    }
    ctx.taken.insert(uuid.to_string());
    ctx.set_attribute(element, OID_ATTRIBUTE, uuid);
    let key = ctx.fresh_oid();
    ctx.set_attribute(element, MOVE_KEY_ATTRIBUTE, &key);
}

/// Synthesize an element, with identities on it and its descendants
fn build_element(spec: &ActionElement, ctx: &mut ActionContext<'_>, move_key: bool) -> Element {
    let mut element = Element::new(spec.tag_name.clone());

    for (name, value) in &spec.attributes {
        if name == OID_ATTRIBUTE || name == MOVE_KEY_ATTRIBUTE {
            continue;
        }
        element.set_string_attribute(name, value);
    }

    if let Some(text) = spec.text_content.as_deref().filter(|text| !text.is_empty()) {
        element.children.push(JsxChild::Text(Text {
            raw: codegen::escape_text(text),
            span: Span::detached(),
        }));
    }
    for child in &spec.children {
        let child = build_element(child, ctx, false);
        element.children.push(JsxChild::Element(child));
    }

    element.self_closing = element.children.is_empty() && codegen::is_void_element(&element.name);

    let preferred = spec
        .oid
        .as_deref()
        .or_else(|| spec.attributes.get(OID_ATTRIBUTE).map(String::as_str));
    let oid = ctx.claim_oid(preferred);
    element.set_string_attribute(OID_ATTRIBUTE, &oid);

    if move_key {
        let key = match spec.attributes.get(MOVE_KEY_ATTRIBUTE) {
            Some(key) => key.clone(),
            None => ctx.fresh_oid(),
        };
        element.set_string_attribute(MOVE_KEY_ATTRIBUTE, &key);
    }
    element
}
