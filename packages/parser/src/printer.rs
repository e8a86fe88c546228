use crate::ast::*;
use crate::codegen;
use std::collections::HashSet;

/// Lossless printer that preserves original formatting using spans
///
/// Untouched nodes are copied from the source verbatim. A node is printed
/// from the tree when it is detached (created after parsing), when its span
/// id has been marked dirty, or when something inside it needs printing.
/// Reprinting happens at attribute and child granularity, so an element
/// whose className changed keeps every other byte of its opening tag.
pub struct Printer<'a> {
    source: &'a str,
    dirty_spans: HashSet<String>, // Node IDs that were modified
}

impl<'a> Printer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            dirty_spans: HashSet::new(),
        }
    }

    /// Mark a node as dirty (modified) by its span ID
    pub fn mark_dirty(&mut self, span_id: &str) {
        self.dirty_spans.insert(span_id.to_string());
    }

    /// Mark multiple nodes as dirty
    pub fn mark_dirty_many<I, S>(&mut self, span_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dirty_spans.extend(span_ids.into_iter().map(Into::into));
    }

    pub fn print(&self, module: &Module) -> String {
        let mut out = String::with_capacity(self.source.len());
        self.write_script(&module.body, &mut out);
        out
    }

    pub fn print_node(&self, node: &JsxNode) -> String {
        let mut out = String::new();
        self.write_node(node, &mut out);
        out
    }

    fn is_dirty(&self, span: &Span) -> bool {
        span.is_detached() || self.dirty_spans.contains(&span.id)
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        self.source.get(start..end).unwrap_or_default()
    }

    fn copy(&self, span: &Span, out: &mut String) {
        out.push_str(self.slice(span.start, span.end));
    }

    // ---------------------------------------------------------------------
    // Change detection
    // ---------------------------------------------------------------------

    fn script_changed(&self, script: &Script) -> bool {
        script.parts.iter().any(|part| match part {
            ScriptPart::Code { span } => span.is_detached(),
            ScriptPart::Generated { .. } => true,
            ScriptPart::Declaration(decl) => self.script_changed(&decl.body),
            ScriptPart::Markup(root) => self.node_changed(&root.node),
        })
    }

    fn node_changed(&self, node: &JsxNode) -> bool {
        match node {
            JsxNode::Element(el) => self.element_changed(el),
            JsxNode::Fragment(frag) => self.fragment_changed(frag),
        }
    }

    fn element_changed(&self, el: &Element) -> bool {
        self.is_dirty(&el.span)
            || el.attributes.iter().any(|attr| self.attribute_changed(attr))
            || el.children.iter().any(|child| self.child_changed(child))
    }

    fn fragment_changed(&self, frag: &Fragment) -> bool {
        self.is_dirty(&frag.span) || frag.children.iter().any(|child| self.child_changed(child))
    }

    fn child_changed(&self, child: &JsxChild) -> bool {
        match child {
            JsxChild::Element(el) => self.element_changed(el),
            JsxChild::Fragment(frag) => self.fragment_changed(frag),
            JsxChild::Text(text) => self.is_dirty(&text.span),
            JsxChild::Expression(expr) => {
                self.is_dirty(&expr.span) || self.script_changed(&expr.script)
            }
        }
    }

    fn attribute_changed(&self, attr: &Attribute) -> bool {
        match attr {
            Attribute::Named(named) => self.is_dirty(&named.span) || self.value_changed(&named.value),
            Attribute::Spread(spread) => {
                self.is_dirty(&spread.span) || self.script_changed(&spread.script)
            }
        }
    }

    fn value_changed(&self, value: &AttributeValue) -> bool {
        match value {
            AttributeValue::Expression(expr) => self.script_changed(&expr.script),
            AttributeValue::Element { node } => self.node_changed(node),
            AttributeValue::Absent | AttributeValue::String(_) | AttributeValue::Template(_) => false,
        }
    }

    // ---------------------------------------------------------------------
    // Writing
    // ---------------------------------------------------------------------

    fn write_script(&self, script: &Script, out: &mut String) {
        for part in &script.parts {
            match part {
                ScriptPart::Code { span } => self.copy(span, out),
                ScriptPart::Generated { text } => out.push_str(text),
                ScriptPart::Declaration(decl) => self.write_script(&decl.body, out),
                ScriptPart::Markup(root) => self.write_node(&root.node, out),
            }
        }
    }

    fn write_node(&self, node: &JsxNode, out: &mut String) {
        match node {
            JsxNode::Element(el) => self.write_element(el, out),
            JsxNode::Fragment(frag) => self.write_fragment(frag, out),
        }
    }

    fn write_child(&self, child: &JsxChild, out: &mut String) {
        match child {
            JsxChild::Element(el) => self.write_element(el, out),
            JsxChild::Fragment(frag) => self.write_fragment(frag, out),
            JsxChild::Text(text) => out.push_str(&text.raw),
            JsxChild::Expression(expr) => {
                if self.child_changed(child) {
                    out.push('{');
                    self.write_script(&expr.script, out);
                    out.push('}');
                } else {
                    self.copy(&expr.span, out);
                }
            }
        }
    }

    fn write_fragment(&self, frag: &Fragment, out: &mut String) {
        if !self.fragment_changed(frag) {
            self.copy(&frag.span, out);
            return;
        }

        if frag.span.is_detached() {
            out.push_str("<>");
        } else {
            self.copy(&frag.opening, out);
        }
        for child in &frag.children {
            self.write_child(child, out);
        }
        if frag.span.is_detached() {
            out.push_str("</>");
        } else {
            self.copy(&frag.closing, out);
        }
    }

    fn write_element(&self, el: &Element, out: &mut String) {
        if !self.element_changed(el) {
            self.copy(&el.span, out);
            return;
        }
        if el.span.is_detached() {
            self.generate_element(el, out);
            return;
        }

        let gains_children = el.self_closing && !el.children.is_empty();
        let opening_changed = self.dirty_spans.contains(&el.span.id)
            || gains_children
            || el.attributes.iter().any(|attr| self.attribute_changed(attr));

        if opening_changed {
            self.write_opening(el, out);
        } else {
            self.copy(&el.opening, out);
        }

        if el.self_closing && el.children.is_empty() {
            return;
        }

        for child in &el.children {
            self.write_child(child, out);
        }

        match &el.closing {
            Some(closing) => self.copy(closing, out),
            None => {
                out.push_str("</");
                out.push_str(&el.name);
                out.push('>');
            }
        }
    }

    /// Opening tag of a parsed element, reprinted one attribute at a time
    fn write_opening(&self, el: &Element, out: &mut String) {
        out.push_str(self.slice(el.opening.start, el.name_end));

        for attr in &el.attributes {
            let span = attribute_span(attr);
            if span.is_detached() {
                out.push(' ');
                self.generate_attribute(attr, out);
                continue;
            }

            // Keep the whitespace that preceded the attribute
            let before = self.slice(0, span.start);
            let leading = &before[before.trim_end().len()..];
            if leading.is_empty() {
                out.push(' ');
            } else {
                out.push_str(leading);
            }

            if self.dirty_spans.contains(&span.id) {
                self.generate_attribute(attr, out);
            } else {
                self.write_clean_attribute(attr, out);
            }
        }

        let tail = self.slice(el.attrs_end, el.opening.end);
        if el.self_closing && !el.children.is_empty() {
            out.push_str(tail.trim_end_matches("/>").trim_end());
            out.push('>');
        } else {
            out.push_str(tail);
        }
    }

    /// An attribute that was not edited itself but may contain edited markup
    fn write_clean_attribute(&self, attr: &Attribute, out: &mut String) {
        match attr {
            Attribute::Named(named) => match &named.value {
                AttributeValue::Element { node } if self.node_changed(node) => {
                    let inner = node.span();
                    out.push_str(self.slice(named.span.start, inner.start));
                    self.write_node(node, out);
                    out.push_str(self.slice(inner.end, named.span.end));
                }
                AttributeValue::Expression(expr)
                    if !expr.span.is_detached() && self.script_changed(&expr.script) =>
                {
                    out.push_str(self.slice(named.span.start, expr.span.start));
                    out.push('{');
                    self.write_script(&expr.script, out);
                    out.push('}');
                    out.push_str(self.slice(expr.span.end, named.span.end));
                }
                _ => self.copy(&named.span, out),
            },
            Attribute::Spread(spread) => {
                if self.script_changed(&spread.script) {
                    out.push('{');
                    self.write_script(&spread.script, out);
                    out.push('}');
                } else {
                    self.copy(&spread.span, out);
                }
            }
        }
    }

    fn generate_attribute(&self, attr: &Attribute, out: &mut String) {
        match attr {
            Attribute::Named(named) => {
                out.push_str(&named.name);
                match &named.value {
                    AttributeValue::Absent => {}
                    AttributeValue::String(value) => out.push_str(&codegen::string_value(value)),
                    AttributeValue::Template(template) => {
                        out.push_str("={");
                        out.push_str(&codegen::template_literal(template));
                        out.push('}');
                    }
                    AttributeValue::Expression(expr) => {
                        out.push_str("={");
                        self.write_script(&expr.script, out);
                        out.push('}');
                    }
                    AttributeValue::Element { node } => {
                        out.push('=');
                        self.write_node(node, out);
                    }
                }
            }
            Attribute::Spread(spread) => {
                out.push('{');
                self.write_script(&spread.script, out);
                out.push('}');
            }
        }
    }

    /// Element created after parsing
    fn generate_element(&self, el: &Element, out: &mut String) {
        out.push('<');
        out.push_str(&el.name);
        for attr in &el.attributes {
            out.push(' ');
            let span = attribute_span(attr);
            if self.is_dirty(span) {
                self.generate_attribute(attr, out);
            } else {
                self.write_clean_attribute(attr, out);
            }
        }

        if el.children.is_empty() && el.self_closing {
            out.push_str("/>");
            return;
        }

        out.push('>');
        for child in &el.children {
            self.write_child(child, out);
        }
        out.push_str("</");
        out.push_str(&el.name);
        out.push('>');
    }
}

fn attribute_span(attr: &Attribute) -> &Span {
    match attr {
        Attribute::Named(named) => &named.span,
        Attribute::Spread(spread) => &spread.span,
    }
}
