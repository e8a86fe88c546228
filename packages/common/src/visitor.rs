use std::ops::ControlFlow;
use tessera_parser::ast::*;

/// Visitor pattern for traversing parsed modules immutably
///
/// Every method returns a [`ControlFlow`]; returning `Break` stops the whole
/// traversal. The default implementations walk the entire tree, so override
/// the `visit_*` methods you care about and call the matching `walk_*`
/// function to keep descending.
pub trait Visitor: Sized {
    fn visit_module(&mut self, module: &Module) -> ControlFlow<()> {
        walk_script(self, &module.body)
    }

    fn visit_declaration(&mut self, decl: &Declaration) -> ControlFlow<()> {
        walk_script(self, &decl.body)
    }

    fn visit_markup_root(&mut self, root: &MarkupRoot) -> ControlFlow<()> {
        walk_node(self, &root.node)
    }

    fn visit_element(&mut self, element: &Element) -> ControlFlow<()> {
        walk_element(self, element)
    }

    fn visit_fragment(&mut self, fragment: &Fragment) -> ControlFlow<()> {
        walk_children(self, &fragment.children)
    }

    fn visit_text(&mut self, _text: &Text) -> ControlFlow<()> {
        // Leaf node, no children to walk
        ControlFlow::Continue(())
    }

    fn visit_expression_container(&mut self, expr: &ExpressionContainer) -> ControlFlow<()> {
        walk_script(self, &expr.script)
    }

    fn visit_attribute(&mut self, attr: &Attribute) -> ControlFlow<()> {
        walk_attribute(self, attr)
    }
}

/// Mutable visitor pattern for transforming parsed modules
///
/// Similar to Visitor, but provides mutable access to nodes.
pub trait VisitorMut: Sized {
    fn visit_module_mut(&mut self, module: &mut Module) -> ControlFlow<()> {
        walk_script_mut(self, &mut module.body)
    }

    fn visit_declaration_mut(&mut self, decl: &mut Declaration) -> ControlFlow<()> {
        walk_script_mut(self, &mut decl.body)
    }

    fn visit_markup_root_mut(&mut self, root: &mut MarkupRoot) -> ControlFlow<()> {
        walk_node_mut(self, &mut root.node)
    }

    fn visit_element_mut(&mut self, element: &mut Element) -> ControlFlow<()> {
        walk_element_mut(self, element)
    }

    fn visit_fragment_mut(&mut self, fragment: &mut Fragment) -> ControlFlow<()> {
        walk_children_mut(self, &mut fragment.children)
    }

    fn visit_text_mut(&mut self, _text: &mut Text) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn visit_expression_container_mut(&mut self, expr: &mut ExpressionContainer) -> ControlFlow<()> {
        walk_script_mut(self, &mut expr.script)
    }

    fn visit_attribute_mut(&mut self, attr: &mut Attribute) -> ControlFlow<()> {
        walk_attribute_mut(self, attr)
    }
}

// Default walk implementations for immutable visitor

pub fn walk_script<V: Visitor>(visitor: &mut V, script: &Script) -> ControlFlow<()> {
    for part in &script.parts {
        match part {
            ScriptPart::Code { .. } | ScriptPart::Generated { .. } => {}
            ScriptPart::Declaration(decl) => visitor.visit_declaration(decl)?,
            ScriptPart::Markup(root) => visitor.visit_markup_root(root)?,
        }
    }
    ControlFlow::Continue(())
}

pub fn walk_node<V: Visitor>(visitor: &mut V, node: &JsxNode) -> ControlFlow<()> {
    match node {
        JsxNode::Element(element) => visitor.visit_element(element),
        JsxNode::Fragment(fragment) => visitor.visit_fragment(fragment),
    }
}

pub fn walk_element<V: Visitor>(visitor: &mut V, element: &Element) -> ControlFlow<()> {
    for attr in &element.attributes {
        visitor.visit_attribute(attr)?;
    }
    walk_children(visitor, &element.children)
}

pub fn walk_children<V: Visitor>(visitor: &mut V, children: &[JsxChild]) -> ControlFlow<()> {
    for child in children {
        match child {
            JsxChild::Element(element) => visitor.visit_element(element)?,
            JsxChild::Fragment(fragment) => visitor.visit_fragment(fragment)?,
            JsxChild::Text(text) => visitor.visit_text(text)?,
            JsxChild::Expression(expr) => visitor.visit_expression_container(expr)?,
        }
    }
    ControlFlow::Continue(())
}

pub fn walk_attribute<V: Visitor>(visitor: &mut V, attr: &Attribute) -> ControlFlow<()> {
    match attr {
        Attribute::Named(named) => match &named.value {
            AttributeValue::Expression(expr) => walk_script(visitor, &expr.script),
            AttributeValue::Element { node } => walk_node(visitor, node),
            AttributeValue::Absent | AttributeValue::String(_) | AttributeValue::Template(_) => {
                ControlFlow::Continue(())
            }
        },
        Attribute::Spread(spread) => walk_script(visitor, &spread.script),
    }
}

// Default walk implementations for mutable visitor

pub fn walk_script_mut<V: VisitorMut>(visitor: &mut V, script: &mut Script) -> ControlFlow<()> {
    for part in &mut script.parts {
        match part {
            ScriptPart::Code { .. } | ScriptPart::Generated { .. } => {}
            ScriptPart::Declaration(decl) => visitor.visit_declaration_mut(decl)?,
            ScriptPart::Markup(root) => visitor.visit_markup_root_mut(root)?,
        }
    }
    ControlFlow::Continue(())
}

pub fn walk_node_mut<V: VisitorMut>(visitor: &mut V, node: &mut JsxNode) -> ControlFlow<()> {
    match node {
        JsxNode::Element(element) => visitor.visit_element_mut(element),
        JsxNode::Fragment(fragment) => visitor.visit_fragment_mut(fragment),
    }
}

pub fn walk_element_mut<V: VisitorMut>(visitor: &mut V, element: &mut Element) -> ControlFlow<()> {
    for attr in &mut element.attributes {
        visitor.visit_attribute_mut(attr)?;
    }
    walk_children_mut(visitor, &mut element.children)
}

pub fn walk_children_mut<V: VisitorMut>(visitor: &mut V, children: &mut [JsxChild]) -> ControlFlow<()> {
    for child in children {
        match child {
            JsxChild::Element(element) => visitor.visit_element_mut(element)?,
            JsxChild::Fragment(fragment) => visitor.visit_fragment_mut(fragment)?,
            JsxChild::Text(text) => visitor.visit_text_mut(text)?,
            JsxChild::Expression(expr) => visitor.visit_expression_container_mut(expr)?,
        }
    }
    ControlFlow::Continue(())
}

pub fn walk_attribute_mut<V: VisitorMut>(visitor: &mut V, attr: &mut Attribute) -> ControlFlow<()> {
    match attr {
        Attribute::Named(named) => match &mut named.value {
            AttributeValue::Expression(expr) => walk_script_mut(visitor, &mut expr.script),
            AttributeValue::Element { node } => walk_node_mut(visitor, node),
            AttributeValue::Absent | AttributeValue::String(_) | AttributeValue::Template(_) => {
                ControlFlow::Continue(())
            }
        },
        Attribute::Spread(spread) => walk_script_mut(visitor, &mut spread.script),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_parser::parse;

    struct TagCollector {
        tags: Vec<String>,
        stop_at: Option<&'static str>,
    }

    impl Visitor for TagCollector {
        fn visit_element(&mut self, element: &Element) -> ControlFlow<()> {
            self.tags.push(element.name.clone());
            if self.stop_at == Some(element.name.as_str()) {
                return ControlFlow::Break(());
            }
            walk_element(self, element)
        }
    }

    const SOURCE: &str = r#"
function App() {
    return (
        <main>
            <Header title={<b>t</b>} />
            {show && <section><p>x</p></section>}
            <footer />
        </main>
    );
}
"#;

    #[test]
    fn test_visitor_walks_all_elements() {
        let module = parse(SOURCE).unwrap();
        let mut collector = TagCollector {
            tags: Vec::new(),
            stop_at: None,
        };
        let flow = collector.visit_module(&module);

        assert!(flow.is_continue());
        assert_eq!(
            collector.tags,
            vec!["main", "Header", "b", "section", "p", "footer"]
        );
    }

    #[test]
    fn test_visitor_break_stops_traversal() {
        let module = parse(SOURCE).unwrap();
        let mut collector = TagCollector {
            tags: Vec::new(),
            stop_at: Some("section"),
        };
        let flow = collector.visit_module(&module);

        assert!(flow.is_break());
        assert_eq!(collector.tags, vec!["main", "Header", "b", "section"]);
    }

    struct Renamer;

    impl VisitorMut for Renamer {
        fn visit_element_mut(&mut self, element: &mut Element) -> ControlFlow<()> {
            if element.name == "p" {
                element.name = "span".to_string();
            }
            walk_element_mut(self, element)
        }
    }

    #[test]
    fn test_visitor_mut_reaches_nested_markup() {
        let mut module = parse(SOURCE).unwrap();
        let _ = Renamer.visit_module_mut(&mut module);

        let mut collector = TagCollector {
            tags: Vec::new(),
            stop_at: None,
        };
        let _ = collector.visit_module(&module);
        assert!(collector.tags.contains(&"span".to_string()));
        assert!(!collector.tags.contains(&"p".to_string()));
    }
}
