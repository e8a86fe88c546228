//! # Template Map
//!
//! Registry from element identity to the source location that defines the
//! element. Each scanned file contributes one sub-map; rescanning a file
//! swaps its sub-map as a whole so lookups never see a half-built file.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use tessera_common::{walk_children, walk_element, walk_node, walk_script, Visitor};
use tessera_editor::element_oid;
use tessera_parser::ast::*;
use tessera_parser::{LineIndex, Position};

/// Start and end of one tag, 1-indexed. `end` is the column of the tag's
/// last character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRange {
    pub start: Position,
    pub end: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DynamicType {
    Conditional,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoreElementType {
    ComponentRoot,
    BodyTag,
}

/// Source location and structural role of one identified element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateNode {
    pub path: PathBuf,
    pub start_tag: TagRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_tag: Option<TagRange>,
    /// Innermost named declaration enclosing the element
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_type: Option<DynamicType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_element_type: Option<CoreElementType>,
}

impl TemplateNode {
    /// Position just past the element, the closing tag when there is one
    pub fn end(&self) -> Position {
        self.end_tag.unwrap_or(self.start_tag).end
    }
}

/// Role of the element directly at a markup root
#[derive(Debug, Clone, Copy, Default)]
struct RootContext {
    dynamic_type: Option<DynamicType>,
    component_root: bool,
}

struct Classifier<'a> {
    path: &'a Path,
    lines: LineIndex<'a>,
    components: Vec<String>,
    root: Option<RootContext>,
    nodes: HashMap<String, TemplateNode>,
}

impl Classifier<'_> {
    fn tag_range(&self, span: &Span) -> TagRange {
        TagRange {
            start: self.lines.start_position(span.start),
            end: self.lines.end_position(span.end),
        }
    }

    fn record(&mut self, oid: &str, element: &Element, context: RootContext) {
        let core_element_type = if context.component_root {
            Some(CoreElementType::ComponentRoot)
        } else if element.name.eq_ignore_ascii_case("body") {
            Some(CoreElementType::BodyTag)
        } else {
            None
        };

        let node = TemplateNode {
            path: self.path.to_path_buf(),
            start_tag: self.tag_range(&element.opening),
            end_tag: element.closing.as_ref().map(|span| self.tag_range(span)),
            component: self.components.last().cloned(),
            dynamic_type: context.dynamic_type,
            core_element_type,
        };
        self.nodes.insert(oid.to_string(), node);
    }
}

impl Visitor for Classifier<'_> {
    fn visit_declaration(&mut self, decl: &Declaration) -> ControlFlow<()> {
        self.components.push(decl.name.clone());
        let flow = walk_script(self, &decl.body);
        self.components.pop();
        flow
    }

    fn visit_markup_root(&mut self, root: &MarkupRoot) -> ControlFlow<()> {
        let component_root = matches!(root.position, MarkupPosition::Return | MarkupPosition::ArrowBody);
        let dynamic_type = match root.position {
            MarkupPosition::Branch => Some(DynamicType::Conditional),
            MarkupPosition::ArrowBody => Some(DynamicType::Array),
            MarkupPosition::Return | MarkupPosition::Other => None,
        };

        match &root.node {
            JsxNode::Element(element) => {
                self.root = Some(RootContext {
                    dynamic_type,
                    component_root,
                });
                self.visit_element(element)
            }
            // `items.map((i) => <><li/><li/></>)`: each element is a list item
            JsxNode::Fragment(fragment) if root.position == MarkupPosition::ArrowBody => {
                for child in &fragment.children {
                    if let JsxChild::Element(element) = child {
                        self.root = Some(RootContext {
                            dynamic_type: Some(DynamicType::Array),
                            component_root: false,
                        });
                        self.visit_element(element)?;
                    } else {
                        walk_children(self, std::slice::from_ref(child))?;
                    }
                }
                ControlFlow::Continue(())
            }
            JsxNode::Fragment(_) => walk_node(self, &root.node),
        }
    }

    fn visit_element(&mut self, element: &Element) -> ControlFlow<()> {
        let context = self.root.take().unwrap_or_default();
        if !element.is_fragment() {
            if let Some(oid) = element_oid(element) {
                self.record(oid, element, context);
            }
        }
        walk_element(self, element)
    }
}

/// Template nodes of every identified element in a parsed file
pub fn classify(module: &Module, source: &str, path: &Path) -> HashMap<String, TemplateNode> {
    let mut classifier = Classifier {
        path,
        lines: LineIndex::new(source),
        components: Vec::new(),
        root: None,
        nodes: HashMap::new(),
    };
    let _ = classifier.visit_module(module);
    classifier.nodes
}

/// Exact source text of the element a template node describes
pub fn code_block(node: &TemplateNode, source: &str) -> Option<String> {
    let lines = LineIndex::new(source);
    let start = lines.offset_of_start(node.start_tag.start)?;
    let end = lines.offset_of_end(node.end())?;
    source.get(start..end).map(str::to_string)
}

/// Identity of the `index`-th `<component>` element (in tree order) inside
/// a code block
pub fn instance_child(block: &str, component: &str, index: usize) -> Option<String> {
    struct Instances<'a> {
        component: &'a str,
        found: Vec<Option<String>>,
        index: usize,
    }

    impl Visitor for Instances<'_> {
        fn visit_element(&mut self, element: &Element) -> ControlFlow<()> {
            if element.name == self.component {
                self.found.push(element_oid(element).map(str::to_string));
                if self.found.len() > self.index {
                    return ControlFlow::Break(());
                }
            }
            walk_element(self, element)
        }
    }

    let node = tessera_parser::parse_markup(block).ok()?;
    let mut instances = Instances {
        component,
        found: Vec::new(),
        index,
    };
    let _ = walk_node(&mut instances, &node);
    instances.found.into_iter().nth(index).flatten()
}

/// Names of the components a file exports: uppercase functions,
/// function-valued variables and classes extending `Component` or
/// `PureComponent`
pub fn exported_components(module: &Module) -> Vec<String> {
    module
        .body
        .declarations()
        .filter(|decl| decl.exported)
        .filter(|decl| decl.name.chars().next().map(char::is_uppercase).unwrap_or(false))
        .filter(|decl| match decl.kind {
            DeclarationKind::Function => true,
            DeclarationKind::Variable => decl.function_valued,
            DeclarationKind::Class => decl.heritage.as_deref().map(extends_component).unwrap_or(false),
        })
        .map(|decl| decl.name.clone())
        .collect()
}

fn extends_component(heritage: &str) -> bool {
    let base = heritage.split('<').next().unwrap_or_default().trim();
    let last = base.rsplit('.').next().unwrap_or(base).trim();
    matches!(last, "Component" | "PureComponent")
}

#[derive(Default)]
struct MapInner {
    files: HashMap<PathBuf, HashMap<String, TemplateNode>>,
    index: HashMap<String, PathBuf>,
}

impl MapInner {
    /// Point `oid` at another file that still defines it, or drop it
    fn reindex(&mut self, oid: &str) {
        match self.files.iter().find(|(_, nodes)| nodes.contains_key(oid)) {
            Some((path, _)) => {
                let path = path.clone();
                self.index.insert(oid.to_string(), path);
            }
            None => {
                self.index.remove(oid);
            }
        }
    }

    fn detach(&mut self, path: &Path) -> Option<HashMap<String, TemplateNode>> {
        let old = self.files.remove(path)?;
        for oid in old.keys() {
            if self.index.get(oid).map(PathBuf::as_path) == Some(path) {
                self.reindex(oid);
            }
        }
        Some(old)
    }
}

/// Identity to template node registry for one session
#[derive(Default)]
pub struct TemplateMap {
    inner: RwLock<MapInner>,
}

impl TemplateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, oid: &str) -> Option<TemplateNode> {
        let inner = self.inner.read();
        let path = inner.index.get(oid)?;
        inner.files.get(path)?.get(oid).cloned()
    }

    pub fn path_of(&self, oid: &str) -> Option<PathBuf> {
        self.inner.read().index.get(oid).cloned()
    }

    /// Replace everything known about `path` with `nodes`
    pub fn upsert_file(&self, path: PathBuf, nodes: HashMap<String, TemplateNode>) {
        let mut inner = self.inner.write();
        inner.detach(&path);
        for oid in nodes.keys() {
            inner.index.insert(oid.clone(), path.clone());
        }
        tracing::debug!(path = %path.display(), count = nodes.len(), "template map updated");
        inner.files.insert(path, nodes);
    }

    pub fn remove_file(&self, path: &Path) -> bool {
        self.inner.write().detach(path).is_some()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.files.clear();
        inner.index.clear();
    }

    /// Number of identities
    pub fn len(&self) -> usize {
        self.inner.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<_> = self.inner.read().files.keys().cloned().collect();
        files.sort();
        files
    }

    /// Nodes of one file in source order
    pub fn file_nodes(&self, path: &Path) -> Vec<(String, TemplateNode)> {
        let inner = self.inner.read();
        let mut nodes: Vec<_> = inner
            .files
            .get(path)
            .map(|nodes| nodes.iter().map(|(oid, node)| (oid.clone(), node.clone())).collect())
            .unwrap_or_default();
        nodes.sort_by_key(|(_, node)| (node.start_tag.start.line, node.start_tag.start.column));
        nodes
    }
}
