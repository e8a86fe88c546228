use serde::{Deserialize, Serialize};

/// Span information for source location tracking
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub id: String,
}

impl Span {
    pub fn new(start: usize, end: usize, id: String) -> Self {
        Self { start, end, id }
    }

    /// Span for a node created after parsing. It has no source text, so the
    /// printer always generates it.
    pub fn detached() -> Self {
        Self {
            start: usize::MAX,
            end: usize::MAX,
            id: String::new(),
        }
    }

    pub fn is_detached(&self) -> bool {
        self.start == usize::MAX
    }

    pub fn len(&self) -> usize {
        if self.is_detached() {
            0
        } else {
            self.end - self.start
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Root of a parsed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub body: Script,
    pub span: Span,
}

/// A run of script code with the declarations and markup embedded in it.
///
/// Parts tile the source range they were parsed from: concatenating the
/// source text of every part reproduces the original text exactly.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Script {
    pub parts: Vec<ScriptPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScriptPart {
    /// Verbatim source range
    Code { span: Span },
    /// Script text with no source range (synthesized nodes)
    Generated { text: String },
    Declaration(Declaration),
    Markup(MarkupRoot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclarationKind {
    Function,
    Class,
    Variable,
}

/// Named function, class or variable declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub name: String,
    pub exported: bool,
    /// Text of the `extends` clause for classes
    pub heritage: Option<String>,
    /// Variable initialised with a function or arrow function
    pub function_valued: bool,
    pub body: Script,
    pub span: Span,
}

/// Syntactic position of a markup expression inside script code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkupPosition {
    /// Operand of `return`
    Return,
    /// Expression body of an arrow function
    ArrowBody,
    /// Operand of `?:`, `&&`, `||` or `??` directly inside a markup expression container
    Branch,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkupRoot {
    pub node: JsxNode,
    pub position: MarkupPosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum JsxNode {
    Element(Element),
    Fragment(Fragment),
}

/// Markup element: `<name attrs>children</name>` or `<name attrs />`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<JsxChild>,
    pub self_closing: bool,
    pub span: Span,
    /// `<` through the `>` of the opening tag
    pub opening: Span,
    /// End of the tag name inside the opening tag
    pub name_end: usize,
    /// End of the last attribute (or of the name when there are none)
    pub attrs_end: usize,
    pub closing: Option<Span>,
}

/// `<>children</>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub children: Vec<JsxChild>,
    pub span: Span,
    pub opening: Span,
    pub closing: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum JsxChild {
    Element(Element),
    Fragment(Fragment),
    Text(Text),
    Expression(ExpressionContainer),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    /// Source text, entities left undecoded
    pub raw: String,
    pub span: Span,
}

/// `{script}` as a markup child
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionContainer {
    pub script: Script,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Attribute {
    Named(NamedAttribute),
    /// `{...props}`
    Spread(SpreadAttribute),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedAttribute {
    pub name: String,
    pub value: AttributeValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadAttribute {
    pub script: Script,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AttributeValue {
    /// Boolean shorthand: `<input disabled />`
    Absent,
    String(StringValue),
    /// `{`...`}` holding a single template literal
    Template(TemplateValue),
    Expression(ExpressionValue),
    Element { node: Box<JsxNode> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringValue {
    /// Raw text between the quotes
    pub value: String,
    pub quote: char,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateValue {
    pub chunks: Vec<TemplateChunk>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateChunk {
    Text(String),
    /// Raw expression between `${` and `}`
    Substitution(String),
}

/// `{expression}` attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionValue {
    /// Raw text between the braces
    pub raw: String,
    pub script: Script,
    /// Present when the whole expression is a single call `callee(args)`
    pub call: Option<CallShape>,
    /// `{` through `}`
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallShape {
    pub callee: String,
    pub args: Vec<CallArgument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallArgument {
    pub raw: String,
    /// Set when the argument is a plain string literal
    pub literal: Option<StringValue>,
}

impl Module {
    /// Every top level markup tree, in source order, including those nested
    /// inside declarations
    pub fn markup_roots(&self) -> Vec<&MarkupRoot> {
        let mut roots = Vec::new();
        collect_roots(&self.body, &mut roots);
        roots
    }
}

fn collect_roots<'a>(script: &'a Script, out: &mut Vec<&'a MarkupRoot>) {
    for part in &script.parts {
        match part {
            ScriptPart::Declaration(decl) => collect_roots(&decl.body, out),
            ScriptPart::Markup(root) => out.push(root),
            ScriptPart::Code { .. } | ScriptPart::Generated { .. } => {}
        }
    }
}

impl Script {
    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            parts: vec![ScriptPart::Generated { text: text.into() }],
        }
    }

    /// Top level declarations of this script
    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.parts.iter().filter_map(|part| match part {
            ScriptPart::Declaration(decl) => Some(decl),
            _ => None,
        })
    }
}

impl JsxNode {
    pub fn span(&self) -> &Span {
        match self {
            JsxNode::Element(el) => &el.span,
            JsxNode::Fragment(frag) => &frag.span,
        }
    }

    pub fn children(&self) -> &[JsxChild] {
        match self {
            JsxNode::Element(el) => &el.children,
            JsxNode::Fragment(frag) => &frag.children,
        }
    }

    pub fn children_mut(&mut self) -> &mut Vec<JsxChild> {
        match self {
            JsxNode::Element(el) => &mut el.children,
            JsxNode::Fragment(frag) => &mut frag.children,
        }
    }

    pub fn into_child(self) -> JsxChild {
        match self {
            JsxNode::Element(el) => JsxChild::Element(el),
            JsxNode::Fragment(frag) => JsxChild::Fragment(frag),
        }
    }
}

impl JsxChild {
    /// Elements and fragments; text and expression children are not
    /// counted by positional edits
    pub fn is_node(&self) -> bool {
        matches!(self, JsxChild::Element(_) | JsxChild::Fragment(_))
    }

    pub fn span(&self) -> &Span {
        match self {
            JsxChild::Element(el) => &el.span,
            JsxChild::Fragment(frag) => &frag.span,
            JsxChild::Text(text) => &text.span,
            JsxChild::Expression(expr) => &expr.span,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            JsxChild::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            JsxChild::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Whitespace-only text that spans a line break (layout separator)
    pub fn is_line_separator(&self) -> bool {
        match self {
            JsxChild::Text(text) => {
                text.raw.contains('\n') && text.raw.chars().all(char::is_whitespace)
            }
            _ => false,
        }
    }
}

impl Element {
    /// Create a detached element with no attributes or children
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: false,
            span: Span::detached(),
            opening: Span::detached(),
            name_end: usize::MAX,
            attrs_end: usize::MAX,
            closing: None,
        }
    }

    /// `<Fragment>` and `<React.Fragment>` behave like `<>`
    pub fn is_fragment(&self) -> bool {
        self.name == "Fragment" || self.name == "React.Fragment"
    }

    pub fn attribute(&self, name: &str) -> Option<&NamedAttribute> {
        self.attributes.iter().find_map(|attr| match attr {
            Attribute::Named(named) if named.name == name => Some(named),
            _ => None,
        })
    }

    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut NamedAttribute> {
        self.attributes.iter_mut().find_map(|attr| match attr {
            Attribute::Named(named) if named.name == name => Some(named),
            _ => None,
        })
    }

    /// Value of a string literal attribute
    pub fn string_attribute(&self, name: &str) -> Option<&str> {
        match self.attribute(name).map(|attr| &attr.value) {
            Some(AttributeValue::String(value)) => Some(value.value.as_str()),
            _ => None,
        }
    }

    /// Set `name` to a string literal, appending the attribute when missing.
    ///
    /// Returns the span id of a replaced attribute so the caller can mark it
    /// for reprinting. New attributes are detached and need no marking.
    pub fn set_string_attribute(&mut self, name: &str, value: &str) -> Option<String> {
        if let Some(attr) = self.attribute_mut(name) {
            attr.value = AttributeValue::String(StringValue {
                value: value.to_string(),
                quote: '"',
            });
            return Some(attr.span.id.clone());
        }

        self.attributes.push(Attribute::Named(NamedAttribute {
            name: name.to_string(),
            value: AttributeValue::String(StringValue {
                value: value.to_string(),
                quote: '"',
            }),
            span: Span::detached(),
        }));
        None
    }

    /// Remove every named attribute matching `predicate`, returning how many went
    pub fn remove_attributes(&mut self, predicate: impl Fn(&str) -> bool) -> usize {
        let before = self.attributes.len();
        self.attributes.retain(|attr| match attr {
            Attribute::Named(named) => !predicate(&named.name),
            Attribute::Spread(_) => true,
        });
        before - self.attributes.len()
    }

    /// Text of the tag name, e.g. `div` or `Card.Header`
    pub fn tag(&self) -> &str {
        &self.name
    }
}
