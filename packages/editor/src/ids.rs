//! # Element Identity
//!
//! Every non-fragment element in a source file carries a `data-oid`
//! attribute that links rendered elements back to their source location.
//! `inject` adds missing identities (and repairs duplicates), `strip`
//! removes them together with transient editor attributes.

use std::collections::HashSet;
use std::ops::ControlFlow;

use tessera_common::{walk_element, walk_element_mut, walk_node_mut, Visitor, VisitorMut};
use tessera_parser::ast::{AttributeValue, Element, JsxNode, Module};
use tessera_parser::{ParseResult, Printer};

/// Attribute holding an element's identity
pub const OID_ATTRIBUTE: &str = "data-oid";

/// Prefix of transient editor attributes removed on strip
pub const RESERVED_PREFIX: &str = "data-tessera-";

/// Disambiguates elements that were moved or inserted by the editor
pub const MOVE_KEY_ATTRIBUTE: &str = "data-tessera-move-key";

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789-._:";
const ID_LENGTH: usize = 7;

/// Generate a random identity not present in `taken`
pub fn generate_oid(taken: &HashSet<String>) -> String {
    loop {
        let id = random_id();
        if !taken.contains(&id) {
            return id;
        }
    }
}

fn random_id() -> String {
    // Largest multiple of the alphabet size that fits in a byte
    let limit = (256 / ALPHABET.len() * ALPHABET.len()) as u8;
    let mut id = String::with_capacity(ID_LENGTH);
    let mut buf = [0u8; 16];

    while id.len() < ID_LENGTH {
        if getrandom::getrandom(&mut buf).is_err() {
            fallback_bytes(&mut buf);
        }
        for &byte in &buf {
            if byte < limit && id.len() < ID_LENGTH {
                id.push(ALPHABET[byte as usize % ALPHABET.len()] as char);
            }
        }
    }
    id
}

/// Used only when the OS random source is unavailable
fn fallback_bytes(buf: &mut [u8]) {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    for chunk in buf.chunks_mut(8) {
        let mut hasher = RandomState::new().build_hasher();
        hasher.write_usize(chunk.as_ptr() as usize);
        let bytes = hasher.finish().to_le_bytes();
        chunk.copy_from_slice(&bytes[..chunk.len()]);
    }
}

/// Identity of an element, when it is a string literal
pub fn element_oid(element: &Element) -> Option<&str> {
    element.string_attribute(OID_ATTRIBUTE)
}

/// Every string identity used in a module
pub fn collect_oids(module: &Module) -> HashSet<String> {
    struct Collector(HashSet<String>);

    impl Visitor for Collector {
        fn visit_element(&mut self, element: &Element) -> ControlFlow<()> {
            if let Some(oid) = element_oid(element) {
                self.0.insert(oid.to_string());
            }
            walk_element(self, element)
        }
    }

    let mut collector = Collector(HashSet::new());
    let _ = collector.visit_module(module);
    collector.0
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InjectReport {
    /// Elements that received a new identity
    pub added: usize,
    /// Duplicate identities that were replaced
    pub reassigned: usize,
    /// Span ids the printer must regenerate
    pub dirty: Vec<String>,
}

impl InjectReport {
    pub fn changed(&self) -> bool {
        self.added > 0 || self.reassigned > 0
    }
}

struct Injector<'a> {
    taken: &'a mut HashSet<String>,
    claimed: HashSet<String>,
    report: InjectReport,
}

impl Injector<'_> {
    fn identify(&mut self, element: &mut Element) {
        if element.is_fragment() {
            return;
        }

        let existing = match element.attribute(OID_ATTRIBUTE).map(|attr| &attr.value) {
            Some(AttributeValue::String(value)) => Some(value.value.clone()),
            // Computed identities are left alone
            Some(_) => return,
            None => None,
        };

        match existing {
            Some(oid) if self.claimed.insert(oid.clone()) => {
                self.taken.insert(oid);
            }
            Some(oid) => {
                let fresh = generate_oid(self.taken);
                tracing::debug!(duplicate = %oid, replacement = %fresh, "reassigning identity");
                self.taken.insert(fresh.clone());
                self.claimed.insert(fresh.clone());
                if let Some(attr_id) = element.set_string_attribute(OID_ATTRIBUTE, &fresh) {
                    self.report.dirty.push(attr_id);
                }
                self.report.reassigned += 1;
            }
            None => {
                let fresh = generate_oid(self.taken);
                self.taken.insert(fresh.clone());
                self.claimed.insert(fresh.clone());
                element.set_string_attribute(OID_ATTRIBUTE, &fresh);
                self.report.added += 1;
            }
        }
    }
}

impl VisitorMut for Injector<'_> {
    fn visit_element_mut(&mut self, element: &mut Element) -> ControlFlow<()> {
        self.identify(element);
        walk_element_mut(self, element)
    }
}

/// Give every non-fragment element an identity.
///
/// Existing identities are kept; when the same identity appears twice the
/// first occurrence keeps it and later ones get fresh ids.
pub fn inject(module: &mut Module) -> InjectReport {
    let mut taken = collect_oids(module);
    let mut injector = Injector {
        taken: &mut taken,
        claimed: HashSet::new(),
        report: InjectReport::default(),
    };
    let _ = injector.visit_module_mut(module);
    injector.report
}

/// Inject identities into a detached node, avoiding `taken` and adding the
/// new ids to it.
///
/// Identities the node carries that are already in `taken` are replaced, so
/// a pasted copy of an existing element never shares its id.
pub fn inject_node(node: &mut JsxNode, taken: &mut HashSet<String>) -> InjectReport {
    let claimed = taken.clone();
    let mut injector = Injector {
        taken,
        claimed,
        report: InjectReport::default(),
    };
    let _ = walk_node_mut(&mut injector, node);
    injector.report
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StripReport {
    pub removed: usize,
    pub dirty: Vec<String>,
}

fn is_editor_attribute(name: &str) -> bool {
    name == OID_ATTRIBUTE || name.starts_with(RESERVED_PREFIX)
}

struct Stripper(StripReport);

impl VisitorMut for Stripper {
    fn visit_element_mut(&mut self, element: &mut Element) -> ControlFlow<()> {
        let removed = element.remove_attributes(is_editor_attribute);
        if removed > 0 {
            self.0.removed += removed;
            self.0.dirty.push(element.span.id.clone());
        }
        walk_element_mut(self, element)
    }
}

/// Remove identities and transient editor attributes from every element
pub fn strip(module: &mut Module) -> StripReport {
    let mut stripper = Stripper(StripReport::default());
    let _ = stripper.visit_module_mut(module);
    stripper.0
}

/// Source text with every editor attribute removed
pub fn strip_source(source: &str) -> ParseResult<String> {
    let mut module = tessera_parser::parse(source)?;
    let report = strip(&mut module);
    if report.removed == 0 {
        return Ok(source.to_string());
    }

    let mut printer = Printer::new(source);
    printer.mark_dirty_many(report.dirty);
    Ok(printer.print(&module))
}

/// Source text with identities injected, or `None` when nothing changed
pub fn inject_source(source: &str, path: &str) -> ParseResult<Option<String>> {
    let mut module = tessera_parser::parse_with_path(source, path)?;
    let report = inject(&mut module);
    if !report.changed() {
        return Ok(None);
    }

    let mut printer = Printer::new(source);
    printer.mark_dirty_many(report.dirty);
    Ok(Some(printer.print(&module)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_parser::parse;

    #[test]
    fn test_generate_oid_alphabet_and_length() {
        let taken = HashSet::new();
        for _ in 0..200 {
            let id = generate_oid(&taken);
            assert_eq!(id.len(), ID_LENGTH);
            assert!(id.bytes().all(|b| ALPHABET.contains(&b)), "bad id {}", id);
        }
    }

    #[test]
    fn test_inject_adds_last_attribute() {
        let source = "const a = <div className=\"x\"><span /></div>;";
        let output = inject_source(source, "/a.tsx").unwrap().unwrap();

        let module = parse(&output).unwrap();
        let oids = collect_oids(&module);
        assert_eq!(oids.len(), 2);
        assert!(output.starts_with("const a = <div className=\"x\" data-oid=\""));
    }

    #[test]
    fn test_inject_skips_fragments() {
        let source = "const a = <><Fragment><p /></Fragment><React.Fragment /></>;";
        let output = inject_source(source, "/a.tsx").unwrap().unwrap();
        assert!(output.contains("<Fragment>"));
        assert!(output.contains("<React.Fragment />"));
        assert_eq!(output.matches(OID_ATTRIBUTE).count(), 1);
    }

    #[test]
    fn test_inject_repairs_duplicates() {
        let source = "const a = <ul><li data-oid=\"same\" /><li data-oid=\"same\" /></ul>;";
        let mut module = parse(source).unwrap();
        let report = inject(&mut module);
        assert_eq!(report.added, 1);
        assert_eq!(report.reassigned, 1);

        let mut printer = Printer::new(source);
        printer.mark_dirty_many(report.dirty);
        let output = printer.print(&module);
        assert!(output.contains("<li data-oid=\"same\" />"));
        assert_eq!(output.matches("\"same\"").count(), 1);
    }

    #[test]
    fn test_inject_node_avoids_taken_identities() {
        let mut node = tessera_parser::parse_markup("<li data-oid=\"keep\"><b data-oid=\"new\" /></li>").unwrap();
        let mut taken: HashSet<String> = ["keep".to_string()].into_iter().collect();
        let report = inject_node(&mut node, &mut taken);
        assert_eq!(report.reassigned, 1);

        let JsxNode::Element(element) = &node else {
            panic!("expected an element");
        };
        let oid = element_oid(element).unwrap();
        assert_ne!(oid, "keep");
        assert!(taken.contains(oid));
        assert!(taken.contains("new"));
    }

    #[test]
    fn test_inject_source_unchanged() {
        let source = "const a = <div data-oid=\"abc\" />;";
        assert_eq!(inject_source(source, "/a.tsx").unwrap(), None);
    }

    #[test]
    fn test_strip_source() {
        let source = "const a = <div data-oid=\"abc\" className=\"x\" data-tessera-move-key=\"k\">\n  <img data-oid=\"d\" />\n</div>;";
        assert_eq!(
            strip_source(source).unwrap(),
            "const a = <div className=\"x\">\n  <img />\n</div>;"
        );
    }
}
