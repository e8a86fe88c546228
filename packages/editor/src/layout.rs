//! Splicing of markup children by filtered index.
//!
//! Positional edits count only element and fragment children. Text and
//! expression children stay interleaved in the underlying list, and
//! whitespace runs that contain a line break are treated as layout: an
//! inserted element gets its own copy of the separator in front of its
//! neighbour and a removed element takes one separator with it.

use tessera_parser::ast::JsxChild;

/// Raw positions of element and fragment children
pub fn node_positions(children: &[JsxChild]) -> Vec<usize> {
    children
        .iter()
        .enumerate()
        .filter(|(_, child)| child.is_node())
        .map(|(i, _)| i)
        .collect()
}

pub fn node_count(children: &[JsxChild]) -> usize {
    children.iter().filter(|child| child.is_node()).count()
}

fn separator_before(children: &[JsxChild], raw: usize) -> Option<JsxChild> {
    let previous = children.get(raw.checked_sub(1)?)?;
    previous.is_line_separator().then(|| previous.clone())
}

/// Insert before the `index`-th node, or append when `index` is past the end
pub fn insert_node(children: &mut Vec<JsxChild>, index: usize, child: JsxChild) {
    let positions = node_positions(children);
    match positions.get(index) {
        Some(&raw) => match separator_before(children, raw) {
            Some(separator) => {
                children.insert(raw, separator);
                children.insert(raw, child);
            }
            None => children.insert(raw, child),
        },
        None => append_node(children, child),
    }
}

pub fn append_node(children: &mut Vec<JsxChild>, child: JsxChild) {
    let trailing = children.last().map_or(false, JsxChild::is_line_separator);
    if !trailing {
        children.push(child);
        return;
    }

    let end = children.len() - 1;
    let separator = node_positions(children)
        .last()
        .and_then(|&raw| separator_before(children, raw));
    match separator {
        Some(separator) => {
            children.insert(end, child);
            children.insert(end, separator);
        }
        None => children.insert(end, child),
    }
}

pub fn prepend_node(children: &mut Vec<JsxChild>, child: JsxChild) {
    match children.first() {
        Some(first) if first.is_line_separator() => {
            let separator = first.clone();
            children.insert(1, separator);
            children.insert(1, child);
        }
        _ => children.insert(0, child),
    }
}

/// Remove the `index`-th node together with one adjoining line separator
pub fn remove_node(children: &mut Vec<JsxChild>, index: usize) -> Option<JsxChild> {
    let raw = *node_positions(children).get(index)?;
    let removed = children.remove(raw);

    if raw > 0 && children[raw - 1].is_line_separator() {
        children.remove(raw - 1);
    } else if children.get(raw).map_or(false, JsxChild::is_line_separator)
        && raw + 1 < children.len()
    {
        children.remove(raw);
    }
    Some(removed)
}
