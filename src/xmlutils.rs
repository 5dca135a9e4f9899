use std::collections::BTreeMap;
use xmltree::{Element, XMLNode};

use crate::types::ConnectionRecord;

/// Child elements of `el` in document order, skipping text/comment nodes.
pub fn child_elements(el: &Element) -> impl Iterator<Item = &Element> {
    el.children.iter().filter_map(|n| match n {
        XMLNode::Element(e) => Some(e),
        _ => None,
    })
}

/// Trimmed text content of the direct child named `name`, if non-empty.
pub fn child_text(el: &Element, name: &str) -> Option<String> {
    el.get_child(name)
        .and_then(|c| c.get_text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Depth-first search for the first element named `name`; returns its trimmed text.
pub fn find_text(el: &Element, name: &str) -> Option<String> {
    if el.name == name {
        return el.get_text().map(|t| t.trim().to_string());
    }
    for child in child_elements(el) {
        if let Some(t) = find_text(child, name) {
            return Some(t);
        }
    }
    None
}

/// Extract every node that looks like a connection entry.
///
/// A node qualifies when any of its child element names appears in `hints`;
/// qualifying nodes are flattened into a field map (child name -> trimmed text)
/// and their subtrees are not descended further. Mirrors the loose structure of
/// firmware listing responses, which nest entries at unpredictable depths.
pub fn collect_connection_records(el: &Element, hints: &[&str]) -> Vec<ConnectionRecord> {
    let mut out = Vec::new();
    collect_into(el, hints, &mut out);
    out
}

fn collect_into(el: &Element, hints: &[&str], out: &mut Vec<ConnectionRecord>) {
    let is_record = child_elements(el).any(|c| hints.contains(&c.name.as_str()));
    if is_record {
        let mut fields = BTreeMap::new();
        for c in child_elements(el) {
            let text = c
                .get_text()
                .map(|t| t.trim().to_string())
                .unwrap_or_default();
            fields.insert(c.name.clone(), text);
        }
        out.push(ConnectionRecord::new(fields));
        return;
    }
    for c in child_elements(el) {
        collect_into(c, hints, out);
    }
}
