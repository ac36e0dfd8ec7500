use std::collections::HashMap;

use crate::dom::dom_tree::{Document, ElementNode, Handle, Node};

/// Lookup tables over the elements of a document.
///
/// Entries are positions into `elements`, which is in document order, so
/// any candidate set can be put back into document order by sorting.
/// The indices are a snapshot: rebuild them after attributes change.
#[derive(Debug, Default)]
pub struct DomIndices {
    /// Every element in document (pre-)order.
    pub elements: Vec<Handle>,
    /// Maps an element's "id" attribute to the elements carrying it.
    pub id_map: HashMap<String, Vec<usize>>,
    /// Maps a class name to all elements that have that class.
    pub class_map: HashMap<String, Vec<usize>>,
    /// Maps a lowercase tag name (e.g., "div") to all elements with that tag.
    pub tag_map: HashMap<String, Vec<usize>>,
}

impl DomIndices {
    /// Build the indices for the entire document.
    pub fn build(document: &Document) -> Self {
        let mut indices = DomIndices::default();
        indices.traverse(&document.root);
        indices
    }

    /// Pre-order walk with an explicit stack, so nesting depth is bounded
    /// by the heap rather than the call stack.
    fn traverse(&mut self, root: &Handle) {
        let mut stack = vec![root.clone()];
        while let Some(node) = stack.pop() {
            let node_ref = node.borrow();
            if let Node::Element(elem) = &*node_ref {
                self.insert(node.clone(), elem);
            }
            if let Some(children) = node_ref.children() {
                stack.extend(children.iter().rev().cloned());
            }
        }
    }

    fn insert(&mut self, handle: Handle, elem: &ElementNode) {
        let position = self.elements.len();
        self.elements.push(handle);

        self.tag_map
            .entry(elem.tag.to_lowercase())
            .or_default()
            .push(position);
        if let Some(id_value) = elem.get_attribute("id") {
            self.id_map
                .entry(id_value.to_string())
                .or_default()
                .push(position);
        }
        if let Some(class_attr) = elem.get_attribute("class") {
            for class in class_attr.split_whitespace() {
                let entries = self.class_map.entry(class.to_string()).or_default();
                // `class="a a"` lists the element once.
                if entries.last() != Some(&position) {
                    entries.push(position);
                }
            }
        }
    }

    /// Positions of the elements carrying `id`.
    pub fn by_id(&self, id: &str) -> &[usize] {
        self.id_map.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn by_class(&self, class: &str) -> &[usize] {
        self.class_map.get(class).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn by_tag(&self, tag: &str) -> &[usize] {
        self.tag_map
            .get(&tag.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::cas_html::create_dom_tree;

    #[test]
    fn test_indices() {
        let document = create_dom_tree(
            r#"<div id="a" class="x y"><p class="x x">1</p></div><p id="a">2</p>"#,
        );
        let indices = DomIndices::build(&document);
        // html, head, body, div, p, p
        assert_eq!(indices.elements.len(), 6);
        assert_eq!(indices.by_tag("P"), &[4, 5]);
        assert_eq!(indices.by_id("a"), &[3, 5]);
        assert_eq!(indices.by_class("x"), &[3, 4]);
        assert!(indices.by_class("missing").is_empty());
    }

    #[test]
    fn test_deeply_nested_document() {
        let depth = 10_000;
        let document = create_dom_tree(&"<div>".repeat(depth));
        let indices = DomIndices::build(&document);
        assert_eq!(indices.by_tag("div").len(), depth);
        // Positions follow nesting order.
        assert_eq!(indices.by_tag("div")[0], 3);
        assert_eq!(indices.elements.len(), depth + 3);
    }
}
