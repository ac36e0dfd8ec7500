//! Serializes the DOM tree back to HTML text.

use crate::dom::dom_tree::{self, Handle, Node};
use std::fmt::Write;

const VOID_ELEMENTS: &[&str] = &[
    "meta", "img", "br", "hr", "input", "link", "area", "base", "col", "embed", "param", "source",
    "track", "wbr",
];

/// Elements whose text content is written without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
];

/// Outer markup of the document element, without the doctype.
pub fn serialize_document(document: &dom_tree::Document) -> String {
    let mut out = String::new();
    if let Some(root) = dom_tree::document_element(document) {
        write_tree(root, &mut out);
    }
    out
}

/// Pending serializer work; end tags are queued behind an element's children.
enum Step {
    Node { handle: Handle, raw_text: bool },
    EndTag(String),
}

fn write_tree(root: Handle, out: &mut String) {
    let mut stack = vec![Step::Node {
        handle: root,
        raw_text: false,
    }];
    while let Some(step) = stack.pop() {
        let (handle, raw_text) = match step {
            Step::EndTag(tag) => {
                // Writing to a String cannot fail.
                let _ = write!(out, "</{}>", tag);
                continue;
            }
            Step::Node { handle, raw_text } => (handle, raw_text),
        };
        let node = handle.borrow();
        match &*node {
            Node::DocumentRoot(root) => push_children(&mut stack, &root.children, false),
            Node::Element(elem) => {
                out.push('<');
                out.push_str(&elem.tag);
                for (k, v) in &elem.attributes {
                    let _ = write!(out, " {}=\"{}\"", k, escape(v, true));
                }
                out.push('>');

                if VOID_ELEMENTS.contains(&elem.tag.as_str()) {
                    continue;
                }
                stack.push(Step::EndTag(elem.tag.clone()));
                let raw = RAW_TEXT_ELEMENTS.contains(&elem.tag.as_str());
                push_children(&mut stack, &elem.children, raw);
            }
            Node::Text(text) if raw_text => out.push_str(text),
            Node::Text(text) => out.push_str(&escape(text, false)),
            Node::Comment(text) => {
                let _ = write!(out, "<!--{}-->", text);
            }
        }
    }
}

fn push_children(stack: &mut Vec<Step>, children: &[Handle], raw_text: bool) {
    stack.extend(children.iter().rev().map(|child| Step::Node {
        handle: child.clone(),
        raw_text,
    }));
}

/// Whether `name` serializes as exactly one attribute that reads back under
/// the same name.
pub fn is_valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && !name.chars().any(|c| {
            c.is_whitespace()
                || c.is_control()
                || matches!(c, '"' | '\'' | '>' | '/' | '=')
        })
}

/// Escapes text the way the HTML fragment serialization algorithm does.
fn escape(text: &str, attribute: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '\u{a0}' => escaped.push_str("&nbsp;"),
            '"' if attribute => escaped.push_str("&quot;"),
            '<' if !attribute => escaped.push_str("&lt;"),
            '>' if !attribute => escaped.push_str("&gt;"),
            c => escaped.push(c),
        }
    }
    escaped
}
