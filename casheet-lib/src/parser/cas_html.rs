//! This module contains functions and types for parsing HTML into a custom DOM tree.
//!
//! It uses html5ever as the HTML parser and builds a DOM tree defined in the
//! `crate::dom::dom_tree` module.

use crate::dom::dom_tree::{self, Handle, Node};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{
    interface::{ElemName, NodeOrText, QuirksMode, TreeSink},
    LocalName, Namespace, QualName,
};
use log::debug;
use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

/// Doctype used when the source carries none.
pub const DEFAULT_DOCTYPE: &str = "<!doctype html>";

/// Returns the literal leading `<!doctype ...>` of `html`, matched without
/// regard to case and after any leading whitespace, or [`DEFAULT_DOCTYPE`].
pub fn extract_doctype(html: &str) -> String {
    let trimmed = html.trim_start();
    let prefix = "<!doctype";
    let has_doctype = trimmed
        .get(..prefix.len())
        .map_or(false, |head| head.eq_ignore_ascii_case(prefix));
    if has_doctype {
        if let Some(end) = trimmed.find('>') {
            return trimmed[..=end].to_string();
        }
    }
    DEFAULT_DOCTYPE.to_string()
}

/// Creates a DOM tree from the provided HTML content.
///
/// Malformed markup is repaired the way browsers repair it; this never fails.
pub fn create_dom_tree(html_content: &str) -> dom_tree::Document {
    let tree_sink = CasTreeSink::new();
    html5ever::parse_document(tree_sink, Default::default()).one(html_content)
}

/// A custom TreeSink for building the DOM tree used by the parser.
pub struct CasTreeSink {
    document: dom_tree::Document,
    quirks_mode: RefCell<QuirksMode>,
}

impl CasTreeSink {
    pub fn new() -> Self {
        Self {
            document: dom_tree::new_document(),
            quirks_mode: RefCell::new(QuirksMode::NoQuirks),
        }
    }
}

impl Default for CasTreeSink {
    fn default() -> Self {
        Self::new()
    }
}

/// A simple implementation of the `ElemName` trait for our elements.
#[derive(Debug)]
pub struct CasElemName {
    ns: Namespace,
    local: LocalName,
}

impl ElemName for CasElemName {
    fn local_name(&self) -> &LocalName {
        &self.local
    }

    fn ns(&self) -> &Namespace {
        &self.ns
    }
}

fn set_parent(child: &Handle, parent: &Handle) {
    if let Node::Element(ref mut elem) = *child.borrow_mut() {
        elem.parent = Some(Rc::downgrade(parent));
    }
}

/// Appends to `parent`, merging adjacent text.
fn append_child(parent: &Handle, child: NodeOrText<Handle>) {
    let mut parent_borrow = parent.borrow_mut();
    let Some(children) = parent_borrow.children_mut() else {
        // Text and comment nodes cannot have children.
        return;
    };
    match child {
        NodeOrText::AppendText(text) => {
            if let Some(last) = children.last() {
                if let Node::Text(ref mut existing) = *last.borrow_mut() {
                    existing.push_str(&text);
                    return;
                }
            }
            children.push(Rc::new(RefCell::new(Node::Text(text.to_string()))));
        }
        NodeOrText::AppendNode(node) => {
            set_parent(&node, parent);
            children.push(node);
        }
    }
}

/// Detaches `target` from its parent, if it has one.
fn detach(target: &Handle) {
    let Some(parent) = dom_tree::parent_of(target) else {
        return;
    };
    if let Some(children) = parent.borrow_mut().children_mut() {
        children.retain(|c| !Rc::ptr_eq(c, target));
    }
    if let Node::Element(ref mut elem) = *target.borrow_mut() {
        elem.parent = None;
    }
}

impl TreeSink for CasTreeSink {
    type Handle = Handle;
    type Output = dom_tree::Document;
    type ElemName<'a>
        = CasElemName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self.document
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        debug!("HTML parse error: {}", msg);
    }

    fn get_document(&self) -> Self::Handle {
        self.document.root.clone()
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        match *target.borrow() {
            Node::Element(ref elem) => CasElemName {
                ns: elem.qual_name.ns.clone(),
                local: elem.qual_name.local.clone(),
            },
            _ => panic!("elem_name called on non-element node"),
        }
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<html5ever::Attribute>,
        _flags: html5ever::interface::ElementFlags,
    ) -> Self::Handle {
        let mut element = dom_tree::ElementNode::new(name.local.to_string(), name);
        for attr in attrs {
            element.set_attribute(&attr.name.local, &attr.value);
        }
        Rc::new(RefCell::new(Node::Element(element)))
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        Rc::new(RefCell::new(Node::Comment(text.to_string())))
    }

    /// Processing instructions only occur in XML; keep them as comments.
    fn create_pi(&self, target: StrTendril, data: StrTendril) -> Self::Handle {
        Rc::new(RefCell::new(Node::Comment(format!("?{} {}?", target, data))))
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        append_child(parent, child);
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        if dom_tree::parent_of(element).is_some() {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    ) {
        *self.document.doctype.borrow_mut() = Some(dom_tree::Doctype {
            name: name.to_string(),
            public_id: public_id.to_string(),
            system_id: system_id.to_string(),
        });
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        target.clone()
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        Rc::ptr_eq(x, y)
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        *self.quirks_mode.borrow_mut() = mode;
    }

    fn append_before_sibling(&self, sibling: &Self::Handle, child: NodeOrText<Self::Handle>) {
        let Some(parent) = dom_tree::parent_of(sibling) else {
            debug!("append_before_sibling on a detached node");
            return;
        };
        let mut parent_borrow = parent.borrow_mut();
        let Some(children) = parent_borrow.children_mut() else {
            return;
        };
        let Some(index) = children.iter().position(|c| Rc::ptr_eq(c, sibling)) else {
            return;
        };

        let node = match child {
            NodeOrText::AppendText(text) => {
                if index > 0 {
                    if let Node::Text(ref mut existing) = *children[index - 1].borrow_mut() {
                        existing.push_str(&text);
                        return;
                    }
                }
                Rc::new(RefCell::new(Node::Text(text.to_string())))
            }
            NodeOrText::AppendNode(node) => {
                set_parent(&node, &parent);
                node
            }
        };
        children.insert(index, node);
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<html5ever::Attribute>) {
        if let Node::Element(ref mut elem) = *target.borrow_mut() {
            for attr in attrs {
                if elem.get_attribute(&attr.name.local).is_none() {
                    elem.set_attribute(&attr.name.local, &attr.value);
                }
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        detach(target);
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let moved = match node.borrow_mut().children_mut() {
            Some(children) => std::mem::take(children),
            None => return,
        };
        for child in moved {
            append_child(new_parent, NodeOrText::AppendNode(child));
        }
    }
}
