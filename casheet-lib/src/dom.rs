use html5ever::QualName;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub mod dom_tree {
    use super::*;

    pub type Handle = Rc<RefCell<Node>>;
    pub type WeakHandle = Weak<RefCell<Node>>;

    #[derive(Debug, Clone)]
    pub enum Node {
        DocumentRoot(DocumentRootNode),
        Element(ElementNode),
        Text(String),
        Comment(String),
    }

    #[derive(Debug, Clone)]
    pub struct DocumentRootNode {
        pub children: Vec<Handle>,
    }

    #[derive(Debug, Clone)]
    pub struct ElementNode {
        pub tag: String,
        pub qual_name: QualName,
        /// Attributes in source order; names are unique.
        pub attributes: Vec<(String, String)>,
        pub children: Vec<Handle>,
        pub parent: Option<WeakHandle>,
    }

    #[derive(Debug)]
    pub struct Document {
        pub root: Handle,
        pub doctype: RefCell<Option<Doctype>>,
    }

    #[derive(Debug)]
    pub struct Doctype {
        pub name: String,
        pub public_id: String,
        pub system_id: String,
    }

    impl Node {
        pub fn children(&self) -> Option<&Vec<Handle>> {
            match self {
                Node::DocumentRoot(root) => Some(&root.children),
                Node::Element(elem) => Some(&elem.children),
                Node::Text(_) | Node::Comment(_) => None,
            }
        }

        pub fn children_mut(&mut self) -> Option<&mut Vec<Handle>> {
            match self {
                Node::DocumentRoot(root) => Some(&mut root.children),
                Node::Element(elem) => Some(&mut elem.children),
                Node::Text(_) | Node::Comment(_) => None,
            }
        }

        pub fn as_element(&self) -> Option<&ElementNode> {
            match self {
                Node::Element(elem) => Some(elem),
                _ => None,
            }
        }

        pub fn is_element(&self) -> bool {
            matches!(self, Node::Element(_))
        }
    }

    impl DocumentRootNode {
        pub fn new() -> Self {
            DocumentRootNode {
                children: Vec::new(),
            }
        }
    }

    impl Default for DocumentRootNode {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ElementNode {
        pub fn new(tag: String, qual_name: QualName) -> Self {
            ElementNode {
                tag,
                qual_name,
                attributes: Vec::new(),
                children: Vec::new(),
                parent: None,
            }
        }

        pub fn get_attribute(&self, name: &str) -> Option<&str> {
            self.attributes
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        }

        /// Replaces the value of `name` in place, or appends it.
        pub fn set_attribute(&mut self, name: &str, value: &str) {
            match self.attributes.iter_mut().find(|(k, _)| k == name) {
                Some((_, existing)) => *existing = value.to_string(),
                None => self.attributes.push((name.to_string(), value.to_string())),
            }
        }
    }

    impl Drop for Document {
        /// Frees the tree with a work list instead of one stack frame per
        /// nesting level. Subtrees still referenced elsewhere are left intact.
        fn drop(&mut self) {
            if Rc::strong_count(&self.root) != 1 {
                return;
            }
            let mut pending = vec![self.root.clone()];
            while let Some(node) = pending.pop() {
                // One count for `pending`; the root also has `self.root`.
                let owners = if Rc::ptr_eq(&node, &self.root) { 2 } else { 1 };
                if Rc::strong_count(&node) != owners {
                    continue;
                }
                if let Some(children) = node.borrow_mut().children_mut() {
                    pending.append(children);
                }
            }
        }
    }

    pub fn new_document() -> Document {
        Document {
            root: Rc::new(RefCell::new(Node::DocumentRoot(DocumentRootNode::new()))),
            doctype: RefCell::new(None),
        }
    }

    /// The first element child of the document root, usually `<html>`.
    pub fn document_element(document: &Document) -> Option<Handle> {
        let root = document.root.borrow();
        root.children()?
            .iter()
            .find(|child| child.borrow().is_element())
            .cloned()
    }

    /// Parent of an element node. Text and comment nodes have none recorded.
    pub fn parent_of(node: &Handle) -> Option<Handle> {
        match &*node.borrow() {
            Node::Element(elem) => elem.parent.as_ref().and_then(Weak::upgrade),
            _ => None,
        }
    }

    /// Element children of `node` in order.
    pub fn element_children(node: &Handle) -> Vec<Handle> {
        node.borrow()
            .children()
            .map(|children| {
                children
                    .iter()
                    .filter(|child| child.borrow().is_element())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}
