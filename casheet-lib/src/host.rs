//! The HTML capability the cascade runs against.
//!
//! The engine never touches markup itself: it asks an [`HtmlHost`] to parse
//! the document, find the elements a selector matches, set attributes on
//! them and serialize the result. [`Html5everHost`] is the bundled
//! implementation; tests can plug in anything else.

use crate::dom::dom_tree::{Document, Handle, Node};
use crate::error::CasError;
use crate::parser::{cas_html, html};
use crate::style::css_matcher;
use log::warn;

pub trait HtmlHost {
    type Document;
    type Element;

    /// The literal leading doctype of `html`, or `<!doctype html>`.
    fn extract_doctype(&self, html: &str) -> String;

    /// Builds an element tree. Must accept malformed markup.
    fn parse_fragment(&self, html: &str) -> Self::Document;

    /// Elements matching `selector` in document order.
    fn query_all(
        &self,
        document: &Self::Document,
        selector: &str,
    ) -> Result<Vec<Self::Element>, CasError>;

    /// Sets `name` to `value`. Hosts may skip names they cannot represent.
    fn set_attribute(&self, element: &Self::Element, name: &str, value: &str);

    /// Outer markup of the root element, without the doctype.
    fn serialize(&self, document: &Self::Document) -> String;
}

/// [`HtmlHost`] backed by html5ever and the crate's own selector matcher.
#[derive(Debug, Default, Clone, Copy)]
pub struct Html5everHost;

impl HtmlHost for Html5everHost {
    type Document = Document;
    type Element = Handle;

    fn extract_doctype(&self, html: &str) -> String {
        cas_html::extract_doctype(html)
    }

    fn parse_fragment(&self, html: &str) -> Document {
        cas_html::create_dom_tree(html)
    }

    fn query_all(&self, document: &Document, selector: &str) -> Result<Vec<Handle>, CasError> {
        css_matcher::select_all(document, selector)
    }

    /// HTML attribute names are lowercased, as the parser does. Names that
    /// would not read back as a single attribute are skipped with a warning.
    fn set_attribute(&self, element: &Handle, name: &str, value: &str) {
        if !html::is_valid_attribute_name(name) {
            warn!("skipping `{}`: not a valid attribute name", name);
            return;
        }
        if let Node::Element(ref mut elem) = *element.borrow_mut() {
            elem.set_attribute(&name.to_ascii_lowercase(), value);
        }
    }

    fn serialize(&self, document: &Document) -> String {
        html::serialize_document(document)
    }
}
