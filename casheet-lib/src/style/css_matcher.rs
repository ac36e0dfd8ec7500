use crate::dom::dom_tree::{self, Document, Handle, Node};
use crate::error::CasError;
use crate::parser::dom_indices::DomIndices;
use std::collections::BTreeSet;
use std::iter::Peekable;
use std::str::Chars;

/// ------------------------------
/// 1. Selector Parsing
/// ------------------------------

/// Supported attribute selector operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeOperator {
    /// [attr="value"]
    Exact,
    /// [attr~="value"]
    Includes,
    /// [attr|="value"]
    DashMatch,
    /// [attr^="value"]
    Prefix,
    /// [attr$="value"]
    Suffix,
    /// [attr*="value"]
    Substring,
}

/// Represents one attribute condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    pub name: String,
    /// Operator and expected value; `None` only checks existence.
    pub condition: Option<(AttributeOperator, String)>,
}

/// Structural pseudo-classes the matcher understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoClass {
    FirstChild,
    LastChild,
    OnlyChild,
    Root,
    Empty,
}

/// A compound selector: an optional tag plus ids, classes, attribute
/// conditions and pseudo-classes that must all hold.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompoundSelector {
    /// `None` for `*` or when no type selector was written.
    pub tag: Option<String>,
    pub ids: Vec<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeSelector>,
    pub pseudo_classes: Vec<PseudoClass>,
}

/// A complex selector composed of a key compound selector and a list of ancestor parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    pub key: CompoundSelector,
    /// Ancestors with their combinators, in right-to-left order.
    pub ancestors: Vec<(Combinator, CompoundSelector)>,
}

/// Supported combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Descendant combinator (a space).
    Descendant,
    /// Child combinator (`>`).
    Child,
    /// Adjacent sibling combinator (`+`).
    AdjacentSibling,
    /// General sibling combinator (`~`).
    GeneralSibling,
}

type Input<'a> = Peekable<Chars<'a>>;

/// Parse a selector list such as `"a, div.red > p#header"`.
pub fn parse_selector_list(selector: &str) -> Result<Vec<ComplexSelector>, CasError> {
    split_selector_list(selector)
        .into_iter()
        .map(|part| {
            parse_complex_selector(part)
                .map_err(|reason| CasError::invalid_selector(selector, reason))
        })
        .collect()
}

/// Splits on commas that are not inside `[...]` or quotes.
fn split_selector_list(selector: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in selector.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&selector[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&selector[start..]);
    parts
}

/// Parse one complex selector, e.g. `"div.red > p#header + span.foo"`.
pub fn parse_complex_selector(selector: &str) -> Result<ComplexSelector, String> {
    let mut chars = selector.chars().peekable();
    let mut compounds: Vec<CompoundSelector> = Vec::new();
    let mut combinators: Vec<Combinator> = Vec::new();
    let mut pending: Option<Combinator> = None;

    loop {
        skip_whitespace(&mut chars);
        let Some(&ch) = chars.peek() else {
            break;
        };
        let explicit = match ch {
            '>' => Some(Combinator::Child),
            '+' => Some(Combinator::AdjacentSibling),
            '~' => Some(Combinator::GeneralSibling),
            _ => None,
        };
        if let Some(combinator) = explicit {
            if compounds.is_empty() || pending.is_some() {
                return Err(format!("unexpected combinator `{}`", ch));
            }
            pending = Some(combinator);
            chars.next();
            continue;
        }
        if !compounds.is_empty() {
            combinators.push(pending.take().unwrap_or(Combinator::Descendant));
        }
        compounds.push(parse_compound(&mut chars)?);
    }

    if pending.is_some() {
        return Err("selector ends with a combinator".to_string());
    }
    let key = compounds.pop().ok_or_else(|| "empty selector".to_string())?;
    let ancestors = combinators.into_iter().zip(compounds).rev().collect();
    Ok(ComplexSelector { key, ancestors })
}

/// Parse a compound selector, e.g. `div.red#header[disabled][data-type~="main"]`.
/// Stops at whitespace or a combinator.
fn parse_compound(chars: &mut Input<'_>) -> Result<CompoundSelector, String> {
    let mut compound = CompoundSelector::default();
    let mut universal = false;

    if let Some(&ch) = chars.peek() {
        if ch == '*' {
            chars.next();
            universal = true;
        } else if is_ident_char(ch) {
            compound.tag = Some(read_ident(chars, "type selector")?);
        }
    }

    while let Some(&ch) = chars.peek() {
        match ch {
            '#' => {
                chars.next();
                compound.ids.push(read_ident(chars, "id selector")?);
            }
            '.' => {
                chars.next();
                compound.classes.push(read_ident(chars, "class selector")?);
            }
            '[' => {
                chars.next();
                compound.attributes.push(parse_attribute(chars)?);
            }
            ':' => {
                chars.next();
                compound.pseudo_classes.push(parse_pseudo_class(chars)?);
            }
            c if c.is_whitespace() || c == '>' || c == '+' || c == '~' => break,
            c => return Err(format!("unexpected character `{}`", c)),
        }
    }

    if !universal && compound == CompoundSelector::default() {
        return Err("expected a selector".to_string());
    }
    Ok(compound)
}

fn parse_attribute(chars: &mut Input<'_>) -> Result<AttributeSelector, String> {
    skip_whitespace(chars);
    // HTML attribute names are stored lowercased.
    let name = read_ident(chars, "attribute name")?.to_ascii_lowercase();
    skip_whitespace(chars);

    let operator = match chars.next() {
        Some(']') => {
            return Ok(AttributeSelector {
                name,
                condition: None,
            })
        }
        Some('=') => AttributeOperator::Exact,
        Some(op @ ('~' | '|' | '^' | '$' | '*')) => {
            if chars.next() != Some('=') {
                return Err(format!("expected `=` after `{}`", op));
            }
            match op {
                '~' => AttributeOperator::Includes,
                '|' => AttributeOperator::DashMatch,
                '^' => AttributeOperator::Prefix,
                '$' => AttributeOperator::Suffix,
                _ => AttributeOperator::Substring,
            }
        }
        Some(c) => return Err(format!("unexpected `{}` in attribute selector", c)),
        None => return Err("unterminated attribute selector".to_string()),
    };

    skip_whitespace(chars);
    let value = match chars.peek() {
        Some(&q) if q == '"' || q == '\'' => {
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next() {
                    Some(c) if c == q => break,
                    Some(c) => value.push(c),
                    None => return Err("unterminated string in attribute selector".to_string()),
                }
            }
            value
        }
        _ => read_ident(chars, "attribute value")?,
    };
    skip_whitespace(chars);
    // Case-sensitivity flags are accepted and ignored.
    if let Some('i' | 's' | 'I' | 'S') = chars.peek().copied() {
        chars.next();
        skip_whitespace(chars);
    }
    if chars.next() != Some(']') {
        return Err("unterminated attribute selector".to_string());
    }
    Ok(AttributeSelector {
        name,
        condition: Some((operator, value)),
    })
}

fn parse_pseudo_class(chars: &mut Input<'_>) -> Result<PseudoClass, String> {
    if chars.peek() == Some(&':') {
        return Err("pseudo-elements are not supported".to_string());
    }
    let name = read_ident(chars, "pseudo-class")?;
    match name.to_ascii_lowercase().as_str() {
        "first-child" => Ok(PseudoClass::FirstChild),
        "last-child" => Ok(PseudoClass::LastChild),
        "only-child" => Ok(PseudoClass::OnlyChild),
        "root" => Ok(PseudoClass::Root),
        "empty" => Ok(PseudoClass::Empty),
        other => Err(format!("unsupported pseudo-class `:{}`", other)),
    }
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii()
}

fn read_ident(chars: &mut Input<'_>, what: &str) -> Result<String, String> {
    let mut ident = String::new();
    while let Some(&ch) = chars.peek() {
        if !is_ident_char(ch) {
            break;
        }
        ident.push(ch);
        chars.next();
    }
    if ident.is_empty() {
        Err(format!("expected {}", what))
    } else {
        Ok(ident)
    }
}

fn skip_whitespace(chars: &mut Input<'_>) {
    while chars.peek().map_or(false, |c| c.is_whitespace()) {
        chars.next();
    }
}

/// ------------------------------
/// 2. Selector Matching
/// ------------------------------

/// Returns true if the element behind `node` matches the CompoundSelector.
pub fn matches_compound(node: &Handle, compound: &CompoundSelector) -> bool {
    let node_ref = node.borrow();
    let Some(elem) = node_ref.as_element() else {
        return false;
    };

    if let Some(ref tag) = compound.tag {
        if !elem.tag.eq_ignore_ascii_case(tag) {
            return false;
        }
    }
    if compound
        .ids
        .iter()
        .any(|id| elem.get_attribute("id") != Some(id.as_str()))
    {
        return false;
    }
    if !compound.classes.is_empty() {
        let class_attr = elem.get_attribute("class").unwrap_or_default();
        let elem_classes = class_attr.split_whitespace();
        if !compound
            .classes
            .iter()
            .all(|class| elem_classes.clone().any(|c| c == class.as_str()))
        {
            return false;
        }
    }
    for attr_sel in &compound.attributes {
        let Some(actual) = elem.get_attribute(&attr_sel.name) else {
            return false;
        };
        if let Some((operator, expected)) = &attr_sel.condition {
            if !matches_attribute(actual, operator, expected) {
                return false;
            }
        }
    }
    drop(node_ref);

    compound
        .pseudo_classes
        .iter()
        .all(|pseudo| matches_pseudo_class(node, *pseudo))
}

fn matches_attribute(actual: &str, operator: &AttributeOperator, expected: &str) -> bool {
    match operator {
        AttributeOperator::Exact => actual == expected,
        AttributeOperator::Includes => actual.split_whitespace().any(|word| word == expected),
        AttributeOperator::DashMatch => {
            actual == expected
                || actual
                    .strip_prefix(expected)
                    .map_or(false, |rest| rest.starts_with('-'))
        }
        // An empty expected value never matches for the substring operators.
        AttributeOperator::Prefix => !expected.is_empty() && actual.starts_with(expected),
        AttributeOperator::Suffix => !expected.is_empty() && actual.ends_with(expected),
        AttributeOperator::Substring => !expected.is_empty() && actual.contains(expected),
    }
}

fn matches_pseudo_class(node: &Handle, pseudo: PseudoClass) -> bool {
    match pseudo {
        PseudoClass::Root => dom_tree::parent_of(node).map_or(false, |parent| is_document(&parent)),
        PseudoClass::Empty => node.borrow().children().map_or(true, |children| {
            children.iter().all(|child| match &*child.borrow() {
                Node::Comment(_) => true,
                Node::Text(text) => text.is_empty(),
                _ => false,
            })
        }),
        PseudoClass::FirstChild => element_siblings(node)
            .map_or(false, |(siblings, i)| i == 0 && !siblings.is_empty()),
        PseudoClass::LastChild => {
            element_siblings(node).map_or(false, |(siblings, i)| i + 1 == siblings.len())
        }
        PseudoClass::OnlyChild => {
            element_siblings(node).map_or(false, |(siblings, _)| siblings.len() == 1)
        }
    }
}

fn is_document(node: &Handle) -> bool {
    matches!(*node.borrow(), Node::DocumentRoot(_))
}

/// Element children of `node`'s parent and `node`'s position among them.
fn element_siblings(node: &Handle) -> Option<(Vec<Handle>, usize)> {
    let parent = dom_tree::parent_of(node)?;
    let siblings = dom_tree::element_children(&parent);
    let index = siblings.iter().position(|s| std::rc::Rc::ptr_eq(s, node))?;
    Some((siblings, index))
}

fn parent_element(node: &Handle) -> Option<Handle> {
    dom_tree::parent_of(node).filter(|parent| parent.borrow().is_element())
}

/// Matches a ComplexSelector against a candidate element, right to left,
/// backtracking over the ancestor and sibling chains.
pub fn matches_complex_selector(candidate: &Handle, complex: &ComplexSelector) -> bool {
    matches_compound(candidate, &complex.key) && matches_ancestors(candidate, &complex.ancestors)
}

fn matches_ancestors(node: &Handle, parts: &[(Combinator, CompoundSelector)]) -> bool {
    let Some(((combinator, compound), rest)) = parts.split_first() else {
        return true;
    };
    let step = |next: &Handle| matches_compound(next, compound) && matches_ancestors(next, rest);

    match combinator {
        Combinator::Child => parent_element(node).map_or(false, |parent| step(&parent)),
        Combinator::Descendant => {
            let mut ancestor = parent_element(node);
            while let Some(current) = ancestor {
                if step(&current) {
                    return true;
                }
                ancestor = parent_element(&current);
            }
            false
        }
        Combinator::AdjacentSibling => element_siblings(node)
            .filter(|(_, i)| *i > 0)
            .map_or(false, |(siblings, i)| step(&siblings[i - 1])),
        Combinator::GeneralSibling => element_siblings(node)
            .map_or(false, |(siblings, i)| siblings[..i].iter().any(|s| step(s))),
    }
}

/// ------------------------------
/// 3. Querying a Document
/// ------------------------------

/// All elements of `document` matching `selector`, in document order and
/// without duplicates.
pub fn select_all(document: &Document, selector: &str) -> Result<Vec<Handle>, CasError> {
    let selectors = parse_selector_list(selector)?;
    let indices = DomIndices::build(document);
    let all: Vec<usize> = (0..indices.elements.len()).collect();

    let mut matched = BTreeSet::new();
    for complex in &selectors {
        let key = &complex.key;
        let candidates = if let Some(id) = key.ids.first() {
            indices.by_id(id)
        } else if let Some(class) = key.classes.first() {
            indices.by_class(class)
        } else if let Some(tag) = &key.tag {
            indices.by_tag(tag)
        } else {
            all.as_slice()
        };
        matched.extend(
            candidates
                .iter()
                .copied()
                .filter(|&i| matches_complex_selector(&indices.elements[i], complex)),
        );
    }
    Ok(matched
        .into_iter()
        .map(|i| indices.elements[i].clone())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::cas_html::create_dom_tree;

    fn ids(document: &Document, selector: &str) -> Vec<String> {
        select_all(document, selector)
            .unwrap()
            .iter()
            .map(|n| {
                n.borrow()
                    .as_element()
                    .and_then(|e| e.get_attribute("id"))
                    .unwrap_or("-")
                    .to_string()
            })
            .collect()
    }

    fn sample() -> Document {
        create_dom_tree(
            r#"<div id="outer" class="red box">
                 <p id="p1" class="intro" lang="en-US">1</p>
                 <p id="p2" data-kind="main extra">2</p>
                 <span id="s1"><a id="a1" href="https://x.com/page">x</a></span>
               </div>
               <div id="second" class="blue"><em id="e1"></em></div>"#,
        )
    }

    #[test]
    fn test_parse_compound_parts() {
        let complex =
            parse_complex_selector(r#"div.red#header[disabled][data-type~="main"]"#).unwrap();
        let key = complex.key;
        assert_eq!(key.tag.as_deref(), Some("div"));
        assert_eq!(key.ids, vec!["header"]);
        assert_eq!(key.classes, vec!["red"]);
        assert_eq!(key.attributes.len(), 2);
        assert_eq!(key.attributes[0].condition, None);
        assert_eq!(
            key.attributes[1].condition,
            Some((AttributeOperator::Includes, "main".to_string()))
        );
    }

    #[test]
    fn test_parse_combinators_without_spaces() {
        let complex = parse_complex_selector("a>b+c~d e").unwrap();
        let combinators: Vec<_> = complex.ancestors.iter().map(|(c, _)| *c).collect();
        assert_eq!(
            combinators,
            vec![
                Combinator::Descendant,
                Combinator::GeneralSibling,
                Combinator::AdjacentSibling,
                Combinator::Child
            ]
        );
        assert_eq!(complex.key.tag.as_deref(), Some("e"));
    }

    #[test]
    fn test_invalid_selectors() {
        for bad in [
            "", "a,", "> a", "a >", "a > > b", "a[", "a[x=\"y]", "#", ".", "a::before", ":hover",
            "a!", "[x^y]",
        ] {
            assert!(
                matches!(parse_selector_list(bad), Err(CasError::InvalidSelector { .. })),
                "expected `{}` to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_select_by_simple_selectors() {
        let document = sample();
        assert_eq!(ids(&document, "p"), vec!["p1", "p2"]);
        assert_eq!(ids(&document, "#p2"), vec!["p2"]);
        assert_eq!(ids(&document, ".red.box"), vec!["outer"]);
        assert_eq!(ids(&document, ".red.blue"), Vec::<String>::new());
        assert_eq!(ids(&document, "DIV"), vec!["outer", "second"]);
    }

    #[test]
    fn test_select_attribute_operators() {
        let document = sample();
        assert_eq!(ids(&document, "[data-kind]"), vec!["p2"]);
        assert_eq!(ids(&document, "[data-kind~=extra]"), vec!["p2"]);
        assert_eq!(ids(&document, "[lang|=en]"), vec!["p1"]);
        assert_eq!(ids(&document, "a[href^='https://']"), vec!["a1"]);
        assert_eq!(ids(&document, "a[href$=page]"), vec!["a1"]);
        assert_eq!(ids(&document, "a[href*=\"x.com\"]"), vec!["a1"]);
        assert_eq!(ids(&document, "[id=s1]"), vec!["s1"]);
        assert_eq!(ids(&document, "[DATA-Kind]"), vec!["p2"]);
        assert_eq!(ids(&document, "A[HREF$=page]"), vec!["a1"]);
    }

    #[test]
    fn test_select_with_combinators() {
        let document = sample();
        assert_eq!(ids(&document, "div a"), vec!["a1"]);
        assert_eq!(ids(&document, "div > a"), Vec::<String>::new());
        assert_eq!(ids(&document, ".red > span > a"), vec!["a1"]);
        assert_eq!(ids(&document, "#p1 + p"), vec!["p2"]);
        assert_eq!(ids(&document, "#p1 ~ span"), vec!["s1"]);
        assert_eq!(ids(&document, "#p2 + #p1"), Vec::<String>::new());
        assert_eq!(ids(&document, "body > div + div em"), vec!["e1"]);
    }

    #[test]
    fn test_descendant_backtracks() {
        let document = create_dom_tree(
            r#"<div class="a"><div class="b"><div><i id="target"></i></div></div></div>"#,
        );
        // The nearest div ancestor is not `.b`; matching must keep climbing.
        assert_eq!(ids(&document, ".a > .b div i"), vec!["target"]);
    }

    #[test]
    fn test_pseudo_classes() {
        let document = sample();
        assert_eq!(ids(&document, "p:first-child"), vec!["p1"]);
        assert_eq!(ids(&document, "div:last-child"), vec!["second"]);
        assert_eq!(ids(&document, "a:only-child"), vec!["a1"]);
        assert_eq!(ids(&document, "em:empty"), vec!["e1"]);
        let root = select_all(&document, ":root").unwrap();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].borrow().as_element().unwrap().tag, "html");
    }

    #[test]
    fn test_selector_list_is_deduplicated_in_document_order() {
        let document = sample();
        assert_eq!(ids(&document, "#s1, p, .intro"), vec!["p1", "p2", "s1"]);
    }

    #[test]
    fn test_universal() {
        let document = create_dom_tree("<p></p>");
        // html, head, body, p
        assert_eq!(select_all(&document, "*").unwrap().len(), 4);
    }
}
