//! Tokenizer and parser for Cascading Attribute Sheets.
//!
//! The grammar is deliberately forgiving:
//!
//! ```text
//! sheet      ::= comment? block*
//! comment    ::= "/*" any-text "*/"        # only the first one is removed
//! block      ::= selectorText "{" propsText "}"
//! propsText  ::= (propName ":" propValue ";")* (propName ":" propValue)?
//! ```
//!
//! `}` always closes a block and `;` always closes a property. Only the
//! first `{` of a block and the first `:` of a property are structural, so
//! values such as `http://x.com` or `{a}` come through untouched. Nothing in
//! here fails on malformed text: a block without `{` yields a declaration
//! with no properties and a property without `:` gets an empty value.

use crate::error::CasError;
use crate::style::declaration::{Declaration, DeclarationList, Selector};
use crate::style::specificity::SpecificityMode;
use log::{debug, warn};

/// Tokenizer states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Only whitespace seen since the last `}`.
    BeforeSelector,
    /// Reading selector text up to the first `{`.
    InSelector,
    /// Reading a property name up to the first `:`.
    InProperties,
    /// Reading a property value up to `;` or `}`.
    InValue,
}

/// A block as cut out of the source, before trimming.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawBlock {
    pub selector: String,
    /// Whether a `{` opened the property section.
    pub has_body: bool,
    /// `(name, value)` pairs; `value` is `None` when the entry had no `:`.
    pub properties: Vec<(String, Option<String>)>,
}

/// Parses `source` and sorts the result by legacy specificity.
pub fn parse(source: &str) -> Result<DeclarationList, CasError> {
    parse_with(source, SpecificityMode::Legacy)
}

/// Parses `source` and sorts the result by specificity under `mode`.
pub fn parse_with(source: &str, mode: SpecificityMode) -> Result<DeclarationList, CasError> {
    if source.is_empty() {
        return Err(CasError::EmptyInput);
    }

    let stripped = strip_first_comment(source);
    let mut list = DeclarationList::new();
    for block in tokenize(&stripped) {
        list.add(build_declaration(block));
    }
    list.sort_with(mode, false);
    debug!("parsed {} CAS declaration(s)", list.len());
    Ok(list)
}

/// Removes the first `/* ... */` comment. Later comments are left alone and
/// an unterminated comment is not removed.
pub fn strip_first_comment(source: &str) -> String {
    if let Some(start) = source.find("/*") {
        if let Some(len) = source[start + 2..].find("*/") {
            let end = start + 2 + len + 2;
            let mut out = String::with_capacity(source.len() - (end - start));
            out.push_str(&source[..start]);
            out.push_str(&source[end..]);
            return out;
        }
    }
    source.to_string()
}

/// Cuts `source` into raw blocks.
///
/// A whitespace-only tail after the last `}` is dropped. Whitespace-only
/// blocks between two `}` are kept.
pub fn tokenize(source: &str) -> Vec<RawBlock> {
    let mut tokenizer = Tokenizer::new();
    for ch in source.chars() {
        tokenizer.feed(ch);
    }
    tokenizer.finish()
}

struct Tokenizer {
    state: State,
    blocks: Vec<RawBlock>,
    current: RawBlock,
    name: String,
    value: String,
}

impl Tokenizer {
    fn new() -> Self {
        Tokenizer {
            state: State::BeforeSelector,
            blocks: Vec::new(),
            current: RawBlock::default(),
            name: String::new(),
            value: String::new(),
        }
    }

    fn feed(&mut self, ch: char) {
        match (self.state, ch) {
            (_, '}') => self.close_block(),
            (State::BeforeSelector, '{') | (State::InSelector, '{') => {
                self.current.has_body = true;
                self.state = State::InProperties;
            }
            (State::BeforeSelector, c) => {
                self.current.selector.push(c);
                if !c.is_whitespace() {
                    self.state = State::InSelector;
                }
            }
            (State::InSelector, c) => self.current.selector.push(c),
            (State::InProperties, ':') => self.state = State::InValue,
            (State::InProperties, ';') | (State::InValue, ';') => {
                self.close_property();
                self.state = State::InProperties;
            }
            (State::InProperties, c) => self.name.push(c),
            (State::InValue, c) => self.value.push(c),
        }
    }

    fn close_property(&mut self) {
        let name = std::mem::take(&mut self.name);
        let value = std::mem::take(&mut self.value);
        let value = (self.state == State::InValue).then_some(value);
        self.current.properties.push((name, value));
    }

    /// Closes the trailing property of a block. A final entry that is empty
    /// (the text after a terminating `;`) is not a property.
    fn close_trailing_property(&mut self) {
        match self.state {
            State::InValue => self.close_property(),
            State::InProperties if !self.name.trim().is_empty() => self.close_property(),
            _ => self.name.clear(),
        }
    }

    fn close_block(&mut self) {
        self.close_trailing_property();
        self.blocks.push(std::mem::take(&mut self.current));
        self.state = State::BeforeSelector;
    }

    fn finish(mut self) -> Vec<RawBlock> {
        if self.state != State::BeforeSelector {
            self.close_block();
        }
        self.blocks
    }
}

fn build_declaration(block: RawBlock) -> Declaration {
    let mut declaration = Declaration::new(Selector::new(&block.selector));
    if !block.has_body && !block.selector.trim().is_empty() {
        warn!(
            "block `{}` has no `{{`; it sets no attributes",
            declaration.selector().text()
        );
    }
    for (name, value) in block.properties {
        let name = name.trim();
        if name.is_empty() {
            warn!(
                "skipping unnamed property in `{}`",
                declaration.selector().text()
            );
            continue;
        }
        if value.is_none() {
            warn!(
                "property `{}` in `{}` has no `:`; using an empty value",
                name,
                declaration.selector().text()
            );
        }
        let value = value.as_deref().map(str::trim).unwrap_or_default();
        declaration.add(name, value);
    }
    declaration
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(d: &Declaration) -> Vec<(&str, &str)> {
        d.properties()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn test_single_block() {
        let list = parse("a { color: red; }").unwrap();
        assert_eq!(list.len(), 1);
        let d = &list.all()[0];
        assert_eq!(d.selector().text(), "a");
        assert_eq!(props(d), vec![("color", "red")]);
    }

    #[test]
    fn test_trailing_semicolon_is_optional() {
        assert_eq!(parse("a { x: 1 }").unwrap(), parse("a { x: 1; }").unwrap());
    }

    #[test]
    fn test_colons_in_value_survive() {
        let list = parse("a { href: http://x.com; }").unwrap();
        assert_eq!(list.all()[0].get("href"), Some("http://x.com"));
    }

    #[test]
    fn test_braces_in_value_survive() {
        // `}` still closes the block, leaving `;` as a stray selector.
        let list = parse("a { data-tpl: {name}; }").unwrap();
        let a = list.iter().find(|d| d.selector().text() == "a").unwrap();
        assert_eq!(a.get("data-tpl"), Some("{name"));
        assert_eq!(list.len(), 2);

        let list = parse("a { data-x: {{y: z; }").unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.all()[0].get("data-x"), Some("{{y: z"));
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert_eq!(parse(""), Err(CasError::EmptyInput));
    }

    #[test]
    fn test_whitespace_only_input_is_empty_list() {
        assert!(parse("  \n ").unwrap().is_empty());
    }

    #[test]
    fn test_result_is_sorted() {
        let list = parse("#id { x: 2; } a { x: 1; } .c { x: 3; }").unwrap();
        let selectors: Vec<_> = list.iter().map(|d| d.selector().text()).collect();
        assert_eq!(selectors, vec!["a", ".c", "#id"]);
    }

    #[test]
    fn test_only_first_comment_is_stripped() {
        assert_eq!(strip_first_comment("/* a */b/* c */"), "b/* c */");
        assert_eq!(strip_first_comment("a /* open"), "a /* open");

        let list = parse("/* header */ a { x: 1; }").unwrap();
        assert_eq!(list.all()[0].selector().text(), "a");

        // The second comment ends up in the next selector.
        let list = parse("/* one */ a { x: 1; } /* two */ b { y: 2; }").unwrap();
        let texts: Vec<_> = list.iter().map(|d| d.selector().text()).collect();
        assert!(texts.contains(&"/* two */ b"));
    }

    #[test]
    fn test_tokenizer_states() {
        let blocks = tokenize("a{x:1;y}  ");
        assert_eq!(
            blocks,
            vec![RawBlock {
                selector: "a".into(),
                has_body: true,
                properties: vec![("x".into(), Some("1".into())), ("y".into(), None)],
            }]
        );
    }

    #[test]
    fn test_interior_blank_block_is_kept() {
        let blocks = tokenize("a { x: 1 }  } b { y: 2 }");
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[1].selector.trim(), "");

        let list = parse("a { x: 1 }  } b { y: 2 }").unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.all()[0].selector().text(), "*");
        assert!(list.all()[0].is_empty());
    }

    #[test]
    fn test_block_without_brace_has_no_properties() {
        let blocks = tokenize("a x: 1 } b { }");
        assert!(!blocks[0].has_body);
        assert!(blocks[1].has_body);

        let list = parse("a x: 1 }").unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.all()[0].selector().text(), "a x: 1");
        assert!(list.all()[0].is_empty());
    }

    #[test]
    fn test_property_without_colon_gets_empty_value() {
        let list = parse("input { disabled; type: text }").unwrap();
        let d = &list.all()[0];
        assert_eq!(props(d), vec![("disabled", ""), ("type", "text")]);
    }

    #[test]
    fn test_unnamed_properties_are_skipped() {
        let list = parse("a { ; : orphan; x: 1;; }").unwrap();
        assert_eq!(props(&list.all()[0]), vec![("x", "1")]);
    }

    #[test]
    fn test_unclosed_last_block_is_parsed() {
        let list = parse("a { x: 1").unwrap();
        assert_eq!(list.all()[0].get("x"), Some("1"));
    }

    #[test]
    fn test_last_write_wins_within_block() {
        let list = parse("a { x: 1; x: 2 }").unwrap();
        assert_eq!(props(&list.all()[0]), vec![("x", "2")]);
    }

    #[test]
    fn test_parse_with_tuple_mode() {
        let source = "#a { x: id } .a.b.c.d.e.f.g.h.i.j { x: classes }";
        let legacy = parse_with(source, SpecificityMode::Legacy).unwrap();
        assert_eq!(legacy.all()[1].get("x"), Some("classes"));
        let tuple = parse_with(source, SpecificityMode::Tuple).unwrap();
        assert_eq!(tuple.all()[1].get("x"), Some("id"));
    }
}
