//! Selectors, declarations and the specificity-ordered declaration list.

use crate::style::specificity::{self, Specificity, SpecificityMode};
use std::collections::BTreeMap;
use std::fmt;

/// A selector's text together with its cached specificity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    text: String,
    specificity: Specificity,
}

impl Selector {
    /// Text that is blank after trimming becomes the universal selector `*`.
    pub fn new(text: &str) -> Self {
        let text = match text.trim() {
            "" => "*",
            trimmed => trimmed,
        };
        Selector {
            text: text.to_string(),
            specificity: specificity::calculate(text),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn specificity(&self) -> Specificity {
        self.specificity
    }

    /// Replaces the text and recomputes the specificity.
    pub fn set_text(&mut self, text: &str) {
        *self = Selector::new(text);
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// One selector and the attributes it assigns.
///
/// Property names are unique. They keep the position of their first
/// insertion; writing an existing name replaces its value in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    selector: Selector,
    properties: Vec<(String, String)>,
}

impl Declaration {
    pub fn new(selector: Selector) -> Self {
        Declaration {
            selector,
            properties: Vec::new(),
        }
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Properties as `(name, value)` pairs in insertion order.
    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Sets one property, overwriting an existing value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.properties.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value,
            None => self.properties.push((name, value)),
        }
    }

    /// Merges every pair of `properties` into this declaration.
    pub fn add_all<I, K, V>(&mut self, properties: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in properties {
            self.add(name, value);
        }
    }

    /// Removes `name` if present.
    pub fn remove(&mut self, name: &str) {
        self.properties.retain(|(k, _)| k != name);
    }

    /// Removes each of `names`; names that are not set are ignored.
    pub fn remove_each<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.remove(name.as_ref());
        }
    }

    /// Clears every property but keeps the selector.
    pub fn remove_all(&mut self) {
        self.properties.clear();
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {{", self.selector)?;
        for (name, value) in &self.properties {
            writeln!(f, "  {}: {};", name, value)?;
        }
        write!(f, "}}")
    }
}

/// Ordered collection of declarations.
///
/// Insertion order is kept until [`DeclarationList::sort`] runs. Sorting
/// groups declarations into buckets of equal specificity and concatenates
/// the buckets in ascending order, so equal-specificity declarations stay in
/// source order and the later one wins when applied front to back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationList {
    declarations: Vec<Declaration>,
}

impl DeclarationList {
    pub fn new() -> Self {
        DeclarationList::default()
    }

    /// Read view of the current order.
    pub fn all(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Declaration> {
        self.declarations.iter()
    }

    pub fn add(&mut self, declaration: Declaration) {
        self.declarations.push(declaration);
    }

    /// Appends a batch after the existing entries, keeping batch order.
    pub fn add_many<I: IntoIterator<Item = Declaration>>(&mut self, declarations: I) {
        self.declarations.extend(declarations);
    }

    /// Sorts by legacy specificity. See [`DeclarationList::sort_with`].
    pub fn sort(&mut self, reverse: bool) {
        self.sort_with(SpecificityMode::Legacy, reverse);
    }

    /// Bucket sort by specificity under `mode`.
    ///
    /// With `reverse`, the ascending result is reversed as a whole: the most
    /// specific bucket comes first and ties within a bucket are reversed too.
    pub fn sort_with(&mut self, mode: SpecificityMode, reverse: bool) {
        let mut buckets: BTreeMap<(u64, u64, u64), Vec<Declaration>> = BTreeMap::new();
        for declaration in self.declarations.drain(..) {
            let key = declaration.selector.specificity.sort_key(mode);
            buckets.entry(key).or_default().push(declaration);
        }

        self.declarations = buckets.into_values().flatten().collect();
        if reverse {
            self.declarations.reverse();
        }
    }
}

impl From<Vec<Declaration>> for DeclarationList {
    fn from(declarations: Vec<Declaration>) -> Self {
        DeclarationList { declarations }
    }
}

impl FromIterator<Declaration> for DeclarationList {
    fn from_iter<I: IntoIterator<Item = Declaration>>(iter: I) -> Self {
        DeclarationList {
            declarations: iter.into_iter().collect(),
        }
    }
}

impl Extend<Declaration> for DeclarationList {
    fn extend<I: IntoIterator<Item = Declaration>>(&mut self, iter: I) {
        self.add_many(iter);
    }
}

impl IntoIterator for DeclarationList {
    type Item = Declaration;
    type IntoIter = std::vec::IntoIter<Declaration>;

    fn into_iter(self) -> Self::IntoIter {
        self.declarations.into_iter()
    }
}

impl<'a> IntoIterator for &'a DeclarationList {
    type Item = &'a Declaration;
    type IntoIter = std::slice::Iter<'a, Declaration>;

    fn into_iter(self) -> Self::IntoIter {
        self.declarations.iter()
    }
}

/// Renders the list back as CAS source, one block per declaration.
impl fmt::Display for DeclarationList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, declaration) in self.declarations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}", declaration)?;
        }
        Ok(())
    }
}
