//! Selector specificity for CAS rules.
//!
//! Counts are taken straight from the selector text rather than from a parsed
//! selector, so any string has a specificity, including ones the host later
//! rejects.

use std::fmt;

/// How specificities are compared when ordering declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpecificityMode {
    /// The three counts are written as decimal digit groups and read back as
    /// one integer, so `(1, 2, 3)` weighs `123`. A count of 10 or more carries
    /// into the next group: `(0, 10, 0)` weighs the same as `(1, 0, 0)`.
    #[default]
    Legacy,
    /// Lexicographic `(a, b, c)` comparison, as CSS Selectors Level 3 orders them.
    Tuple,
}

/// Specificity counts `(a, b, c)` of a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Specificity {
    /// `#` occurrences.
    pub ids: u32,
    /// `.`, `[` and `:` occurrences.
    pub classes: u32,
    /// Letter runs at the start of the text or right after whitespace.
    pub types: u32,
}

impl Specificity {
    pub fn new(ids: u32, classes: u32, types: u32) -> Self {
        Specificity {
            ids,
            classes,
            types,
        }
    }

    /// The concatenated-decimal weight used by [`SpecificityMode::Legacy`].
    pub fn legacy_value(&self) -> u64 {
        let digits = format!("{}{}{}", self.ids, self.classes, self.types);
        // Only digits go in, so parsing fails solely on overflow.
        digits.parse().unwrap_or(u64::MAX)
    }

    /// Bucket key for sorting under `mode`. Keys compare with `Ord`.
    pub fn sort_key(&self, mode: SpecificityMode) -> (u64, u64, u64) {
        match mode {
            SpecificityMode::Legacy => (0, 0, self.legacy_value()),
            SpecificityMode::Tuple => (
                u64::from(self.ids),
                u64::from(self.classes),
                u64::from(self.types),
            ),
        }
    }
}

impl fmt::Display for Specificity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.ids, self.classes, self.types)
    }
}

/// Compute the specificity of `selector`.
pub fn calculate(selector: &str) -> Specificity {
    let mut spec = Specificity::default();
    let mut prev: Option<char> = None;

    for ch in selector.chars() {
        match ch {
            '#' => spec.ids += 1,
            '.' | '[' | ':' => spec.classes += 1,
            // A run only starts after whitespace; later letters follow a letter.
            c if c.is_ascii_alphabetic() && prev.map_or(true, char::is_whitespace) => {
                spec.types += 1
            }
            _ => {}
        }
        prev = Some(ch);
    }
    spec
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy(selector: &str) -> u64 {
        calculate(selector).legacy_value()
    }

    #[test]
    fn test_counts_each_bucket() {
        assert_eq!(calculate("a"), Specificity::new(0, 0, 1));
        assert_eq!(calculate(".a"), Specificity::new(0, 1, 0));
        assert_eq!(calculate("#a"), Specificity::new(1, 0, 0));
        assert_eq!(calculate("a[href]:hover"), Specificity::new(0, 2, 1));
        assert_eq!(calculate("div p.intro"), Specificity::new(0, 1, 2));
        assert_eq!(calculate("ul#nav li.active a"), Specificity::new(1, 1, 3));
    }

    #[test]
    fn test_type_only_counted_at_boundaries() {
        // "b" follows ">" directly, not whitespace.
        assert_eq!(calculate("a>b").types, 1);
        assert_eq!(calculate("a > b").types, 2);
        assert_eq!(calculate("*").types, 0);
        assert_eq!(calculate("").types, 0);
    }

    #[test]
    fn test_legacy_value_concatenates_digits() {
        assert_eq!(Specificity::new(1, 2, 3).legacy_value(), 123);
        assert_eq!(legacy("a"), 1);
        assert_eq!(legacy(".a"), 10);
        assert_eq!(legacy("#a"), 100);
    }

    #[test]
    fn test_id_beats_class_beats_type() {
        assert!(legacy("#a") > legacy(".a"));
        assert!(legacy(".a") > legacy("a"));
    }

    #[test]
    fn test_legacy_carry_versus_tuple() {
        let many_classes = calculate(".a.b.c.d.e.f.g.h.i.j");
        let one_id = calculate("#a");
        assert_eq!(many_classes.legacy_value(), 100);
        assert_eq!(
            many_classes.sort_key(SpecificityMode::Legacy),
            one_id.sort_key(SpecificityMode::Legacy)
        );
        assert!(
            many_classes.sort_key(SpecificityMode::Tuple) < one_id.sort_key(SpecificityMode::Tuple)
        );
    }

    #[test]
    fn test_calculate_is_deterministic() {
        for selector in ["a", "#x .y z", "[data-x]", "p::before"] {
            assert_eq!(calculate(selector), calculate(selector));
        }
    }
}
