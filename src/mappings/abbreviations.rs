//! Abbreviation tables: named character classes for rules.
//!
//! A rule may reference an abbreviation as `{NAME}`; at compile time the
//! reference is replaced by a non-capturing alternation over its listed
//! expansions. Expansions may themselves reference other abbreviations,
//! so expansion recurses, with a depth cap to catch circular tables.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::CompileError;

/// How many levels of nested references an expansion may cross.
pub const MAX_EXPANSION_DEPTH: usize = 10;

pub(crate) fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Bounded quantifiers like {2,3} are purely numeric, so a leading
    // letter is what distinguishes an abbreviation reference.
    PATTERN.get_or_init(|| Regex::new(r"\{([A-Za-z][A-Za-z0-9_]*)\}").unwrap())
}

/// An immutable table of abbreviations for one mapping.
#[derive(Debug, Clone, Default)]
pub struct Abbreviations {
    table: BTreeMap<String, Vec<String>>,
}

impl Abbreviations {
    /// Build a table from `(name, expansions)` entries. Later entries
    /// for the same name extend the earlier list, matching how the
    /// delimited file format accumulates rows.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<S>)>,
        S: Into<String>,
    {
        let mut table: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, expansions) in entries {
            table
                .entry(name.into())
                .or_default()
                .extend(expansions.into_iter().map(Into::into).filter(|e| !e.is_empty()));
        }
        Self { table }
    }

    /// True when the table defines no names.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of names defined.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// The table as `(name, expansions)` entries, sorted by name; used
    /// when the mapping is written into a compiled index.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.table.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Replace every `{NAME}` in `text` with a non-capturing alternation
    /// over NAME's expansions, recursively.
    ///
    /// With `escape`, each expansion is regex-escaped, for mappings that
    /// treat rule text as literal.
    pub fn expand(&self, text: &str, escape: bool) -> Result<String, CompileError> {
        self.expand_with(text, 0, |expansions| {
            let alternation = expansions
                .iter()
                .map(|e| {
                    if escape {
                        regex::escape(e)
                    } else {
                        e.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join("|");
            format!("(?:{alternation})")
        })
    }

    /// Replace every `{NAME}` with its longest expansion, recursively.
    ///
    /// This is the literal form used to measure a rule's effective match
    /// length for `apply-longest-first` ordering.
    pub fn longest_form(&self, text: &str) -> Result<String, CompileError> {
        self.expand_with(text, 0, |expansions| {
            expansions
                .iter()
                .max_by_key(|e| e.chars().count())
                .cloned()
                .unwrap_or_default()
        })
    }

    fn expand_with<F>(&self, text: &str, depth: usize, replace: F) -> Result<String, CompileError>
    where
        F: Fn(&[String]) -> String + Copy,
    {
        let pattern = reference_pattern();
        if !pattern.is_match(text) {
            return Ok(text.to_string());
        }

        let mut result = String::with_capacity(text.len());
        let mut last = 0;
        let mut first_name = String::new();
        for caps in pattern.captures_iter(text) {
            let m = caps.get(0).unwrap();
            let name = &caps[1];
            if first_name.is_empty() {
                first_name = name.to_string();
            }
            let expansions = self
                .table
                .get(name)
                .ok_or_else(|| CompileError::UnknownAbbreviation {
                    name: name.to_string(),
                    rule_input: text.to_string(),
                })?;
            result.push_str(&text[last..m.start()]);
            result.push_str(&replace(expansions));
            last = m.end();
        }
        result.push_str(&text[last..]);

        // Expansions may introduce further references.
        if pattern.is_match(&result) {
            if depth + 1 >= MAX_EXPANSION_DEPTH {
                return Err(CompileError::CircularAbbreviation {
                    name: first_name,
                    limit: MAX_EXPANSION_DEPTH,
                });
            }
            return self.expand_with(&result, depth + 1, replace);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vowels() -> Abbreviations {
        Abbreviations::from_entries(vec![("VOWEL", vec!["a", "e", "i", "o", "u"])])
    }

    #[test]
    fn expands_to_alternation() {
        assert_eq!(
            vowels().expand("{VOWEL}", false).unwrap(),
            "(?:a|e|i|o|u)"
        );
    }

    #[test]
    fn expansion_preserves_surrounding_text() {
        assert_eq!(
            vowels().expand("x{VOWEL}y", false).unwrap(),
            "x(?:a|e|i|o|u)y"
        );
    }

    #[test]
    fn bounded_quantifiers_are_not_references() {
        assert_eq!(vowels().expand("a{2,3}", false).unwrap(), "a{2,3}");
    }

    #[test]
    fn unknown_name_is_an_error() {
        let err = vowels().expand("{CONS}", false).unwrap_err();
        assert!(matches!(err, CompileError::UnknownAbbreviation { .. }));
    }

    #[test]
    fn nested_references_expand() {
        let abbs = Abbreviations::from_entries(vec![
            ("HIGH", vec!["i", "u"]),
            ("VOWEL", vec!["{HIGH}", "a"]),
        ]);
        assert_eq!(abbs.expand("{VOWEL}", false).unwrap(), "(?:(?:i|u)|a)");
    }

    #[test]
    fn circular_references_are_caught() {
        let abbs = Abbreviations::from_entries(vec![
            ("A", vec!["{B}"]),
            ("B", vec!["{A}"]),
        ]);
        let err = abbs.expand("{A}", false).unwrap_err();
        assert!(matches!(err, CompileError::CircularAbbreviation { .. }));
    }

    #[test]
    fn longest_form_picks_longest_alternative() {
        let abbs = Abbreviations::from_entries(vec![("STOP", vec!["p", "kw", "t"])]);
        assert_eq!(abbs.longest_form("a{STOP}").unwrap(), "akw");
    }

    #[test]
    fn escaped_expansions_are_literal() {
        let abbs = Abbreviations::from_entries(vec![("DOT", vec!["a.b"])]);
        assert_eq!(abbs.expand("{DOT}", true).unwrap(), r"(?:a\.b)");
    }
}
