//! Language-aware tokenization.
//!
//! A token is a maximal run of word characters or a maximal run of
//! anything else. By default word characters are Unicode letters,
//! numbers and diacritics; a tokenizer built from a mapping widens that
//! set with every character that appears in some rule input, so
//! punctuation that is orthographically part of words (an apostrophe,
//! say) does not split them.

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};

use crate::mappings::Mapping;

/// One tokenized segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The segment text.
    pub text: String,
    /// Whether the segment is a word (and should be transduced).
    pub is_word: bool,
}

impl Token {
    /// Construct a token.
    pub fn new(text: impl Into<String>, is_word: bool) -> Self {
        Token {
            text: text.into(),
            is_word,
        }
    }
}

fn word_character_class() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[\p{L}\p{M}\p{N}]$").unwrap())
}

/// Splits text into word and non-word tokens.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    /// Multi-character and single-character units from rule inputs.
    inventory: Vec<String>,
    /// Alternation regex over the inventory; `None` for the default
    /// tokenizer, which looks at single characters only.
    unit_pattern: Option<Regex>,
    case_sensitive: bool,
    /// Extra word characters beyond the inventory and Unicode classes.
    extra_word_chars: Vec<char>,
    /// Treat `.` as a letter when not word-final.
    dot_is_letter: bool,
}

impl Tokenizer {
    /// The default tokenizer: letters, numbers and diacritics are word
    /// characters.
    pub fn new() -> Self {
        Tokenizer::default()
    }

    /// A tokenizer whose word characters come from the rule inputs of
    /// `mappings` (usually one mapping, or the hops of a path).
    pub fn from_mappings<'m, I>(mappings: I) -> Self
    where
        I: IntoIterator<Item = &'m Mapping>,
    {
        let mut case_sensitive = true;
        let mut inventory: Vec<String> = Vec::new();
        for (index, mapping) in mappings.into_iter().enumerate() {
            if index == 0 {
                case_sensitive = mapping.config().case_sensitive;
            }
            for input in mapping.input_inventory() {
                inventory.extend(split_input_units(input));
            }
        }
        if !case_sensitive {
            inventory = inventory.iter().map(|p| p.to_lowercase()).collect();
        }
        inventory.sort();
        inventory.dedup();
        // Longest first so digraphs tokenize as single units.
        inventory.sort_by_key(|p| std::cmp::Reverse(p.chars().count()));

        let mut pieces: Vec<String> = inventory.iter().map(|p| regex::escape(p)).collect();
        pieces.push(".".to_string());
        let pattern = format!("(?s)({})", pieces.join("|"));
        let unit_pattern = RegexBuilder::new(&pattern)
            .case_insensitive(!case_sensitive)
            .build()
            .ok();
        if unit_pattern.is_none() {
            log::warn!("could not build tokenizer pattern; falling back to default");
        }

        Tokenizer {
            inventory,
            unit_pattern,
            case_sensitive,
            extra_word_chars: Vec::new(),
            dot_is_letter: false,
        }
    }

    /// Add word characters the mappings do not mention.
    pub fn with_word_chars(mut self, chars: impl IntoIterator<Item = char>) -> Self {
        self.extra_word_chars.extend(chars);
        self
    }

    /// Treat `.` as a letter when followed by a word unit.
    pub fn with_dot_as_letter(mut self, enabled: bool) -> Self {
        self.dot_is_letter = enabled;
        self
    }

    /// Split `text` into alternating word and non-word tokens.
    /// Concatenating the token texts reproduces `text` exactly.
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut units: Vec<Token> = self
            .units(text)
            .into_iter()
            .map(|unit| {
                let is_word = self.is_word_unit(&unit);
                Token::new(unit, is_word)
            })
            .collect();

        if self.dot_is_letter {
            for i in 0..units.len() {
                if units[i].text == "." && units.get(i + 1).is_some_and(|u| u.is_word) {
                    units[i].is_word = true;
                }
            }
        }

        merge_same_type(units)
    }

    fn units(&self, text: &str) -> Vec<String> {
        match &self.unit_pattern {
            Some(pattern) => pattern
                .find_iter(text)
                .map(|m| m.as_str().to_string())
                .collect(),
            None => text.chars().map(|c| c.to_string()).collect(),
        }
    }

    fn is_word_unit(&self, unit: &str) -> bool {
        let folded = if self.case_sensitive {
            unit.to_string()
        } else {
            unit.to_lowercase()
        };
        if self.inventory.contains(&folded) {
            return true;
        }
        if unit.chars().all(|c| self.extra_word_chars.contains(&c)) && !unit.is_empty() {
            return true;
        }
        unit.chars().count() == 1 && word_character_class().is_match(unit)
    }
}

/// Break one expanded rule input into tokenizer units: strip grouping
/// syntax, split on unescaped alternation bars, unescape what remains.
fn split_input_units(input: &str) -> Vec<String> {
    let stripped = input.replace("(?:", "").replace(['(', ')'], "");
    let mut units = Vec::new();
    let mut current = String::new();
    let mut chars = stripped.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '|' => units.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    units.push(current);
    units.retain(|u| !u.is_empty());
    units
}

fn merge_same_type(units: Vec<Token>) -> Vec<Token> {
    let mut merged: Vec<Token> = Vec::new();
    for unit in units {
        match merged.last_mut() {
            Some(last) if last.is_word == unit.is_word => last.text.push_str(&unit.text),
            _ => merged.push(unit),
        }
    }
    merged
}
