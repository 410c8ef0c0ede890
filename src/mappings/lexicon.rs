//! Aligned lexicon lookup for lexicon mappings.
//!
//! A lexicon stores pre-aligned pronunciations, one entry per line in
//! Phonetisaurus format: `a}ʌ b}b a}æ s|h}ʃ e|d}t` says "abashed" is
//! /ʌbæʃt/, with each `graphemes}phonemes` group pairing a run of input
//! characters with its output. `_` marks an epsilon on either side.
//!
//! Entries are kept sorted by their input word and found by binary
//! search; a miss is not an error.

/// One aligned segment: how many input characters it consumes and the
/// output text they map to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedSegment {
    /// Number of input characters consumed; 0 for a pure insertion.
    pub consumed: usize,
    /// Output text produced; empty for a pure deletion.
    pub output: String,
}

/// A sorted table of aligned entries.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    /// `(input word, alignment spec)`, sorted by word.
    entries: Vec<(String, String)>,
}

impl Lexicon {
    /// Build a lexicon from alignment lines, skipping blanks.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries: Vec<(String, String)> = lines
            .into_iter()
            .filter_map(|line| {
                let line = line.as_ref().trim();
                if line.is_empty() {
                    return None;
                }
                Some((alignment_input(line), line.to_string()))
            })
            .collect();
        entries.sort();
        Lexicon { entries }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the lexicon holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up `word` and return its parsed alignment, if present.
    pub fn find(&self, word: &str) -> Option<Vec<AlignedSegment>> {
        let index = self
            .entries
            .binary_search_by(|(key, _)| key.as_str().cmp(word))
            .ok()?;
        Some(alignment_sequence(&self.entries[index].1))
    }

    /// The raw alignment lines, sorted by input word; used when the
    /// lexicon is written into a compiled index.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, line)| line.as_str())
    }

    /// True when `word` has an entry; cheaper than [`Lexicon::find`].
    pub fn contains(&self, word: &str) -> bool {
        self.entries
            .binary_search_by(|(key, _)| key.as_str().cmp(word))
            .is_ok()
    }
}

/// The input word an alignment spec describes.
fn alignment_input(alignment: &str) -> String {
    alignment
        .split_whitespace()
        .flat_map(|group| {
            let brace = group.rfind('}').unwrap_or(group.len());
            group[..brace]
                .split('|')
                .filter(|tok| *tok != "_")
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Parse an alignment spec into its segments.
fn alignment_sequence(alignment: &str) -> Vec<AlignedSegment> {
    alignment
        .split_whitespace()
        .map(|group| {
            let brace = group.rfind('}').unwrap_or(group.len());
            let consumed: usize = group[..brace]
                .split('|')
                .filter(|tok| *tok != "_")
                .map(|tok| tok.chars().count())
                .sum();
            let output: String = group
                .get(brace + 1..)
                .unwrap_or("")
                .split('|')
                .filter(|tok| *tok != "_")
                .collect();
            AlignedSegment { consumed, output }
        })
        .collect()
}
