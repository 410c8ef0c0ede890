//! The rewriting kernel: applying one mapping to a string.
//!
//! A [`Transducer`] is a cheap view over a compiled [`Mapping`]. Applying
//! it walks the mapping's rules in their compile-time order over a
//! working string, keeps a protected-position mask so rules marked
//! `prevent_feeding` cannot feed later rules, and threads a character
//! alignment through every replacement.

mod composite;
mod graph;
mod tokenizing;

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use unicode_normalization::UnicodeNormalization;

use crate::alignment::{self, Edge};
use crate::mappings::{Mapping, MappingType};
use crate::normalization;

pub use composite::CompositeTransducer;
pub use graph::{CompositeTransductionGraph, RuleApplication, TransductionGraph};
pub use tokenizing::TokenizingTransducer;

/// Characters unidecode output may keep besides letters.
const UNIDECODE_SPECIALS: [char; 5] = ['@', '?', '\'', ',', ':'];

/// Applies one [`Mapping`] to input strings.
#[derive(Debug)]
pub struct Transducer<'m> {
    mapping: &'m Mapping,
    case: CaseMapper,
}

impl<'m> Transducer<'m> {
    /// Wrap a mapping. Transducers borrow the mapping and may be
    /// recreated per conversion without cost.
    pub fn new(mapping: &'m Mapping) -> Self {
        Transducer {
            case: CaseMapper::from_equivalencies(&mapping.config().case_equivalencies),
            mapping,
        }
    }

    /// The mapping driving this transducer.
    pub fn mapping(&self) -> &'m Mapping {
        self.mapping
    }

    /// Input notation identifier.
    pub fn in_lang(&self) -> &str {
        self.mapping.in_lang()
    }

    /// Output notation identifier.
    pub fn out_lang(&self) -> &str {
        self.mapping.out_lang()
    }

    /// Convert `input`, producing the output string and its alignment.
    ///
    /// Conversion never fails: input nothing matches passes through
    /// unchanged, and a lexicon miss returns the input with an identity
    /// alignment.
    pub fn apply(&self, input: &str) -> TransductionGraph {
        match self.mapping.mapping_type() {
            MappingType::Rule => self.apply_rules(input),
            MappingType::Unidecode => self.apply_unidecode(input),
            MappingType::Lexicon => self.apply_lexicon(input),
        }
    }

    /// The rule engine described in the module docs.
    fn apply_rules(&self, to_convert: &str) -> TransductionGraph {
        let config = self.mapping.config();
        let unescaped = normalization::unicode_escape(to_convert);

        // Case-insensitive matching without preserve_case folds the
        // whole input once, so unmatched characters come out lowercase
        // too. preserve_case instead leaves the input intact and relies
        // on the case-insensitive matchers.
        let working = if !config.case_sensitive && !config.preserve_case {
            lowercase_keeping_length(&unescaped)
        } else {
            unescaped.clone()
        };
        let (mut w, norm_edges) =
            normalization::normalize_with_indices(&working, config.norm_form);

        let mut protected = vec![false; w.chars().count()];
        let mut edges: Vec<Edge> = alignment::identity(protected.len());
        let mut trace = Vec::new();
        let delimiter = config.out_delimiter.clone();

        for rule in self.mapping.rules() {
            let mut pos = 0usize;
            while pos <= w.len() {
                let found = match rule.pattern().find_from_pos(&w, pos) {
                    Ok(found) => found,
                    Err(e) => {
                        // Backtracking limits and the like; treated as
                        // "no further matches" so conversion stays total.
                        log::warn!(
                            "rule {:?} failed while matching: {e}",
                            rule.rule().rule_input
                        );
                        None
                    }
                };
                let Some(m) = found else { break };
                let (byte_start, byte_end) = (m.start(), m.end());

                if byte_start == byte_end {
                    // A nullable pattern; skip a character so the scan
                    // always advances.
                    match w[byte_end..].chars().next() {
                        Some(c) => pos = byte_end + c.len_utf8(),
                        None => break,
                    }
                    continue;
                }

                let start = char_index(&w, byte_start);
                let end = start + w[byte_start..byte_end].chars().count();

                // Only the match span is checked for protection;
                // contexts may still refer to protected characters.
                if protected[start..end].iter().any(|&p| p) {
                    match w[byte_start..].chars().next() {
                        Some(c) => pos = byte_start + c.len_utf8(),
                        None => break,
                    }
                    continue;
                }

                let matched = &w[byte_start..byte_end];
                let mut replacement = if config.preserve_case {
                    self.case.apply_pattern(matched, rule.replacement())
                } else {
                    rule.replacement().to_string()
                };
                if !delimiter.is_empty() {
                    replacement.push_str(&delimiter);
                }
                let replacement_len = replacement.chars().count();

                let before = w.clone();
                update_alignment(&mut edges, start, end, replacement_len);
                splice_mask(
                    &mut protected,
                    start,
                    end,
                    replacement_len,
                    rule.prevent_feeding(),
                );
                if !delimiter.is_empty() && replacement_len > 0 {
                    // The delimiter is never rewritten by later rules.
                    protected[start + replacement_len - 1] = true;
                }
                w.replace_range(byte_start..byte_end, &replacement);

                let source = rule.rule();
                if source.rule_input != source.rule_output
                    || !source.context_before.is_empty()
                    || !source.context_after.is_empty()
                {
                    trace.push(RuleApplication {
                        input: before,
                        output: w.clone(),
                        rule: source.clone(),
                        start,
                        end,
                    });
                }

                pos = byte_start + replacement.len();
            }
        }

        // One trailing delimiter is trimmed; inputs aligned only to it
        // become deletions for normalization to resolve.
        if !delimiter.is_empty() && w.ends_with(&delimiter) {
            let trimmed = w.chars().count() - 1;
            w.truncate(w.len() - delimiter.len());
            let orphans: Vec<usize> = edges
                .iter()
                .filter(|&&(_, k)| k == Some(trimmed))
                .map(|&(i, _)| i)
                .collect();
            edges.retain(|&(_, k)| k != Some(trimmed));
            for i in orphans {
                if !edges.iter().any(|&(j, _)| j == i) {
                    edges.push((i, None));
                }
            }
        }

        let edges = alignment::normalize_edges(edges);
        let edges = alignment::compose(&norm_edges, &edges);
        TransductionGraph::assemble(unescaped, w, edges, trace)
    }

    /// ASCII transliteration, character by character.
    ///
    /// Spaces in the input are kept; spaces invented by the
    /// transliteration are dropped, as are any other non-letters except
    /// a few phonetically meaningful marks.
    fn apply_unidecode(&self, to_convert: &str) -> TransductionGraph {
        let config = self.mapping.config();
        let unescaped = normalization::unicode_escape(to_convert);
        let (normalized, norm_edges) =
            normalization::normalize_with_indices(&unescaped, config.norm_form);

        let converted: Vec<String> = normalized
            .chars()
            .map(|c| {
                let nfkc: String = c.to_string().nfkc().collect();
                nfkc.chars()
                    // Characters with no transliteration vanish rather
                    // than turning into replacement markers.
                    .flat_map(|u| deunicode::deunicode_char(u).unwrap_or("").chars())
                    .filter(|u| {
                        u.is_alphabetic() || UNIDECODE_SPECIALS.contains(u) || c.is_whitespace()
                    })
                    .collect()
            })
            .collect();
        let output: String = converted.concat();

        // Inputs the transliteration deleted hang onto the previous
        // output character. A fully deleted input has no edges at all.
        let mut edges: Vec<Edge> = Vec::new();
        if !output.is_empty() {
            let mut out_pos = 0usize;
            for (in_pos, piece) in converted.iter().enumerate() {
                if piece.is_empty() {
                    edges.push((in_pos, Some(out_pos.saturating_sub(1))));
                } else {
                    for _ in piece.chars() {
                        edges.push((in_pos, Some(out_pos)));
                        out_pos += 1;
                    }
                }
            }
        }

        let edges = alignment::compose(&norm_edges, &edges);
        TransductionGraph::assemble(unescaped, output, edges, Vec::new())
    }

    /// Lexicon lookup. A miss passes the input through unchanged.
    fn apply_lexicon(&self, to_convert: &str) -> TransductionGraph {
        let config = self.mapping.config();
        let lookup = if config.case_sensitive {
            to_convert.to_string()
        } else {
            to_convert.to_lowercase()
        };
        let Some(segments) = self.mapping.lexicon().find(&lookup) else {
            return TransductionGraph::identity(to_convert);
        };

        let delimiter = &config.out_delimiter;
        let delimiter_len = delimiter.chars().count();
        let total_consumed: usize = segments.iter().map(|s| s.consumed).sum();

        let mut output = String::new();
        let mut edges: Vec<Edge> = Vec::new();
        let mut in_pos = 0usize;
        let mut out_pos = 0usize;
        for segment in &segments {
            let out_len = segment.output.chars().count();
            for i in 0..segment.consumed {
                for j in 0..out_len {
                    edges.push((in_pos + i, Some(out_pos + j)));
                }
                if out_len == 0 {
                    edges.push((in_pos + i, Some(out_pos.saturating_sub(1))));
                }
            }
            if segment.consumed == 0 && total_consumed > 0 {
                // Insertions attach to the neighbouring input.
                let anchor = in_pos.min(total_consumed - 1);
                for j in 0..out_len {
                    edges.push((anchor, Some(out_pos + j)));
                }
            }
            in_pos += segment.consumed;
            if out_len != 0 {
                out_pos += out_len + delimiter_len;
                output.push_str(&segment.output);
                output.push_str(delimiter);
            }
        }
        if !delimiter.is_empty() && output.ends_with(delimiter.as_str()) {
            output.truncate(output.len() - delimiter.len());
        }

        // Edges that ran past the trimmed end clamp to the last output.
        let out_total = output.chars().count();
        let edges: Vec<Edge> = edges
            .into_iter()
            .map(|(i, j)| match j {
                Some(j) if j >= out_total => {
                    (i, if out_total == 0 { None } else { Some(out_total - 1) })
                }
                other => (i, other),
            })
            .collect();
        let edges = alignment::normalize_edges(edges);
        TransductionGraph::assemble(to_convert.to_string(), output, edges, Vec::new())
    }
}

/// The many-to-many block update from replacing output span
/// `[start, end)` with `replacement_len` characters.
fn update_alignment(edges: &mut Vec<Edge>, start: usize, end: usize, replacement_len: usize) {
    let mut inputs: SmallVec<[usize; 8]> = SmallVec::new();
    for &(i, k) in edges.iter() {
        if matches!(k, Some(k) if k >= start && k < end) && !inputs.contains(&i) {
            inputs.push(i);
        }
    }
    edges.retain(|&(_, k)| !matches!(k, Some(k) if k >= start && k < end));
    let delta = replacement_len as isize - (end - start) as isize;
    if delta != 0 {
        alignment::shift_outputs(edges, end, delta);
    }
    if replacement_len == 0 {
        for &i in &inputs {
            edges.push((i, None));
        }
    } else {
        for &i in &inputs {
            for offset in 0..replacement_len {
                edges.push((i, Some(start + offset)));
            }
        }
    }
}

/// Replace mask positions `[start, end)` with `replacement_len` bits of
/// `protect`.
fn splice_mask(
    mask: &mut Vec<bool>,
    start: usize,
    end: usize,
    replacement_len: usize,
    protect: bool,
) {
    mask.splice(start..end, std::iter::repeat(protect).take(replacement_len));
}

fn char_index(s: &str, byte_pos: usize) -> usize {
    s[..byte_pos].chars().count()
}

/// Lowercase character by character. Characters whose lowercase form
/// has a different length are left alone so indices stay stable.
fn lowercase_keeping_length(s: &str) -> String {
    s.chars()
        .map(|c| {
            let mut lower = c.to_lowercase();
            match (lower.next(), lower.next()) {
                (Some(l), None) => l,
                _ => c,
            }
        })
        .collect()
}

/// Case classification and conversion, extended by a mapping's
/// `case_equivalencies` for characters Unicode cannot case.
#[derive(Debug, Default, Clone)]
struct CaseMapper {
    to_upper: FxHashMap<char, char>,
    to_lower: FxHashMap<char, char>,
}

impl CaseMapper {
    fn from_equivalencies(equivalencies: &BTreeMap<String, String>) -> Self {
        let mut mapper = CaseMapper::default();
        for (lower, upper) in equivalencies {
            for (l, u) in lower.chars().zip(upper.chars()) {
                mapper.to_upper.insert(l, u);
                mapper.to_lower.insert(u, l);
            }
        }
        mapper
    }

    fn is_upper(&self, c: char) -> bool {
        self.to_lower.contains_key(&c) || c.is_uppercase()
    }

    fn upper_of(&self, c: char, out: &mut String) {
        match self.to_upper.get(&c) {
            Some(&u) => out.push(u),
            None => out.extend(c.to_uppercase()),
        }
    }

    /// Reapply the case pattern of `matched` to `replacement`,
    /// character by character; replacement characters past the end of
    /// the match adopt the case of the last matched character.
    fn apply_pattern(&self, matched: &str, replacement: &str) -> String {
        let matched: Vec<char> = matched.chars().collect();
        if matched.is_empty() {
            return replacement.to_string();
        }
        let mut out = String::with_capacity(replacement.len());
        for (i, c) in replacement.chars().enumerate() {
            let source = matched[i.min(matched.len() - 1)];
            if self.is_upper(source) {
                self.upper_of(c, &mut out);
            } else {
                out.push(c);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappings::{MappingConfig, Rule};
    use crate::normalization::NormForm;

    fn mapping(rules: Vec<Rule>) -> Mapping {
        let config = MappingConfig {
            in_lang: "test".into(),
            out_lang: "test-out".into(),
            norm_form: NormForm::None,
            ..MappingConfig::default()
        };
        Mapping::new(config, rules, Vec::new(), Default::default()).unwrap()
    }

    #[test]
    fn single_rule_single_character() {
        let m = mapping(vec![Rule::new("a", "b")]);
        let tg = m.apply("a");
        assert_eq!(tg.output(), "b");
        assert_eq!(tg.alignment(), &[(0, Some(0))]);
    }

    #[test]
    fn context_restricts_application() {
        let m = mapping(vec![
            Rule::new("a", "b").with_context("c", "d"),
            Rule::new("a", "e"),
        ]);
        let tg = m.apply("cad");
        assert_eq!(tg.output(), "cbd");
        assert_eq!(tg.alignment(), &[(0, Some(0)), (1, Some(1)), (2, Some(2))]);
    }

    #[test]
    fn expansion_aligns_many_to_many() {
        let m = mapping(vec![Rule::new("a", "xy")]);
        let tg = m.apply("na");
        assert_eq!(tg.output(), "nxy");
        assert_eq!(tg.alignment(), &[(0, Some(0)), (1, Some(1)), (1, Some(2))]);
    }

    #[test]
    fn deletion_attaches_to_neighbour() {
        let m = mapping(vec![Rule::new("h", "")]);
        let tg = m.apply("ah");
        assert_eq!(tg.output(), "a");
        assert_eq!(tg.alignment(), &[(0, Some(0)), (1, Some(0))]);
    }

    #[test]
    fn full_deletion_yields_deletion_edges() {
        let m = mapping(vec![Rule::new("h", "")]);
        let tg = m.apply("hh");
        assert_eq!(tg.output(), "");
        assert_eq!(tg.alignment(), &[(0, None), (1, None)]);
    }

    #[test]
    fn feeding_applies_by_default() {
        let m = mapping(vec![Rule::new("a", "b"), Rule::new("b", "c")]);
        let tg = m.apply("a");
        assert_eq!(tg.output(), "c");
        assert_eq!(tg.alignment(), &[(0, Some(0))]);
    }

    #[test]
    fn prevent_feeding_protects_output() {
        let m = mapping(vec![
            Rule::new("a", "b").preventing_feeding(),
            Rule::new("b", "c"),
        ]);
        let tg = m.apply("ab");
        // The first b comes from the rule and is protected; the second
        // was already there and still converts.
        assert_eq!(tg.output(), "bc");
    }

    #[test]
    fn context_may_reference_protected_output() {
        let m = mapping(vec![
            Rule::new("a", "b").preventing_feeding(),
            Rule::new("x", "y").with_context("b", ""),
        ]);
        let tg = m.apply("ax");
        assert_eq!(tg.output(), "by");
    }

    #[test]
    fn matches_do_not_overlap_within_a_rule() {
        let m = mapping(vec![Rule::new("aa", "b")]);
        let tg = m.apply("aaa");
        assert_eq!(tg.output(), "ba");
        assert_eq!(tg.alignment(), &[(0, Some(0)), (1, Some(0)), (2, Some(1))]);
    }

    #[test]
    fn out_delimiter_separates_every_application() {
        let config = MappingConfig {
            in_lang: "t".into(),
            out_lang: "u".into(),
            norm_form: NormForm::None,
            out_delimiter: " ".into(),
            ..MappingConfig::default()
        };
        let m = Mapping::new(
            config,
            vec![Rule::new("a", "A"), Rule::new("b", "B")],
            Vec::new(),
            Default::default(),
        )
        .unwrap();
        let tg = m.apply("ab");
        assert_eq!(tg.output(), "A B");
    }

    #[test]
    fn case_insensitive_lowers_unmatched_characters() {
        let config = MappingConfig {
            in_lang: "t".into(),
            out_lang: "u".into(),
            norm_form: NormForm::None,
            case_sensitive: false,
            ..MappingConfig::default()
        };
        let m = Mapping::new(
            config,
            vec![Rule::new("a", "x")],
            Vec::new(),
            Default::default(),
        )
        .unwrap();
        assert_eq!(m.apply("AB").output(), "xb");
    }

    #[test]
    fn preserve_case_restores_uppercase() {
        let config = MappingConfig {
            in_lang: "t".into(),
            out_lang: "u".into(),
            norm_form: NormForm::None,
            case_sensitive: false,
            preserve_case: true,
            ..MappingConfig::default()
        };
        let m = Mapping::new(
            config,
            vec![Rule::new("a", "e"), Rule::new("th", "d")],
            Vec::new(),
            Default::default(),
        )
        .unwrap();
        assert_eq!(m.apply("Art").output(), "Ert");
        // Multi-character match: output adopts the first char's case.
        assert_eq!(m.apply("This").output(), "Dis");
    }

    #[test]
    fn unmatched_input_passes_through() {
        let m = mapping(vec![Rule::new("q", "x")]);
        let tg = m.apply("abc");
        assert_eq!(tg.output(), "abc");
        assert_eq!(tg.alignment(), &[(0, Some(0)), (1, Some(1)), (2, Some(2))]);
    }

    #[test]
    fn empty_mapping_is_identity() {
        let m = mapping(Vec::new());
        let tg = m.apply("hello");
        assert_eq!(tg.output(), "hello");
        assert_eq!(tg.alignment().len(), 5);
    }

    #[test]
    fn nfd_alignment_composes_back_to_input() {
        let config = MappingConfig {
            in_lang: "t".into(),
            out_lang: "u".into(),
            norm_form: NormForm::Nfd,
            ..MappingConfig::default()
        };
        let m = Mapping::new(
            config,
            vec![Rule::new("e\u{0301}", "E")],
            Vec::new(),
            Default::default(),
        )
        .unwrap();
        // Precomposed input: one character on the caller's side.
        let tg = m.apply("é");
        assert_eq!(tg.output(), "E");
        assert_eq!(tg.alignment(), &[(0, Some(0))]);
    }

    #[test]
    fn trace_records_applied_rules() {
        let m = mapping(vec![Rule::new("a", "b"), Rule::new("b", "c")]);
        let tg = m.apply("a");
        assert_eq!(tg.trace().len(), 2);
        assert_eq!(tg.trace()[0].input, "a");
        assert_eq!(tg.trace()[0].output, "b");
        assert_eq!(tg.trace()[1].output, "c");
    }

    #[test]
    fn case_mapper_uses_equivalencies() {
        let mut equivalencies = BTreeMap::new();
        equivalencies.insert("ʔ".to_string(), "Ɂ".to_string());
        let mapper = CaseMapper::from_equivalencies(&equivalencies);
        assert!(mapper.is_upper('Ɂ'));
        // Extra output characters adopt the case of the last input one.
        assert_eq!(mapper.apply_pattern("Ɂ", "ʔa"), "ɁA");
    }
}
