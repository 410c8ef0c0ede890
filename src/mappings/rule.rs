//! Rule compilation: textual rewrite rules into anchored matchers.
//!
//! A rule `input -> output / before _ after` compiles to a regex of the
//! shape `(?<=before)input(?=after)` plus a literal replacement string.
//! The pattern-source strings are kept alongside the compiled matcher so
//! mappings can be reversed, serialized and debugged without losing the
//! author's notation.

use serde::{Deserialize, Serialize};

use crate::error::CompileError;

use super::abbreviations::{reference_pattern, Abbreviations};

/// One rewrite rule as written in a rules file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// The character(s) to consume. Never empty after compilation.
    #[serde(rename = "in", alias = "rule_input")]
    pub rule_input: String,

    /// What the consumed characters become; may be empty (a deletion).
    #[serde(rename = "out", alias = "rule_output", default)]
    pub rule_output: String,

    /// Pattern that must match immediately before the input.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context_before: String,

    /// Pattern that must match immediately after the input.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context_after: String,

    /// Protect this rule's output from every later rule in the mapping.
    #[serde(default, skip_serializing_if = "is_false")]
    pub prevent_feeding: bool,

    /// Free-form note carried through serialization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Rule {
    /// A plain `input -> output` rule with no contexts.
    pub fn new(rule_input: impl Into<String>, rule_output: impl Into<String>) -> Self {
        Rule {
            rule_input: rule_input.into(),
            rule_output: rule_output.into(),
            context_before: String::new(),
            context_after: String::new(),
            prevent_feeding: false,
            comment: None,
        }
    }

    /// The same rule with contexts attached.
    pub fn with_context(mut self, before: impl Into<String>, after: impl Into<String>) -> Self {
        self.context_before = before.into();
        self.context_after = after.into();
        self
    }

    /// The same rule with feeding prevented.
    pub fn preventing_feeding(mut self) -> Self {
        self.prevent_feeding = true;
        self
    }
}

/// Mapping-level settings the compiler needs for each rule.
#[derive(Debug, Clone)]
pub struct CompileSettings {
    /// Compile case-insensitive matchers and lowercase replacements.
    pub case_sensitive: bool,
    /// Treat rule text as literal characters.
    pub escape_special: bool,
    /// Mapping-wide feeding prevention, OR-ed with the rule's own flag.
    pub prevent_feeding: bool,
    /// For diagnostics.
    pub in_lang: String,
    /// For diagnostics.
    pub out_lang: String,
}

/// A rule compiled against its mapping's configuration.
#[derive(Debug)]
pub struct CompiledRule {
    rule: Rule,
    pattern: fancy_regex::Regex,
    expanded_input: String,
    replacement: String,
    effective_length: usize,
    source_index: usize,
    prevent_feeding: bool,
}

impl CompiledRule {
    /// Compile one rule. `index` is the rule's position in the source
    /// file, used as the tie-breaking ordering key.
    pub fn compile(
        rule: Rule,
        index: usize,
        abbreviations: &Abbreviations,
        settings: &CompileSettings,
    ) -> Result<CompiledRule, CompileError> {
        // Effective match length is measured on the literal form, with
        // abbreviations standing in for their longest alternative.
        let effective_length = abbreviations
            .longest_form(&rule.rule_input)?
            .chars()
            .count();

        let escape = settings.escape_special;
        let input = abbreviations.expand(&prepare(&rule.rule_input, escape), escape)?;
        let before = abbreviations.expand(&prepare(&rule.context_before, escape), escape)?;
        let after = abbreviations.expand(&prepare(&rule.context_after, escape), escape)?;
        let output = abbreviations.expand(&rule.rule_output, false)?;

        if input.is_empty() {
            return Err(CompileError::EmptyRuleInput {
                rule_output: rule.rule_output.clone(),
            });
        }

        let mut source = String::new();
        if !settings.case_sensitive {
            source.push_str("(?i)");
        }
        source.push_str(&lookbehind_for(&before));
        source.push_str(&input);
        if !after.is_empty() {
            source.push_str("(?=");
            source.push_str(&after);
            source.push(')');
        }

        let pattern =
            fancy_regex::Regex::new(&source).map_err(|e| CompileError::BadPattern {
                rule_input: rule.rule_input.clone(),
                in_lang: settings.in_lang.clone(),
                out_lang: settings.out_lang.clone(),
                source: Box::new(e),
            })?;

        let replacement = if settings.case_sensitive {
            output
        } else {
            output.to_lowercase()
        };

        Ok(CompiledRule {
            prevent_feeding: settings.prevent_feeding || rule.prevent_feeding,
            rule,
            pattern,
            expanded_input: input,
            replacement,
            effective_length,
            source_index: index,
        })
    }

    /// The rule as written, for serialization and reversal.
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// The compiled matcher.
    pub fn pattern(&self) -> &fancy_regex::Regex {
        &self.pattern
    }

    /// The input pattern with abbreviations expanded; the tokenizer
    /// derives word characters from this.
    pub fn expanded_input(&self) -> &str {
        &self.expanded_input
    }

    /// The literal replacement string.
    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Match length of the fully expanded literal input.
    pub fn effective_length(&self) -> usize {
        self.effective_length
    }

    /// Position in the source file; the ordering tie-breaker.
    pub fn source_index(&self) -> usize {
        self.source_index
    }

    /// Whether this rule's output is protected from later rules.
    pub fn prevent_feeding(&self) -> bool {
        self.prevent_feeding
    }
}

/// Escape rule text when the mapping wants literals, leaving `{NAME}`
/// references intact for the expansion pass.
fn prepare(text: &str, escape: bool) -> String {
    if !escape {
        return text.to_string();
    }
    let pattern = reference_pattern();
    let mut result = String::with_capacity(text.len());
    let mut last = 0;
    for m in pattern.find_iter(text) {
        result.push_str(&regex::escape(&text[last..m.start()]));
        result.push_str(m.as_str());
        last = m.end();
    }
    result.push_str(&regex::escape(&text[last..]));
    result
}

/// Wrap a context-before pattern in lookbehind.
///
/// Alternations of fixed-width branches are regrouped by width and each
/// width gets its own lookbehind, tried longest first. Patterns whose
/// width cannot be computed fall through as a single lookbehind for the
/// engine to handle.
fn lookbehind_for(before: &str) -> String {
    if before.is_empty() {
        return String::new();
    }
    let inner = strip_outer_group(before);
    let Some(alternatives) = split_alternatives(inner) else {
        return format!("(?<={before})");
    };
    let mut widths = Vec::with_capacity(alternatives.len());
    for alt in &alternatives {
        match fixed_width(alt) {
            Some(w) => widths.push(w),
            None => return format!("(?<={before})"),
        }
    }

    let mut order: Vec<usize> = (0..alternatives.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(widths[i]));

    let mut groups: Vec<(usize, Vec<&str>)> = Vec::new();
    for i in order {
        match groups.last_mut() {
            Some((w, alts)) if *w == widths[i] => alts.push(&alternatives[i]),
            _ => groups.push((widths[i], vec![&alternatives[i]])),
        }
    }

    if groups.len() == 1 {
        return format!("(?<={})", groups[0].1.join("|"));
    }
    let branches: Vec<String> = groups
        .iter()
        .map(|(_, alts)| format!("(?<={})", alts.join("|")))
        .collect();
    format!("(?:{})", branches.join("|"))
}

/// Remove one redundant level of grouping around the whole pattern.
fn strip_outer_group(pattern: &str) -> &str {
    let stripped = pattern
        .strip_prefix("(?:")
        .or_else(|| pattern.strip_prefix('('))
        .and_then(|rest| rest.strip_suffix(')'));
    match stripped {
        Some(inner) if balanced(inner) => inner,
        _ => pattern,
    }
}

fn balanced(pattern: &str) -> bool {
    let mut depth = 0i32;
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Split on top-level `|`. Returns `None` when the pattern nests groups,
/// which the width computation does not model.
fn split_alternatives(pattern: &str) -> Option<Vec<String>> {
    let mut alternatives = Vec::new();
    let mut current = String::new();
    let mut in_class = false;
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '[' if !in_class => {
                in_class = true;
                current.push(c);
            }
            ']' if in_class => {
                in_class = false;
                current.push(c);
            }
            '(' | ')' if !in_class => return None,
            '|' if !in_class => {
                alternatives.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    alternatives.push(current);
    Some(alternatives)
}

/// Width in characters of a fixed-width alternative, or `None` when the
/// alternative uses quantifiers or anything else of variable width.
fn fixed_width(alternative: &str) -> Option<usize> {
    let mut width = 0usize;
    let mut chars = alternative.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            // Anchors take no width of their own.
            '^' | '$' => {}
            '\\' => {
                let escaped = chars.next()?;
                // Word boundaries are zero-width; everything else
                // escaped is one character.
                if escaped != 'b' && escaped != 'B' {
                    width += 1;
                }
            }
            '[' => {
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == ']' {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return None;
                }
                width += 1;
            }
            '*' | '+' | '?' | '{' | '(' | ')' => return None,
            _ => width += 1,
        }
    }
    Some(width)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CompileSettings {
        CompileSettings {
            case_sensitive: true,
            escape_special: false,
            prevent_feeding: false,
            in_lang: "test".into(),
            out_lang: "test-out".into(),
        }
    }

    fn compile(rule: Rule) -> CompiledRule {
        CompiledRule::compile(rule, 0, &Abbreviations::default(), &settings()).unwrap()
    }

    #[test]
    fn plain_rule_matches_its_input() {
        let compiled = compile(Rule::new("th", "θ"));
        assert!(compiled.pattern().is_match("nothing").unwrap());
        assert_eq!(compiled.replacement(), "θ");
        assert_eq!(compiled.effective_length(), 2);
    }

    #[test]
    fn context_after_becomes_lookahead() {
        let compiled = compile(Rule::new("c", "s").with_context("", "i|e"));
        let m = compiled.pattern().find("co ci").unwrap().unwrap();
        assert_eq!(m.start(), 3);
    }

    #[test]
    fn context_before_becomes_lookbehind() {
        let compiled = compile(Rule::new("a", "e").with_context("c", ""));
        let m = compiled.pattern().find("a ca").unwrap().unwrap();
        assert_eq!(m.start(), 3);
    }

    #[test]
    fn variable_length_context_groups_by_width() {
        assert_eq!(lookbehind_for("a|bb|c"), "(?:(?<=bb)|(?<=a|c))");
        assert_eq!(lookbehind_for("x"), "(?<=x)");
        assert_eq!(lookbehind_for("(a|bb)"), "(?:(?<=bb)|(?<=a))");
    }

    #[test]
    fn anchors_are_zero_width_in_lookbehind() {
        assert_eq!(lookbehind_for("^|a"), "(?:(?<=a)|(?<=^))");
        let compiled = compile(Rule::new("h", "H").with_context("^", ""));
        let m = compiled.pattern().find("hah").unwrap().unwrap();
        assert_eq!(m.start(), 0);
    }

    #[test]
    fn mixed_width_lookbehind_matches_both_widths() {
        let compiled = compile(Rule::new("x", "y").with_context("a|bb", ""));
        assert_eq!(compiled.pattern().find("ax").unwrap().unwrap().start(), 1);
        assert_eq!(compiled.pattern().find("bbx").unwrap().unwrap().start(), 2);
        assert!(compiled.pattern().find("cx").unwrap().is_none());
    }

    #[test]
    fn case_insensitive_lowers_replacement() {
        let mut s = settings();
        s.case_sensitive = false;
        let compiled =
            CompiledRule::compile(Rule::new("A", "B"), 0, &Abbreviations::default(), &s).unwrap();
        assert!(compiled.pattern().is_match("a").unwrap());
        assert_eq!(compiled.replacement(), "b");
    }

    #[test]
    fn escape_special_makes_metacharacters_literal() {
        let mut s = settings();
        s.escape_special = true;
        let compiled =
            CompiledRule::compile(Rule::new("a.b", "x"), 0, &Abbreviations::default(), &s).unwrap();
        assert!(compiled.pattern().is_match("a.b").unwrap());
        assert!(!compiled.pattern().is_match("acb").unwrap());
    }

    #[test]
    fn abbreviations_expand_in_input_and_contexts() {
        let abbs = Abbreviations::from_entries(vec![("V", vec!["a", "e"])]);
        let compiled =
            CompiledRule::compile(Rule::new("t", "d").with_context("{V}", ""), 0, &abbs, &settings())
                .unwrap();
        assert_eq!(compiled.pattern().find("at").unwrap().unwrap().start(), 1);
        assert!(compiled.pattern().find("xt").unwrap().is_none());
    }

    #[test]
    fn effective_length_uses_longest_alternative() {
        let abbs = Abbreviations::from_entries(vec![("STOP", vec!["p", "kw"])]);
        let compiled =
            CompiledRule::compile(Rule::new("{STOP}a", "x"), 0, &abbs, &settings()).unwrap();
        assert_eq!(compiled.effective_length(), 3);
    }

    #[test]
    fn empty_input_is_rejected() {
        let err =
            CompiledRule::compile(Rule::new("", "x"), 0, &Abbreviations::default(), &settings())
                .unwrap_err();
        assert!(matches!(err, CompileError::EmptyRuleInput { .. }));
    }

    #[test]
    fn bad_pattern_is_reported() {
        let err = CompiledRule::compile(
            Rule::new("[unclosed", "x"),
            0,
            &Abbreviations::default(),
            &settings(),
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::BadPattern { .. }));
    }
}
