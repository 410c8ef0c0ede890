//! Mappings: ordered collections of compiled rules plus configuration.
//!
//! A [`Mapping`] is one edge of the language network. It owns its
//! compiled rules (or its lexicon), is immutable once built, and is
//! cheap to share; the conversion machinery in [`crate::transducer`]
//! only ever borrows it.

pub mod abbreviations;
pub mod config;
pub mod lexicon;
pub mod loader;
pub mod rule;

use std::path::Path;

use crate::error::{ConfigError, Error, Result};
use crate::normalization::{self, NormForm};
use crate::transducer::{TransductionGraph, Transducer};

pub use abbreviations::Abbreviations;
pub use config::{ConfigDocument, MappingConfig, MappingType, RuleOrdering};
pub use lexicon::{AlignedSegment, Lexicon};
pub use rule::{CompileSettings, CompiledRule, Rule};

/// One compiled mapping between two notations.
#[derive(Debug)]
pub struct Mapping {
    config: MappingConfig,
    abbreviations: Abbreviations,
    rules: Vec<CompiledRule>,
    lexicon: Lexicon,
}

impl Mapping {
    /// Compile a mapping from in-memory parts.
    ///
    /// Rule strings and abbreviation expansions are unicode-unescaped
    /// and normalized to the mapping's `norm_form` before compilation;
    /// `reverse` swaps rule inputs and outputs and drops contexts; the
    /// ordering policy is applied once, here.
    pub fn new(
        config: MappingConfig,
        rules: Vec<Rule>,
        abbreviation_entries: Vec<(String, Vec<String>)>,
        lexicon: Lexicon,
    ) -> Result<Mapping> {
        config.validate()?;

        if config.mapping_type == MappingType::Lexicon && lexicon.is_empty() {
            return Err(Error::Config(ConfigError::MissingAlignments {
                in_lang: config.in_lang.clone(),
                out_lang: config.out_lang.clone(),
            }));
        }
        if config.mapping_type == MappingType::Rule && rules.is_empty() {
            log::warn!(
                "mapping from {} to {} has no rules; conversion will be the identity",
                config.in_lang,
                config.out_lang
            );
        }

        let norm = config.norm_form;
        let abbreviations = Abbreviations::from_entries(
            abbreviation_entries
                .into_iter()
                .map(|(name, exps)| {
                    let exps = exps
                        .iter()
                        .map(|e| normalization::normalize(e, norm))
                        .collect::<Vec<_>>();
                    (name, exps)
                })
                .collect::<Vec<_>>(),
        );

        let rules = compile_rules(&config, &abbreviations, rules)?;

        Ok(Mapping {
            config,
            abbreviations,
            rules,
            lexicon,
        })
    }

    /// Compile a mapping from a configuration entry, resolving its
    /// `*_path` fields relative to `base_dir`.
    pub fn from_config(config: MappingConfig, base_dir: Option<&Path>) -> Result<Mapping> {
        config.validate()?;
        let resolve = |p: &Path| match base_dir {
            Some(dir) => dir.join(p),
            None => p.to_path_buf(),
        };

        let mut rules = Vec::new();
        if let Some(path) = &config.rules_path {
            rules.extend(loader::load_rules(&resolve(path))?);
        }
        rules.extend(config.rules.iter().cloned());

        let mut abbreviation_entries = Vec::new();
        if let Some(path) = &config.abbreviations_path {
            abbreviation_entries.extend(loader::load_abbreviation_entries(&resolve(path))?);
        }
        for (name, expansions) in &config.abbreviations {
            abbreviation_entries.push((name.clone(), expansions.clone()));
        }

        let lexicon = match &config.alignments_path {
            Some(path) => loader::load_lexicon(&resolve(path))?,
            None => Lexicon::default(),
        };

        Mapping::new(config, rules, abbreviation_entries, lexicon)
    }

    /// Compile every mapping described by a configuration document.
    pub fn from_config_file(path: &Path) -> Result<Vec<Mapping>> {
        let document = loader::load_config_document(path)?;
        let base_dir = path.parent();
        document
            .mappings
            .into_iter()
            .map(|config| Mapping::from_config(config, base_dir))
            .collect()
    }

    /// Compile a plain rule mapping with default configuration; the
    /// entry point for programmatic and test mappings.
    pub fn from_rules(
        in_lang: impl Into<String>,
        out_lang: impl Into<String>,
        rules: Vec<Rule>,
    ) -> Result<Mapping> {
        let config = MappingConfig {
            in_lang: in_lang.into(),
            out_lang: out_lang.into(),
            ..MappingConfig::default()
        };
        Mapping::new(config, rules, Vec::new(), Lexicon::default())
    }

    /// The mapping's configuration.
    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// Input notation identifier.
    pub fn in_lang(&self) -> &str {
        &self.config.in_lang
    }

    /// Output notation identifier.
    pub fn out_lang(&self) -> &str {
        &self.config.out_lang
    }

    /// What drives the conversion.
    pub fn mapping_type(&self) -> MappingType {
        self.config.mapping_type
    }

    /// The compiled rules, in application order.
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// The aligned lexicon; empty unless this is a lexicon mapping.
    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// The abbreviation table the rules were compiled against.
    pub fn abbreviations(&self) -> &Abbreviations {
        &self.abbreviations
    }

    /// Apply the mapping to `input`.
    pub fn apply(&self, input: &str) -> TransductionGraph {
        Transducer::new(self).apply(input)
    }

    /// Expanded rule inputs, the raw material for the tokenizer's
    /// word-character set.
    pub fn input_inventory(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.expanded_input()).collect()
    }

    /// The source rules in current application order.
    pub fn source_rules(&self) -> Vec<Rule> {
        self.rules.iter().map(|r| r.rule().clone()).collect()
    }

    /// Append another mapping's rules after this mapping's own and
    /// recompile under this mapping's configuration.
    ///
    /// Where the two mappings hold contradictory rules, this mapping's
    /// copy keeps precedence by coming first.
    pub fn extend(&mut self, other: &Mapping) -> Result<()> {
        let mut rules = self.source_rules();
        rules.extend(other.source_rules());
        self.rules = compile_rules(&self.config, &self.abbreviations, rules)?;
        Ok(())
    }

    /// Drop duplicate rules, keeping the first copy of each.
    pub fn deduplicate(&mut self) -> Result<()> {
        let mut seen = Vec::new();
        let mut rules = Vec::new();
        for rule in self.source_rules() {
            if !seen.contains(&rule) {
                seen.push(rule.clone());
                rules.push(rule);
            }
        }
        self.rules = compile_rules(&self.config, &self.abbreviations, rules)?;
        Ok(())
    }
}

/// Normalize, reverse, compile and order a rule list.
fn compile_rules(
    config: &MappingConfig,
    abbreviations: &Abbreviations,
    rules: Vec<Rule>,
) -> Result<Vec<CompiledRule>> {
    let norm = config.norm_form;
    let settings = CompileSettings {
        case_sensitive: config.case_sensitive,
        escape_special: config.escape_special,
        prevent_feeding: config.prevent_feeding,
        in_lang: config.in_lang.clone(),
        out_lang: config.out_lang.clone(),
    };

    let mut compiled = Vec::with_capacity(rules.len());
    for (index, rule) in rules.into_iter().enumerate() {
        let mut rule = normalize_rule(rule, norm);
        if config.reverse {
            std::mem::swap(&mut rule.rule_input, &mut rule.rule_output);
            rule.context_before.clear();
            rule.context_after.clear();
        }
        compiled.push(CompiledRule::compile(rule, index, abbreviations, &settings)?);
    }

    if config.rule_ordering == RuleOrdering::ApplyLongestFirst {
        // Stable, so rules of equal length keep their source order.
        compiled.sort_by_key(|r| std::cmp::Reverse(r.effective_length()));
    }
    Ok(compiled)
}

fn normalize_rule(mut rule: Rule, norm: NormForm) -> Rule {
    rule.rule_input = normalization::normalize(&rule.rule_input, norm);
    rule.rule_output = normalization::normalize(&rule.rule_output, norm);
    rule.context_before = normalization::normalize(&rule.context_before, norm);
    rule.context_after = normalization::normalize(&rule.context_after, norm);
    rule
}
