//! Mapping configuration: the document format and its validation.
//!
//! One configuration document (`config-g2p.yaml`) describes the mappings
//! of a language folder under a top-level `mappings:` list. Every field
//! is explicit; unknown fields are rejected at load so typos surface
//! immediately instead of silently changing behaviour.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::normalization::NormForm;

use super::rule::Rule;

/// What drives a mapping's conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingType {
    /// Context-sensitive rewrite rules; the default.
    #[default]
    #[serde(alias = "mapping")]
    Rule,
    /// ASCII transliteration of arbitrary Unicode input.
    Unidecode,
    /// Lookup in a precomputed aligned lexicon.
    Lexicon,
}

impl fmt::Display for MappingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingType::Rule => write!(f, "rule"),
            MappingType::Unidecode => write!(f, "unidecode"),
            MappingType::Lexicon => write!(f, "lexicon"),
        }
    }
}

/// The order in which rules are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RuleOrdering {
    /// Top to bottom, in the order the source file lists them.
    #[default]
    #[serde(rename = "as-written")]
    AsWritten,
    /// Stable sort by effective input length, longest first, so shorter
    /// rules cannot feed on the inputs of longer ones.
    #[serde(rename = "apply-longest-first")]
    ApplyLongestFirst,
}

impl fmt::Display for RuleOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleOrdering::AsWritten => write!(f, "as-written"),
            RuleOrdering::ApplyLongestFirst => write!(f, "apply-longest-first"),
        }
    }
}

fn default_lang() -> String {
    "standalone".to_string()
}

fn is_default_lang(lang: &str) -> bool {
    lang == "standalone"
}

const fn default_true() -> bool {
    true
}

/// Configuration for a single mapping, one entry of the `mappings:` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingConfig {
    /// Input notation identifier; one end of the network edge.
    #[serde(default = "default_lang", skip_serializing_if = "is_default_lang")]
    pub in_lang: String,

    /// Output notation identifier; the other end of the network edge.
    #[serde(default = "default_lang", skip_serializing_if = "is_default_lang")]
    pub out_lang: String,

    /// Human-readable label for the mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Human-readable name of the language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_name: Option<String>,

    /// What drives the conversion.
    #[serde(rename = "type", default)]
    pub mapping_type: MappingType,

    /// Order in which rules apply.
    #[serde(default)]
    pub rule_ordering: RuleOrdering,

    /// When false, matchers are case-insensitive and outputs lowercase.
    #[serde(default = "default_true")]
    pub case_sensitive: bool,

    /// Reapply the case pattern of the matched input to the output.
    /// Requires `case_sensitive: false`.
    #[serde(default)]
    pub preserve_case: bool,

    /// Lower/upper pairs for characters the Unicode tables cannot case.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub case_equivalencies: BTreeMap<String, String>,

    /// Treat every rule character as a literal.
    #[serde(default)]
    pub escape_special: bool,

    /// Normalization applied to rules and conversion input.
    #[serde(default)]
    pub norm_form: NormForm,

    /// At most one character, inserted after every rule application.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub out_delimiter: String,

    /// Swap rule inputs and outputs at load time, dropping contexts.
    #[serde(default)]
    pub reverse: bool,

    /// Prevent every rule from feeding later rules.
    #[serde(default)]
    pub prevent_feeding: bool,

    /// Rules given inline in the configuration document.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,

    /// Path to a rules file, relative to the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules_path: Option<PathBuf>,

    /// Abbreviations given inline in the configuration document.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub abbreviations: BTreeMap<String, Vec<String>>,

    /// Path to an abbreviations file, relative to the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviations_path: Option<PathBuf>,

    /// Path to an aligned lexicon, required for lexicon mappings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignments_path: Option<PathBuf>,

    /// People responsible for the mapping; metadata only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,

    /// Removed boolean predecessor of `rule_ordering`. Recognized only
    /// so its rejection can point at the replacement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_is: Option<bool>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        MappingConfig {
            in_lang: default_lang(),
            out_lang: default_lang(),
            display_name: None,
            language_name: None,
            mapping_type: MappingType::default(),
            rule_ordering: RuleOrdering::default(),
            case_sensitive: true,
            preserve_case: false,
            case_equivalencies: BTreeMap::new(),
            escape_special: false,
            norm_form: NormForm::default(),
            out_delimiter: String::new(),
            reverse: false,
            prevent_feeding: false,
            rules: Vec::new(),
            rules_path: None,
            abbreviations: BTreeMap::new(),
            abbreviations_path: None,
            alignments_path: None,
            authors: None,
            as_is: None,
        }
    }
}

impl MappingConfig {
    /// Check the cross-field invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(as_is) = self.as_is {
            return Err(ConfigError::AsIsRemoved {
                in_lang: self.in_lang.clone(),
                out_lang: self.out_lang.clone(),
                as_is,
                replacement: if as_is {
                    "as-written"
                } else {
                    "apply-longest-first"
                },
            });
        }
        if self.preserve_case && self.case_sensitive {
            return Err(ConfigError::ConflictingCaseFlags {
                in_lang: self.in_lang.clone(),
                out_lang: self.out_lang.clone(),
            });
        }
        if self.out_delimiter.chars().count() > 1 {
            return Err(ConfigError::DelimiterTooLong {
                delimiter: self.out_delimiter.clone(),
            });
        }
        for (lower, upper) in &self.case_equivalencies {
            if lower.chars().count() != upper.chars().count() {
                return Err(ConfigError::UnevenCaseEquivalency {
                    lower: lower.clone(),
                    upper: upper.clone(),
                });
            }
        }
        Ok(())
    }

    /// Label shown in diagnostics and `show-mappings` output.
    pub fn display_name(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| format!("{} to {}", self.in_lang, self.out_lang))
    }
}

/// A whole configuration document: one `mappings:` list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigDocument {
    /// The mappings this document defines, in order.
    pub mappings: Vec<MappingConfig>,
}
