//! Generating direct mappings by composing a path.
//!
//! Where the network connects two notations only through intermediate
//! hops, a direct mapping can be generated: every unit of the first
//! hop's input inventory is converted through the whole chain and the
//! resulting pairs become literal rules. The generated mapping is an
//! ordinary edge that can be registered and serialized like any other.

use crate::error::Result;
use crate::mappings::{Mapping, MappingConfig, Rule, RuleOrdering};
use crate::network::{is_ipa, Network};

/// How `generate_mapping` picks its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerateMode {
    /// Compose the path from `in_lang` to `out_lang` as given.
    #[default]
    Direct,
    /// Compose the IPA side: from `in_lang`'s IPA notation to
    /// `out_lang`'s, following the `-ipa` suffix convention.
    Ipa,
}

/// Suffix a notation with `-ipa` unless it already follows the
/// convention.
fn ipa_form(lang: &str) -> String {
    if is_ipa(lang) {
        lang.to_string()
    } else {
        format!("{lang}-ipa")
    }
}

/// Generate a direct mapping from `in_lang` to `out_lang` by composing
/// the mappings along the shortest path between them.
///
/// The generated rules pair each unit of the first hop's expanded
/// input inventory with its converted form, longest first, with
/// duplicates and identity-producing units dropped.
pub fn generate_mapping(
    network: &Network,
    in_lang: &str,
    out_lang: &str,
    mode: GenerateMode,
) -> Result<Mapping> {
    let (in_lang, out_lang) = match mode {
        GenerateMode::Direct => (in_lang.to_string(), out_lang.to_string()),
        GenerateMode::Ipa => (ipa_form(in_lang), ipa_form(out_lang)),
    };

    let hops = network.find_path(&in_lang, &out_lang)?;
    let transducer = crate::transducer::CompositeTransducer::new(hops.iter().copied());

    let mut units: Vec<String> = hops
        .first()
        .map(|m| {
            m.input_inventory()
                .into_iter()
                .flat_map(split_units)
                .collect()
        })
        .unwrap_or_default();
    units.sort();
    units.dedup();

    let mut rules: Vec<Rule> = units
        .into_iter()
        .filter_map(|unit| {
            let output = transducer.apply(&unit).output().to_string();
            if output == unit {
                return None;
            }
            Some(Rule::new(unit, output))
        })
        .collect();
    // Longest inputs first so digraphs survive the as-written order of
    // the generated file.
    rules.sort_by_key(|r| std::cmp::Reverse(r.rule_input.chars().count()));

    log::info!(
        "generated {} rules for {} to {}",
        rules.len(),
        in_lang,
        out_lang
    );

    let config = MappingConfig {
        in_lang: in_lang.clone(),
        out_lang: out_lang.clone(),
        display_name: Some(format!("{in_lang} to {out_lang} (generated)")),
        rule_ordering: RuleOrdering::ApplyLongestFirst,
        ..MappingConfig::default()
    };
    Mapping::new(config, rules, Vec::new(), Default::default())
}

/// Split an expanded rule input into literal units, the same shapes
/// the tokenizer uses.
fn split_units(input: &str) -> Vec<String> {
    let stripped = input.replace("(?:", "").replace(['(', ')'], "");
    stripped
        .split('|')
        .filter(|u| !u.is_empty())
        .map(String::from)
        .collect()
}
