//! The mapping network: notation identifiers connected by mappings.
//!
//! Nodes are opaque notation identifiers (`dan`, `dan-ipa`,
//! `eng-arpabet`); each [`Mapping`] is a directed edge keyed by its
//! `(in_lang, out_lang)` pair. Conversion between two notations walks
//! the shortest path between them and chains the mappings along it.
//!
//! The network is loaded once (from a compiled index) and is read-only
//! afterwards, so conversions can run concurrently without locking.

mod graph;
mod index;

use std::path::Path;

use rustc_hash::FxHashMap;

use crate::error::{NetworkError, Result};
use crate::mappings::Mapping;
use crate::tokenizer::Tokenizer;
use crate::transducer::{CompositeTransducer, CompositeTransductionGraph, TokenizingTransducer};

pub use graph::DiGraph;
pub use index::{load_index, rebuild, write_index, CATALOG_FILE, CONFIG_FILE, NETWORK_FILE, SCHEMA_VERSION};

/// True for notation identifiers in the IPA naming convention.
pub fn is_ipa(lang: &str) -> bool {
    lang.ends_with("ipa")
}

/// A compiled collection of mappings and the graph connecting them.
#[derive(Debug, Default)]
pub struct Network {
    graph: DiGraph,
    mappings: Vec<Mapping>,
    by_pair: FxHashMap<(String, String), usize>,
}

impl Network {
    /// A network with no nodes; the substitute used by tests.
    pub fn empty() -> Self {
        Network::default()
    }

    /// Build a network from mappings, in registration order.
    pub fn from_mappings<I>(mappings: I) -> Self
    where
        I: IntoIterator<Item = Mapping>,
    {
        let mut network = Network::empty();
        for mapping in mappings {
            network.add_mapping(mapping);
        }
        network
    }

    /// Load the compiled index from `dir`; see [`load_index`].
    pub fn load(dir: &Path) -> Result<Self> {
        load_index(dir)
    }

    /// Install a mapping as an edge, replacing any existing mapping
    /// with the same `(in_lang, out_lang)` identity.
    pub fn add_mapping(&mut self, mapping: Mapping) {
        let key = (
            mapping.in_lang().to_string(),
            mapping.out_lang().to_string(),
        );
        self.graph.add_edge(key.0.clone(), key.1.clone());
        match self.by_pair.get(&key) {
            Some(&index) => {
                log::warn!(
                    "replacing existing mapping from {} to {}",
                    key.0,
                    key.1
                );
                self.mappings[index] = mapping;
            }
            None => {
                self.by_pair.insert(key, self.mappings.len());
                self.mappings.push(mapping);
            }
        }
    }

    /// The mapping on edge `(in_lang, out_lang)`, if registered.
    pub fn get(&self, in_lang: &str, out_lang: &str) -> Option<&Mapping> {
        self.by_pair
            .get(&(in_lang.to_string(), out_lang.to_string()))
            .map(|&index| &self.mappings[index])
    }

    /// Every registered mapping, in registration order.
    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// The underlying graph.
    pub fn graph(&self) -> &DiGraph {
        &self.graph
    }

    pub(crate) fn graph_mut(&mut self) -> &mut DiGraph {
        &mut self.graph
    }

    /// True when `lang` is a node in the network.
    pub fn contains(&self, lang: &str) -> bool {
        self.graph.contains(lang)
    }

    /// Notations reachable from `in_lang`.
    pub fn descendants(&self, in_lang: &str) -> Result<Vec<String>> {
        if !self.graph.contains(in_lang) {
            return Err(NetworkError::UnknownLang {
                lang: in_lang.to_string(),
            }
            .into());
        }
        Ok(self.graph.descendants(in_lang))
    }

    /// The mappings along the shortest path from `in_lang` to
    /// `out_lang`, in application order.
    pub fn find_path(&self, in_lang: &str, out_lang: &str) -> Result<Vec<&Mapping>> {
        for lang in [in_lang, out_lang] {
            if !self.graph.contains(lang) {
                return Err(NetworkError::UnknownLang {
                    lang: lang.to_string(),
                }
                .into());
            }
        }
        let Some(path) = self.graph.shortest_path(in_lang, out_lang) else {
            return Err(NetworkError::NoPath {
                in_lang: in_lang.to_string(),
                out_lang: out_lang.to_string(),
            }
            .into());
        };
        path.windows(2)
            .map(|hop| {
                self.get(&hop[0], &hop[1]).ok_or_else(|| {
                    crate::error::Error::Network(NetworkError::MappingMissing {
                        in_lang: hop[0].clone(),
                        out_lang: hop[1].clone(),
                    })
                })
            })
            .collect()
    }

    /// The transducer chain for the shortest path between two
    /// notations.
    pub fn transducer_for(&self, in_lang: &str, out_lang: &str) -> Result<CompositeTransducer<'_>> {
        Ok(CompositeTransducer::new(self.find_path(in_lang, out_lang)?))
    }

    /// The tokenizer for input written in `in_lang`.
    ///
    /// Word characters come from the rule inputs of the mapping that
    /// will consume the text: the mapping to an IPA successor when one
    /// exists, else the first two hops towards one, else the first
    /// successor. A notation with no mappings gets the default
    /// Unicode tokenizer.
    pub fn make_tokenizer(&self, in_lang: &str) -> Tokenizer {
        let tokenizer = self.pick_tokenizer(in_lang);
        // Tlingit uses a period as a letter except word-finally.
        if in_lang == "tli" {
            tokenizer.with_dot_as_letter(true)
        } else {
            tokenizer
        }
    }

    fn pick_tokenizer(&self, in_lang: &str) -> Tokenizer {
        let successors = self.graph.successors(in_lang);
        if let Some(out) = successors.iter().find(|s| is_ipa(s)) {
            if let Some(mapping) = self.get(in_lang, out) {
                return Tokenizer::from_mappings([mapping]);
            }
        }
        // No direct IPA successor; try a two-hop path through the
        // first successor.
        if let Some(first) = successors.first() {
            if let Some(second) = self.graph.successors(first).iter().find(|s| is_ipa(s)) {
                if let (Some(hop1), Some(hop2)) =
                    (self.get(in_lang, first), self.get(first, second))
                {
                    return Tokenizer::from_mappings([hop1, hop2]);
                }
            }
            if let Some(mapping) = self.get(in_lang, first) {
                return Tokenizer::from_mappings([mapping]);
            }
        }
        log::debug!("no mapping found for {in_lang}; using the default tokenizer");
        Tokenizer::new()
    }

    /// Convert `text` from `in_lang` to `out_lang`, tokenizing so only
    /// word segments are transduced.
    pub fn convert(
        &self,
        text: &str,
        in_lang: &str,
        out_lang: &str,
    ) -> Result<CompositeTransductionGraph> {
        Ok(make_g2p(self, in_lang, out_lang)?.apply(text))
    }
}

/// Build the tokenizing transducer for converting `in_lang` text to
/// `out_lang` over the shortest mapping path.
pub fn make_g2p<'n>(
    network: &'n Network,
    in_lang: &str,
    out_lang: &str,
) -> Result<TokenizingTransducer<'n>> {
    let transducer = network.transducer_for(in_lang, out_lang)?;
    let tokenizer = network.make_tokenizer(in_lang);
    Ok(TokenizingTransducer::new(transducer, tokenizer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappings::Rule;

    fn two_hop_network() -> Network {
        Network::from_mappings(vec![
            Mapping::from_rules("dan", "dan-ipa", vec![Rule::new("j", "j")]).unwrap(),
            Mapping::from_rules("dan-ipa", "eng-ipa", vec![Rule::new("j", "y")]).unwrap(),
        ])
    }

    #[test]
    fn find_path_chains_mappings() {
        let network = two_hop_network();
        let path = network.find_path("dan", "eng-ipa").unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].out_lang(), "dan-ipa");
    }

    #[test]
    fn unknown_lang_is_a_lookup_error() {
        let network = two_hop_network();
        let err = network.find_path("nope", "eng-ipa").unwrap_err();
        assert!(err.to_string().contains("unknown language"));
    }

    #[test]
    fn unconnected_langs_have_no_path() {
        let mut network = two_hop_network();
        network.add_mapping(
            Mapping::from_rules("moh", "moh-ipa", vec![Rule::new("k", "k")]).unwrap(),
        );
        let err = network.convert("x", "dan", "moh-ipa").unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn replacing_a_mapping_keeps_identity_unique() {
        let mut network = two_hop_network();
        network.add_mapping(
            Mapping::from_rules("dan", "dan-ipa", vec![Rule::new("j", "ʒ")]).unwrap(),
        );
        assert_eq!(network.mappings().len(), 2);
        let result = network.convert("j", "dan", "dan-ipa").unwrap();
        assert_eq!(result.output(), "ʒ");
    }

    #[test]
    fn convert_walks_the_path() {
        let network = two_hop_network();
        let result = network.convert("j", "dan", "eng-ipa").unwrap();
        assert_eq!(result.output(), "y");
        assert_eq!(result.tiers().len(), 2);
    }

    #[test]
    fn descendants_follow_edges() {
        let network = two_hop_network();
        assert_eq!(
            network.descendants("dan").unwrap(),
            vec!["dan-ipa".to_string(), "eng-ipa".to_string()]
        );
        assert!(network.descendants("??").is_err());
    }

    #[test]
    fn tokenizer_uses_ipa_successor_inventory() {
        let network = Network::from_mappings(vec![Mapping::from_rules(
            "moh",
            "moh-ipa",
            vec![Rule::new("'", "ʔ"), Rule::new("k", "k")],
        )
        .unwrap()]);
        let tokens = network.make_tokenizer("moh").tokenize("ka'k");
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_word);
    }

    #[test]
    fn same_lang_conversion_is_identity() {
        let network = two_hop_network();
        let result = network.convert("jam", "dan", "dan").unwrap();
        assert_eq!(result.output(), "jam");
    }
}
