//! The compiled index: a serialized network on disk.
//!
//! `g2p update` compiles every mapping configuration it can find and
//! writes two gzip-compressed JSON files: a catalog of the compiled
//! mappings and a node-link description of the graph. Both carry a
//! schema version; a mismatch fails loudly instead of misreading data
//! written by another build.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Error, Result};
use crate::mappings::{Lexicon, Mapping, MappingConfig, Rule};

use super::Network;

/// Version stamp written into both index files.
pub const SCHEMA_VERSION: &str = "1.0";

/// File name of the mapping catalog.
pub const CATALOG_FILE: &str = "langs.json.gz";

/// File name of the graph description.
pub const NETWORK_FILE: &str = "network.json.gz";

/// Name of the per-folder configuration document `update` looks for.
pub const CONFIG_FILE: &str = "config-g2p.yaml";

#[derive(Debug, Serialize, Deserialize)]
struct Catalog {
    schema_version: String,
    mappings: Vec<MappingRecord>,
}

/// One mapping, flattened for the catalog: configuration plus the data
/// its path fields pointed at.
#[derive(Debug, Serialize, Deserialize)]
struct MappingRecord {
    config: MappingConfig,
    #[serde(default)]
    rules: Vec<Rule>,
    #[serde(default)]
    abbreviations: Vec<(String, Vec<String>)>,
    #[serde(default)]
    alignments: Vec<String>,
}

impl MappingRecord {
    fn from_mapping(mapping: &Mapping) -> Self {
        let mut config = mapping.config().clone();
        // The record embeds everything the paths pointed at, and the
        // rules are stored post-reversal.
        config.rules_path = None;
        config.abbreviations_path = None;
        config.alignments_path = None;
        config.rules = Vec::new();
        config.abbreviations = Default::default();
        config.reverse = false;
        MappingRecord {
            config,
            rules: mapping.source_rules(),
            abbreviations: mapping
                .abbreviations()
                .entries()
                .map(|(name, exps)| (name.to_string(), exps.to_vec()))
                .collect(),
            alignments: mapping.lexicon().lines().map(String::from).collect(),
        }
    }

    fn into_mapping(self) -> Result<Mapping> {
        Mapping::new(
            self.config,
            self.rules,
            self.abbreviations,
            Lexicon::from_lines(self.alignments),
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeRecord {
    id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct LinkRecord {
    source: String,
    target: String,
}

/// Node-link graph description, the shape the studio's network view
/// consumes directly.
#[derive(Debug, Serialize, Deserialize)]
struct NodeLinkData {
    schema_version: String,
    directed: bool,
    multigraph: bool,
    nodes: Vec<NodeRecord>,
    links: Vec<LinkRecord>,
}

fn read_versioned<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let reader = BufReader::new(GzDecoder::new(file));
    let value: serde_json::Value = serde_json::from_reader(reader).map_err(|e| {
        Error::Config(ConfigError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    })?;
    let found = value
        .get("schema_version")
        .and_then(|v| v.as_str())
        .unwrap_or("missing")
        .to_string();
    if found != SCHEMA_VERSION {
        return Err(Error::Config(ConfigError::SchemaVersionMismatch {
            path: path.to_path_buf(),
            found,
            expected: SCHEMA_VERSION,
        }));
    }
    serde_json::from_value(value).map_err(|e| {
        Error::Config(ConfigError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    })
}

fn write_gz_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    serde_json::to_writer(&mut encoder, value)
        .map_err(|e| Error::io(path, std::io::Error::new(std::io::ErrorKind::Other, e)))?;
    encoder.finish().map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// Write `network` as a compiled index into `out_dir`.
pub fn write_index(network: &Network, out_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(out_dir).map_err(|e| Error::io(out_dir, e))?;

    let catalog = Catalog {
        schema_version: SCHEMA_VERSION.to_string(),
        mappings: network
            .mappings()
            .iter()
            .map(MappingRecord::from_mapping)
            .collect(),
    };
    write_gz_json(&out_dir.join(CATALOG_FILE), &catalog)?;

    let graph = network.graph();
    let data = NodeLinkData {
        schema_version: SCHEMA_VERSION.to_string(),
        directed: true,
        multigraph: false,
        nodes: graph
            .nodes()
            .iter()
            .map(|id| NodeRecord { id: id.clone() })
            .collect(),
        links: graph
            .edges()
            .map(|(source, target)| LinkRecord {
                source: source.to_string(),
                target: target.to_string(),
            })
            .collect(),
    };
    write_gz_json(&out_dir.join(NETWORK_FILE), &data)?;
    Ok(())
}

/// Load a compiled index from `dir`.
pub fn load_index(dir: &Path) -> Result<Network> {
    let catalog: Catalog = read_versioned(&dir.join(CATALOG_FILE))?;
    let data: NodeLinkData = read_versioned(&dir.join(NETWORK_FILE))?;
    if !data.directed {
        return Err(Error::Config(ConfigError::Malformed {
            path: dir.join(NETWORK_FILE),
            message: "network graph must be directed".to_string(),
        }));
    }

    let mut network = Network::empty();
    for record in catalog.mappings {
        network.add_mapping(record.into_mapping()?);
    }
    // Nodes and edges beyond those implied by the catalog (isolated
    // nodes in particular) come from the graph file.
    for node in data.nodes {
        network.graph_mut().add_node(node.id);
    }
    for link in data.links {
        network.graph_mut().add_edge(link.source, link.target);
    }
    Ok(network)
}

/// Compile every configuration document under `langs_dir` and write
/// the index into `out_dir`. Returns the compiled network.
///
/// Language folders are visited in name order so the resulting network
/// resolves paths deterministically.
pub fn rebuild(langs_dir: &Path, out_dir: &Path) -> Result<Network> {
    let mut config_paths = Vec::new();
    let top_level = langs_dir.join(CONFIG_FILE);
    if top_level.is_file() {
        config_paths.push(top_level);
    }
    let entries = std::fs::read_dir(langs_dir).map_err(|e| Error::io(langs_dir, e))?;
    let mut folders: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    folders.sort();
    for folder in folders {
        let candidate = folder.join(CONFIG_FILE);
        if candidate.is_file() {
            config_paths.push(candidate);
        }
    }

    let mut network = Network::empty();
    for path in &config_paths {
        log::info!("compiling {}", path.display());
        for mapping in Mapping::from_config_file(path)? {
            network.add_mapping(mapping);
        }
    }
    write_index(&network, out_dir)?;
    log::info!(
        "wrote compiled index with {} mappings to {}",
        network.mappings().len(),
        out_dir.display()
    );
    Ok(network)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappings::Rule;

    fn sample_network() -> Network {
        let mut network = Network::empty();
        network.add_mapping(
            Mapping::from_rules("dan", "dan-ipa", vec![Rule::new("hej", "haj")]).unwrap(),
        );
        network.add_mapping(
            Mapping::from_rules("dan-ipa", "eng-ipa", vec![Rule::new("aj", "ej")]).unwrap(),
        );
        network
    }

    #[test]
    fn index_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let network = sample_network();
        write_index(&network, dir.path()).unwrap();

        let loaded = load_index(dir.path()).unwrap();
        assert_eq!(loaded.mappings().len(), 2);
        assert!(loaded.graph().contains("dan"));
        let path = loaded.find_path("dan", "eng-ipa").unwrap();
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_index(&sample_network(), dir.path()).unwrap();

        // Rewrite the catalog with a bogus version.
        let path = dir.path().join(CATALOG_FILE);
        let file = File::open(&path).unwrap();
        let mut value: serde_json::Value =
            serde_json::from_reader(BufReader::new(GzDecoder::new(file))).unwrap();
        value["schema_version"] = "0.0-bogus".into();
        write_gz_json(&path, &value).unwrap();

        let err = load_index(dir.path()).unwrap_err();
        assert!(err.to_string().contains("schema version"));
    }

    #[test]
    fn rebuild_scans_language_folders() {
        let dir = tempfile::tempdir().unwrap();
        let lang_dir = dir.path().join("dan");
        std::fs::create_dir(&lang_dir).unwrap();
        std::fs::write(lang_dir.join("rules.csv"), "hej,haj\n").unwrap();
        std::fs::write(
            lang_dir.join(CONFIG_FILE),
            "mappings:\n  - in_lang: dan\n    out_lang: dan-ipa\n    rules_path: rules.csv\n",
        )
        .unwrap();

        let out_dir = dir.path().join("generated");
        let network = rebuild(dir.path(), &out_dir).unwrap();
        assert_eq!(network.mappings().len(), 1);
        assert!(out_dir.join(CATALOG_FILE).is_file());
        assert!(out_dir.join(NETWORK_FILE).is_file());

        let reloaded = load_index(&out_dir).unwrap();
        assert_eq!(reloaded.mappings()[0].in_lang(), "dan");
    }
}
