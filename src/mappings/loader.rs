//! Loading rules, abbreviations and lexicons from disk.
//!
//! Rules files are delimited text (`.csv`, `.tsv`, `.psv`) with columns
//! `in, out, context_before, context_after, prevent_feeding` (first two
//! required), or a `.json` array of rule objects with the same field
//! names. Abbreviations files are delimited text whose first column is
//! the name and remaining columns the expansions.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{ConfigError, Error, Result};

use super::config::ConfigDocument;
use super::lexicon::Lexicon;
use super::rule::Rule;

fn delimiter_for(path: &Path) -> Option<u8> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => Some(b','),
        Some("tsv") => Some(b'\t'),
        Some("psv") => Some(b'|'),
        _ => None,
    }
}

fn strip_bom(field: &str) -> String {
    field.replace('\u{feff}', "")
}

/// Load rules from a delimited or JSON rules file.
pub fn load_rules(path: &Path) -> Result<Vec<Rule>> {
    let rules = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => {
            let file = File::open(path).map_err(|e| Error::io(path, e))?;
            serde_json::from_reader(BufReader::new(file)).map_err(|e| {
                Error::Config(ConfigError::Malformed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            })?
        }
        _ => match delimiter_for(path) {
            Some(delimiter) => load_rules_delimited(path, delimiter)?,
            None => {
                return Err(Error::Config(ConfigError::Malformed {
                    path: path.to_path_buf(),
                    message: "rules must be a .csv, .tsv, .psv or .json file".to_string(),
                }))
            }
        },
    };
    if rules.is_empty() {
        return Err(Error::Config(ConfigError::Malformed {
            path: path.to_path_buf(),
            message: "file does not contain any rules".to_string(),
        }));
    }
    Ok(rules)
}

fn load_rules_delimited(path: &Path, delimiter: u8) -> Result<Vec<Rule>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let mut rules = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| {
            Error::Config(ConfigError::Malformed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        })?;
        if record.len() == 0 || (record.len() == 1 && record[0].trim().is_empty()) {
            continue;
        }
        if record.len() == 1 {
            return Err(Error::Config(ConfigError::Malformed {
                path: path.to_path_buf(),
                message: format!("rule {:?} has no output column", &record[0]),
            }));
        }
        let field = |i: usize| record.get(i).map(strip_bom).unwrap_or_default();
        let prevent_feeding = match record.get(4).map(str::trim) {
            None | Some("") => false,
            Some(raw) => raw.eq_ignore_ascii_case("true") || raw == "1",
        };
        rules.push(Rule {
            rule_input: field(0),
            rule_output: field(1),
            context_before: field(2),
            context_after: field(3),
            prevent_feeding,
            comment: None,
        });
    }
    Ok(rules)
}

/// Load abbreviation entries from a delimited file.
///
/// Returned as raw `(name, expansions)` pairs so the mapping can
/// normalize them with its own `norm_form` before building the table.
pub fn load_abbreviation_entries(path: &Path) -> Result<Vec<(String, Vec<String>)>> {
    let Some(delimiter) = delimiter_for(path) else {
        return Err(Error::Config(ConfigError::Malformed {
            path: path.to_path_buf(),
            message: "abbreviations must be a .csv, .tsv or .psv file".to_string(),
        }));
    };
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| {
            Error::Config(ConfigError::Malformed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        })?;
        let Some(name) = record.get(0).map(strip_bom) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        let expansions: Vec<String> = record
            .iter()
            .skip(1)
            .filter(|e| !e.is_empty())
            .map(strip_bom)
            .collect();
        entries.push((name, expansions));
    }
    Ok(entries)
}

/// Load an aligned lexicon, one Phonetisaurus entry per line.
pub fn load_lexicon(path: &Path) -> Result<Lexicon> {
    log::info!("loading alignments from {}", path.display());
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut lines = Vec::new();
    for line in BufReader::new(file).lines() {
        lines.push(line.map_err(|e| Error::io(path, e))?);
    }
    Ok(Lexicon::from_lines(lines))
}

/// Load a mapping configuration document.
pub fn load_config_document(path: &Path) -> Result<ConfigDocument> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    serde_yaml::from_reader(BufReader::new(file)).map_err(|e| {
        Error::Config(ConfigError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    })
}
