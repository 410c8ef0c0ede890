//! Unicode normalization that keeps track of character indices.
//!
//! Normalizing conversion input is itself an aligned transformation:
//! composing one character into another (NFC) or decomposing it into
//! several (NFD) moves character positions around. The functions here
//! return the normalized string together with the edge list from the
//! original to the normalized form, so the final alignment of a
//! conversion can be expressed against the text the caller actually
//! passed in.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::alignment::{self, Edge};
use crate::error::ConfigError;

/// Unicode normalization form applied to rules and conversion input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NormForm {
    /// Canonical composition.
    #[serde(rename = "NFC")]
    Nfc,
    /// Canonical decomposition. The default, matching how most mapping
    /// files are written.
    #[default]
    #[serde(rename = "NFD")]
    Nfd,
    /// Compatibility composition.
    #[serde(rename = "NFKC")]
    Nfkc,
    /// Compatibility decomposition.
    #[serde(rename = "NFKD")]
    Nfkd,
    /// No normalization; operate on the input as given.
    #[serde(rename = "none")]
    None,
}

impl NormForm {
    /// The decomposed counterpart used as a pivot when composing.
    fn decomposed(self) -> NormForm {
        match self {
            NormForm::Nfc => NormForm::Nfd,
            NormForm::Nfkc => NormForm::Nfkd,
            other => other,
        }
    }

    fn is_composed(self) -> bool {
        matches!(self, NormForm::Nfc | NormForm::Nfkc)
    }
}

impl fmt::Display for NormForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NormForm::Nfc => "NFC",
            NormForm::Nfd => "NFD",
            NormForm::Nfkc => "NFKC",
            NormForm::Nfkd => "NFKD",
            NormForm::None => "none",
        };
        write!(f, "{name}")
    }
}

impl FromStr for NormForm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NFC" => Ok(NormForm::Nfc),
            "NFD" => Ok(NormForm::Nfd),
            "NFKC" => Ok(NormForm::Nfkc),
            "NFKD" => Ok(NormForm::Nfkd),
            "none" | "" => Ok(NormForm::None),
            other => Err(ConfigError::InvalidValue {
                field: "norm_form",
                value: other.to_string(),
                expected: "NFC, NFD, NFKC, NFKD, none",
            }),
        }
    }
}

/// Decode `\uXXXX` and `\UXXXXXX` escapes into their code points.
///
/// Mapping files use these to spell combining characters that would be
/// invisible or easy to mangle in an editor.
pub fn unicode_escape(text: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"\\(?:u([0-9A-Fa-f]{4})|U([0-9A-Fa-f]{6}))").unwrap());
    let mut result = String::with_capacity(text.len());
    let mut last = 0;
    for caps in pattern.captures_iter(text) {
        let m = caps.get(0).unwrap();
        result.push_str(&text[last..m.start()]);
        let hex = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|g| g.as_str())
            .unwrap_or_default();
        match u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
            Some(c) => result.push(c),
            // Not a valid scalar value; keep the escape verbatim.
            None => result.push_str(m.as_str()),
        }
        last = m.end();
    }
    result.push_str(&text[last..]);
    result
}

fn apply_form(text: &str, form: NormForm) -> String {
    match form {
        NormForm::Nfc => text.nfc().collect(),
        NormForm::Nfd => text.nfd().collect(),
        NormForm::Nfkc => text.nfkc().collect(),
        NormForm::Nfkd => text.nfkd().collect(),
        NormForm::None => text.to_string(),
    }
}

/// Normalize `input` to `form`, decoding unicode escapes first.
pub fn normalize(input: &str, form: NormForm) -> String {
    let unescaped = unicode_escape(input);
    let normalized = apply_form(&unescaped, form);
    if normalized != input {
        log::debug!("normalized {input:?} to {normalized:?} using {form}");
    }
    normalized
}

/// Normalize to a decomposed form, character by character, recording
/// which normalized characters each input character became.
fn decompose_with_indices(input: &str, form: NormForm) -> (String, Vec<Edge>) {
    debug_assert!(matches!(form, NormForm::Nfd | NormForm::Nfkd));
    let mut result = String::new();
    let mut edges = Vec::new();
    let mut out_pos = 0;
    for (i, c) in input.chars().enumerate() {
        let decomposed = apply_form(&c.to_string(), form);
        for n in 0..decomposed.chars().count() {
            edges.push((i, Some(out_pos + n)));
        }
        out_pos += decomposed.chars().count();
        result.push_str(&decomposed);
    }
    (result, edges)
}

/// Normalize to a composed form by pivoting through the decomposed
/// form on both sides and composing the two index maps.
fn compose_with_indices(input: &str, form: NormForm) -> (String, Vec<Edge>) {
    debug_assert!(form.is_composed());
    let composed = apply_form(input, form);
    let pivot = form.decomposed();
    let (input_nfd, to_nfd) = decompose_with_indices(input, pivot);
    let (remapped_nfd, composed_to_nfd) = decompose_with_indices(&composed, pivot);
    debug_assert_eq!(input_nfd, remapped_nfd);
    // Invert composed -> NFD into NFD -> composed, then chain.
    let from_nfd: Vec<Edge> = composed_to_nfd
        .into_iter()
        .filter_map(|(a, b)| b.map(|b| (b, Some(a))))
        .collect();
    (composed, alignment::compose(&to_nfd, &from_nfd))
}

/// Normalize `input` to `form` and return the index map from the
/// original characters to the normalized ones.
///
/// With `NormForm::None` the input is returned with an identity map.
pub fn normalize_with_indices(input: &str, form: NormForm) -> (String, Vec<Edge>) {
    match form {
        NormForm::Nfd | NormForm::Nfkd => decompose_with_indices(input, form),
        NormForm::Nfc | NormForm::Nfkc => compose_with_indices(input, form),
        NormForm::None => {
            let len = input.chars().count();
            (input.to_string(), alignment::identity(len))
        }
    }
}
