//! Error types for mapping compilation, network resolution and I/O.
//!
//! All errors surface at load or compile time. Conversion itself never
//! fails: a rule that matches nothing leaves its input unchanged, and a
//! lexicon miss returns the input with an identity alignment.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while parsing configuration documents.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration document could not be parsed at all.
    #[error("malformed mapping configuration in {path}: {message}")]
    Malformed {
        /// File the document was read from.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },

    /// A field held a value outside its enumeration.
    #[error("invalid value {value:?} for {field}: expected one of {expected}")]
    InvalidValue {
        /// Offending field name.
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Human-readable list of accepted values.
        expected: &'static str,
    },

    /// The deprecated boolean ordering schema is rejected, not translated.
    #[error(
        "mapping from {in_lang} to {out_lang} uses the removed `as_is` option; \
         replace `as_is: {as_is}` with `rule_ordering: {replacement}`"
    )]
    AsIsRemoved {
        /// Input language of the offending mapping.
        in_lang: String,
        /// Output language of the offending mapping.
        out_lang: String,
        /// The boolean value found.
        as_is: bool,
        /// The enum value the author should write instead.
        replacement: &'static str,
    },

    /// Flags that cannot be combined.
    #[error("mapping from {in_lang} to {out_lang}: preserve_case requires case_sensitive to be false")]
    ConflictingCaseFlags {
        /// Input language of the offending mapping.
        in_lang: String,
        /// Output language of the offending mapping.
        out_lang: String,
    },

    /// Case equivalencies must pair strings of equal length.
    #[error("case equivalency {lower:?} <-> {upper:?} is invalid: both sides must have the same length")]
    UnevenCaseEquivalency {
        /// Lower-case side of the pair.
        lower: String,
        /// Upper-case side of the pair.
        upper: String,
    },

    /// `out_delimiter` is limited to at most one character.
    #[error("out_delimiter {delimiter:?} is longer than one character")]
    DelimiterTooLong {
        /// The rejected delimiter.
        delimiter: String,
    },

    /// A compiled index was produced by an incompatible version of `g2p update`.
    #[error(
        "compiled index at {path} has schema version {found:?} but this build \
         expects {expected:?}; re-run `g2p update`"
    )]
    SchemaVersionMismatch {
        /// File the index was read from.
        path: PathBuf,
        /// Version string found in the file.
        found: String,
        /// Version string this build writes.
        expected: &'static str,
    },

    /// A lexicon mapping without alignment data cannot convert anything.
    #[error("lexicon mapping from {in_lang} to {out_lang} provides no alignments")]
    MissingAlignments {
        /// Input language of the offending mapping.
        in_lang: String,
        /// Output language of the offending mapping.
        out_lang: String,
    },
}

/// Errors raised while compiling rules into matchers.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Rules with an empty input can never match and are disallowed.
    #[error("rule with output {rule_output:?} has an empty input; rules must consume at least one character")]
    EmptyRuleInput {
        /// The rule's output, for identification in diagnostics.
        rule_output: String,
    },

    /// The rule produced an invalid regular expression.
    #[error("malformed pattern in rule {rule_input:?} (mapping {in_lang} to {out_lang}): {source}")]
    BadPattern {
        /// The rule input that produced the pattern.
        rule_input: String,
        /// Input language of the mapping being compiled.
        in_lang: String,
        /// Output language of the mapping being compiled.
        out_lang: String,
        /// Underlying regex engine diagnostic.
        source: Box<fancy_regex::Error>,
    },

    /// An abbreviation was referenced but never defined.
    #[error("unknown abbreviation {name:?} referenced by rule {rule_input:?}")]
    UnknownAbbreviation {
        /// The missing abbreviation name.
        name: String,
        /// The rule that referenced it.
        rule_input: String,
    },

    /// Abbreviations that expand through themselves never terminate.
    #[error("abbreviation expansion exceeded {limit} levels; check {name:?} for circular references")]
    CircularAbbreviation {
        /// Abbreviation that was being expanded when the limit was hit.
        name: String,
        /// The recursion cap.
        limit: usize,
    },
}

/// Errors raised when resolving a conversion request against the network.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The two notations exist but nothing connects them.
    #[error("no path from {in_lang} to {out_lang}; run `g2p update` if you recently added mappings")]
    NoPath {
        /// Requested source notation.
        in_lang: String,
        /// Requested target notation.
        out_lang: String,
    },

    /// The notation identifier is not a node in the network.
    #[error("unknown language code {lang:?}")]
    UnknownLang {
        /// The identifier that failed to resolve.
        lang: String,
    },

    /// A mapping listed in the network graph is missing from the catalog.
    #[error("no mapping registered between {in_lang} and {out_lang}")]
    MappingMissing {
        /// Edge source.
        in_lang: String,
        /// Edge target.
        out_lang: String,
    },
}

/// Top-level error for every fallible operation in the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration document problems.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Rule compilation problems.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Path resolution problems.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Filesystem problems while reading rules, abbreviations or the index.
    #[error("cannot read {path}: {source}")]
    Io {
        /// The file that could not be read or written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl Error {
    /// Attach a path to a bare I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for the CLI: 3 for unreachable language pairs,
    /// 4 for anything that went wrong before conversion could start.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Network(NetworkError::NoPath { .. }) => 3,
            _ => 4,
        }
    }
}

/// A specialized `Result` type for g2p operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_path_exit_code() {
        let err = Error::Network(NetworkError::NoPath {
            in_lang: "dan".into(),
            out_lang: "moh".into(),
        });
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn compile_error_exit_code() {
        let err = Error::Compile(CompileError::EmptyRuleInput {
            rule_output: "x".into(),
        });
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn as_is_message_names_replacement() {
        let err = ConfigError::AsIsRemoved {
            in_lang: "dan".into(),
            out_lang: "dan-ipa".into(),
            as_is: false,
            replacement: "apply-longest-first",
        };
        let msg = err.to_string();
        assert!(msg.contains("rule_ordering"));
        assert!(msg.contains("apply-longest-first"));
    }
}
