//! CLI argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "g2p")]
#[command(about = "Grapheme-to-phoneme conversion with character alignment")]
#[command(version)]
pub struct Cli {
    /// Directory holding language folders and the compiled index
    /// (defaults to $G2P_LANGS_DIR, then ./langs)
    #[arg(short = 'l', long, global = true)]
    pub langs_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert text between two notations
    Convert {
        /// Input notation identifier
        in_lang: String,

        /// Output notation identifier
        out_lang: String,

        /// Text to convert
        text: String,

        /// Print the alignment edges as well
        #[arg(short, long)]
        alignment: bool,

        /// Print every intermediate stage
        #[arg(short, long)]
        stages: bool,
    },

    /// Rebuild the compiled index from the language folders
    Update {
        /// Write the index here instead of <langs-dir>/generated
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Split text into word and non-word tokens
    Tokenize {
        /// Notation identifier whose mappings define word characters
        lang: String,

        /// Text to tokenize
        text: String,
    },

    /// Generate a direct mapping by composing the path between two
    /// notations
    GenerateMapping {
        /// Input notation identifier
        in_lang: String,

        /// Output notation identifier
        out_lang: String,

        /// Compose the IPA notations of both ends instead
        #[arg(long)]
        ipa: bool,

        /// Write the generated mapping here instead of
        /// <langs-dir>/generated
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// List the mappings in the compiled index
    ShowMappings {
        /// Only mappings from this notation
        in_lang: Option<String>,

        /// Only mappings to this notation
        out_lang: Option<String>,

        /// Print every rule, not just the counts
        #[arg(short, long)]
        verbose: bool,
    },
}
