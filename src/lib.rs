//! # libg2p
//!
//! Rule-based grapheme-to-phoneme conversion that preserves a
//! bidirectional character alignment across arbitrarily many composed
//! mappings.
//!
//! Text in one notation (a community orthography, say) is converted to
//! another (IPA, ARPABET) by context-sensitive rewrite rules; for every
//! output character the engine reports the input characters that
//! produced it, and vice versa. Mappings form a directed network over
//! notation identifiers, and conversion between any two connected
//! notations chains the mappings along the shortest path, composing
//! their alignments.
//!
//! ## Example
//!
//! ```rust,ignore
//! use libg2p::prelude::*;
//!
//! let network = Network::load(Path::new("langs/generated"))?;
//! let result = network.convert("hej", "dan", "eng-arpabet")?;
//! println!("{}", result.output());
//! for (input, output) in result.substring_alignments() {
//!     println!("{input} -> {output}");
//! }
//! ```
//!
//! Compiled mappings and the network are immutable after load, so any
//! number of conversions may run concurrently without locking.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod alignment;
pub mod error;
pub mod generate;
pub mod mappings;
pub mod network;
pub mod normalization;
pub mod tokenizer;
pub mod transducer;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{Error, Result};
pub use network::{make_g2p, Network};

/// Common imports for convenient usage.
pub mod prelude {
    pub use crate::alignment::Edge;
    pub use crate::error::{Error, Result};
    pub use crate::generate::{generate_mapping, GenerateMode};
    pub use crate::mappings::{Mapping, MappingConfig, MappingType, Rule, RuleOrdering};
    pub use crate::network::{make_g2p, Network};
    pub use crate::normalization::NormForm;
    pub use crate::tokenizer::{Token, Tokenizer};
    pub use crate::transducer::{
        CompositeTransducer, CompositeTransductionGraph, TokenizingTransducer, Transducer,
        TransductionGraph,
    };
}
