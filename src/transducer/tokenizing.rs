//! Tokenized conversion: transduce words, pass everything else through.

use crate::normalization::{self, NormForm};
use crate::tokenizer::Tokenizer;

use super::composite::CompositeTransducer;
use super::graph::CompositeTransductionGraph;

/// Combines a tokenizer with a transducer chain.
///
/// Word tokens are fed through the chain; non-word tokens are appended
/// unchanged with an identity alignment, so the whole text keeps a
/// single coherent alignment.
#[derive(Debug)]
pub struct TokenizingTransducer<'m> {
    transducer: CompositeTransducer<'m>,
    tokenizer: Tokenizer,
}

impl<'m> TokenizingTransducer<'m> {
    /// Pair a transducer chain with the tokenizer for its input
    /// notation.
    pub fn new(transducer: CompositeTransducer<'m>, tokenizer: Tokenizer) -> Self {
        TokenizingTransducer {
            transducer,
            tokenizer,
        }
    }

    /// The underlying chain.
    pub fn transducer(&self) -> &CompositeTransducer<'m> {
        &self.transducer
    }

    /// The tokenizer splitting the input.
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Input notation identifier.
    pub fn in_lang(&self) -> &str {
        self.transducer.in_lang()
    }

    /// Output notation identifier.
    pub fn out_lang(&self) -> &str {
        self.transducer.out_lang()
    }

    /// Convert `text`, transducing word tokens only.
    pub fn apply(&self, text: &str) -> CompositeTransductionGraph {
        // Normalize before tokenizing: normalization can split or merge
        // characters and with them the token boundaries.
        let norm = self.transducer.norm_form();
        let text = if norm == NormForm::None {
            text.to_string()
        } else {
            normalization::normalize(text, norm)
        };

        // Start from an empty conversion so text that begins with a
        // non-word token still lands in the right tier.
        let mut result = CompositeTransductionGraph::identity("", self.transducer.len());
        for token in self.tokenizer.tokenize(&text) {
            if token.is_word {
                result.append(&self.transducer.apply(&token.text));
            } else {
                result.append_identity(&token.text);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappings::{Mapping, MappingConfig, Rule};
    use crate::normalization::NormForm;

    fn mapping() -> Mapping {
        let config = MappingConfig {
            in_lang: "t".into(),
            out_lang: "u".into(),
            norm_form: NormForm::None,
            ..MappingConfig::default()
        };
        Mapping::new(
            config,
            vec![Rule::new("a", "b")],
            Vec::new(),
            Default::default(),
        )
        .unwrap()
    }

    #[test]
    fn words_convert_and_punctuation_passes_through() {
        let m = mapping();
        let transducer =
            TokenizingTransducer::new(CompositeTransducer::new([&m]), Tokenizer::new());
        let result = transducer.apply("aa, aa!");
        assert_eq!(result.output(), "bb, bb!");
    }

    #[test]
    fn leading_non_word_text_is_kept() {
        let m = mapping();
        let transducer =
            TokenizingTransducer::new(CompositeTransducer::new([&m]), Tokenizer::new());
        let result = transducer.apply("... a");
        assert_eq!(result.output(), "... b");
        // Alignment covers the punctuation identically.
        assert_eq!(result.alignment()[0], (0, Some(0)));
    }

    #[test]
    fn alignment_spans_the_whole_text() {
        let m = mapping();
        let transducer =
            TokenizingTransducer::new(CompositeTransducer::new([&m]), Tokenizer::new());
        let result = transducer.apply("a a");
        let alignment = result.alignment();
        assert_eq!(alignment.len(), 3);
        assert_eq!(alignment, vec![(0, Some(0)), (1, Some(1)), (2, Some(2))]);
    }
}
