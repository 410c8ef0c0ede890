//! Chaining transducers and composing their alignments.

use crate::mappings::Mapping;

use super::graph::{CompositeTransductionGraph, TransductionGraph};
use super::Transducer;

/// An ordered chain of transducers applied in sequence.
///
/// The output of each stage feeds the next; the end-to-end alignment is
/// the relational composition of the per-stage alignments. An empty
/// chain is the identity.
#[derive(Debug)]
pub struct CompositeTransducer<'m> {
    transducers: Vec<Transducer<'m>>,
}

impl<'m> CompositeTransducer<'m> {
    /// Build a chain over borrowed mappings, in order.
    pub fn new<I>(mappings: I) -> Self
    where
        I: IntoIterator<Item = &'m Mapping>,
    {
        CompositeTransducer {
            transducers: mappings.into_iter().map(Transducer::new).collect(),
        }
    }

    /// The underlying transducers.
    pub fn transducers(&self) -> &[Transducer<'m>] {
        &self.transducers
    }

    /// Number of stages in the chain.
    pub fn len(&self) -> usize {
        self.transducers.len()
    }

    /// True for the empty (identity) chain.
    pub fn is_empty(&self) -> bool {
        self.transducers.is_empty()
    }

    /// Input notation of the first stage.
    pub fn in_lang(&self) -> &str {
        self.transducers.first().map(|t| t.in_lang()).unwrap_or("")
    }

    /// Output notation of the last stage.
    pub fn out_lang(&self) -> &str {
        self.transducers.last().map(|t| t.out_lang()).unwrap_or("")
    }

    /// Normalization form of the first stage, which governs
    /// tokenization of the raw input.
    pub fn norm_form(&self) -> crate::normalization::NormForm {
        self.transducers
            .first()
            .map(|t| t.mapping().config().norm_form)
            .unwrap_or_default()
    }

    /// Convert `input` through every stage.
    pub fn apply(&self, input: &str) -> CompositeTransductionGraph {
        if self.transducers.is_empty() {
            return CompositeTransductionGraph::new(vec![TransductionGraph::identity(input)]);
        }
        let mut tiers = Vec::with_capacity(self.transducers.len());
        let mut current = input.to_string();
        for transducer in &self.transducers {
            let tg = transducer.apply(&current);
            current = tg.output().to_string();
            tiers.push(tg);
        }
        CompositeTransductionGraph::new(tiers)
    }
}
