//! Transduction results: output strings plus their alignments.

use serde::Serialize;

use crate::alignment::{self, Edge};
use crate::mappings::Rule;

/// One recorded rule application, kept for debugging and for the
/// staged view of a conversion.
#[derive(Debug, Clone, Serialize)]
pub struct RuleApplication {
    /// The working string before the rule applied.
    pub input: String,
    /// The working string after the rule applied.
    pub output: String,
    /// The rule that applied.
    pub rule: Rule,
    /// Character index where the match started.
    pub start: usize,
    /// Character index one past the end of the match.
    pub end: usize,
}

/// The result of applying one mapping to a string.
///
/// Holds the input, the output and the edge list relating their
/// character positions, plus a log of the rules that fired.
#[derive(Debug, Clone, Default)]
pub struct TransductionGraph {
    input: String,
    output: String,
    edges: Vec<Edge>,
    trace: Vec<RuleApplication>,
}

impl TransductionGraph {
    /// An identity graph over `input`: output equals input and every
    /// character maps to itself.
    pub fn identity(input: impl Into<String>) -> Self {
        let input = input.into();
        let len = input.chars().count();
        TransductionGraph {
            output: input.clone(),
            input,
            edges: alignment::identity(len),
            trace: Vec::new(),
        }
    }

    pub(crate) fn assemble(
        input: String,
        output: String,
        edges: Vec<Edge>,
        trace: Vec<RuleApplication>,
    ) -> Self {
        TransductionGraph {
            input,
            output,
            edges,
            trace,
        }
    }

    /// The string the transduction started from.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The converted string.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Alignment edges `(input index, output index)`, sorted by input
    /// index then output index.
    pub fn alignment(&self) -> &[Edge] {
        &self.edges
    }

    /// The rules that fired, in order.
    pub fn trace(&self) -> &[RuleApplication] {
        &self.trace
    }

    /// Minimal monotonic substring pairs; see
    /// [`alignment::substring_alignments`].
    pub fn substring_alignments(&self) -> Vec<(String, String)> {
        alignment::substring_alignments(&self.input, &self.output, &self.edges)
    }

    /// This graph as a one-stage slice, for symmetry with
    /// [`CompositeTransductionGraph::tiers`].
    pub fn tiers(&self) -> &[TransductionGraph] {
        std::slice::from_ref(self)
    }

    /// Append another graph after this one, shifting its indices past
    /// this graph's input and output.
    pub fn append(&mut self, other: &TransductionGraph) {
        let in_offset = self.input.chars().count();
        let out_offset = self.output.chars().count();
        self.input.push_str(&other.input);
        self.output.push_str(&other.output);
        let mut edges = std::mem::take(&mut self.edges);
        edges.extend(
            other
                .edges
                .iter()
                .map(|&(i, j)| (i + in_offset, j.map(|j| j + out_offset))),
        );
        self.edges = alignment::normalize_edges(edges);
        self.trace.extend(other.trace.iter().cloned());
    }
}

/// The result of applying a chain of mappings.
///
/// Keeps one [`TransductionGraph`] per stage; the end-to-end alignment
/// is the relational composition of the per-stage alignments.
#[derive(Debug, Clone, Default)]
pub struct CompositeTransductionGraph {
    tiers: Vec<TransductionGraph>,
}

impl CompositeTransductionGraph {
    /// Bundle per-stage graphs into a composite result.
    pub fn new(tiers: Vec<TransductionGraph>) -> Self {
        CompositeTransductionGraph { tiers }
    }

    /// An identity composite with `tiers` identity stages.
    pub fn identity(input: impl Into<String>, tiers: usize) -> Self {
        let input = input.into();
        CompositeTransductionGraph {
            tiers: (0..tiers.max(1))
                .map(|_| TransductionGraph::identity(input.clone()))
                .collect(),
        }
    }

    /// The original input string.
    pub fn input(&self) -> &str {
        self.tiers.first().map(|t| t.input()).unwrap_or("")
    }

    /// The final output string.
    pub fn output(&self) -> &str {
        self.tiers.last().map(|t| t.output()).unwrap_or("")
    }

    /// The per-stage graphs, in application order.
    pub fn tiers(&self) -> &[TransductionGraph] {
        &self.tiers
    }

    /// The end-to-end alignment, composed across every stage and
    /// normalized.
    pub fn alignment(&self) -> Vec<Edge> {
        let mut tiers = self.tiers.iter();
        let Some(first) = tiers.next() else {
            return Vec::new();
        };
        let mut composed = first.alignment().to_vec();
        for tier in tiers {
            composed = alignment::compose(&composed, tier.alignment());
        }
        alignment::normalize_edges(composed)
    }

    /// Substring pairs for the end-to-end alignment.
    pub fn substring_alignments(&self) -> Vec<(String, String)> {
        alignment::substring_alignments(self.input(), self.output(), &self.alignment())
    }

    /// Append another composite of the same depth, stage by stage.
    pub fn append(&mut self, other: &CompositeTransductionGraph) {
        debug_assert_eq!(self.tiers.len(), other.tiers.len());
        for (tier, other_tier) in self.tiers.iter_mut().zip(other.tiers.iter()) {
            tier.append(other_tier);
        }
    }

    /// Append a pass-through segment to every stage.
    pub fn append_identity(&mut self, text: &str) {
        let identity = TransductionGraph::identity(text);
        for tier in &mut self.tiers {
            tier.append(&identity);
        }
    }
}
