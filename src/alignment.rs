//! The alignment algebra: edges, composition and normalization.
//!
//! An alignment is a many-to-many relation between character positions of
//! an input string and character positions of an output string. It is kept
//! as a sorted edge list; composition across transducer stages is ordinary
//! relational composition.
//!
//! All indices count Unicode scalar values, not bytes.

use rustc_hash::{FxHashMap, FxHashSet};

/// One alignment edge: `(input index, output index)`.
///
/// The output side is `None` for a deletion that could not be re-attached
/// to a neighbouring output character; after [`normalize_edges`] this only
/// happens when the output string is empty.
pub type Edge = (usize, Option<usize>);

/// The identity alignment over a string of `len` characters.
pub fn identity(len: usize) -> Vec<Edge> {
    (0..len).map(|i| (i, Some(i))).collect()
}

/// Compose two edge lists into direct edges from the inputs of `first`
/// to the outputs of `second`.
///
/// `(i, k)` is in the result iff some `j` links `(i, j)` in `first` and
/// `(j, k)` in `second`. Edges of `first` that end in a deletion have no
/// continuation and drop out. Result order follows `first`, with
/// duplicates suppressed.
pub fn compose(first: &[Edge], second: &[Edge]) -> Vec<Edge> {
    // Arcs leaving `second`, keyed by source, in insertion order.
    let mut arcs: FxHashMap<usize, Vec<Option<usize>>> = FxHashMap::default();
    for &(j, k) in second {
        let outs = arcs.entry(j).or_default();
        if !outs.contains(&k) {
            outs.push(k);
        }
    }

    let mut seen: FxHashSet<Edge> = FxHashSet::default();
    let mut result = Vec::with_capacity(first.len());
    for &(i, j) in first {
        let Some(j) = j else { continue };
        let Some(outs) = arcs.get(&j) else { continue };
        for &k in outs {
            if seen.insert((i, k)) {
                result.push((i, k));
            }
        }
    }
    result
}

/// Normalize and sort an edge list.
///
/// - Where an input index carries a deletion edge, its other edges are
///   dropped; the deletion stands for the whole input character.
/// - Each surviving deletion is re-attached to the previous non-deleted
///   output if one exists, otherwise to the following one. `None` remains
///   only when there is no output at all.
/// - Edges are sorted by input index (stable) and deduplicated.
pub fn normalize_edges(edges: Vec<Edge>) -> Vec<Edge> {
    let deleted_inputs: FxHashSet<usize> = edges
        .iter()
        .filter(|e| e.1.is_none())
        .map(|e| e.0)
        .collect();
    let mut edges: Vec<Edge> = edges
        .into_iter()
        .filter(|e| e.1.is_none() || !deleted_inputs.contains(&e.0))
        .collect();

    edges.sort_by_key(|e| e.0);

    for i in 0..edges.len() {
        if edges[i].1.is_some() {
            continue;
        }
        let previous = edges[..i].iter().rev().find_map(|e| e.1);
        let following = edges[i + 1..].iter().find_map(|e| e.1);
        edges[i].1 = previous.or(following);
    }

    let mut seen: FxHashSet<Edge> = FxHashSet::default();
    edges.retain(|e| seen.insert(*e));
    edges
}

/// Shift every output index at or past `from` by `delta`.
pub(crate) fn shift_outputs(edges: &mut [Edge], from: usize, delta: isize) {
    for edge in edges.iter_mut() {
        if let Some(out) = edge.1 {
            if out >= from {
                edge.1 = Some((out as isize + delta) as usize);
            }
        }
    }
}

/// A monotonic segment: inclusive input and output index ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    in_start: usize,
    in_end: usize,
    out_start: Option<usize>,
    out_end: Option<usize>,
}

/// Minimal monotonic input/output substring pairs for an alignment.
///
/// Where input and output stay in lockstep this returns one pair per
/// block, e.g. `AABB -> aab` with the obvious edges yields
/// `[("AA", "aa"), ("BB", "b")]`. Reorderings collapse into the smallest
/// substring pair that preserves ordering on both sides, so a radical
/// reordering degenerates to a single pair covering everything.
pub fn substring_alignments(input: &str, output: &str, edges: &[Edge]) -> Vec<(String, String)> {
    let segments = merge_overlapping_segments(find_monotonic_segments(edges));
    let input: Vec<char> = input.chars().collect();
    let output: Vec<char> = output.chars().collect();
    segments
        .into_iter()
        .map(|seg| {
            let istr: String = input[seg.in_start..=seg.in_end].iter().collect();
            let ostr: String = match (seg.out_start, seg.out_end) {
                (Some(s), Some(e)) => output[s..=e].iter().collect(),
                _ => String::new(),
            };
            (istr, ostr)
        })
        .collect()
}

fn find_monotonic_segments(edges: &[Edge]) -> Vec<Segment> {
    // Deletions sort as if they pointed at their own input position.
    let sort_key = |e: &Edge, by_output: bool| -> (usize, usize) {
        match e.1 {
            None => (e.0, e.0),
            Some(out) => {
                if by_output {
                    (out, e.0)
                } else {
                    (e.0, out)
                }
            }
        }
    };
    let mut isort: Vec<Edge> = edges.to_vec();
    isort.sort_by_key(|e| sort_key(e, false));
    let mut osort: Vec<Edge> = edges.to_vec();
    osort.sort_by_key(|e| sort_key(e, true));

    let mut segments = Vec::new();
    let mut current: Option<Segment> = None;

    for (iedge, oedge) in isort.iter().zip(osort.iter()) {
        // A new segment starts where the two sort orders agree, or where
        // the next edges cannot overlap the open segment on either side.
        let non_overlapping = current.map_or(false, |seg| {
            iedge.0 > seg.in_end && seg.out_end.map_or(false, |oe| oedge.0 > oe)
        });
        if iedge == oedge || non_overlapping {
            if let Some(seg) = current.take() {
                segments.push(seg);
            }
            if iedge == oedge {
                segments.push(Segment {
                    in_start: iedge.0,
                    in_end: iedge.0,
                    out_start: iedge.1,
                    out_end: iedge.1,
                });
                continue;
            }
        }
        match current.as_mut() {
            None => {
                current = Some(Segment {
                    in_start: iedge.0,
                    in_end: oedge.0,
                    out_start: oedge.1,
                    out_end: iedge.1,
                });
            }
            Some(seg) => {
                seg.in_end = seg.in_end.max(oedge.0);
                seg.out_end = match (seg.out_end, iedge.1) {
                    (None, out) => out,
                    (Some(oe), Some(out)) => Some(oe.max(out)),
                    (some, None) => some,
                };
            }
        }
    }
    if let Some(seg) = current {
        segments.push(seg);
    }
    segments
}

fn merge_overlapping_segments(segments: Vec<Segment>) -> Vec<Segment> {
    if segments.len() <= 1 {
        return segments;
    }
    let mut merged = Vec::new();
    let mut acc = segments[0];
    for seg in &segments[1..] {
        let output_outside = match (seg.out_start, acc.out_end) {
            (Some(s), Some(e)) => s > e,
            (None, None) => false,
            _ => true,
        };
        if seg.in_start > acc.in_end && output_outside {
            merged.push(acc);
            acc = *seg;
        } else {
            acc.in_end = seg.in_end;
            acc.out_end = seg.out_end;
        }
    }
    merged.push(acc);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_covers_every_index() {
        assert_eq!(identity(3), vec![(0, Some(0)), (1, Some(1)), (2, Some(2))]);
    }

    #[test]
    fn compose_follows_intermediate_arcs() {
        // [(0,1), (1,4)] . [(0,0), (1,2), (1,3), (4,2)] == [(0,2), (0,3), (1,2)]
        let first = vec![(0, Some(1)), (1, Some(4))];
        let second = vec![(0, Some(0)), (1, Some(2)), (1, Some(3)), (4, Some(2))];
        assert_eq!(
            compose(&first, &second),
            vec![(0, Some(2)), (0, Some(3)), (1, Some(2))]
        );
    }

    #[test]
    fn compose_drops_dead_ends() {
        let first = vec![(0, None), (1, Some(0))];
        let second = vec![(0, Some(0))];
        assert_eq!(compose(&first, &second), vec![(1, Some(0))]);
    }

    #[test]
    fn normalize_resolves_deletions_to_previous_output() {
        let edges = vec![(0, Some(0)), (1, None), (2, Some(1))];
        assert_eq!(
            normalize_edges(edges),
            vec![(0, Some(0)), (1, Some(0)), (2, Some(1))]
        );
    }

    #[test]
    fn normalize_resolves_leading_deletion_to_following_output() {
        let edges = vec![(0, None), (1, Some(0))];
        assert_eq!(normalize_edges(edges), vec![(0, Some(0)), (1, Some(0))]);
    }

    #[test]
    fn normalize_keeps_none_when_output_empty() {
        let edges = vec![(0, None), (1, None)];
        assert_eq!(normalize_edges(edges), vec![(0, None), (1, None)]);
    }

    #[test]
    fn deletion_supersedes_other_edges_for_same_input() {
        let edges = vec![(0, Some(2)), (0, None), (1, Some(0))];
        // The deletion wins, then re-attaches to the following output.
        assert_eq!(normalize_edges(edges), vec![(0, Some(0)), (1, Some(0))]);
    }

    #[test]
    fn substrings_group_many_to_many_blocks() {
        // ABCDEFF -> aabbcdef
        let edges = vec![
            (0, Some(0)),
            (0, Some(1)),
            (1, Some(2)),
            (1, Some(3)),
            (2, Some(4)),
            (3, Some(5)),
            (4, Some(6)),
            (5, Some(7)),
            (6, Some(7)),
        ];
        assert_eq!(
            substring_alignments("ABCDEFF", "aabbcdef", &edges),
            vec![
                ("A".to_string(), "aa".to_string()),
                ("B".to_string(), "bb".to_string()),
                ("C".to_string(), "c".to_string()),
                ("D".to_string(), "d".to_string()),
                ("E".to_string(), "e".to_string()),
                ("FF".to_string(), "f".to_string()),
            ]
        );
    }

    #[test]
    fn substrings_collapse_reorderings() {
        // ABCDEF -> abefcd with CD and EF swapped
        let edges = vec![
            (0, Some(0)),
            (1, Some(1)),
            (2, Some(4)),
            (3, Some(5)),
            (4, Some(2)),
            (5, Some(3)),
        ];
        assert_eq!(
            substring_alignments("ABCDEF", "abefcd", &edges),
            vec![
                ("A".to_string(), "a".to_string()),
                ("B".to_string(), "b".to_string()),
                ("CDEF".to_string(), "efcd".to_string()),
            ]
        );
    }
}
