//! Skyline reduction of overlapping interval results
//!
//! Sliding-window tests produce many overlapping intervals per chromosome. Drawn as
//! vertical bars, most of them sit behind a taller neighbour. [`reduce`] keeps every
//! interval that is the top of the skyline somewhere along its span, so each covered
//! base still shows its best score, and drops the rest.
//!
//! The sweep visits the elementary segments between consecutive interval boundaries,
//! keeping the intervals active over the current segment in a max-heap ordered by
//! score, then by input position (earlier wins). Ended intervals are discarded lazily
//! when they surface at the top of the heap.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::types::{GenomicPos, ScoredInterval};

#[derive(Debug)]
struct Active {
    score: f64,
    index: usize,
    end: GenomicPos,
}

impl PartialEq for Active {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Active {}

impl PartialOrd for Active {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Active {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.index.cmp(&self.index))
    }
}

/// Span used for the sweep; zero-width intervals occupy one base
fn sweep_span(interval: &ScoredInterval) -> (GenomicPos, GenomicPos) {
    let start = interval.start();
    (start, interval.end().max(start.saturating_add(1)))
}

/// Indices of the intervals that top the skyline somewhere
pub fn visible_indices(intervals: &[ScoredInterval], preserve_ties: bool) -> Vec<usize> {
    let n = intervals.len();
    if n <= 1 {
        return (0..n).collect();
    }

    let spans: Vec<(GenomicPos, GenomicPos)> = intervals.iter().map(sweep_span).collect();

    let mut by_start: Vec<usize> = (0..n).collect();
    by_start.sort_by_key(|&i| spans[i].0);

    let mut breakpoints: Vec<GenomicPos> = spans.iter().flat_map(|&(s, e)| [s, e]).collect();
    breakpoints.sort_unstable();
    breakpoints.dedup();

    let mut heap = BinaryHeap::with_capacity(n);
    let mut keep = vec![false; n];
    let mut next = 0;
    let mut ties = Vec::new();

    for &position in &breakpoints {
        while next < n && spans[by_start[next]].0 <= position {
            let index = by_start[next];
            heap.push(Active {
                score: intervals[index].display_score(),
                index,
                end: spans[index].1,
            });
            next += 1;
        }

        while matches!(heap.peek(), Some(top) if top.end <= position) {
            heap.pop();
        }

        let Some(top) = heap.peek() else {
            continue;
        };
        keep[top.index] = true;

        if preserve_ties {
            let best = top.score;
            while let Some(candidate) = heap.peek() {
                if candidate.score.total_cmp(&best) != Ordering::Equal {
                    break;
                }
                let Some(candidate) = heap.pop() else {
                    break;
                };
                if candidate.end > position {
                    keep[candidate.index] = true;
                    ties.push(candidate);
                }
            }
            heap.extend(ties.drain(..));
        }
    }

    (0..n).filter(|&i| keep[i]).collect()
}

/// Order-preserving subset of `intervals` that remains visible as a skyline.
///
/// Every position covered by the input stays covered by a retained interval carrying
/// the maximum score over that position. With `preserve_ties` every interval tied at
/// that maximum is kept; otherwise only the earliest listed one.
pub fn reduce(intervals: &[ScoredInterval], preserve_ties: bool) -> Vec<ScoredInterval> {
    visible_indices(intervals, preserve_ties)
        .into_iter()
        .map(|i| intervals[i].clone())
        .collect()
}
