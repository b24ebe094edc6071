//! Resolve a click on an association plot to one cached interval

use crate::types::ScoredInterval;

/// Index of the interval a click at `position` refers to.
///
/// Among intervals whose open range strictly contains `position`, the highest scoring
/// one wins. When none contains it, the interval with the nearest boundary wins. Both
/// passes scan in order and only replace the current best on a strict improvement, so
/// the first listed interval wins ties. `None` only for an empty slice.
pub fn resolve(position: f64, intervals: &[ScoredInterval]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, interval) in intervals.iter().enumerate() {
        if !interval.interval().contains_open(position) {
            continue;
        }
        let score = interval.display_score();
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((index, score));
        }
    }
    if let Some((index, _)) = best {
        return Some(index);
    }

    let mut nearest: Option<(usize, f64)> = None;
    for (index, interval) in intervals.iter().enumerate() {
        let distance = interval.interval().boundary_distance(position);
        if nearest.map_or(true, |(_, best_distance)| distance < best_distance) {
            nearest = Some((index, distance));
        }
    }
    nearest.map(|(index, _)| index)
}

/// Convenience wrapper returning the interval itself
pub fn resolve_interval(position: f64, intervals: &[ScoredInterval]) -> Option<&ScoredInterval> {
    resolve(position, intervals).map(|index| &intervals[index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GenomicInterval, GenomicPos};

    fn scored(start: GenomicPos, end: GenomicPos, score: f64) -> ScoredInterval {
        ScoredInterval::new(GenomicInterval::new(1, start, end).unwrap(), 0.01, score)
    }

    #[test]
    fn test_higher_containing_score_wins() {
        let set = vec![scored(100, 200, 5.0), scored(150, 250, 9.0)];
        assert_eq!(resolve(160.0, &set), Some(1));
    }

    #[test]
    fn test_containment_tie_first_wins() {
        let set = vec![scored(100, 200, 5.0), scored(150, 250, 5.0)];
        assert_eq!(resolve(160.0, &set), Some(0));
    }

    #[test]
    fn test_boundary_is_not_containment() {
        let set = vec![scored(100, 200, 1.0), scored(200, 300, 0.5)];
        // 200 is a boundary of both, so the nearest-boundary pass decides
        assert_eq!(resolve(200.0, &set), Some(0));
    }

    #[test]
    fn test_nearest_fallback() {
        let set = vec![scored(100, 200, 5.0)];
        assert_eq!(resolve(500.0, &set), Some(0));

        let set = vec![scored(0, 100, 1.0), scored(300, 400, 1.0), scored(450, 460, 9.0)];
        assert_eq!(resolve(280.0, &set), Some(1));
    }

    #[test]
    fn test_nearest_tie_first_wins() {
        let set = vec![scored(0, 100, 1.0), scored(200, 300, 8.0)];
        assert_eq!(resolve(150.0, &set), Some(0));
    }

    #[test]
    fn test_empty_set() {
        assert_eq!(resolve(10.0, &[]), None);
        assert!(resolve_interval(10.0, &[]).is_none());
    }
}
