//! Per-chromosome result cache shared by the background worker and the view

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::{Chromosome, ChromosomeResultSet};

/// Selection generation that produced a cache entry
pub type Generation = u64;

#[derive(Debug)]
struct CacheEntry {
    generation: Generation,
    results: Arc<ChromosomeResultSet>,
}

/// Thread-safe map from chromosome to its reduced result set.
///
/// One writer (the worker computing results) and any number of readers (render and
/// click handling) may use it concurrently; all locking is internal.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: RwLock<HashMap<Chromosome, CacheEntry>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn have(&self, chromosome: Chromosome) -> bool {
        self.entries.read().contains_key(&chromosome)
    }

    pub fn get(&self, chromosome: Chromosome) -> Option<Arc<ChromosomeResultSet>> {
        self.entries
            .read()
            .get(&chromosome)
            .map(|entry| entry.results.clone())
    }

    /// Store `results` under its chromosome unconditionally
    pub fn put(&self, results: ChromosomeResultSet) {
        let chromosome = results.chromosome();
        let mut entries = self.entries.write();
        let generation = entries.get(&chromosome).map_or(0, |entry| entry.generation);
        entries.insert(
            chromosome,
            CacheEntry {
                generation,
                results: Arc::new(results),
            },
        );
    }

    /// Store `results` computed by `generation` unless a newer generation already
    /// wrote this chromosome. Returns whether the entry was written.
    pub fn put_tagged(&self, results: ChromosomeResultSet, generation: Generation) -> bool {
        let mut entries = self.entries.write();
        Self::insert_tagged(&mut entries, results, generation)
    }

    /// Like [`put_tagged`](Self::put_tagged), but also refuses the write unless
    /// `current` still holds `generation`. The check happens under the write lock, so a
    /// writer that bumps `current` and then calls [`clear`](Self::clear) never leaves an
    /// entry from the superseded generation behind.
    pub fn put_if_current(&self, results: ChromosomeResultSet, generation: Generation, current: &AtomicU64) -> bool {
        let mut entries = self.entries.write();
        if current.load(Ordering::SeqCst) != generation {
            log::debug!(
                "Discarding chromosome {} from superseded generation {}",
                results.chromosome(),
                generation
            );
            return false;
        }
        Self::insert_tagged(&mut entries, results, generation)
    }

    fn insert_tagged(
        entries: &mut HashMap<Chromosome, CacheEntry>,
        results: ChromosomeResultSet,
        generation: Generation,
    ) -> bool {
        let chromosome = results.chromosome();
        if let Some(existing) = entries.get(&chromosome) {
            if existing.generation > generation {
                log::debug!(
                    "Keeping chromosome {} from generation {} over stale generation {}",
                    chromosome,
                    existing.generation,
                    generation
                );
                return false;
            }
        }
        entries.insert(
            chromosome,
            CacheEntry {
                generation,
                results: Arc::new(results),
            },
        );
        true
    }

    /// Requested chromosomes that have no entry yet
    pub fn missing(&self, requested: &BTreeSet<Chromosome>) -> BTreeSet<Chromosome> {
        let entries = self.entries.read();
        requested
            .iter()
            .copied()
            .filter(|chromosome| !entries.contains_key(chromosome))
            .collect()
    }

    pub fn generation_of(&self, chromosome: Chromosome) -> Option<Generation> {
        self.entries.read().get(&chromosome).map(|entry| entry.generation)
    }

    pub fn chromosomes(&self) -> BTreeSet<Chromosome> {
        self.entries.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop everything; used when the test inputs change
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(chromosome: Chromosome) -> ChromosomeResultSet {
        ChromosomeResultSet::empty(chromosome)
    }

    #[test]
    fn test_missing_and_put() {
        let cache = ResultCache::new();
        let requested = BTreeSet::from([1, 2, 3]);

        assert_eq!(cache.missing(&requested), requested);
        cache.put(set(2));
        assert!(cache.have(2));
        assert_eq!(cache.missing(&requested), BTreeSet::from([1, 3]));
        assert_eq!(cache.missing(&requested), cache.missing(&requested));
        assert!(cache.missing(&BTreeSet::from([2])).is_empty());
    }

    #[test]
    fn test_put_tagged_refuses_older_generation() {
        let cache = ResultCache::new();
        assert!(cache.put_tagged(set(2), 2));
        assert!(!cache.put_tagged(set(2), 1));
        assert_eq!(cache.generation_of(2), Some(2));
        assert!(cache.put_tagged(set(2), 3));
        assert_eq!(cache.generation_of(2), Some(3));
    }

    #[test]
    fn test_put_if_current_after_bump_and_clear() {
        let cache = ResultCache::new();
        let current = AtomicU64::new(1);
        assert!(cache.put_if_current(set(4), 1, &current));

        // The inputs change: bump, then clear. A late write from generation 1 must not
        // repopulate the cleared cache.
        current.store(2, Ordering::SeqCst);
        cache.clear();
        assert!(!cache.put_if_current(set(4), 1, &current));
        assert!(!cache.have(4));
        assert_eq!(cache.missing(&BTreeSet::from([4])), BTreeSet::from([4]));

        assert!(cache.put_if_current(set(4), 2, &current));
        assert_eq!(cache.generation_of(4), Some(2));
    }

    #[test]
    fn test_clear() {
        let cache = ResultCache::new();
        cache.put(set(1));
        cache.put(set(5));
        assert_eq!(cache.chromosomes(), BTreeSet::from([1, 5]));
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(1).is_none());
    }

    #[test]
    fn test_concurrent_readers_and_writer() {
        let cache = Arc::new(ResultCache::new());
        let writer = {
            let cache = cache.clone();
            std::thread::spawn(move || {
                for chromosome in 1..=50 {
                    cache.put_tagged(set(chromosome), 1);
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    let requested: BTreeSet<Chromosome> = (1..=50).collect();
                    for _ in 0..100 {
                        let missing = cache.missing(&requested);
                        assert!(missing.len() <= 50);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(cache.len(), 50);
    }
}
