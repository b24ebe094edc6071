//! Chromosome-at-a-time driver for an external significance test
//!
//! The runner owns a cursor over the requested chromosomes. Each [`IncrementalTestRunner::advance`]
//! runs the test for one chromosome, scores and reduces its intervals, and moves the
//! cursor by exactly one whether or not the test succeeded, so progress always reaches
//! its total. Failures go to the [`ErrorSink`] and are never retried.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{AssocError, AssocResult};
use crate::occlusion;
use crate::transform::ScoreTransform;
use crate::types::{Chromosome, ChromosomeResultSet, ScoredInterval, ScoredIntervalCandidate};

/// The association test supplied by the analysis layer
pub trait SignificanceTest: Send + Sync {
    /// Short name used for progress reporting
    fn name(&self) -> &str;

    /// Strains common to the test's inputs, sorted by name. Partition bit vectors and
    /// label arrays are indexed in this order.
    fn common_strains(&self) -> Vec<String>;

    fn run_for_chromosome(&self, chromosome: Chromosome) -> AssocResult<Vec<ScoredIntervalCandidate>>;
}

pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, task: &str, completed: usize, total: usize);
}

impl<F> ProgressObserver for F
where
    F: Fn(&str, usize, usize) + Send + Sync,
{
    fn on_progress(&self, task: &str, completed: usize, total: usize) {
        self(task, completed, total)
    }
}

/// Logs progress at `debug` level
#[derive(Debug, Default)]
pub struct LogProgressObserver;

impl ProgressObserver for LogProgressObserver {
    fn on_progress(&self, task: &str, completed: usize, total: usize) {
        log::debug!("{}: {}/{} chromosomes", task, completed, total);
    }
}

pub trait ErrorSink: Send + Sync {
    fn report(&self, chromosome: Chromosome, error: &AssocError);
}

/// Logs failures at `warn` level
#[derive(Debug, Default)]
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn report(&self, chromosome: Chromosome, error: &AssocError) {
        log::warn!("Chromosome {} could not be computed: {}", chromosome, error);
    }
}

/// Keeps failures so they can be shown next to the plot, passing each one on
pub struct CollectingErrorSink {
    failures: Mutex<Vec<(Chromosome, AssocError)>>,
    inner: Arc<dyn ErrorSink>,
}

impl Default for CollectingErrorSink {
    fn default() -> Self {
        Self::forwarding(Arc::new(LogErrorSink))
    }
}

impl CollectingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forwarding(inner: Arc<dyn ErrorSink>) -> Self {
        Self {
            failures: Mutex::new(Vec::new()),
            inner,
        }
    }

    pub fn failures(&self) -> Vec<(Chromosome, AssocError)> {
        self.failures.lock().clone()
    }

    pub fn take(&self) -> Vec<(Chromosome, AssocError)> {
        std::mem::take(&mut *self.failures.lock())
    }
}

impl ErrorSink for CollectingErrorSink {
    fn report(&self, chromosome: Chromosome, error: &AssocError) {
        self.failures.lock().push((chromosome, error.clone()));
        self.inner.report(chromosome, error);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunnerOptions {
    pub transform: ScoreTransform,
    pub preserve_ties: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            transform: ScoreTransform::default(),
            preserve_ties: true,
        }
    }
}

/// Score, sort and reduce the raw output of one chromosome's test run
pub fn prepare_result_set(
    chromosome: Chromosome,
    candidates: Vec<ScoredIntervalCandidate>,
    options: &RunnerOptions,
) -> AssocResult<ChromosomeResultSet> {
    let mut candidates: Vec<ScoredIntervalCandidate> = candidates
        .into_iter()
        .filter(|candidate| {
            let on_chromosome = candidate.interval.chromosome() == chromosome;
            if !on_chromosome {
                log::warn!(
                    "Ignoring {} returned while computing chromosome {}",
                    candidate.interval,
                    chromosome
                );
            }
            on_chromosome
        })
        .collect();
    candidates.sort_by_key(|candidate| candidate.interval.start());

    let mut scored = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match options.transform.score(candidate.raw_value)? {
            Some(score) => scored.push(ScoredInterval::from_candidate(candidate, score)),
            None => log::debug!(
                "Dropping {} with unscorable value {}",
                candidate.interval,
                candidate.raw_value
            ),
        }
    }

    let raw_count = scored.len();
    let reduced = occlusion::reduce(&scored, options.preserve_ties);
    log::debug!(
        "Chromosome {}: {} intervals reduced to {}",
        chromosome,
        raw_count,
        reduced.len()
    );
    Ok(ChromosomeResultSet::new(chromosome, reduced))
}

pub struct IncrementalTestRunner {
    test: Arc<dyn SignificanceTest>,
    chromosomes: Vec<Chromosome>,
    cursor: usize,
    options: RunnerOptions,
    progress: Option<Arc<dyn ProgressObserver>>,
    errors: Arc<dyn ErrorSink>,
}

impl IncrementalTestRunner {
    pub fn new(test: Arc<dyn SignificanceTest>, chromosomes: Vec<Chromosome>, options: RunnerOptions) -> Self {
        Self {
            test,
            chromosomes,
            cursor: 0,
            options,
            progress: None,
            errors: Arc::new(LogErrorSink),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressObserver>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_error_sink(mut self, errors: Arc<dyn ErrorSink>) -> Self {
        self.errors = errors;
        self
    }

    pub fn has_more(&self) -> bool {
        self.cursor < self.chromosomes.len()
    }

    pub fn peek_next_chromosome(&self) -> Option<Chromosome> {
        self.chromosomes.get(self.cursor).copied()
    }

    pub fn total_units(&self) -> usize {
        self.chromosomes.len()
    }

    pub fn completed_units(&self) -> usize {
        self.cursor
    }

    /// Compute the next chromosome. Returns `None` when the runner is exhausted or the
    /// test failed; failures have already been reported to the error sink.
    pub fn advance(&mut self) -> Option<ChromosomeResultSet> {
        let chromosome = self.peek_next_chromosome()?;
        log::debug!("Running {} on chromosome {}", self.test.name(), chromosome);

        let outcome = self
            .test
            .run_for_chromosome(chromosome)
            .and_then(|candidates| prepare_result_set(chromosome, candidates, &self.options))
            .map_err(|err| err.for_chromosome(chromosome));

        self.cursor += 1;
        if let Some(progress) = &self.progress {
            progress.on_progress(self.test.name(), self.cursor, self.chromosomes.len());
        }

        match outcome {
            Ok(set) => Some(set),
            Err(err) => {
                self.errors.report(chromosome, &err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::NonPositivePolicy;
    use crate::types::GenomicInterval;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedTest;

    impl SignificanceTest for ScriptedTest {
        fn name(&self) -> &str {
            "scripted"
        }

        fn common_strains(&self) -> Vec<String> {
            vec!["A".into(), "B".into()]
        }

        fn run_for_chromosome(&self, chromosome: Chromosome) -> AssocResult<Vec<ScoredIntervalCandidate>> {
            let iv = |s, e| GenomicInterval::new(chromosome, s, e).unwrap();
            match chromosome {
                2 => Err(AssocError::computation(2, "no genotypes")),
                3 => Ok(vec![ScoredIntervalCandidate::new(iv(0, 10), 0.0)]),
                _ => Ok(vec![
                    ScoredIntervalCandidate::new(iv(150, 180), 0.001),
                    ScoredIntervalCandidate::new(iv(100, 200), 0.00001),
                    ScoredIntervalCandidate::new(GenomicInterval::new(9, 0, 5).unwrap(), 0.5),
                ]),
            }
        }
    }

    #[test]
    fn test_advance_reduces_and_scores() {
        let mut runner = IncrementalTestRunner::new(Arc::new(ScriptedTest), vec![1], RunnerOptions::default());
        assert_eq!(runner.peek_next_chromosome(), Some(1));

        let set = runner.advance().unwrap();
        assert_eq!(set.chromosome(), 1);
        assert_eq!(set.len(), 1);
        assert_eq!(set.intervals()[0].start(), 100);
        assert!((set.intervals()[0].display_score() - 5.0).abs() < 1e-9);
        assert!(!runner.has_more());
        assert!(runner.advance().is_none());
    }

    #[test]
    fn test_failure_still_advances_and_reports() {
        let sink = Arc::new(CollectingErrorSink::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let progress = move |_task: &str, completed: usize, total: usize| {
            seen.fetch_add(1, Ordering::SeqCst);
            assert!(completed <= total);
        };

        let mut runner = IncrementalTestRunner::new(Arc::new(ScriptedTest), vec![2, 1], RunnerOptions::default())
            .with_progress(Arc::new(progress))
            .with_error_sink(sink.clone());

        assert!(runner.advance().is_none());
        assert_eq!(runner.completed_units(), 1);
        assert!(runner.advance().is_some());
        assert_eq!(runner.completed_units(), runner.total_units());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let failures = sink.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 2);
    }

    #[test]
    fn test_reject_policy_fails_chromosome() {
        let sink = Arc::new(CollectingErrorSink::new());
        let options = RunnerOptions {
            transform: ScoreTransform::new(NonPositivePolicy::Reject),
            preserve_ties: true,
        };
        let mut runner =
            IncrementalTestRunner::new(Arc::new(ScriptedTest), vec![3], options).with_error_sink(sink.clone());

        assert!(runner.advance().is_none());
        assert!(!runner.has_more());
        assert!(matches!(
            sink.take().as_slice(),
            [(3, AssocError::Computation { chromosome: 3, .. })]
        ));
    }

    #[test]
    fn test_drop_policy_leaves_empty_set() {
        let options = RunnerOptions {
            transform: ScoreTransform::new(NonPositivePolicy::Drop),
            preserve_ties: false,
        };
        let mut runner = IncrementalTestRunner::new(Arc::new(ScriptedTest), vec![3], options);
        let set = runner.advance().unwrap();
        assert!(set.is_empty());
    }
}
