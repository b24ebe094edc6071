//! Association graph controller
//!
//! Owns the result cache and the chromosome selection of one association plot. Selecting
//! chromosomes starts a background worker for the ones not yet cached; each selection
//! change bumps a generation counter, and a worker whose generation is no longer current
//! stops and discards what it computed. Clicks are resolved against the cached results
//! of the displayed chromosome.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;

use crate::cache::{Generation, ResultCache};
use crate::error::{AssocError, AssocResult};
use crate::hit_test;
use crate::inspect::{ContextActionSink, FeatureInspection, FeatureInspector, LogActionSink, LookupLink};
use crate::runner::{
    CollectingErrorSink, ErrorSink, IncrementalTestRunner, LogErrorSink, LogProgressObserver, ProgressObserver,
    RunnerOptions, SignificanceTest,
};
use crate::types::Chromosome;
use crate::viewport::{CoordinateMapper, DevicePoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    /// No selection has been made yet
    Idle,
    /// A worker for `generation` is filling the cache
    Computing { generation: Generation },
    /// Every selected chromosome has been attempted
    Ready,
}

/// Asked to repaint when new results land
pub trait RedrawSink: Send + Sync {
    /// `Some` after one chromosome was cached, `None` when the whole selection is done
    fn request_redraw(&self, chromosome: Option<Chromosome>);
}

#[derive(Debug, Default)]
pub struct LogRedrawSink;

impl RedrawSink for LogRedrawSink {
    fn request_redraw(&self, chromosome: Option<Chromosome>) {
        match chromosome {
            Some(chr) => log::debug!("Redraw requested after chromosome {}", chr),
            None => log::debug!("Redraw requested for completed selection"),
        }
    }
}

/// Outward-facing collaborators of the controller
#[derive(Clone)]
pub struct GraphHooks {
    pub progress: Arc<dyn ProgressObserver>,
    pub errors: Arc<dyn ErrorSink>,
    pub redraw: Arc<dyn RedrawSink>,
    pub actions: Arc<dyn ContextActionSink>,
}

impl Default for GraphHooks {
    fn default() -> Self {
        Self {
            progress: Arc::new(LogProgressObserver),
            errors: Arc::new(LogErrorSink),
            redraw: Arc::new(LogRedrawSink),
            actions: Arc::new(LogActionSink),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GraphOptions {
    pub runner: RunnerOptions,
    pub lookups: Vec<LookupLink>,
}

/// Everything a background worker needs, detached from the controller
struct Worker {
    generation: Generation,
    current: Arc<AtomicU64>,
    state: Arc<Mutex<GraphState>>,
    cache: Arc<ResultCache>,
    redraw: Arc<dyn RedrawSink>,
}

impl Worker {
    fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }

    fn run(self, mut runner: IncrementalTestRunner) {
        while runner.has_more() {
            if !self.is_current() {
                log::debug!("Generation {} superseded, stopping", self.generation);
                return;
            }
            let Some(results) = runner.advance() else {
                continue;
            };
            let chromosome = results.chromosome();
            if !self.cache.put_if_current(results, self.generation, &self.current) {
                return;
            }
            self.redraw.request_redraw(Some(chromosome));
        }

        let mut state = self.state.lock();
        if self.is_current() {
            *state = GraphState::Ready;
            drop(state);
            log::info!("Generation {} complete", self.generation);
            self.redraw.request_redraw(None);
        }
    }
}

pub struct AssociationGraphController {
    test: Arc<dyn SignificanceTest>,
    options: GraphOptions,
    inspector: FeatureInspector,
    hooks: GraphHooks,
    cache: Arc<ResultCache>,
    generation: Arc<AtomicU64>,
    state: Arc<Mutex<GraphState>>,
    failures: Arc<CollectingErrorSink>,
    selection: Vec<Chromosome>,
    workers: Vec<JoinHandle<()>>,
}

impl AssociationGraphController {
    pub fn new(test: Arc<dyn SignificanceTest>, options: GraphOptions, hooks: GraphHooks) -> Self {
        let inspector = FeatureInspector::new(test.common_strains(), options.lookups.clone());
        let failures = Arc::new(CollectingErrorSink::forwarding(hooks.errors.clone()));
        Self {
            test,
            options,
            inspector,
            hooks,
            cache: Arc::new(ResultCache::new()),
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(Mutex::new(GraphState::Idle)),
            failures,
            selection: Vec::new(),
            workers: Vec::new(),
        }
    }

    /// Show `chromosomes`, computing whichever are not cached yet.
    ///
    /// Returns immediately. Chromosomes are computed in the given order; duplicates are
    /// ignored. Any worker started by an earlier selection is superseded.
    pub fn select_chromosomes(&mut self, chromosomes: &[Chromosome]) -> AssocResult<GraphState> {
        if let Some(&invalid) = chromosomes.iter().find(|&&chr| chr == 0) {
            return Err(AssocError::InvalidChromosome(invalid));
        }
        self.reap_workers();

        let mut seen = BTreeSet::new();
        self.selection = chromosomes.iter().copied().filter(|chr| seen.insert(*chr)).collect();
        let missing = self.cache.missing(&seen);
        let pending: Vec<Chromosome> = self
            .selection
            .iter()
            .copied()
            .filter(|chr| missing.contains(chr))
            .collect();

        let mut state = self.state.lock();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if pending.is_empty() {
            *state = GraphState::Ready;
            drop(state);
            log::debug!("Selection {:?} fully cached", self.selection);
            self.hooks.redraw.request_redraw(None);
            return Ok(GraphState::Ready);
        }

        log::info!(
            "Generation {}: computing {} of {} chromosome(s)",
            generation,
            pending.len(),
            self.selection.len()
        );
        let runner = IncrementalTestRunner::new(self.test.clone(), pending, self.options.runner)
            .with_progress(self.hooks.progress.clone())
            .with_error_sink(self.failures.clone());
        let worker = Worker {
            generation,
            current: self.generation.clone(),
            state: self.state.clone(),
            cache: self.cache.clone(),
            redraw: self.hooks.redraw.clone(),
        };

        let handle = std::thread::Builder::new()
            .name(format!("assoc-gen-{}", generation))
            .spawn(move || worker.run(runner))
            .map_err(|e| AssocError::worker(format!("failed to spawn worker: {}", e)))?;
        self.workers.push(handle);

        *state = GraphState::Computing { generation };
        Ok(*state)
    }

    pub fn selection(&self) -> &[Chromosome] {
        &self.selection
    }

    pub fn state(&self) -> GraphState {
        *self.state.lock()
    }

    pub fn generation(&self) -> Generation {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn inspector(&self) -> &FeatureInspector {
        &self.inspector
    }

    /// Failures recorded since the last [`clear_failures`](Self::clear_failures)
    pub fn failures(&self) -> Vec<(Chromosome, AssocError)> {
        self.failures.failures()
    }

    pub fn clear_failures(&self) {
        self.failures.take();
    }

    /// Block until every worker started so far has finished
    pub fn wait(&mut self) -> AssocResult<()> {
        for handle in self.workers.drain(..) {
            handle
                .join()
                .map_err(|_| AssocError::worker("background worker panicked"))?;
        }
        Ok(())
    }

    /// Swap in a test over different inputs. Cached results no longer apply, so the
    /// cache is cleared and the current selection recomputed.
    pub fn replace_test(&mut self, test: Arc<dyn SignificanceTest>) -> AssocResult<GraphState> {
        {
            let mut state = self.state.lock();
            self.generation.fetch_add(1, Ordering::SeqCst);
            *state = GraphState::Idle;
        }
        self.inspector = FeatureInspector::new(test.common_strains(), self.options.lookups.clone());
        self.test = test;
        self.cache.clear();
        self.clear_failures();

        if self.selection.is_empty() {
            return Ok(GraphState::Idle);
        }
        let selection = self.selection.clone();
        self.select_chromosomes(&selection)
    }

    /// Route a click on the plot of `chromosome`. Ignored (returns `None`) while that
    /// chromosome has no cached results or the results are empty.
    pub fn on_click(
        &self,
        chromosome: Chromosome,
        point: DevicePoint,
        mapper: &dyn CoordinateMapper,
    ) -> Option<FeatureInspection> {
        let results = self.cache.get(chromosome)?;
        let domain = mapper.to_domain(point);
        let index = hit_test::resolve(domain.position, results.intervals())?;
        let interval = &results.intervals()[index];

        let inspection = self.inspector.inspect(interval).unwrap_or_else(|err| {
            log::warn!("Cannot group strains for {}: {}", interval.interval(), err);
            FeatureInspection {
                interval: interval.clone(),
                actions: self.inspector.actions(interval),
                strain_groups: None,
            }
        });
        self.hooks.actions.present(&inspection);
        Some(inspection)
    }

    fn reap_workers(&mut self) {
        self.workers.retain(|handle| !handle.is_finished());
    }
}

impl Drop for AssociationGraphController {
    fn drop(&mut self) {
        // Outstanding workers stop at their next check
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GenomicInterval, ScoredIntervalCandidate};
    use crate::viewport::{DomainRect, PlotArea, PlotViewport};
    use bitvec::prelude::*;
    use std::sync::atomic::AtomicUsize;

    struct TwoPeaks {
        calls: AtomicUsize,
    }

    impl SignificanceTest for TwoPeaks {
        fn name(&self) -> &str {
            "two-peaks"
        }

        fn common_strains(&self) -> Vec<String> {
            vec!["A".into(), "B".into(), "C".into()]
        }

        fn run_for_chromosome(&self, chromosome: Chromosome) -> AssocResult<Vec<ScoredIntervalCandidate>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if chromosome == 13 {
                return Err(AssocError::computation(13, "no variants"));
            }
            let iv = |s, e| GenomicInterval::new(chromosome, s, e).unwrap();
            Ok(vec![
                ScoredIntervalCandidate::new(iv(0, 100), 0.01)
                    .with_partition(crate::types::PartitionAnnotation::Binary(bitvec![1, 0, 1])),
                ScoredIntervalCandidate::new(iv(400, 500), 0.0001),
            ])
        }
    }

    fn controller() -> (AssociationGraphController, Arc<TwoPeaks>) {
        let test = Arc::new(TwoPeaks {
            calls: AtomicUsize::new(0),
        });
        let controller = AssociationGraphController::new(test.clone(), GraphOptions::default(), GraphHooks::default());
        (controller, test)
    }

    fn viewport() -> PlotViewport {
        PlotViewport::new(
            DomainRect {
                position_min: 0.0,
                position_max: 1000.0,
                score_min: 0.0,
                score_max: 10.0,
            },
            PlotArea::new(0.0, 0.0, 1000.0, 100.0),
        )
        .unwrap()
    }

    #[test]
    fn test_select_computes_then_hits_cache() {
        let (mut controller, test) = controller();
        assert_eq!(controller.state(), GraphState::Idle);

        let state = controller.select_chromosomes(&[1, 2, 1]).unwrap();
        assert!(matches!(state, GraphState::Computing { generation: 1 }));
        assert_eq!(controller.selection(), &[1, 2]);
        controller.wait().unwrap();
        assert_eq!(controller.state(), GraphState::Ready);
        assert_eq!(controller.cache().len(), 2);
        assert_eq!(test.calls.load(Ordering::SeqCst), 2);

        assert_eq!(controller.select_chromosomes(&[2]).unwrap(), GraphState::Ready);
        assert_eq!(test.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invalid_chromosome_rejected() {
        let (mut controller, _) = controller();
        assert_eq!(
            controller.select_chromosomes(&[1, 0]),
            Err(AssocError::InvalidChromosome(0))
        );
        assert_eq!(controller.state(), GraphState::Idle);
    }

    #[test]
    fn test_failures_recorded_and_not_cached() {
        let (mut controller, _) = controller();
        controller.select_chromosomes(&[13, 4]).unwrap();
        controller.wait().unwrap();

        assert_eq!(controller.state(), GraphState::Ready);
        assert!(!controller.cache().have(13));
        assert!(controller.cache().have(4));
        let failures = controller.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 13);
    }

    #[test]
    fn test_click_routing() {
        let (mut controller, _) = controller();
        let vp = viewport();
        assert!(controller.on_click(1, DevicePoint::new(50.0, 50.0), &vp).is_none());

        controller.select_chromosomes(&[1]).unwrap();
        controller.wait().unwrap();

        let inspection = controller.on_click(1, DevicePoint::new(50.0, 50.0), &vp).unwrap();
        assert_eq!(inspection.interval.start(), 0);
        let groups = inspection.strain_groups.unwrap();
        assert_eq!(groups[0].strains, vec!["A", "C"]);

        let inspection = controller.on_click(1, DevicePoint::new(300.0, 50.0), &vp).unwrap();
        assert_eq!(inspection.interval.start(), 400);
        assert!(inspection.strain_groups.is_none());
    }

    #[test]
    fn test_replace_test_clears_cache() {
        let (mut controller, first) = controller();
        controller.select_chromosomes(&[1]).unwrap();
        controller.wait().unwrap();

        let second = Arc::new(TwoPeaks {
            calls: AtomicUsize::new(0),
        });
        controller.replace_test(second.clone()).unwrap();
        controller.wait().unwrap();

        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.cache().generation_of(1), Some(controller.generation()));
        assert_eq!(controller.state(), GraphState::Ready);
    }
}
