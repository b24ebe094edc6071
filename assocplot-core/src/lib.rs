//! Association graph core library
//!
//! Scoring, display reduction, caching, hit-testing and strain grouping for plots of
//! per-chromosome association test results.

pub mod error;
pub mod types;
pub mod phylogeny;
pub mod transform;
pub mod occlusion;
pub mod runner;
pub mod cache;
pub mod viewport;
pub mod hit_test;
pub mod inspect;
pub mod phenotype;
pub mod controller;

// Re-export commonly used types and functions
pub use error::{AssocError, AssocResult};
pub use types::{
    Chromosome, ChromosomeResultSet, GenomicInterval, GenomicPos, PartitionAnnotation, ScoredInterval,
    ScoredIntervalCandidate, StrainGroup,
};
pub use phylogeny::{PhyloNode, PhylogenySubtree};
pub use transform::{NonPositivePolicy, ScoreTransform};
pub use runner::{ErrorSink, IncrementalTestRunner, ProgressObserver, RunnerOptions, SignificanceTest};
pub use cache::{Generation, ResultCache};
pub use viewport::{CoordinateMapper, DevicePoint, DomainPoint, PlotArea, PlotViewport};
pub use inspect::{ContextAction, ContextActionSink, FeatureInspection, FeatureInspector, LookupLink};
pub use phenotype::{phenotype_effect, GroupEffect, PhenotypeTable};
pub use controller::{AssociationGraphController, GraphHooks, GraphOptions, GraphState, RedrawSink};

/// Version information for the association graph core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
