use bitvec::vec::BitVec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AssocError, AssocResult};
use crate::phylogeny::PhylogenySubtree;

pub type Chromosome = u32;
pub type GenomicPos = u64;

/// Half-open base-pair range on one chromosome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenomicInterval {
    chromosome: Chromosome,
    start: GenomicPos,
    end: GenomicPos,
}

impl GenomicInterval {
    pub fn new(chromosome: Chromosome, start: GenomicPos, end: GenomicPos) -> AssocResult<Self> {
        if chromosome == 0 {
            return Err(AssocError::InvalidChromosome(chromosome));
        }
        if start > end {
            return Err(AssocError::InvalidInterval { start, end });
        }
        Ok(Self {
            chromosome,
            start,
            end,
        })
    }

    pub fn chromosome(&self) -> Chromosome {
        self.chromosome
    }

    pub fn start(&self) -> GenomicPos {
        self.start
    }

    pub fn end(&self) -> GenomicPos {
        self.end
    }

    pub fn len(&self) -> GenomicPos {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &GenomicInterval) -> bool {
        self.chromosome == other.chromosome && self.start < other.end && other.start < self.end
    }

    /// True when `position` lies strictly inside `(start, end)`
    pub fn contains_open(&self, position: f64) -> bool {
        (self.start as f64) < position && position < (self.end as f64)
    }

    /// Distance from `position` to the nearer of the two boundaries
    pub fn boundary_distance(&self, position: f64) -> f64 {
        let to_start = (self.start as f64 - position).abs();
        let to_end = (self.end as f64 - position).abs();
        to_start.min(to_end)
    }
}

impl fmt::Display for GenomicInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chr{}:{}-{}", self.chromosome, self.start, self.end)
    }
}

/// How the strains split over an interval, kept for secondary inspection
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionAnnotation {
    /// One bit per strain; set means the strain shares the block's haplotype
    Binary(BitVec),
    /// One group label per strain
    MultiGroup(Vec<u16>),
    /// Local phylogeny over the interval
    Phylogeny(PhylogenySubtree),
}

impl PartitionAnnotation {
    pub fn kind(&self) -> &'static str {
        match self {
            PartitionAnnotation::Binary(_) => "binary",
            PartitionAnnotation::MultiGroup(_) => "multi-group",
            PartitionAnnotation::Phylogeny(_) => "phylogeny",
        }
    }
}

/// One interval as produced by a significance test, before scoring
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredIntervalCandidate {
    pub interval: GenomicInterval,
    pub raw_value: f64,
    pub partition: Option<PartitionAnnotation>,
}

impl ScoredIntervalCandidate {
    pub fn new(interval: GenomicInterval, raw_value: f64) -> Self {
        Self {
            interval,
            raw_value,
            partition: None,
        }
    }

    pub fn with_partition(mut self, partition: PartitionAnnotation) -> Self {
        self.partition = Some(partition);
        self
    }
}

/// A test result with its display score; never mutated once built
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredInterval {
    interval: GenomicInterval,
    raw_value: f64,
    display_score: f64,
    #[serde(skip)]
    partition: Option<PartitionAnnotation>,
}

impl ScoredInterval {
    pub fn new(interval: GenomicInterval, raw_value: f64, display_score: f64) -> Self {
        Self {
            interval,
            raw_value,
            display_score,
            partition: None,
        }
    }

    pub fn from_candidate(candidate: ScoredIntervalCandidate, display_score: f64) -> Self {
        Self {
            interval: candidate.interval,
            raw_value: candidate.raw_value,
            display_score,
            partition: candidate.partition,
        }
    }

    pub fn with_partition(mut self, partition: PartitionAnnotation) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn interval(&self) -> &GenomicInterval {
        &self.interval
    }

    pub fn start(&self) -> GenomicPos {
        self.interval.start
    }

    pub fn end(&self) -> GenomicPos {
        self.interval.end
    }

    pub fn raw_value(&self) -> f64 {
        self.raw_value
    }

    pub fn display_score(&self) -> f64 {
        self.display_score
    }

    pub fn partition(&self) -> Option<&PartitionAnnotation> {
        self.partition.as_ref()
    }
}

/// Reduced, scored results for one chromosome, sorted by start position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChromosomeResultSet {
    chromosome: Chromosome,
    intervals: Vec<ScoredInterval>,
}

impl ChromosomeResultSet {
    /// Builds a set, sorting by start (stable, so equal starts keep their order)
    pub fn new(chromosome: Chromosome, mut intervals: Vec<ScoredInterval>) -> Self {
        intervals.sort_by_key(|iv| iv.start());
        Self {
            chromosome,
            intervals,
        }
    }

    pub fn empty(chromosome: Chromosome) -> Self {
        Self {
            chromosome,
            intervals: Vec::new(),
        }
    }

    pub fn chromosome(&self) -> Chromosome {
        self.chromosome
    }

    pub fn intervals(&self) -> &[ScoredInterval] {
        &self.intervals
    }

    pub fn get(&self, index: usize) -> Option<&ScoredInterval> {
        self.intervals.get(index)
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Highest-scoring interval, first listed on ties
    pub fn peak(&self) -> Option<&ScoredInterval> {
        self.intervals.iter().fold(None, |best: Option<&ScoredInterval>, iv| match best {
            Some(b) if b.display_score() >= iv.display_score() => Some(b),
            _ => Some(iv),
        })
    }

    /// Span covered by the set, `None` when empty
    pub fn extent(&self) -> Option<(GenomicPos, GenomicPos)> {
        let start = self.intervals.iter().map(|iv| iv.start()).min()?;
        let end = self.intervals.iter().map(|iv| iv.end()).max()?;
        Some((start, end))
    }
}

/// Named set of strains shown as one series in the phenotype effect plot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrainGroup {
    pub name: String,
    pub strains: Vec<String>,
}
