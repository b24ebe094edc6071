//! Error types shared across the association graph pipeline

use thiserror::Error;

use crate::types::{Chromosome, GenomicPos};

/// Errors raised by the pipeline and by the test collaborators it drives
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssocError {
    #[error("Association test failed on chromosome {chromosome}: {message}")]
    Computation { chromosome: Chromosome, message: String },

    #[error("Cannot transform non-positive significance value {raw_value}")]
    Transform { raw_value: f64 },

    #[error("Invalid clamp ceiling {ceiling}: must be a finite score")]
    InvalidCeiling { ceiling: f64 },

    #[error("Invalid interval {start}-{end}: start must not exceed end")]
    InvalidInterval { start: GenomicPos, end: GenomicPos },

    #[error("Invalid chromosome number {0}: chromosomes are numbered from 1")]
    InvalidChromosome(Chromosome),

    #[error("Invalid partition: {message}")]
    InvalidPartition { message: String },

    #[error("Invalid viewport: {message}")]
    InvalidViewport { message: String },

    #[error("Newick parse error at offset {offset}: {message}")]
    Newick { offset: usize, message: String },

    #[error("Background worker error: {message}")]
    Worker { message: String },
}

impl AssocError {
    pub fn computation<S: Into<String>>(chromosome: Chromosome, message: S) -> Self {
        Self::Computation {
            chromosome,
            message: message.into(),
        }
    }

    pub fn invalid_partition<S: Into<String>>(message: S) -> Self {
        Self::InvalidPartition { message: message.into() }
    }

    pub fn invalid_viewport<S: Into<String>>(message: S) -> Self {
        Self::InvalidViewport { message: message.into() }
    }

    pub fn newick<S: Into<String>>(offset: usize, message: S) -> Self {
        Self::Newick {
            offset,
            message: message.into(),
        }
    }

    pub fn worker<S: Into<String>>(message: S) -> Self {
        Self::Worker { message: message.into() }
    }

    /// Wrap any error raised while computing `chromosome`, keeping its message
    pub fn for_chromosome(self, chromosome: Chromosome) -> Self {
        match self {
            err @ Self::Computation { .. } => err,
            other => Self::computation(chromosome, other.to_string()),
        }
    }
}

/// Result type for pipeline operations
pub type AssocResult<T> = Result<T, AssocError>;
