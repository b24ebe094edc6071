//! Command implementations for the assocplot CLI

pub mod inspect;
pub mod scan;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use assocplot_core::{AssociationGraphController, Chromosome, GraphHooks, GraphOptions};
use clap::Args;

use crate::config::{Config, NonPositiveMode, ScanConfig};
use crate::error::CliError;
use crate::input::FileBackedTest;
use crate::progress::ScanProgress;

/// Flags overriding the `[scan]` section of the configuration
#[derive(Args, Debug, Clone, Default)]
pub struct ScanOverrides {
    /// Treatment of zero or negative p-values
    #[arg(long, value_enum)]
    pub non_positive: Option<NonPositiveMode>,

    /// Score assigned to clamped p-values
    #[arg(long)]
    pub clamp_ceiling: Option<f64>,

    /// Keep only the earliest of intervals tied for the top score
    #[arg(long)]
    pub no_ties: bool,
}

impl ScanOverrides {
    pub fn apply(&self, scan: &mut ScanConfig) {
        if let Some(mode) = self.non_positive {
            scan.non_positive = mode;
        }
        if let Some(ceiling) = self.clamp_ceiling {
            scan.clamp_ceiling = ceiling;
        }
        if self.no_ties {
            scan.preserve_ties = false;
        }
    }
}

/// Load `input` and run the controller over `selection` (every chromosome in the file
/// when empty), blocking until the computation is done.
pub(crate) fn run_selection(
    config: &Config,
    quiet: bool,
    input: &Path,
    selection: &[Chromosome],
) -> Result<(AssociationGraphController, Arc<FileBackedTest>)> {
    let test = Arc::new(
        FileBackedTest::from_path(input).with_context(|| format!("Failed to load results from {}", input.display()))?,
    );

    let selection = if selection.is_empty() {
        test.chromosomes()
    } else {
        selection.to_vec()
    };
    if selection.is_empty() {
        return Err(CliError::selection("the input contains no chromosomes").into());
    }
    if selection.contains(&0) {
        return Err(CliError::selection("chromosome 0 is not valid").into());
    }

    let progress = Arc::new(ScanProgress::new(quiet));
    let hooks = GraphHooks {
        progress: progress.clone(),
        ..GraphHooks::default()
    };
    let options = GraphOptions {
        runner: config
            .scan
            .runner_options()
            .map_err(|e| CliError::config(e.to_string()))?,
        lookups: config.lookup.links.clone(),
    };

    let mut controller = AssociationGraphController::new(test.clone(), options, hooks);
    controller.select_chromosomes(&selection)?;
    controller.wait().context("Background computation failed")?;
    progress.finish();
    log::debug!("Worker reported {} of {} chromosome(s)", progress.position(), selection.len());

    for (chromosome, error) in controller.failures() {
        log::warn!("Chromosome {} skipped: {}", chromosome, error);
    }
    Ok((controller, test))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let mut scan = ScanConfig::default();
        let overrides = ScanOverrides {
            non_positive: Some(NonPositiveMode::Drop),
            clamp_ceiling: None,
            no_ties: true,
        };
        overrides.apply(&mut scan);
        assert_eq!(scan.non_positive, NonPositiveMode::Drop);
        assert!(!scan.preserve_ties);

        let mut untouched = ScanConfig::default();
        ScanOverrides::default().apply(&mut untouched);
        assert!(untouched.preserve_ties);
    }
}
