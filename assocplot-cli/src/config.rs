//! Configuration handling for the assocplot CLI
//!
//! Supports loading configuration from assocplot.toml files with CLI argument overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use assocplot_core::transform::DEFAULT_SCORE_CEILING;
use assocplot_core::{AssocResult, LookupLink, NonPositivePolicy, PlotArea, RunnerOptions, ScoreTransform};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::CliError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub plot: PlotConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
}

/// Handling of p-values without a finite -log10 (zero or negative)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NonPositiveMode {
    Clamp,
    Drop,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Keep every interval tied for the top score at a position
    #[serde(default = "default_true")]
    pub preserve_ties: bool,

    #[serde(default = "default_non_positive")]
    pub non_positive: NonPositiveMode,

    /// Score given to clamped values
    #[serde(default = "default_clamp_ceiling")]
    pub clamp_ceiling: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    #[serde(default = "default_width")]
    pub width: f64,

    #[serde(default = "default_height")]
    pub height: f64,

    #[serde(default = "default_margin_left")]
    pub margin_left: f64,

    #[serde(default = "default_margin")]
    pub margin_right: f64,

    #[serde(default = "default_margin")]
    pub margin_top: f64,

    #[serde(default = "default_margin_bottom")]
    pub margin_bottom: f64,

    /// Space above the peak, as a fraction of the peak score
    #[serde(default = "default_headroom")]
    pub headroom: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default = "default_links")]
    pub links: Vec<LookupLink>,
}

// Default value functions
fn default_true() -> bool { true }
fn default_non_positive() -> NonPositiveMode { NonPositiveMode::Clamp }
fn default_clamp_ceiling() -> f64 { DEFAULT_SCORE_CEILING }
fn default_width() -> f64 { 1200.0 }
fn default_height() -> f64 { 400.0 }
fn default_margin_left() -> f64 { 60.0 }
fn default_margin() -> f64 { 20.0 }
fn default_margin_bottom() -> f64 { 40.0 }
fn default_headroom() -> f64 { 0.1 }
fn default_links() -> Vec<LookupLink> {
    vec![
        LookupLink::new(
            "UCSC",
            "https://genome.ucsc.edu/cgi-bin/hgTracks?db=mm10&position=chr{chromosome}:{start}-{end}",
        ),
        LookupLink::new(
            "Ensembl",
            "https://www.ensembl.org/Mus_musculus/Location/View?r={chromosome}:{start}-{end}",
        ),
        LookupLink::new(
            "MGI",
            "https://www.informatics.jax.org/marker/summary?chromosome={chromosome}&startBP={start}&endBP={end}",
        ),
    ]
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            preserve_ties: true,
            non_positive: default_non_positive(),
            clamp_ceiling: default_clamp_ceiling(),
        }
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            margin_left: default_margin_left(),
            margin_right: default_margin(),
            margin_top: default_margin(),
            margin_bottom: default_margin_bottom(),
            headroom: default_headroom(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self { links: default_links() }
    }
}

impl ScanConfig {
    pub fn runner_options(&self) -> AssocResult<RunnerOptions> {
        let policy = match self.non_positive {
            NonPositiveMode::Clamp => NonPositivePolicy::clamp(self.clamp_ceiling)?,
            NonPositiveMode::Drop => NonPositivePolicy::Drop,
            NonPositiveMode::Reject => NonPositivePolicy::Reject,
        };
        Ok(RunnerOptions {
            transform: ScoreTransform::new(policy),
            preserve_ties: self.preserve_ties,
        })
    }
}

impl PlotConfig {
    pub fn area(&self) -> PlotArea {
        PlotArea::with_margins(
            self.width,
            self.height,
            self.margin_left,
            self.margin_right,
            self.margin_top,
            self.margin_bottom,
        )
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => {
                let default_path = PathBuf::from("assocplot.toml");
                if default_path.exists() {
                    log::info!("Loading configuration from: assocplot.toml");
                    Self::load_from_file(&default_path)?
                } else {
                    log::debug!("Using default configuration");
                    Self::default()
                }
            }
        };

        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .map_err(CliError::from)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = Self::to_toml(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Generate example configuration file content
    pub fn example_toml() -> Result<String> {
        Self::default().to_toml()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.scan.preserve_ties);
        assert_eq!(config.scan.non_positive, NonPositiveMode::Clamp);
        assert_eq!(config.lookup.links.len(), 3);
        assert_eq!(config.plot.area().width, 1120.0);
    }

    #[test]
    fn test_config_roundtrip() -> Result<()> {
        let mut config = Config::default();
        config.scan.non_positive = NonPositiveMode::Drop;
        let temp_file = NamedTempFile::new()?;

        config.save_to_file(temp_file.path())?;
        let loaded = Config::load_from_file(temp_file.path())?;

        assert_eq!(loaded.scan.non_positive, NonPositiveMode::Drop);
        assert_eq!(loaded.plot.width, config.plot.width);
        assert_eq!(loaded.lookup.links, config.lookup.links);

        Ok(())
    }

    #[test]
    fn test_partial_file_uses_defaults() -> Result<()> {
        let config: Config = toml::from_str("[scan]\nnon_positive = \"reject\"\n")?;
        assert_eq!(config.scan.non_positive, NonPositiveMode::Reject);
        assert!(config.scan.preserve_ties);
        assert_eq!(config.plot.headroom, 0.1);
        assert_eq!(
            config.scan.runner_options()?.transform.policy,
            NonPositivePolicy::Reject
        );
        Ok(())
    }

    #[test]
    fn test_non_finite_ceiling_rejected() -> Result<()> {
        let config: Config = toml::from_str("[scan]\nclamp_ceiling = inf\n")?;
        assert!(config.scan.runner_options().is_err());

        let dropping: Config = toml::from_str("[scan]\nclamp_ceiling = nan\nnon_positive = \"drop\"\n")?;
        assert_eq!(dropping.scan.runner_options()?.transform.policy, NonPositivePolicy::Drop);
        Ok(())
    }

    #[test]
    fn test_malformed_file_is_config_error() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        std::io::Write::write_all(&mut file, b"[plot]\nwidth = \"wide\"\n")?;
        let err = Config::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err.downcast_ref::<CliError>(), Some(CliError::Config { .. })));
        Ok(())
    }

    #[test]
    fn test_example_toml_generation() -> Result<()> {
        let example = Config::example_toml()?;
        assert!(example.contains("[scan]"));
        assert!(example.contains("[plot]"));
        assert!(example.contains("[[lookup.links]]"));
        Ok(())
    }
}
