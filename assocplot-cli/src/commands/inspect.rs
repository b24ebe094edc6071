//! Inspect command implementation - resolve a click on a chromosome plot

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use assocplot_core::{
    phenotype_effect, Chromosome, ContextAction, DevicePoint, FeatureInspection, GroupEffect, PlotViewport,
};

use super::run_selection;
use crate::config::Config;
use crate::input::read_phenotypes;

pub fn execute(
    config: &Config,
    quiet: bool,
    input: PathBuf,
    chromosome: Chromosome,
    x: f64,
    y: f64,
    phenotypes: Option<PathBuf>,
) -> Result<()> {
    let (inspection, effects) = inspect_click(config, quiet, &input, chromosome, x, y, phenotypes.as_deref())?;
    print_inspection(&inspection);
    if let Some((name, effects)) = effects {
        print_effects(&name, &effects);
    }
    Ok(())
}

/// Phenotype table name and per-group effects for the clicked interval
type PhenotypeEffects = (String, Vec<GroupEffect>);

/// Compute `chromosome`, resolve the click at device `(x, y)` and, given a phenotype
/// file, pool its observations over the interval's strain groups
fn inspect_click(
    config: &Config,
    quiet: bool,
    input: &Path,
    chromosome: Chromosome,
    x: f64,
    y: f64,
    phenotypes: Option<&Path>,
) -> Result<(FeatureInspection, Option<PhenotypeEffects>)> {
    let (controller, _test) = run_selection(config, quiet, input, &[chromosome])?;

    let results = controller.cache().get(chromosome).ok_or_else(|| {
        let reason = controller
            .failures()
            .into_iter()
            .find(|(failed, _)| *failed == chromosome)
            .map_or_else(|| "no results".to_string(), |(_, error)| error.to_string());
        anyhow!("Chromosome {} is not available: {}", chromosome, reason)
    })?;

    let viewport = PlotViewport::for_result_set(&results, config.plot.area(), config.plot.headroom)?;
    let point = DevicePoint::new(x, y);
    let domain = viewport.device_to_domain(point);
    log::info!(
        "Click at ({}, {}) maps to position {:.0}, score {:.3}",
        x,
        y,
        domain.position,
        domain.score
    );

    let inspection = controller
        .on_click(chromosome, point, &viewport)
        .ok_or_else(|| anyhow!("Chromosome {} has no visible intervals", chromosome))?;

    let Some(path) = phenotypes else {
        return Ok((inspection, None));
    };
    let table = read_phenotypes(path)?;
    let effects = match &inspection.strain_groups {
        Some(groups) => Some((table.name().to_string(), phenotype_effect(groups, &table))),
        None => {
            log::warn!("Selected interval has no strain partition; phenotype effect unavailable");
            None
        }
    };
    Ok((inspection, effects))
}

fn print_effects(name: &str, effects: &[GroupEffect]) {
    println!("Phenotype effect ({}):", name);
    for effect in effects {
        let mean = effect.mean.map_or("-".to_string(), |m| format!("{:.3}", m));
        let sd = effect.std_dev.map_or("-".to_string(), |s| format!("{:.3}", s));
        println!(
            "  {}\tn={}\tstrains={}\tmean={}\tsd={}",
            effect.name, effect.n, effect.strains_observed, mean, sd
        );
    }
}

fn print_inspection(inspection: &FeatureInspection) {
    let interval = &inspection.interval;
    println!(
        "{}\tscore {:.3}\tp {:e}",
        interval.interval(),
        interval.display_score(),
        interval.raw_value()
    );

    println!("Actions:");
    for action in &inspection.actions {
        match action {
            ContextAction::OpenLookup { url, .. } => println!("  {}: {}", action.label(), url),
            _ => println!("  {}", action.label()),
        }
    }

    if let Some(groups) = &inspection.strain_groups {
        println!("Strain groups:");
        for group in groups {
            println!("  {} ({}): {}", group.name, group.strains.len(), group.strains.join(", "));
        }
    }
}
