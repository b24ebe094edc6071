//! Scan command implementation - compute and summarise reduced results per chromosome

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use assocplot_core::{Chromosome, ChromosomeResultSet};
use serde::Serialize;

use super::run_selection;
use crate::config::Config;

#[derive(Serialize)]
struct FailureReport {
    chromosome: Chromosome,
    message: String,
}

#[derive(Serialize)]
struct ScanReport<'a> {
    input: String,
    results: Vec<&'a ChromosomeResultSet>,
    failures: Vec<FailureReport>,
}

pub fn execute(
    config: &Config,
    quiet: bool,
    input: PathBuf,
    chromosomes: Vec<Chromosome>,
    json: Option<PathBuf>,
) -> Result<()> {
    log::info!("Scanning {}", input.display());
    let (controller, test) = run_selection(config, quiet, &input, &chromosomes)?;

    let cached: Vec<Arc<ChromosomeResultSet>> = controller
        .selection()
        .iter()
        .filter_map(|&chromosome| controller.cache().get(chromosome))
        .collect();

    if !quiet {
        println!("chromosome\trows\tvisible\tpeak\tscore");
        for &chromosome in controller.selection() {
            match cached.iter().find(|set| set.chromosome() == chromosome) {
                Some(set) => {
                    let (peak, score) = set
                        .peak()
                        .map_or(("-".to_string(), "-".to_string()), |iv| {
                            (iv.interval().to_string(), format!("{:.3}", iv.display_score()))
                        });
                    println!(
                        "{}\t{}\t{}\t{}\t{}",
                        chromosome,
                        test.row_count(chromosome),
                        set.len(),
                        peak,
                        score
                    );
                }
                None => println!("{}\t{}\tfailed\t-\t-", chromosome, test.row_count(chromosome)),
            }
        }
    }

    let failures = controller.failures();
    if !failures.is_empty() {
        log::warn!("{} chromosome(s) could not be computed", failures.len());
    }

    if let Some(path) = json {
        let report = ScanReport {
            input: input.display().to_string(),
            results: cached.iter().map(|set| set.as_ref()).collect(),
            failures: failures
                .iter()
                .map(|(chromosome, error)| FailureReport {
                    chromosome: *chromosome,
                    message: error.to_string(),
                })
                .collect(),
        };
        let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &report)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Report written to: {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_scan_writes_json_report() -> Result<()> {
        let mut input = NamedTempFile::new()?;
        writeln!(input, "#strains\tA\tB")?;
        writeln!(input, "1\t100\t200\t1e-5\tbits:10")?;
        writeln!(input, "1\t150\t180\t1e-3")?;
        writeln!(input, "2\t0\t50\t0")?;
        input.flush()?;
        let output = NamedTempFile::new()?;

        execute(
            &Config::default(),
            true,
            input.path().to_path_buf(),
            vec![1, 2, 3],
            Some(output.path().to_path_buf()),
        )?;

        let report: serde_json::Value = serde_json::from_reader(File::open(output.path())?)?;
        let results = report["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["intervals"].as_array().unwrap().len(), 1);
        assert_eq!(report["failures"][0]["chromosome"], 3);
        Ok(())
    }
}
