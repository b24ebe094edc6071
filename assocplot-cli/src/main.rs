use std::path::PathBuf;

use anyhow::Result;
use assocplot_core::Chromosome;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod error;
mod input;
mod progress;

use commands::ScanOverrides;
use config::Config;
use error::{format_error_with_suggestions, CliError};

#[derive(Parser)]
#[command(name = "assocplot")]
#[command(about = "Association result graphs: scan, reduce and inspect per-chromosome results")]
#[command(version)]
#[command(long_about = "
assocplot replays precomputed association p-values chromosome by chromosome, reduces
overlapping intervals to the visible skyline and resolves plot clicks to intervals,
strain groups and lookup links.

Examples:
  assocplot scan --input results.tsv.gz --chromosomes 1,2,19 --json scan.json
  assocplot inspect --input results.tsv --chromosome 4 --x 420 --y 120 --phenotypes weight.tsv
  assocplot config > assocplot.toml
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute the selected chromosomes and summarise their visible intervals
    Scan {
        /// Results file (.tsv or .tsv.gz)
        #[arg(short, long)]
        input: PathBuf,

        /// Comma-separated chromosomes; all chromosomes in the file by default
        #[arg(long, value_delimiter = ',')]
        chromosomes: Vec<Chromosome>,

        /// Write the reduced results as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        #[command(flatten)]
        overrides: ScanOverrides,
    },

    /// Resolve a click at device coordinates on one chromosome's plot
    Inspect {
        /// Results file (.tsv or .tsv.gz)
        #[arg(short, long)]
        input: PathBuf,

        /// Chromosome whose plot is clicked
        #[arg(long)]
        chromosome: Chromosome,

        /// Click x in pixels
        #[arg(long, allow_negative_numbers = true)]
        x: f64,

        /// Click y in pixels
        #[arg(long, allow_negative_numbers = true)]
        y: f64,

        /// Phenotype file (strain<TAB>value) for the phenotype effect per strain group
        #[arg(long)]
        phenotypes: Option<PathBuf>,

        #[command(flatten)]
        overrides: ScanOverrides,
    },

    /// Print an example configuration, or write it to a file
    Config {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn setup_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan {
            input,
            chromosomes,
            json,
            overrides,
        } => {
            overrides.apply(&mut config.scan);
            commands::scan::execute(&config, cli.quiet, input, chromosomes, json)?;
        }

        Commands::Inspect {
            input,
            chromosome,
            x,
            y,
            phenotypes,
            overrides,
        } => {
            overrides.apply(&mut config.scan);
            commands::inspect::execute(&config, cli.quiet, input, chromosome, x, y, phenotypes)?;
        }

        Commands::Config { output } => match output {
            Some(path) => {
                config.save_to_file(&path)?;
                log::info!("Configuration written to: {}", path.display());
            }
            None => print!("{}", Config::example_toml()?),
        },
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    if let Err(err) = run(cli) {
        match err.downcast_ref::<CliError>() {
            Some(cli_err) => eprintln!("Error: {}", format_error_with_suggestions(cli_err)),
            None => eprintln!("Error: {:#}", err),
        }
        std::process::exit(1);
    }
}
