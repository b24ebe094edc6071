//! Results and phenotype file readers
//!
//! A results file replays precomputed p-values as a [`SignificanceTest`]:
//!
//! ```text
//! #strains	129S1	A/J	BALB/c	C57BL/6J
//! 4	1000	2500	1.2e-6	bits:0110
//! 4	2000	9000	0.003	groups:0,1,1,2
//! 11	0	5000	0.01	newick:(('A/J|BALB/c',129S1):0.2,C57BL/6J);
//! ```
//!
//! Strain names are sorted to define the index order of `bits:` and `groups:`
//! partitions. Files ending in `.gz` are decompressed on the fly.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use assocplot_core::{
    AssocError, AssocResult, Chromosome, GenomicInterval, PartitionAnnotation, PhenotypeTable, PhylogenySubtree,
    ScoredIntervalCandidate, SignificanceTest,
};
use bitvec::vec::BitVec;
use flate2::read::GzDecoder;

use crate::error::{CliError, CliResult};

fn open_reader(path: &Path) -> CliResult<Box<dyn BufRead>> {
    if !path.exists() {
        return Err(CliError::file_not_found(path.to_path_buf()));
    }
    let file = File::open(path)?;
    if path.extension().map_or(false, |ext| ext == "gz") {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Precomputed association results keyed by chromosome
#[derive(Debug, Clone)]
pub struct FileBackedTest {
    name: String,
    strains: Vec<String>,
    rows: BTreeMap<Chromosome, Vec<ScoredIntervalCandidate>>,
}

impl FileBackedTest {
    pub fn from_path(path: &Path) -> CliResult<Self> {
        let reader = open_reader(path)?;
        Self::from_reader(file_label(path), reader)
    }

    pub fn from_reader<R: BufRead>(name: String, reader: R) -> CliResult<Self> {
        let mut strains: Option<Vec<String>> = None;
        let mut rows: BTreeMap<Chromosome, Vec<ScoredIntervalCandidate>> = BTreeMap::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = index + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(header) = trimmed.strip_prefix("#strains") {
                strains = Some(parse_strain_header(header).map_err(|msg| CliError::parse(&name, msg))?);
                continue;
            }
            if trimmed.starts_with('#') {
                continue;
            }

            let known = strains.as_deref().ok_or_else(|| {
                CliError::parse(&name, format!("line {}: data row before the #strains header", line_no))
            })?;
            let candidate =
                parse_row(trimmed, known).map_err(|msg| CliError::parse(&name, format!("line {}: {}", line_no, msg)))?;
            rows.entry(candidate.interval.chromosome()).or_default().push(candidate);
        }

        let strains = strains.ok_or_else(|| CliError::parse(&name, "missing #strains header"))?;
        log::info!(
            "Loaded {} rows over {} chromosome(s) for {} strains from {}",
            rows.values().map(Vec::len).sum::<usize>(),
            rows.len(),
            strains.len(),
            name
        );
        Ok(Self { name, strains, rows })
    }

    /// Chromosomes with at least one row, ascending
    pub fn chromosomes(&self) -> Vec<Chromosome> {
        self.rows.keys().copied().collect()
    }

    pub fn row_count(&self, chromosome: Chromosome) -> usize {
        self.rows.get(&chromosome).map_or(0, Vec::len)
    }
}

impl SignificanceTest for FileBackedTest {
    fn name(&self) -> &str {
        &self.name
    }

    fn common_strains(&self) -> Vec<String> {
        self.strains.clone()
    }

    fn run_for_chromosome(&self, chromosome: Chromosome) -> AssocResult<Vec<ScoredIntervalCandidate>> {
        self.rows
            .get(&chromosome)
            .cloned()
            .ok_or_else(|| AssocError::computation(chromosome, format!("no rows in {}", self.name)))
    }
}

fn parse_strain_header(header: &str) -> Result<Vec<String>, String> {
    let mut names: Vec<String> = header
        .split('\t')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect();
    if names.is_empty() {
        return Err("#strains header lists no strains".to_string());
    }
    names.sort();
    if let Some(pair) = names.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(format!("strain '{}' listed twice", pair[0]));
    }
    Ok(names)
}

fn parse_field<T: std::str::FromStr>(fields: &[&str], index: usize, what: &str) -> Result<T, String> {
    let raw = fields
        .get(index)
        .map(|field| field.trim())
        .ok_or_else(|| format!("missing {}", what))?;
    raw.parse()
        .map_err(|_| format!("invalid {} '{}'", what, raw))
}

fn parse_row(line: &str, strains: &[String]) -> Result<ScoredIntervalCandidate, String> {
    let fields: Vec<&str> = line.split('\t').collect();
    let chromosome_field = fields.first().map_or("", |field| field.trim());
    let chromosome: Chromosome = chromosome_field
        .trim_start_matches("chr")
        .parse()
        .map_err(|_| format!("invalid chromosome '{}'", chromosome_field))?;
    let start = parse_field(&fields, 1, "start")?;
    let end = parse_field(&fields, 2, "end")?;
    let p_value: f64 = parse_field(&fields, 3, "p-value")?;

    let interval = GenomicInterval::new(chromosome, start, end).map_err(|e| e.to_string())?;
    let candidate = ScoredIntervalCandidate::new(interval, p_value);
    match fields.get(4).map(|field| field.trim()).filter(|field| !field.is_empty()) {
        Some(partition) => Ok(candidate.with_partition(parse_partition(partition, strains)?)),
        None => Ok(candidate),
    }
}

fn parse_partition(field: &str, strains: &[String]) -> Result<PartitionAnnotation, String> {
    let (kind, body) = field
        .split_once(':')
        .ok_or_else(|| format!("partition '{}' has no kind prefix", field))?;

    let partition = match kind {
        "bits" => {
            let mut bits = BitVec::with_capacity(body.len());
            for c in body.chars() {
                match c {
                    '0' => bits.push(false),
                    '1' => bits.push(true),
                    other => return Err(format!("invalid bit '{}'", other)),
                }
            }
            PartitionAnnotation::Binary(bits)
        }
        "groups" => {
            let labels = body
                .split(',')
                .map(|label| label.trim().parse::<u16>().map_err(|_| format!("invalid group label '{}'", label)))
                .collect::<Result<Vec<u16>, String>>()?;
            PartitionAnnotation::MultiGroup(labels)
        }
        "newick" => {
            let tree = PhylogenySubtree::parse_newick(body).map_err(|e| e.to_string())?;
            let known: HashSet<&str> = strains.iter().map(String::as_str).collect();
            for leaf in tree.leaves() {
                if let Some(unknown) = leaf.iter().find(|strain| !known.contains(strain.as_str())) {
                    return Err(format!("tree names unknown strain '{}'", unknown));
                }
            }
            PartitionAnnotation::Phylogeny(tree)
        }
        other => return Err(format!("unknown partition kind '{}'", other)),
    };

    let width = match &partition {
        PartitionAnnotation::Binary(bits) => Some(bits.len()),
        PartitionAnnotation::MultiGroup(labels) => Some(labels.len()),
        PartitionAnnotation::Phylogeny(_) => None,
    };
    if let Some(width) = width.filter(|&w| w != strains.len()) {
        return Err(format!(
            "{} partition covers {} strains, header lists {}",
            partition.kind(),
            width,
            strains.len()
        ));
    }
    Ok(partition)
}

/// Read `strain<TAB>value` rows; repeated strains accumulate observations
pub fn read_phenotypes(path: &Path) -> CliResult<PhenotypeTable> {
    let reader = open_reader(path)?;
    let label = file_label(path);
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| label.clone());
    let mut table = PhenotypeTable::new(name);

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let (strain, value) = trimmed
            .split_once('\t')
            .ok_or_else(|| CliError::parse(&label, format!("line {}: expected strain<TAB>value", index + 1)))?;
        let value: f64 = value.trim().parse().map_err(|_| {
            CliError::parse(&label, format!("line {}: invalid value '{}'", index + 1, value.trim()))
        })?;
        table.add_observation(strain.trim(), value);
    }

    log::info!("Loaded phenotype '{}' for {} strains", table.name(), table.strain_count());
    Ok(table)
}
