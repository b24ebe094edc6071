//! Phenotype effect series for the secondary plot of a selected interval

use std::collections::HashMap;

use serde::Serialize;

use crate::types::StrainGroup;

/// Phenotype observations per strain
#[derive(Debug, Clone, Default)]
pub struct PhenotypeTable {
    name: String,
    observations: HashMap<String, Vec<f64>>,
}

impl PhenotypeTable {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            observations: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_observation<S: Into<String>>(&mut self, strain: S, value: f64) {
        self.observations.entry(strain.into()).or_default().push(value);
    }

    pub fn observations(&self, strain: &str) -> &[f64] {
        self.observations.get(strain).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn strain_count(&self) -> usize {
        self.observations.len()
    }

    /// Per-strain mean, `None` for strains without observations
    pub fn strain_mean(&self, strain: &str) -> Option<f64> {
        mean(self.observations(strain))
    }
}

/// Summary of one strain group for the phenotype effect plot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupEffect {
    pub name: String,
    /// Strains in the group that have at least one observation
    pub strains_observed: usize,
    pub n: usize,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub values: Vec<f64>,
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation; needs at least two values
fn std_dev(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Pool the observations of each group's strains
pub fn phenotype_effect(groups: &[StrainGroup], table: &PhenotypeTable) -> Vec<GroupEffect> {
    groups
        .iter()
        .map(|group| {
            let mut strains_observed = 0;
            let mut values = Vec::new();
            for strain in &group.strains {
                let observed = table.observations(strain);
                if !observed.is_empty() {
                    strains_observed += 1;
                    values.extend_from_slice(observed);
                }
            }
            let average = mean(&values);
            GroupEffect {
                name: group.name.clone(),
                strains_observed,
                n: values.len(),
                mean: average,
                std_dev: average.and_then(|m| std_dev(&values, m)),
                values,
            }
        })
        .collect()
}
