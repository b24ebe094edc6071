//! Context actions and strain groups for a clicked interval

use std::collections::{BTreeMap, HashSet};

use bitvec::slice::BitSlice;
use serde::{Deserialize, Serialize};

use crate::error::{AssocError, AssocResult};
use crate::phylogeny::PhylogenySubtree;
use crate::types::{PartitionAnnotation, ScoredInterval, StrainGroup};

pub const INSIDE_BLOCK: &str = "Inside block";
pub const OUTSIDE_BLOCK: &str = "Outside block";

/// External lookup keyed by genomic coordinates. `url` may contain `{chromosome}`,
/// `{start}` and `{end}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupLink {
    pub label: String,
    pub url: String,
}

impl LookupLink {
    pub fn new<L: Into<String>, U: Into<String>>(label: L, url: U) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }

    pub fn render(&self, interval: &ScoredInterval) -> String {
        let iv = interval.interval();
        self.url
            .replace("{chromosome}", &iv.chromosome().to_string())
            .replace("{start}", &iv.start().to_string())
            .replace("{end}", &iv.end().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ContextAction {
    OpenLookup { label: String, url: String },
    CopyCoordinates { text: String },
    ShowPhenotypeEffect,
}

impl ContextAction {
    pub fn label(&self) -> String {
        match self {
            ContextAction::OpenLookup { label, .. } => format!("View in {}", label),
            ContextAction::CopyCoordinates { text } => format!("Copy {}", text),
            ContextAction::ShowPhenotypeEffect => "Show phenotype effect".to_string(),
        }
    }
}

/// Everything the UI needs to present for one resolved click
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureInspection {
    pub interval: ScoredInterval,
    pub actions: Vec<ContextAction>,
    pub strain_groups: Option<Vec<StrainGroup>>,
}

/// Receives inspections for presentation (menus, secondary plots)
pub trait ContextActionSink: Send + Sync {
    fn present(&self, inspection: &FeatureInspection);
}

/// Logs each inspection at `info` level
#[derive(Debug, Default)]
pub struct LogActionSink;

impl ContextActionSink for LogActionSink {
    fn present(&self, inspection: &FeatureInspection) {
        log::info!(
            "Selected {} (score {:.3}), {} action(s)",
            inspection.interval.interval(),
            inspection.interval.display_score(),
            inspection.actions.len()
        );
    }
}

#[derive(Debug, Clone)]
pub struct FeatureInspector {
    strain_names: Vec<String>,
    lookups: Vec<LookupLink>,
}

impl FeatureInspector {
    /// `strain_names` must be in the index order used by binary and multi-group
    /// partitions (the test's sorted common strains).
    pub fn new(strain_names: Vec<String>, lookups: Vec<LookupLink>) -> Self {
        Self { strain_names, lookups }
    }

    pub fn strain_names(&self) -> &[String] {
        &self.strain_names
    }

    pub fn actions(&self, interval: &ScoredInterval) -> Vec<ContextAction> {
        let mut actions: Vec<ContextAction> = self
            .lookups
            .iter()
            .map(|link| ContextAction::OpenLookup {
                label: link.label.clone(),
                url: link.render(interval),
            })
            .collect();
        actions.push(ContextAction::CopyCoordinates {
            text: interval.interval().to_string(),
        });
        if interval.partition().is_some() {
            actions.push(ContextAction::ShowPhenotypeEffect);
        }
        actions
    }

    pub fn strain_groups(&self, partition: &PartitionAnnotation) -> AssocResult<Vec<StrainGroup>> {
        match partition {
            PartitionAnnotation::Binary(bits) => self.binary_groups(bits),
            PartitionAnnotation::MultiGroup(labels) => self.labelled_groups(labels),
            PartitionAnnotation::Phylogeny(tree) => Ok(leaf_groups(tree)),
        }
    }

    pub fn inspect(&self, interval: &ScoredInterval) -> AssocResult<FeatureInspection> {
        let strain_groups = interval
            .partition()
            .map(|partition| self.strain_groups(partition))
            .transpose()?;
        Ok(FeatureInspection {
            interval: interval.clone(),
            actions: self.actions(interval),
            strain_groups,
        })
    }

    fn check_len(&self, kind: &str, len: usize) -> AssocResult<()> {
        if len != self.strain_names.len() {
            return Err(AssocError::invalid_partition(format!(
                "{} partition covers {} strains but the test has {}",
                kind,
                len,
                self.strain_names.len()
            )));
        }
        Ok(())
    }

    fn binary_groups(&self, bits: &BitSlice) -> AssocResult<Vec<StrainGroup>> {
        self.check_len("binary", bits.len())?;
        let (inside, outside): (Vec<_>, Vec<_>) = self
            .strain_names
            .iter()
            .zip(bits.iter().by_vals())
            .partition(|(_, bit)| *bit);
        let names = |members: Vec<(&String, bool)>| -> Vec<String> {
            members.into_iter().map(|(name, _)| name.clone()).collect()
        };
        Ok(vec![
            StrainGroup {
                name: INSIDE_BLOCK.to_string(),
                strains: names(inside),
            },
            StrainGroup {
                name: OUTSIDE_BLOCK.to_string(),
                strains: names(outside),
            },
        ])
    }

    fn labelled_groups(&self, labels: &[u16]) -> AssocResult<Vec<StrainGroup>> {
        self.check_len("multi-group", labels.len())?;
        let mut order: Vec<u16> = Vec::new();
        let mut members: BTreeMap<u16, Vec<String>> = BTreeMap::new();
        for (name, &label) in self.strain_names.iter().zip(labels) {
            let group = members.entry(label).or_insert_with(|| {
                order.push(label);
                Vec::new()
            });
            group.push(name.clone());
        }

        let mut used = HashSet::new();
        Ok(order
            .into_iter()
            .filter_map(|label| members.remove(&label))
            .map(|strains| StrainGroup {
                name: unique_name(&strains[0], &mut used),
                strains,
            })
            .collect())
    }
}

fn leaf_groups(tree: &PhylogenySubtree) -> Vec<StrainGroup> {
    let mut used = HashSet::new();
    tree.leaves()
        .into_iter()
        .map(|strains| StrainGroup {
            name: unique_name(&strains[0], &mut used),
            strains: strains.to_vec(),
        })
        .collect()
}

/// Representative name, suffixed `#2`, `#3`, ... if already taken
fn unique_name(representative: &str, used: &mut HashSet<String>) -> String {
    let mut name = representative.to_string();
    let mut n = 1;
    while used.contains(&name) {
        n += 1;
        name = format!("{} #{}", representative, n);
    }
    used.insert(name.clone());
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenomicInterval;
    use bitvec::prelude::*;

    fn strains() -> Vec<String> {
        ["129S1", "A/J", "BALB/c", "C57BL/6J"].iter().map(|s| s.to_string()).collect()
    }

    fn inspector() -> FeatureInspector {
        FeatureInspector::new(
            strains(),
            vec![LookupLink::new(
                "UCSC",
                "https://genome.ucsc.edu/cgi-bin/hgTracks?db=mm10&position=chr{chromosome}:{start}-{end}",
            )],
        )
    }

    fn interval() -> ScoredInterval {
        ScoredInterval::new(GenomicInterval::new(4, 1000, 2500).unwrap(), 1e-4, 4.0)
    }

    #[test]
    fn test_binary_groups() {
        let partition = PartitionAnnotation::Binary(bitvec![0, 1, 1, 0]);
        let groups = inspector().strain_groups(&partition).unwrap();
        assert_eq!(groups[0].name, INSIDE_BLOCK);
        assert_eq!(groups[0].strains, vec!["A/J", "BALB/c"]);
        assert_eq!(groups[1].name, OUTSIDE_BLOCK);
        assert_eq!(groups[1].strains, vec!["129S1", "C57BL/6J"]);
    }

    #[test]
    fn test_length_mismatch() {
        let partition = PartitionAnnotation::MultiGroup(vec![0, 1]);
        assert!(matches!(
            inspector().strain_groups(&partition),
            Err(AssocError::InvalidPartition { .. })
        ));
    }

    #[test]
    fn test_multi_groups_by_first_appearance() {
        let partition = PartitionAnnotation::MultiGroup(vec![2, 0, 2, 0]);
        let groups = inspector().strain_groups(&partition).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "129S1");
        assert_eq!(groups[0].strains, vec!["129S1", "BALB/c"]);
        assert_eq!(groups[1].name, "A/J");
        assert_eq!(groups[1].strains, vec!["A/J", "C57BL/6J"]);
    }

    #[test]
    fn test_phylogeny_leaf_groups() {
        let tree = PhylogenySubtree::parse_newick("(('A/J|BALB/c',129S1):0.2,C57BL/6J);").unwrap();
        let groups = inspector()
            .strain_groups(&PartitionAnnotation::Phylogeny(tree))
            .unwrap();
        let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["A/J", "129S1", "C57BL/6J"]);
        assert_eq!(groups[0].strains, vec!["A/J", "BALB/c"]);
    }

    #[test]
    fn test_unique_names() {
        let mut used = HashSet::new();
        assert_eq!(unique_name("X", &mut used), "X");
        assert_eq!(unique_name("X", &mut used), "X #2");
        assert_eq!(unique_name("X", &mut used), "X #3");
    }

    #[test]
    fn test_actions_without_partition() {
        let actions = inspector().actions(&interval());
        assert_eq!(
            actions,
            vec![
                ContextAction::OpenLookup {
                    label: "UCSC".into(),
                    url: "https://genome.ucsc.edu/cgi-bin/hgTracks?db=mm10&position=chr4:1000-2500".into(),
                },
                ContextAction::CopyCoordinates {
                    text: "chr4:1000-2500".into()
                },
            ]
        );
    }

    #[test]
    fn test_inspect_with_partition() {
        let iv = interval().with_partition(PartitionAnnotation::Binary(bitvec![1, 1, 1, 0]));
        let inspection = inspector().inspect(&iv).unwrap();
        assert_eq!(inspection.actions.last(), Some(&ContextAction::ShowPhenotypeEffect));
        let groups = inspection.strain_groups.unwrap();
        assert_eq!(groups[0].strains.len(), 3);
        assert_eq!(groups[1].strains, vec!["C57BL/6J"]);
        assert_eq!(ContextAction::ShowPhenotypeEffect.label(), "Show phenotype effect");
    }

    #[test]
    fn test_action_json_is_tagged() {
        let action = ContextAction::CopyCoordinates {
            text: "chr4:1000-2500".into(),
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            serde_json::json!({"action": "copy_coordinates", "text": "chr4:1000-2500"})
        );
    }
}
