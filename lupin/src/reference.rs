//! Regulator -> target reference consulted by mechanistic inference.

use crate::common::*;
use fnv::FnvHashMap as HashMap;

/// Read-only regulator/target table, shared across worker threads
pub trait RegulatorReference: Sync {
    /// Every regulator with at least one target in `genes`, with its
    /// complete target set
    fn lookup(&self, genes: &GeneSet) -> Result<RegulonDict>;
}

#[derive(Debug, Clone, Default)]
pub struct RegulatorTable {
    targets: RegulonDict,
    regulators_of: HashMap<GeneId, Vec<Box<str>>>,
}

impl RegulatorTable {
    /// Build from `(regulator, target)` pairs; repeated pairs count once
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Box<str>, GeneId)>) -> Self {
        let mut targets = RegulonDict::new();
        for (regulator, target) in pairs {
            if regulator.is_empty() || target.is_empty() {
                continue;
            }
            targets.entry(regulator).or_default().insert(target);
        }

        let mut regulators_of: HashMap<GeneId, Vec<Box<str>>> = HashMap::default();
        for (regulator, genes) in targets.iter() {
            for g in genes {
                regulators_of.entry(g.clone()).or_default().push(regulator.clone());
            }
        }

        Self {
            targets,
            regulators_of,
        }
    }

    pub fn num_regulators(&self) -> usize {
        self.targets.len()
    }

    pub fn num_pairs(&self) -> usize {
        self.targets.values().map(|t| t.len()).sum()
    }
}

impl RegulatorReference for RegulatorTable {
    fn lookup(&self, genes: &GeneSet) -> Result<RegulonDict> {
        if self.targets.is_empty() {
            return Err(MinerError::ReferenceLookup(
                "regulator table has no entries".to_string(),
            ));
        }
        let mut ret = RegulonDict::new();
        for g in genes {
            for regulator in self.regulators_of.get(g).into_iter().flatten() {
                if !ret.contains_key(regulator) {
                    ret.insert(regulator.clone(), self.targets[regulator].clone());
                }
            }
        }
        Ok(ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(Box<str>, GeneId)> {
        raw.iter().map(|&(r, t)| (r.into(), t.into())).collect()
    }

    #[test]
    fn test_lookup_returns_full_target_sets() -> Result<()> {
        let table = RegulatorTable::from_pairs(pairs(&[
            ("TF1", "a"),
            ("TF1", "b"),
            ("TF1", "a"),
            ("TF2", "c"),
            ("TF3", "b"),
        ]));
        assert_eq!(table.num_regulators(), 3);
        assert_eq!(table.num_pairs(), 4);

        let query: GeneSet = ["a".into()].into_iter().collect();
        let hits = table.lookup(&query)?;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits["TF1"].len(), 2);
        Ok(())
    }

    #[test]
    fn test_empty_table_fails_lookup() {
        let table = RegulatorTable::default();
        assert!(matches!(
            table.lookup(&GeneSet::new()),
            Err(MinerError::ReferenceLookup(_))
        ));
    }
}
