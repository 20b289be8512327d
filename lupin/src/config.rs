//! Run-wide parameters, loadable from JSON.

use crate::coexpression::CoexpressionArgs;
use crate::common::*;
use crate::mechanistic::MechanisticArgs;
use crate::membership::MembershipArgs;
use crate::regulon::RegulonArgs;
use crate::revision::RevisionArgs;
use crate::stratify::StratifyArgs;
use matrix_util::common_io::open_buf_reader;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    /// worker threads; 0 uses every core
    pub num_threads: usize,
    /// standardise each gene before clustering
    pub zscore: bool,
    pub coexpression: CoexpressionArgs,
    pub revision: RevisionArgs,
    pub membership: MembershipArgs,
    pub mechanistic: MechanisticArgs,
    pub regulon: RegulonArgs,
    pub stratify: StratifyArgs,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            num_threads: 0,
            zscore: true,
            coexpression: CoexpressionArgs::default(),
            revision: RevisionArgs::default(),
            membership: MembershipArgs::default(),
            mechanistic: MechanisticArgs::default(),
            regulon: RegulonArgs::default(),
            stratify: StratifyArgs::default(),
        }
    }
}

impl MinerConfig {
    /// Missing keys take their default values
    pub fn from_json_file(path: &str) -> anyhow::Result<Self> {
        let reader = open_buf_reader(path)?;
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        info!("loaded configuration from {}", path);
        Ok(config)
    }

    pub fn to_json_string(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Use the same minimum cluster size in every stage
    pub fn with_min_number_genes(mut self, min_number_genes: usize) -> Self {
        self.coexpression.min_number_genes = min_number_genes;
        self.revision.min_number_genes = min_number_genes;
        self.mechanistic.min_number_genes = min_number_genes;
        self.regulon.min_number_genes = min_number_genes;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.coexpression.validate()?;
        self.revision.validate()?;
        self.mechanistic.validate()?;
        self.stratify.validate()?;
        if !(0.0..=1.0).contains(&self.membership.p_value) {
            return Err(MinerError::invalid(format!(
                "membership p_value must be in [0, 1], got {}",
                self.membership.p_value
            )));
        }
        if !(0.0..=1.0).contains(&self.regulon.freq_threshold) {
            return Err(MinerError::invalid(format!(
                "regulon freq_threshold must be in [0, 1], got {}",
                self.regulon.freq_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_json_keeps_defaults() -> anyhow::Result<()> {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile()?;
        writeln!(
            file,
            r#"{{ "num_threads": 2, "stratify": {{ "f1_threshold": 0.5 }} }}"#
        )?;
        let path = file.path().to_str().unwrap_or_default().to_string();

        let config = MinerConfig::from_json_file(&path)?;
        assert_eq!(config.num_threads, 2);
        assert_eq!(config.stratify.f1_threshold, 0.5);
        assert_eq!(config.stratify.freq_threshold, 0.333);
        assert_eq!(config.revision, RevisionArgs::default());
        Ok(())
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = MinerConfig::default().with_min_number_genes(8);
        assert_eq!(config.revision.min_number_genes, 8);
        assert!(config.validate().is_ok());
        config.stratify.similarity_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() -> anyhow::Result<()> {
        let config = MinerConfig::default();
        let back: MinerConfig = serde_json::from_str(&config.to_json_string()?)?;
        assert_eq!(back, config);
        Ok(())
    }
}
