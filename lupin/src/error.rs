//! Error kinds raised by the inference stages.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MinerError {
    /// Malformed or empty matrix, non-numeric values, duplicate IDs,
    /// or mismatched axes between artifacts
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A whole stage produced nothing to hand downstream
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// A test is undefined on this unit (e.g. zero variance)
    #[error("statistical degeneracy: {0}")]
    StatisticalDegeneracy(String),

    /// The regulator reference could not answer a query
    #[error("reference lookup failed: {0}")]
    ReferenceLookup(String),
}

pub type Result<T> = std::result::Result<T, MinerError>;

impl MinerError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        MinerError::InvalidInput(msg.into())
    }

    pub fn degenerate(msg: impl std::fmt::Display) -> Self {
        MinerError::StatisticalDegeneracy(msg.to_string())
    }
}
