#![allow(dead_code)]

pub use crate::error::{MinerError, Result};
pub use log::{debug, info, warn};
pub use std::collections::{BTreeMap, BTreeSet};

pub type Mat = nalgebra::DMatrix<f64>;
pub type DVec = nalgebra::DVector<f64>;

pub type GeneId = Box<str>;
pub type SampleId = Box<str>;

/// An unordered set of genes, kept sorted for reproducible output
pub type GeneSet = BTreeSet<GeneId>;
pub type SampleSet = BTreeSet<SampleId>;

/// cluster index -> genes
pub type ClusterDict = BTreeMap<usize, GeneSet>;

/// cluster index -> samples carrying one activity label
pub type MembershipDictionary = BTreeMap<usize, SampleSet>;

/// regulator -> target genes
pub type RegulonDict = BTreeMap<Box<str>, GeneSet>;
