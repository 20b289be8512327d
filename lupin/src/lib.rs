pub mod background;
pub mod centroid;
pub mod coexpression;
pub mod common;
pub mod config;
pub mod error;
pub mod expression;
pub mod hypothesis_tests;
pub mod identifier;
pub mod mechanistic;
pub mod membership;
pub mod pipeline;
pub mod principal;
pub mod reference;
pub mod regulon;
pub mod revision;
pub mod stratify;
pub mod topology;

pub use config::MinerConfig;
pub use error::{MinerError, Result};
pub use expression::ExpressionMatrix;
pub use pipeline::{run_pipeline, PipelineOutput};
