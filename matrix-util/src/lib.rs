pub mod common_io;
pub mod dmatrix_pca;
pub mod dmatrix_stat;
pub mod graph;
pub mod traits;
