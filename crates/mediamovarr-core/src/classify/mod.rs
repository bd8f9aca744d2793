pub mod base;
pub mod features;
pub mod patterns;

pub use base::classify;
pub use features::{extract, CategoryStats, FeatureSet, FileCategory};
