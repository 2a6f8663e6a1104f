//! Feature preprocessing for the baseline scorers.

mod preprocess;

pub use preprocess::{impute_and_scale, FeatureError, MedianImputer, ScaledMatrix, StandardScaler};
