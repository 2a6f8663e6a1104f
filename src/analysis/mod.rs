//! Exploratory statistics over prepared tables.

mod correlation;

pub use correlation::{correlation_matrix, pearson, CorrelationMatrix, CorrelationPair};
