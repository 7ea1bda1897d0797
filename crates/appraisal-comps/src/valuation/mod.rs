//! Comparable-property valuation: pool selection, CDU/grade normalization, ranking, and the
//! service and HTTP surface that expose them.

pub mod assembler;
pub mod domain;
pub mod engine;
pub mod normalizer;
pub mod ranker;
pub mod router;
pub mod selector;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use assembler::assemble;
pub use domain::{
    AccountNumber, AnalysisResult, ComparableCandidate, Grade, Property, ValueAnalysis,
};
pub use engine::{ValuationConfig, ValuationEngine};
pub use normalizer::{AdjustmentConfig, CduCurve, GradeAdjustment, ValueAdjustment, ValueNormalizer};
pub use ranker::{median, potential_reduction, rank, RankedPool};
pub use router::valuation_router;
pub use selector::{
    ComparableSelector, PoolSelection, SelectionConfig, SelectionTier, SimilarityWindow,
};
pub use service::{ValuationError, ValuationService};
pub use store::{InMemoryPropertyStore, PropertyLoader, PropertyStore, StoreError};
