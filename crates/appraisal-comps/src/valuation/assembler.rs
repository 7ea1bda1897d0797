use std::sync::Arc;

use super::domain::{AnalysisResult, ComparableCandidate, Property, ValueAnalysis};

/// Composes the analysis snapshot. `value_analysis.lowest_five_comps` must share its entries
/// with `pool`; no values are recomputed here.
pub fn assemble(
    reference: Property,
    pool: Vec<Arc<ComparableCandidate>>,
    value_analysis: ValueAnalysis,
) -> AnalysisResult {
    debug_assert!(value_analysis
        .lowest_five_comps
        .iter()
        .all(|lowest| pool.iter().any(|candidate| Arc::ptr_eq(lowest, candidate))));

    AnalysisResult {
        reference_property: reference,
        num_comps_found: pool.len(),
        comparable_properties: pool,
        value_analysis,
    }
}
