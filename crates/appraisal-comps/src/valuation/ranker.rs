use std::collections::BTreeMap;
use std::sync::Arc;

use super::domain::{AccountNumber, ComparableCandidate, Property, ValueAnalysis};
use super::normalizer::ValueAdjustment;
use super::service::ValuationError;

pub const LOWEST_COMPS_LIMIT: usize = 5;

/// Pool ordered ascending by adjusted price per square foot, plus its summary statistics.
#[derive(Debug, Clone)]
pub struct RankedPool {
    pub candidates: Vec<Arc<ComparableCandidate>>,
    pub value_analysis: ValueAnalysis,
}

/// Ranks the pool and derives the suggested market value for `reference`.
///
/// The estimate scales the comparables' median building rate by the reference's own building
/// area; land and extra features are assumed not to move the per-square-foot market rate.
pub fn rank(
    reference: &Property,
    pool: &[Property],
    adjustments: &BTreeMap<AccountNumber, ValueAdjustment>,
) -> Result<RankedPool, ValuationError> {
    ensure_valid_reference(reference)?;

    let mut candidates: Vec<ComparableCandidate> = pool
        .iter()
        .filter(|candidate| candidate.has_usable_area())
        .filter_map(|candidate| {
            let Some(adjustment) = adjustments.get(&candidate.account_number) else {
                tracing::warn!(account = %candidate.account_number, "comparable has no value adjustment");
                return None;
            };
            Some(ComparableCandidate {
                property: candidate.clone(),
                cdu_factor: adjustment.cdu_factor,
                grade_factor: adjustment.grade_factor,
                cdu_adjusted_value: adjustment.cdu_adjusted_value,
                price_per_sqft: adjustment.cdu_adjusted_value / candidate.building_area,
            })
        })
        .collect();

    candidates.sort_by(|left, right| {
        left.price_per_sqft
            .total_cmp(&right.price_per_sqft)
            .then_with(|| {
                left.property
                    .account_number
                    .cmp(&right.property.account_number)
            })
    });

    let rates: Vec<f64> = candidates
        .iter()
        .map(|candidate| candidate.price_per_sqft)
        .collect();
    let median_price_per_sqft = median(&rates);
    let final_adjusted_value = median_price_per_sqft.map(|rate| rate * reference.building_area);
    let potential_reduction = final_adjusted_value
        .map(|value| potential_reduction(reference.total_appraised_value, value));

    let candidates: Vec<Arc<ComparableCandidate>> = candidates.into_iter().map(Arc::new).collect();
    let lowest_five_comps = candidates
        .iter()
        .take(LOWEST_COMPS_LIMIT)
        .cloned()
        .collect();

    Ok(RankedPool {
        candidates,
        value_analysis: ValueAnalysis {
            lowest_five_comps,
            median_price_per_sqft,
            final_adjusted_value,
            potential_reduction,
        },
    })
}

pub(crate) fn ensure_valid_reference(reference: &Property) -> Result<(), ValuationError> {
    if reference.has_usable_area() {
        Ok(())
    } else {
        Err(ValuationError::InvalidReferenceProperty {
            account: reference.account_number.clone(),
            reason: format!(
                "building area must be positive, found {}",
                reference.building_area
            ),
        })
    }
}

/// Median of `values`; even-length inputs average the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Amount by which the appraisal exceeds the suggested value, never negative.
pub fn potential_reduction(total_appraised_value: f64, final_adjusted_value: f64) -> f64 {
    (total_appraised_value - final_adjusted_value).max(0.0)
}
