use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{AccountNumber, Grade, Property};

/// Percent-good CDU curve.
///
/// CDU is read as a depreciation-style score on `[0, scale]` where lower is better condition.
/// A candidate's building value is rescaled to the reference's condition by the ratio of the
/// two "percent good" values, `(scale - reference) / (scale - candidate)`, clamped to
/// `[min_factor, max_factor]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CduCurve {
    pub scale: f64,
    pub min_factor: f64,
    pub max_factor: f64,
}

impl Default for CduCurve {
    fn default() -> Self {
        Self {
            scale: 100.0,
            min_factor: 0.5,
            max_factor: 2.0,
        }
    }
}

impl CduCurve {
    /// Multiplier applied to the candidate's building value. Exactly `1.0` for equal CDUs.
    pub fn factor(&self, candidate_cdu: f64, reference_cdu: f64) -> f64 {
        let candidate = candidate_cdu.clamp(0.0, self.scale);
        let reference = reference_cdu.clamp(0.0, self.scale);
        if candidate == reference {
            return 1.0;
        }

        let candidate_good = self.scale - candidate;
        if candidate_good <= 0.0 {
            return self.max_factor;
        }

        ((self.scale - reference) / candidate_good).clamp(self.min_factor, self.max_factor)
    }
}

/// Compounding per-tier grade adjustment, disabled unless configured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeAdjustment {
    /// Fractional change per grade tier, `0.04` for 4%.
    pub step: f64,
    pub min_factor: f64,
    pub max_factor: f64,
}

impl GradeAdjustment {
    /// `(1 + step)^(reference_rank - candidate_rank)`, so a lower-grade candidate is
    /// scaled up. Unranked or missing grades leave the value unchanged.
    pub fn factor(&self, candidate: Option<&Grade>, reference: Option<&Grade>) -> f64 {
        let (Some(candidate), Some(reference)) = (
            candidate.and_then(Grade::rank),
            reference.and_then(Grade::rank),
        ) else {
            return 1.0;
        };
        if candidate == reference {
            return 1.0;
        }

        (1.0 + self.step)
            .powi(reference - candidate)
            .clamp(self.min_factor, self.max_factor)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentConfig {
    pub cdu: CduCurve,
    pub grade: Option<GradeAdjustment>,
}

/// Factors and resulting value for one comparable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueAdjustment {
    pub cdu_factor: f64,
    pub grade_factor: f64,
    pub cdu_adjusted_value: f64,
}

pub struct ValueNormalizer {
    config: AdjustmentConfig,
}

impl ValueNormalizer {
    pub fn new(config: AdjustmentConfig) -> Self {
        Self { config }
    }

    /// `building_value * cdu_factor * grade_factor + extra_features_value`.
    pub fn adjust(&self, candidate: &Property, reference: &Property) -> ValueAdjustment {
        let cdu_factor = self.config.cdu.factor(candidate.cdu, reference.cdu);
        let grade_factor = self
            .config
            .grade
            .map(|grade| grade.factor(candidate.grade.as_ref(), reference.grade.as_ref()))
            .unwrap_or(1.0);

        ValueAdjustment {
            cdu_factor,
            grade_factor,
            cdu_adjusted_value: candidate.building_value * cdu_factor * grade_factor
                + candidate.extra_features_value,
        }
    }

    pub fn adjust_pool(
        &self,
        pool: &[Property],
        reference: &Property,
    ) -> BTreeMap<AccountNumber, ValueAdjustment> {
        pool.iter()
            .map(|candidate| {
                (
                    candidate.account_number.clone(),
                    self.adjust(candidate, reference),
                )
            })
            .collect()
    }
}
