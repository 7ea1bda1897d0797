use serde::{Deserialize, Serialize};

use super::assembler::assemble;
use super::domain::{AnalysisResult, Property};
use super::normalizer::{AdjustmentConfig, ValueNormalizer};
use super::ranker::{ensure_valid_reference, rank};
use super::selector::{ComparableSelector, SelectionConfig};
use super::service::ValuationError;

/// Engine configuration: pool selection policy plus value adjustment curves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuationConfig {
    pub selection: SelectionConfig,
    pub adjustment: AdjustmentConfig,
}

/// Stateless pipeline: select, normalize, rank, assemble.
pub struct ValuationEngine {
    selector: ComparableSelector,
    normalizer: ValueNormalizer,
}

impl ValuationEngine {
    pub fn new(config: ValuationConfig) -> Self {
        Self {
            selector: ComparableSelector::new(config.selection),
            normalizer: ValueNormalizer::new(config.adjustment),
        }
    }

    pub fn analyze(
        &self,
        reference: Property,
        universe: &[Property],
    ) -> Result<AnalysisResult, ValuationError> {
        ensure_valid_reference(&reference)?;

        let selection = self.selector.select(&reference, universe);
        let adjustments = self.normalizer.adjust_pool(&selection.pool, &reference);
        let ranked = rank(&reference, &selection.pool, &adjustments)?;

        Ok(assemble(reference, ranked.candidates, ranked.value_analysis))
    }
}
