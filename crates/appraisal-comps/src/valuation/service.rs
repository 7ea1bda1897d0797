use std::sync::Arc;
use std::time::Duration;

use super::domain::{AccountNumber, AnalysisResult, Property};
use super::engine::{ValuationConfig, ValuationEngine};
use super::store::{PropertyStore, StoreError};

pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Service binding a property store to the valuation engine.
pub struct ValuationService<S> {
    store: Arc<S>,
    engine: ValuationEngine,
    search_limit: usize,
    request_timeout: Duration,
}

impl<S> ValuationService<S>
where
    S: PropertyStore + 'static,
{
    pub fn new(store: Arc<S>, config: ValuationConfig) -> Self {
        Self {
            store,
            engine: ValuationEngine::new(config),
            search_limit: DEFAULT_SEARCH_LIMIT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Address search. Blank queries return nothing without touching the store.
    pub fn search(&self, query: &str) -> Result<Vec<Property>, ValuationError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self.store.search(query, self.search_limit)?)
    }

    pub fn get(&self, account: &AccountNumber) -> Result<Property, ValuationError> {
        self.store
            .fetch(account)?
            .ok_or_else(|| ValuationError::NotFound(account.clone()))
    }

    /// Runs the comparable analysis for the property identified by `account`.
    pub fn analyze(&self, account: &AccountNumber) -> Result<AnalysisResult, ValuationError> {
        let reference = self.get(account)?;
        let universe = self.store.candidates(&reference)?;
        let result = self.engine.analyze(reference, &universe)?;

        tracing::info!(
            %account,
            comps = result.num_comps_found(),
            final_adjusted_value = ?result.value_analysis().final_adjusted_value(),
            "comparable analysis complete"
        );
        Ok(result)
    }
}

/// Error raised by the valuation service.
#[derive(Debug, thiserror::Error)]
pub enum ValuationError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("property with account number {0} not found")]
    NotFound(AccountNumber),
    #[error("invalid reference property {account}: {reason}")]
    InvalidReferenceProperty {
        account: AccountNumber,
        reason: String,
    },
}
