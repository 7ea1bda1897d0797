mod ingest;

pub use ingest::PropertyLoader;

use std::collections::HashMap;
use std::path::Path;

use super::domain::{AccountNumber, Property};

/// Read-only query surface over the property records source.
pub trait PropertyStore: Send + Sync {
    /// Case-insensitive substring match on `street_address`, capped at `limit` records.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<Property>, StoreError>;
    fn fetch(&self, account: &AccountNumber) -> Result<Option<Property>, StoreError>;
    /// Universe the comparable selector narrows for `reference`.
    fn candidates(&self, reference: &Property) -> Result<Vec<Property>, StoreError>;
}

/// Error enumeration for store failures. Absence of a match is never an error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("property store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed property record at line {line} ({account}): {reason}")]
    Malformed {
        line: u64,
        account: String,
        reason: String,
    },
    #[error("failed to read property export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid property export: {0}")]
    Csv(#[from] csv::Error),
}

/// Immutable, index-backed store built once from an export and shared across requests.
#[derive(Debug, Default)]
pub struct InMemoryPropertyStore {
    records: Vec<Property>,
    by_account: HashMap<AccountNumber, usize>,
    // upper-cased addresses, parallel to `records`
    addresses: Vec<String>,
}

impl InMemoryPropertyStore {
    pub fn new(records: Vec<Property>) -> Result<Self, StoreError> {
        let mut by_account = HashMap::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if by_account
                .insert(record.account_number.clone(), index)
                .is_some()
            {
                return Err(StoreError::Malformed {
                    line: index as u64 + 1,
                    account: record.account_number.to_string(),
                    reason: "duplicate account number".to_string(),
                });
            }
        }

        let addresses = records
            .iter()
            .map(|record| record.street_address.to_uppercase())
            .collect();

        Ok(Self {
            records,
            by_account,
            addresses,
        })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let records = PropertyLoader::from_path(path)?;
        let store = Self::new(records)?;
        tracing::info!(records = store.len(), "property store loaded");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl PropertyStore for InMemoryPropertyStore {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<Property>, StoreError> {
        let needle = query.trim().to_uppercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let mut matches: Vec<&Property> = self
            .records
            .iter()
            .zip(&self.addresses)
            .filter(|(_, address)| address.contains(&needle))
            .map(|(record, _)| record)
            .collect();

        matches.sort_by(|left, right| {
            left.street_address
                .cmp(&right.street_address)
                .then_with(|| left.account_number.cmp(&right.account_number))
        });

        Ok(matches.into_iter().take(limit).cloned().collect())
    }

    fn fetch(&self, account: &AccountNumber) -> Result<Option<Property>, StoreError> {
        Ok(self
            .by_account
            .get(account)
            .map(|index| self.records[*index].clone()))
    }

    fn candidates(&self, _reference: &Property) -> Result<Vec<Property>, StoreError> {
        Ok(self.records.clone())
    }
}
