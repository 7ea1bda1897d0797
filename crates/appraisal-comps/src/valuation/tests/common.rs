use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::response::Response;
use serde_json::Value;

use crate::valuation::domain::{AccountNumber, Grade, Property};
use crate::valuation::engine::ValuationConfig;
use crate::valuation::normalizer::ValueAdjustment;
use crate::valuation::service::ValuationService;
use crate::valuation::store::{InMemoryPropertyStore, PropertyStore, StoreError};

pub(crate) fn property(
    account: &str,
    building_area: f64,
    cdu: f64,
    building_value: f64,
) -> Property {
    Property {
        account_number: AccountNumber::new(account),
        street_address: format!("{account} Test Ln"),
        year_built: Some(2001),
        cdu,
        grade: Some(Grade::new("B")),
        building_area,
        total_appraised_value: building_value,
        building_value,
        extra_features_value: 0.0,
        neighborhood_code: None,
        land_area: None,
        land_value: None,
    }
}

pub(crate) fn identity_adjustments(pool: &[Property]) -> BTreeMap<AccountNumber, ValueAdjustment> {
    pool.iter()
        .map(|candidate| {
            (
                candidate.account_number.clone(),
                ValueAdjustment {
                    cdu_factor: 1.0,
                    grade_factor: 1.0,
                    cdu_adjusted_value: candidate.building_value + candidate.extra_features_value,
                },
            )
        })
        .collect()
}

/// Reference `1000` on Cypress Creek with six comparables of varying rate and condition.
pub(crate) fn neighborhood() -> Vec<Property> {
    let mut reference = property("1000", 2000.0, 30.0, 260_000.0);
    reference.street_address = "1000 Cypress Creek Pkwy".to_string();
    reference.total_appraised_value = 310_000.0;
    reference.land_value = Some(50_000.0);

    let mut records = vec![reference];
    for (offset, (area, cdu, value)) in [
        (1900.0, 30.0, 209_000.0),
        (2100.0, 30.0, 252_000.0),
        (2000.0, 40.0, 180_000.0),
        (1800.0, 20.0, 240_000.0),
        (2200.0, 30.0, 286_000.0),
        (2050.0, 30.0, 225_500.0),
    ]
    .into_iter()
    .enumerate()
    {
        let account = (1001 + offset).to_string();
        let mut comp = property(&account, area, cdu, value);
        comp.street_address = format!("{} Cypress Creek Pkwy", 1001 + offset);
        records.push(comp);
    }

    let mut outlier = property("2000", 5200.0, 30.0, 900_000.0);
    outlier.street_address = "77 Bayou Bend".to_string();
    records.push(outlier);
    records
}

pub(crate) fn build_service() -> Arc<ValuationService<InMemoryPropertyStore>> {
    let store = InMemoryPropertyStore::new(neighborhood()).expect("store builds");
    Arc::new(ValuationService::new(
        Arc::new(store),
        ValuationConfig::default(),
    ))
}

/// Store double that counts calls, used to verify blank queries never reach the store.
#[derive(Default)]
pub(crate) struct CountingStore {
    pub(crate) calls: AtomicUsize,
}

impl PropertyStore for CountingStore {
    fn search(&self, _query: &str, _limit: usize) -> Result<Vec<Property>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    fn fetch(&self, _account: &AccountNumber) -> Result<Option<Property>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }

    fn candidates(&self, _reference: &Property) -> Result<Vec<Property>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

pub(crate) struct UnavailableStore;

impl PropertyStore for UnavailableStore {
    fn search(&self, _query: &str, _limit: usize) -> Result<Vec<Property>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _account: &AccountNumber) -> Result<Option<Property>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn candidates(&self, _reference: &Property) -> Result<Vec<Property>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

/// Returns a valid reference but stalls when asked for the candidate universe.
pub(crate) struct StallingStore {
    pub(crate) delay: Duration,
}

impl PropertyStore for StallingStore {
    fn search(&self, _query: &str, _limit: usize) -> Result<Vec<Property>, StoreError> {
        std::thread::sleep(self.delay);
        Ok(Vec::new())
    }

    fn fetch(&self, account: &AccountNumber) -> Result<Option<Property>, StoreError> {
        Ok(Some(property(account.as_str(), 2000.0, 30.0, 200_000.0)))
    }

    fn candidates(&self, _reference: &Property) -> Result<Vec<Property>, StoreError> {
        std::thread::sleep(self.delay);
        Ok(Vec::new())
    }
}

pub(crate) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
