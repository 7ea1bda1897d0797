//! End-to-end comparable analysis over a fixture export, driven through the public store,
//! service, and router surface.

use std::sync::Arc;

use appraisal_comps::valuation::{
    valuation_router, AccountNumber, InMemoryPropertyStore, PropertyStore, SelectionConfig,
    SimilarityWindow, ValuationConfig, ValuationError, ValuationService,
};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/properties.tsv");

fn service(config: ValuationConfig) -> ValuationService<InMemoryPropertyStore> {
    let store = InMemoryPropertyStore::from_path(FIXTURE).expect("fixture loads");
    ValuationService::new(Arc::new(store), config)
}

#[test]
fn fixture_export_loads_with_assessor_columns() {
    let store = InMemoryPropertyStore::from_path(FIXTURE).expect("fixture loads");
    assert_eq!(store.len(), 9);

    let reference = store
        .fetch(&AccountNumber::new("0660640130020"))
        .expect("fetch succeeds")
        .expect("reference present");
    assert_eq!(reference.street_address, "1214 MAGNOLIA GROVE LN");
    assert_eq!(reference.building_area, 2000.0);
    assert_eq!(reference.land_value, Some(55_000.0));
    assert_eq!(reference.neighborhood_code.as_deref(), Some("8401.01"));
}

#[test]
fn suggested_value_uses_median_of_full_pool() {
    let service = service(ValuationConfig::default());

    let result = service
        .analyze(&AccountNumber::new("0660640130020"))
        .expect("analysis succeeds");

    assert_eq!(result.num_comps_found(), 5);
    let analysis = result.value_analysis();
    assert_eq!(analysis.lowest_five_comps().len(), 5);
    assert!((analysis.median_price_per_sqft().unwrap() - 109.375).abs() < 1e-6);
    assert!((analysis.final_adjusted_value().unwrap() - 218_750.0).abs() < 1e-6);
    assert!((analysis.potential_reduction().unwrap() - 81_250.0).abs() < 1e-6);

    let first = &analysis.lowest_five_comps()[0];
    assert_eq!(first.property.account_number.as_str(), "0660640130023");
    assert!((first.cdu_adjusted_value - 201_500.0).abs() < 1e-6);

    for candidate in result.comparable_properties() {
        assert!(candidate.property.building_area > 0.0);
        assert_ne!(
            candidate.property.account_number,
            result.reference_property().account_number
        );
    }
}

#[test]
fn narrow_windows_can_leave_the_pool_empty() {
    let config = ValuationConfig {
        selection: SelectionConfig {
            window: SimilarityWindow {
                area_tolerance_pct: Some(1.0),
                land_area_tolerance_pct: None,
                year_built_tolerance: Some(0),
                cdu_tolerance: Some(0.0),
            },
            ..SelectionConfig::default()
        },
        ..ValuationConfig::default()
    };

    let result = service(config)
        .analyze(&AccountNumber::new("0660640130020"))
        .expect("empty pool is still a result");

    assert_eq!(result.num_comps_found(), 0);
    assert!(result.value_analysis().lowest_five_comps().is_empty());
    assert_eq!(result.value_analysis().median_price_per_sqft(), None);
}

#[test]
fn land_area_band_narrows_the_pool() {
    let config = ValuationConfig {
        selection: SelectionConfig {
            window: SimilarityWindow {
                land_area_tolerance_pct: Some(5.0),
                ..SimilarityWindow::default()
            },
            ..SelectionConfig::default()
        },
        ..ValuationConfig::default()
    };

    let result = service(config)
        .analyze(&AccountNumber::new("0660640130020"))
        .expect("analysis succeeds");

    let mut accounts: Vec<&str> = result
        .comparable_properties()
        .iter()
        .map(|candidate| candidate.property.account_number.as_str())
        .collect();
    accounts.sort_unstable();
    assert_eq!(
        accounts,
        vec!["0660640130021", "0660640130022", "0660640130023"]
    );
    let median = result
        .value_analysis()
        .median_price_per_sqft()
        .expect("median present");
    assert!((median - 207_000.0 / 1_900.0).abs() < 1e-6);
}

#[test]
fn zero_area_reference_is_rejected() {
    let outcome = service(ValuationConfig::default()).analyze(&AccountNumber::new("0660640130028"));

    assert!(matches!(
        outcome,
        Err(ValuationError::InvalidReferenceProperty { .. })
    ));
}

#[tokio::test]
async fn http_search_then_analysis_round_trip() {
    let router = valuation_router(Arc::new(service(ValuationConfig::default())));

    let response = router
        .clone()
        .oneshot(
            Request::get("/api/search?query=magnolia%20grove")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("search executes");
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    let matches: serde_json::Value = serde_json::from_slice(&body).expect("json payload");
    let account = matches[0]["account_number"]
        .as_str()
        .expect("account number")
        .to_string();
    assert_eq!(account, "0660640130020");

    let response = router
        .oneshot(
            Request::get(format!("/api/property/{account}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("analysis executes");
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    let analysis: serde_json::Value = serde_json::from_slice(&body).expect("json payload");

    let pool = analysis["comparable_properties"].as_array().expect("pool");
    for lowest in analysis["value_analysis"]["lowest_five_comps"]
        .as_array()
        .expect("lowest comps")
    {
        assert!(pool.iter().any(|candidate| candidate == lowest));
    }
    assert_eq!(analysis["value_analysis"]["final_adjusted_value"], 218_750.0);
}
