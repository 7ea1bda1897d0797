use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::AccountNumber;
use super::service::{ValuationError, ValuationService};
use super::store::{PropertyStore, StoreError};

/// Router builder exposing address search and comparable analysis.
pub fn valuation_router<S>(service: Arc<ValuationService<S>>) -> Router
where
    S: PropertyStore + 'static,
{
    Router::new()
        .route("/api/search", get(search_handler::<S>))
        .route(
            "/api/property/:account_number",
            get(analysis_handler::<S>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
}

pub(crate) async fn search_handler<S>(
    State(service): State<Arc<ValuationService<S>>>,
    Query(params): Query<SearchParams>,
) -> Response
where
    S: PropertyStore + 'static,
{
    match run_blocking(service, move |service| service.search(&params.query)).await {
        Ok(properties) => (StatusCode::OK, axum::Json(properties)).into_response(),
        Err(failure) => failure.into_response(),
    }
}

pub(crate) async fn analysis_handler<S>(
    State(service): State<Arc<ValuationService<S>>>,
    Path(account_number): Path<String>,
) -> Response
where
    S: PropertyStore + 'static,
{
    let account = AccountNumber::new(&account_number);
    match run_blocking(service, move |service| service.analyze(&account)).await {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(failure) => failure.into_response(),
    }
}

/// Moves store-backed work onto the blocking pool under the service's request timeout.
async fn run_blocking<S, T, F>(
    service: Arc<ValuationService<S>>,
    work: F,
) -> Result<T, RequestFailure>
where
    S: PropertyStore + 'static,
    T: Send + 'static,
    F: FnOnce(&ValuationService<S>) -> Result<T, ValuationError> + Send + 'static,
{
    let timeout = service.request_timeout();
    let task = tokio::task::spawn_blocking(move || work(service.as_ref()));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result.map_err(RequestFailure::Valuation),
        Ok(Err(join_error)) => Err(RequestFailure::Worker(join_error.to_string())),
        Err(_) => Err(RequestFailure::Timeout(timeout)),
    }
}

#[derive(Debug)]
enum RequestFailure {
    Valuation(ValuationError),
    Timeout(Duration),
    Worker(String),
}

impl IntoResponse for RequestFailure {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            RequestFailure::Valuation(ValuationError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, self.message())
            }
            RequestFailure::Valuation(ValuationError::InvalidReferenceProperty { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.message())
            }
            RequestFailure::Valuation(ValuationError::Store(StoreError::Unavailable(_))) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.message())
            }
            RequestFailure::Valuation(ValuationError::Store(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.message())
            }
            RequestFailure::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, self.message()),
            RequestFailure::Worker(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.message()),
        };

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "valuation request failed");
        }

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}

impl RequestFailure {
    fn message(&self) -> String {
        match self {
            RequestFailure::Valuation(err) => err.to_string(),
            RequestFailure::Timeout(timeout) => {
                format!("analysis exceeded {} ms", timeout.as_millis())
            }
            RequestFailure::Worker(detail) => format!("analysis worker failed: {detail}"),
        }
    }
}
