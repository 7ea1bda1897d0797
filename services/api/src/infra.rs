use appraisal_comps::config::AppConfig;
use appraisal_comps::error::AppError;
use appraisal_comps::valuation::{InMemoryPropertyStore, ValuationService};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type PropertyValuationService = ValuationService<InMemoryPropertyStore>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Loads the property export and wires it to the valuation engine.
///
/// `data_override` takes precedence over `PROPERTY_DATA_PATH`.
pub(crate) fn build_service(
    config: &AppConfig,
    data_override: Option<PathBuf>,
) -> Result<PropertyValuationService, AppError> {
    let path = match data_override {
        Some(path) => path,
        None => config.store.require_data_path()?.clone(),
    };

    let store = InMemoryPropertyStore::from_path(&path)?;
    tracing::info!(path = %path.display(), records = store.len(), "property export loaded");

    Ok(
        ValuationService::new(Arc::new(store), config.valuation.clone())
            .with_search_limit(config.store.search_limit)
            .with_request_timeout(config.server.request_timeout),
    )
}
