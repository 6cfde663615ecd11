pub mod classify;
pub mod onboard;
pub mod query;
pub mod status;

use recall_config::AppConfig;
use recall_memory::LayerRegistry;
use recall_retrieval::ContextRouter;

/// Load config and build an initialized pipeline over the file-backed layers.
pub(crate) async fn pipeline() -> Result<ContextRouter, Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let registry = LayerRegistry::from_dir(&config.layers.data_dir(), config.layers.max_results_per_layer);
    let router = ContextRouter::from_config(&config, registry)?;
    router
        .init()
        .await
        .map_err(|e| format!("Failed to initialize classifier: {e}"))?;
    Ok(router)
}
