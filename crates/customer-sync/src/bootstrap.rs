//! Wiring a manager from configuration.

use std::sync::Arc;

use customer_sync_store::RocksStore;
use customer_sync_stripe::{GatewayOptions, StripeGateway};

use crate::config::SyncConfig;
use crate::error::{CustomerError, Result};
use crate::manager::CustomerSourceManager;

/// Build a manager backed by `RocksDB` and the Stripe API.
///
/// Events are logged through the default tracing sink.
///
/// # Errors
///
/// Returns an error if no Stripe API key is configured, the gateway options
/// are invalid, or the store cannot be opened.
pub fn build_manager(config: &SyncConfig) -> Result<CustomerSourceManager> {
    let api_key = config.stripe_api_key.as_deref().ok_or_else(|| {
        CustomerError::Configuration("Stripe API key is not configured".into())
    })?;

    let gateway = StripeGateway::with_options(
        api_key,
        GatewayOptions {
            base_url: config.stripe_api_base.clone(),
            timeout_seconds: config.request_timeout_seconds,
        },
    )?;

    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    let mut store = RocksStore::open(&config.data_dir)?;
    if let Some(ttl) = config.cache_ttl() {
        store = store.with_cache_ttl(ttl);
    }
    let store = Arc::new(store);

    tracing::info!(
        stripe_api_base = %config.stripe_api_base,
        list_page_limit = config.list_page_limit,
        cache_ttl_seconds = ?config.cache_ttl_seconds,
        "Customer source manager configured"
    );

    Ok(CustomerSourceManager::new(
        Arc::new(gateway),
        store.clone(),
        store.clone(),
        store,
    )
    .with_list_limit(config.list_page_limit))
}
