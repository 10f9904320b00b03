//! Runtime configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use customer_sync_stripe::StripeGateway;

use crate::manager::DEFAULT_LIST_LIMIT;

/// Log filter used when neither `RUST_LOG` nor `LOG_FILTER` is set.
pub const DEFAULT_LOG_FILTER: &str = "info,customer_sync=debug";

/// Configuration loaded from environment variables and secrets files.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Stripe secret API key (optional until a gateway is built).
    pub stripe_api_key: Option<String>,

    /// Stripe API base URL (default: the live API).
    pub stripe_api_base: String,

    /// Path to the `RocksDB` data directory (default: "/data/customer-sync").
    pub data_dir: String,

    /// Gateway request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Page size for source listings (1-100).
    pub list_page_limit: u32,

    /// Cache entry lifetime in seconds; `None` keeps entries until invalidated.
    pub cache_ttl_seconds: Option<u64>,

    /// Tracing filter directive.
    pub log_filter: String,
}

/// Stripe secrets file structure.
#[derive(Debug, Deserialize)]
struct StripeSecrets {
    api_key: String,
    #[serde(default)]
    api_base: Option<String>,
}

impl SyncConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_sources(load_stripe_secrets(), |name| std::env::var(name).ok())
    }

    fn from_sources(
        secrets: Option<StripeSecrets>,
        var: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let defaults = Self::default();
        let (stripe_api_key, secrets_api_base) = match secrets {
            Some(secrets) => (Some(secrets.api_key), secrets.api_base),
            None => (var("STRIPE_API_KEY"), None),
        };

        Self {
            stripe_api_key: stripe_api_key.filter(|key| !key.trim().is_empty()),
            stripe_api_base: secrets_api_base
                .or_else(|| var("STRIPE_API_BASE"))
                .unwrap_or(defaults.stripe_api_base),
            data_dir: var("DATA_DIR").unwrap_or(defaults.data_dir),
            request_timeout_seconds: var("REQUEST_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.request_timeout_seconds),
            list_page_limit: var("LIST_PAGE_LIMIT")
                .and_then(|s| s.parse::<u32>().ok())
                .map_or(defaults.list_page_limit, |limit| {
                    limit.clamp(1, DEFAULT_LIST_LIMIT)
                }),
            cache_ttl_seconds: var("CACHE_TTL_SECONDS").and_then(|s| s.parse().ok()),
            log_filter: var("LOG_FILTER").unwrap_or(defaults.log_filter),
        }
    }

    /// Cache entry lifetime, if configured.
    #[must_use]
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_seconds.map(Duration::from_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: None,
            stripe_api_base: StripeGateway::DEFAULT_BASE_URL.into(),
            data_dir: "/data/customer-sync".into(),
            request_timeout_seconds: 30,
            list_page_limit: DEFAULT_LIST_LIMIT,
            cache_ttl_seconds: None,
            log_filter: DEFAULT_LOG_FILTER.into(),
        }
    }
}

/// Load Stripe secrets from the first secrets file found.
fn load_stripe_secrets() -> Option<StripeSecrets> {
    let secret_paths = [
        ".secrets/stripe.json",
        "customer-sync/.secrets/stripe.json",
        "../.secrets/stripe.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<StripeSecrets>(Path::new(path)) {
            tracing::info!(path = %path, "Loaded Stripe secrets from file");
            return Some(secrets);
        }
    }

    tracing::debug!("Stripe secrets file not found, using environment variables");
    None
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, std::io::Error> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
