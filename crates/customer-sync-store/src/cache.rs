//! Cache keys and entry envelope shared by the cache backends.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use customer_sync_core::CustomerId;

/// Key of the merged source list for a remote customer.
#[must_use]
pub fn sources_key(customer_id: &CustomerId) -> String {
    format!("sources:{customer_id}")
}

/// Key of the remote customer snapshot.
#[must_use]
pub fn customer_key(customer_id: &CustomerId) -> String {
    format!("customer:{customer_id}")
}

/// A cached value with an optional expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached bytes.
    pub value: Vec<u8>,
    /// When the entry stops being served. `None` keeps it until deleted.
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// Wrap `value`, expiring `ttl` after `now` when a TTL is given.
    #[must_use]
    pub fn new(value: &[u8], ttl: Option<Duration>, now: DateTime<Utc>) -> Self {
        Self {
            value: value.to_vec(),
            expires_at: ttl.map(|ttl| now + ttl),
        }
    }

    /// Whether the entry is past its expiry at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Convert a configured TTL to a chrono duration; overflow means no expiry.
pub(crate) fn ttl_from_std(ttl: std::time::Duration) -> Option<Duration> {
    Duration::from_std(ttl).ok()
}
