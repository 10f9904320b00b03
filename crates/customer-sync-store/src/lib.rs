//! Storage layer for customer-sync.
//!
//! This crate provides the local collaborators of the customer source manager:
//!
//! - [`UserStore`]: the local user to remote customer binding, plus the
//!   profile fields used to describe a new remote customer
//! - [`PaymentTokenStore`]: saved payment instruments owned by local users
//! - [`SourceCache`]: a transient byte cache keyed by strings
//!
//! Two backends implement all three traits: [`RocksStore`] (persistent, with
//! column families per record kind) and [`MemoryStore`] (in-process).
//!
#![cfg_attr(
    feature = "rocksdb-backend",
    doc = r#"
# Example

```no_run
use customer_sync_core::{CustomerId, UserId};
use customer_sync_store::{RocksStore, UserStore};

let store = RocksStore::open("/tmp/customer-sync-db").unwrap();

let user_id = UserId::new(42).unwrap();
let customer_id: CustomerId = "cus_123".parse().unwrap();
store.set_bound_customer_id(user_id, &customer_id).unwrap();

let bound = store.get_bound_customer_id(user_id).unwrap();
assert_eq!(bound, Some(customer_id));
```
"#
)]

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cache;
pub mod error;
#[cfg(feature = "rocksdb-backend")]
pub mod keys;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
#[cfg(feature = "rocksdb-backend")]
pub mod schema;

pub use cache::{customer_key, sources_key, CacheEntry};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use customer_sync_core::{CustomerId, LocalPaymentToken, ProfileField, UserId};

/// Local user identity store.
pub trait UserStore: Send + Sync {
    /// Get the remote customer bound to a user, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_bound_customer_id(&self, user_id: UserId) -> Result<Option<CustomerId>>;

    /// Bind a user to a remote customer, replacing any existing binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn set_bound_customer_id(&self, user_id: UserId, customer_id: &CustomerId) -> Result<()>;

    /// Remove a user's binding. Removing a missing binding is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn clear_bound_customer_id(&self, user_id: UserId) -> Result<()>;

    /// Read a profile field. Empty values are reported as `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_profile_field(&self, user_id: UserId, field: ProfileField) -> Result<Option<String>>;
}

/// Persisted saved payment instruments.
pub trait PaymentTokenStore: Send + Sync {
    /// Save a token. This also maintains the per-user index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn save_token(&self, token: &LocalPaymentToken) -> Result<()>;

    /// List a user's tokens, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_tokens_by_user(&self, user_id: UserId) -> Result<Vec<LocalPaymentToken>>;
}

/// Transient key-value cache.
///
/// The cache is a performance optimization only; callers must tolerate
/// misses and failures.
pub trait SourceCache: Send + Sync {
    /// Get a cached value. Expired entries are reported as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete a value. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn delete(&self, key: &str) -> Result<()>;
}

/// Treat empty strings as absent profile values.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
