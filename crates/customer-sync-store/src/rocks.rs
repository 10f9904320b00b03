//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the storage traits.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use customer_sync_core::{CustomerId, LocalPaymentToken, ProfileField, TokenId, UserId};

use crate::cache::{ttl_from_std, CacheEntry};
use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{non_empty, PaymentTokenStore, SourceCache, UserStore};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    cache_ttl: Option<chrono::Duration>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            cache_ttl: None,
        })
    }

    /// Expire cache entries `ttl` after they are written.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl_from_std(ttl);
        self
    }

    /// Set a profile field for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn put_profile_field(
        &self,
        user_id: UserId,
        field: ProfileField,
        value: impl AsRef<str>,
    ) -> Result<()> {
        let cf = self.cf(cf::PROFILES)?;
        self.db
            .put_cf(&cf, keys::profile_key(user_id, field), value.as_ref().as_bytes())
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_string(&self, cf_name: &str, key: &[u8], entity: &'static str) -> Result<Option<String>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| {
                String::from_utf8(data).map_err(|e| StoreError::Corrupt {
                    entity,
                    message: e.to_string(),
                })
            })
            .transpose()
    }

    fn get_token(&self, token_id: &TokenId) -> Result<Option<LocalPaymentToken>> {
        let cf = self.cf(cf::PAYMENT_TOKENS)?;
        self.db
            .get_cf(&cf, keys::token_key(token_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }
}

impl UserStore for RocksStore {
    fn get_bound_customer_id(&self, user_id: UserId) -> Result<Option<CustomerId>> {
        let Some(raw) = self.get_string(
            cf::CUSTOMER_BINDINGS,
            &keys::binding_key(user_id),
            "customer binding",
        )?
        else {
            return Ok(None);
        };

        // An empty stored value means the binding was blanked rather than removed.
        match raw.parse::<CustomerId>() {
            Ok(customer_id) => Ok(Some(customer_id)),
            Err(_) => Ok(None),
        }
    }

    fn set_bound_customer_id(&self, user_id: UserId, customer_id: &CustomerId) -> Result<()> {
        let cf = self.cf(cf::CUSTOMER_BINDINGS)?;
        self.db
            .put_cf(&cf, keys::binding_key(user_id), customer_id.as_str().as_bytes())
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn clear_bound_customer_id(&self, user_id: UserId) -> Result<()> {
        let cf = self.cf(cf::CUSTOMER_BINDINGS)?;
        self.db
            .delete_cf(&cf, keys::binding_key(user_id))
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_profile_field(&self, user_id: UserId, field: ProfileField) -> Result<Option<String>> {
        self.get_string(cf::PROFILES, &keys::profile_key(user_id, field), "profile")
            .map(non_empty)
    }
}

impl PaymentTokenStore for RocksStore {
    fn save_token(&self, token: &LocalPaymentToken) -> Result<()> {
        let cf_tokens = self.cf(cf::PAYMENT_TOKENS)?;
        let cf_by_user = self.cf(cf::PAYMENT_TOKENS_BY_USER)?;

        let token_key = keys::token_key(&token.id);
        let user_token_key = keys::user_token_key(token.user_id, &token.id);
        let value = Self::serialize(token)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_tokens, &token_key, &value);
        batch.put_cf(&cf_by_user, &user_token_key, []); // Index entry (empty value)

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn list_tokens_by_user(&self, user_id: UserId) -> Result<Vec<LocalPaymentToken>> {
        let cf_by_user = self.cf(cf::PAYMENT_TOKENS_BY_USER)?;
        let prefix = keys::user_tokens_prefix(user_id);

        let iter = self
            .db
            .iterator_cf(&cf_by_user, IteratorMode::From(&prefix, Direction::Forward));

        let mut tokens = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(&prefix) {
                break;
            }

            let token_id = keys::extract_token_id_from_user_key(&key)?;
            if let Some(token) = self.get_token(&token_id)? {
                tokens.push(token);
            }
        }

        Ok(tokens)
    }
}

impl SourceCache for RocksStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let cf = self.cf(cf::CACHE)?;
        let Some(data) = self
            .db
            .get_cf(&cf, key.as_bytes())
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let entry: CacheEntry = Self::deserialize(&data)?;
        if entry.is_expired(Utc::now()) {
            tracing::debug!(key = %key, "Evicting expired cache entry");
            self.delete(key)?;
            return Ok(None);
        }

        Ok(Some(entry.value))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let cf = self.cf(cf::CACHE)?;
        let entry = CacheEntry::new(value, self.cache_ttl, Utc::now());
        let encoded = Self::serialize(&entry)?;

        self.db
            .put_cf(&cf, key.as_bytes(), encoded)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn delete(&self, key: &str) -> Result<()> {
        let cf = self.cf(cf::CACHE)?;
        self.db
            .delete_cf(&cf, key.as_bytes())
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}
