//! In-process storage implementation.
//!
//! Holds everything in memory behind locks. Used for embedding and tests;
//! nothing survives the process.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

use customer_sync_core::{CustomerId, LocalPaymentToken, ProfileField, UserId};

use crate::cache::{ttl_from_std, CacheEntry};
use crate::error::{Result, StoreError};
use crate::{non_empty, PaymentTokenStore, SourceCache, UserStore};

#[derive(Default)]
struct State {
    bindings: HashMap<UserId, CustomerId>,
    profiles: HashMap<(UserId, ProfileField), String>,
    tokens: Vec<LocalPaymentToken>,
    cache: HashMap<String, CacheEntry>,
}

impl State {
    /// Re-check an entry under the write lock, evicting it only if still expired.
    fn take_unexpired(&mut self, key: &str, now: DateTime<Utc>) -> Option<Vec<u8>> {
        match self.cache.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(_) => {
                tracing::debug!(key = %key, "Evicting expired cache entry");
                self.cache.remove(key);
                None
            }
            None => None,
        }
    }
}

/// Memory-backed storage implementation.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    cache_ttl: Option<chrono::Duration>,
}

impl MemoryStore {
    /// Create an empty store whose cache entries never expire.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
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
    /// Returns an error if the store lock is poisoned.
    pub fn put_profile_field(
        &self,
        user_id: UserId,
        field: ProfileField,
        value: impl Into<String>,
    ) -> Result<()> {
        self.write()?.profiles.insert((user_id, field), value.into());
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }
}

impl UserStore for MemoryStore {
    fn get_bound_customer_id(&self, user_id: UserId) -> Result<Option<CustomerId>> {
        Ok(self.read()?.bindings.get(&user_id).cloned())
    }

    fn set_bound_customer_id(&self, user_id: UserId, customer_id: &CustomerId) -> Result<()> {
        self.write()?.bindings.insert(user_id, customer_id.clone());
        Ok(())
    }

    fn clear_bound_customer_id(&self, user_id: UserId) -> Result<()> {
        self.write()?.bindings.remove(&user_id);
        Ok(())
    }

    fn get_profile_field(&self, user_id: UserId, field: ProfileField) -> Result<Option<String>> {
        Ok(non_empty(
            self.read()?.profiles.get(&(user_id, field)).cloned(),
        ))
    }
}

impl PaymentTokenStore for MemoryStore {
    fn save_token(&self, token: &LocalPaymentToken) -> Result<()> {
        let mut state = self.write()?;
        state.tokens.retain(|existing| existing.id != token.id);
        state.tokens.push(token.clone());
        Ok(())
    }

    fn list_tokens_by_user(&self, user_id: UserId) -> Result<Vec<LocalPaymentToken>> {
        Ok(self
            .read()?
            .tokens
            .iter()
            .filter(|token| token.user_id == user_id)
            .cloned()
            .collect())
    }
}

impl SourceCache for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Utc::now();
        {
            let state = self.read()?;
            match state.cache.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        Ok(self.write()?.take_unexpired(key, now))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let entry = CacheEntry::new(value, self.cache_ttl, Utc::now());
        self.write()?.cache.insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.write()?.cache.remove(key);
        Ok(())
    }
}
