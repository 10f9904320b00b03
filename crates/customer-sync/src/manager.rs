//! The customer source manager and its shared collaborators.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use customer_sync_core::{PaymentGateway, UserId};
use customer_sync_store::{PaymentTokenStore, SourceCache, UserStore};

use crate::customer::Customer;
use crate::error::Result;
use crate::events::{EventSink, TracingEventSink};

/// Page size used for source listings unless configured otherwise.
pub const DEFAULT_LIST_LIMIT: u32 = 100;

/// Supplies metadata attached to newly created remote customers.
pub trait MetadataProvider: Send + Sync {
    /// Metadata for a customer created on behalf of `user_id` (`None` for guests).
    fn metadata(&self, user_id: Option<UserId>) -> BTreeMap<String, String>;
}

impl<F> MetadataProvider for F
where
    F: Fn(Option<UserId>) -> BTreeMap<String, String> + Send + Sync,
{
    fn metadata(&self, user_id: Option<UserId>) -> BTreeMap<String, String> {
        self(user_id)
    }
}

/// Hands out [`Customer`] handles over a shared set of collaborators.
///
/// Cloning is cheap; clones share collaborators and binding locks.
#[derive(Clone)]
pub struct CustomerSourceManager {
    pub(crate) gateway: Arc<dyn PaymentGateway>,
    pub(crate) users: Arc<dyn UserStore>,
    pub(crate) tokens: Arc<dyn PaymentTokenStore>,
    pub(crate) cache: Arc<dyn SourceCache>,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) metadata: Option<Arc<dyn MetadataProvider>>,
    pub(crate) locks: Arc<BindingLocks>,
    pub(crate) list_limit: u32,
}

impl CustomerSourceManager {
    /// Create a manager. Events go to a [`TracingEventSink`] until replaced.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn PaymentTokenStore>,
        cache: Arc<dyn SourceCache>,
    ) -> Self {
        Self {
            gateway,
            users,
            tokens,
            cache,
            events: Arc::new(TracingEventSink),
            metadata: None,
            locks: Arc::new(BindingLocks::default()),
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }

    /// Replace the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Attach metadata to every remote customer this manager creates.
    #[must_use]
    pub fn with_metadata_provider(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.metadata = Some(provider);
        self
    }

    /// Set the page size for source listings, clamped to `1..=100`.
    #[must_use]
    pub fn with_list_limit(mut self, limit: u32) -> Self {
        self.list_limit = limit.clamp(1, DEFAULT_LIST_LIMIT);
        self
    }

    /// Open a handle for a local user, resolving the bound remote customer.
    ///
    /// # Errors
    ///
    /// Returns an error if the binding cannot be read.
    pub fn customer(&self, user_id: UserId) -> Result<Customer> {
        let remote_id = self.users.get_bound_customer_id(user_id)?;
        Ok(Customer::new(self.clone(), Some(user_id), remote_id, None))
    }

    /// Open a handle from a raw local user ID, where zero means guest.
    ///
    /// # Errors
    ///
    /// Returns an error if the binding cannot be read.
    pub fn customer_for_raw(&self, raw_user_id: u64) -> Result<Customer> {
        match UserId::new(raw_user_id) {
            Some(user_id) => self.customer(user_id),
            None => Ok(self.guest(None)),
        }
    }

    /// Open a guest handle. Its remote customer lives only as long as the handle.
    #[must_use]
    pub fn guest(&self, billing_email: Option<String>) -> Customer {
        Customer::new(self.clone(), None, None, billing_email)
    }
}

/// Per-user advisory locks serializing create-and-bind.
#[derive(Default)]
pub(crate) struct BindingLocks {
    locks: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl BindingLocks {
    /// Wait for exclusive access to `user_id`'s binding.
    pub(crate) async fn acquire(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop locks nobody is holding or waiting on.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(user_id).or_default())
        };
        lock.lock_owned().await
    }
}
