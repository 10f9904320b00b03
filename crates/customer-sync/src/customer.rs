//! Per-request customer handle.
//!
//! A [`Customer`] pairs an optional local user with an optional remote
//! customer ID. The remote customer is created lazily on the first mutating
//! call and recreated once if the processor reports it gone.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use customer_sync_core::{
    CreateCustomerArgs, CustomerId, CustomerObject, CustomerUpdate, GatewayError,
    LocalPaymentToken, PaymentGateway, PaymentMethod, PaymentSource, ProfileField, SourceKind,
    UserId,
};
use customer_sync_store::{customer_key, sources_key};

use crate::error::{CustomerError, Result};
use crate::events::{CustomerEvent, CustomerEventKind};
use crate::manager::CustomerSourceManager;

/// Payment method type included in merged listings.
const CARD_METHOD_TYPE: &str = "card";

/// How a create request relates to the current binding.
#[derive(Clone, Copy)]
enum Creation<'a> {
    /// Caller asked for a new customer; always create and rebind.
    Requested,
    /// No customer is known yet; adopt a binding written meanwhile.
    Missing,
    /// The processor reported this customer gone.
    Replacing(&'a CustomerId),
}

/// A local user (or guest) and its remote customer.
pub struct Customer {
    manager: CustomerSourceManager,
    user_id: Option<UserId>,
    remote_id: Option<CustomerId>,
    billing_email: Option<String>,
    snapshot: Option<CustomerObject>,
}

impl Customer {
    pub(crate) fn new(
        manager: CustomerSourceManager,
        user_id: Option<UserId>,
        remote_id: Option<CustomerId>,
        billing_email: Option<String>,
    ) -> Self {
        Self {
            manager,
            user_id,
            remote_id,
            billing_email,
            snapshot: None,
        }
    }

    /// The bound local user, `None` for guests.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// The remote customer ID, once known.
    #[must_use]
    pub const fn remote_id(&self) -> Option<&CustomerId> {
        self.remote_id.as_ref()
    }

    /// Email used when a new remote customer is created and the local
    /// profile has none (always used for guests).
    #[must_use]
    pub fn with_billing_email(mut self, email: impl Into<String>) -> Self {
        self.billing_email = Some(email.into());
        self
    }

    // ========================================================================
    // Customer lifecycle
    // ========================================================================

    /// Return the remote customer ID, creating the remote customer if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if creation fails or the binding cannot be written.
    pub async fn ensure_customer_id(&mut self) -> Result<CustomerId> {
        if let Some(customer_id) = &self.remote_id {
            return Ok(customer_id.clone());
        }
        self.create(CreateCustomerArgs::default(), Creation::Missing)
            .await
    }

    /// Create a new remote customer and bind it to the local user.
    ///
    /// Fields set in `overrides` take precedence over the defaults computed
    /// from the local profile.
    ///
    /// # Errors
    ///
    /// Returns an error if creation fails or the binding cannot be written.
    pub async fn create_customer(&mut self, overrides: CreateCustomerArgs) -> Result<CustomerId> {
        self.create(overrides, Creation::Requested).await
    }

    /// Fetch the remote customer object.
    ///
    /// Served from the handle's snapshot or the cache when possible.
    /// Returns `None` when no remote customer exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the processor request fails.
    pub async fn customer_data(&mut self) -> Result<Option<CustomerObject>> {
        let Some(customer_id) = self.remote_id.clone() else {
            return Ok(None);
        };

        if let Some(snapshot) = &self.snapshot {
            return Ok(Some(snapshot.clone()));
        }

        let key = customer_key(&customer_id);
        if let Some(cached) = self.read_cached::<CustomerObject>(&key) {
            self.snapshot = Some(cached.clone());
            return Ok(Some(cached));
        }

        let customer = self.manager.gateway.retrieve_customer(&customer_id).await?;
        if customer.deleted {
            tracing::warn!(customer_id = %customer_id, "Remote customer is deleted");
            return Ok(Some(customer));
        }

        self.write_cached(&key, &customer);
        self.snapshot = Some(customer.clone());
        Ok(Some(customer))
    }

    // ========================================================================
    // Sources and payment methods
    // ========================================================================

    /// Attach a legacy source and return its remote ID.
    ///
    /// For a bound user the source is also saved as a local payment token
    /// when its shape is a reusable instrument.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote customer cannot be resolved, the attach
    /// fails, the response has no ID, or the token cannot be saved.
    pub async fn add_source(&mut self, source_id: &str) -> Result<String> {
        let (source, customer_id) = self
            .attach_with_recovery(|gateway, customer_id| {
                let source_id = source_id.to_owned();
                async move { gateway.attach_source(&customer_id, &source_id).await }
            })
            .await?;

        if source.id.is_empty() {
            return Err(CustomerError::Validation(
                "unable to add payment source".into(),
            ));
        }

        let kind = SourceKind::classify(&source);
        if let Some(user_id) = self.user_id {
            match LocalPaymentToken::from_source(user_id, &source) {
                Some(token) => {
                    self.manager.tokens.save_token(&token)?;
                    tracing::debug!(
                        user_id = %user_id,
                        token_id = %token.id,
                        gateway_id = %token.gateway_id,
                        "Saved payment token"
                    );
                }
                None => tracing::debug!(
                    source_id = %source.id,
                    kind = kind.label(),
                    "Source shape is not saved as a token"
                ),
            }
        }

        self.clear_cache();
        tracing::info!(
            customer_id = %customer_id,
            source_id = %source.id,
            kind = kind.label(),
            "Attached source"
        );
        self.publish(
            customer_id,
            CustomerEventKind::SourceAdded {
                source_id: source.id.clone(),
                source_kind: kind,
            },
        );

        Ok(source.id)
    }

    /// Attach a payment method unless it already belongs to this customer.
    ///
    /// Returns the attached payment method, or the input unchanged when no
    /// attach was needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote customer cannot be resolved, the attach
    /// fails, the response has no ID, or the token cannot be saved.
    pub async fn add_payment_method(
        &mut self,
        payment_method: PaymentMethod,
    ) -> Result<PaymentMethod> {
        let mut customer_id = self.ensure_customer_id().await?;
        let mut method = payment_method;

        if method.customer.as_deref() != Some(customer_id.as_str()) {
            let method_id = method.id.clone();
            let (attached, attached_to) = self
                .attach_with_recovery(|gateway, customer_id| {
                    let method_id = method_id.clone();
                    async move {
                        gateway
                            .attach_payment_method(&customer_id, &method_id)
                            .await
                    }
                })
                .await?;

            if attached.id.is_empty() {
                return Err(CustomerError::Validation(
                    "unable to add payment method to customer".into(),
                ));
            }
            method = attached;
            customer_id = attached_to;
        }

        if let Some(user_id) = self.user_id {
            match LocalPaymentToken::from_payment_method(user_id, &method) {
                Some(token) => self.manager.tokens.save_token(&token)?,
                None => tracing::warn!(
                    payment_method_id = %method.id,
                    "Payment method has no card details; no token saved"
                ),
            }
        }

        self.clear_cache();
        tracing::info!(
            customer_id = %customer_id,
            payment_method_id = %method.id,
            "Added payment method"
        );
        self.publish(
            customer_id,
            CustomerEventKind::PaymentMethodAdded {
                payment_method_id: method.id.clone(),
            },
        );

        Ok(method)
    }

    /// List saved legacy sources followed by card payment methods.
    ///
    /// Returns an empty list when there is no remote customer or either
    /// listing fails. Successful listings are cached until the next mutation.
    pub async fn list_sources(&self) -> Vec<PaymentSource> {
        let Some(customer_id) = &self.remote_id else {
            return Vec::new();
        };

        let key = sources_key(customer_id);
        if let Some(cached) = self.read_cached::<Vec<PaymentSource>>(&key) {
            tracing::debug!(
                customer_id = %customer_id,
                count = cached.len(),
                "Source list cache hit"
            );
            return cached;
        }

        let gateway = &self.manager.gateway;
        let limit = self.manager.list_limit;

        let legacy = match gateway.list_sources(customer_id, limit).await {
            Ok(list) => list.data,
            Err(e) => {
                tracing::warn!(customer_id = %customer_id, error = %e, "Failed to list sources");
                return Vec::new();
            }
        };

        let methods = match gateway
            .list_payment_methods(customer_id, CARD_METHOD_TYPE, limit)
            .await
        {
            Ok(list) => list.data,
            Err(e) => {
                tracing::warn!(
                    customer_id = %customer_id,
                    error = %e,
                    "Failed to list payment methods"
                );
                return Vec::new();
            }
        };

        let sources: Vec<PaymentSource> = legacy
            .iter()
            .map(PaymentSource::from)
            .chain(methods.iter().map(PaymentSource::from))
            .collect();

        self.write_cached(&key, &sources);
        sources
    }

    /// Delete a legacy source. Returns whether the processor accepted it.
    pub async fn delete_source(&mut self, source_id: &str) -> bool {
        let Some(customer_id) = self.remote_id.clone() else {
            return false;
        };

        let result = self
            .manager
            .gateway
            .delete_source(&customer_id, source_id)
            .await;
        self.clear_cache();

        match result {
            Ok(_) => {
                tracing::info!(
                    customer_id = %customer_id,
                    source_id = %source_id,
                    "Deleted source"
                );
                self.publish(
                    customer_id,
                    CustomerEventKind::SourceDeleted {
                        source_id: source_id.to_string(),
                    },
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    customer_id = %customer_id,
                    source_id = %source_id,
                    error = %e,
                    "Failed to delete source"
                );
                false
            }
        }
    }

    /// Make a legacy source the customer's default.
    ///
    /// Never creates a customer. Returns whether the processor accepted it.
    /// A handle with no remote customer returns `false` without a network
    /// call and leaves the cache untouched.
    pub async fn set_default_source(&mut self, source_id: &str) -> bool {
        let Some(customer_id) = self.remote_id.clone() else {
            return false;
        };

        let update = CustomerUpdate {
            default_source: Some(source_id.to_string()),
        };
        let result = self
            .manager
            .gateway
            .update_customer(&customer_id, &update)
            .await;
        self.clear_cache();

        match result {
            Ok(_) => {
                self.publish(
                    customer_id,
                    CustomerEventKind::DefaultSourceSet {
                        source_id: source_id.to_string(),
                    },
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    customer_id = %customer_id,
                    source_id = %source_id,
                    error = %e,
                    "Failed to set default source"
                );
                false
            }
        }
    }

    /// Drop cached listings and customer data for this customer.
    pub fn clear_cache(&mut self) {
        self.snapshot = None;
        let Some(customer_id) = &self.remote_id else {
            return;
        };

        for key in [sources_key(customer_id), customer_key(customer_id)] {
            if let Err(e) = self.manager.cache.delete(&key) {
                tracing::warn!(key = %key, error = %e, "Failed to delete cache entry");
            }
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn create(
        &mut self,
        overrides: CreateCustomerArgs,
        creation: Creation<'_>,
    ) -> Result<CustomerId> {
        let Some(user_id) = self.user_id else {
            return self.create_remote(overrides).await;
        };

        let _guard = self.manager.locks.acquire(user_id).await;
        let bound = self.manager.users.get_bound_customer_id(user_id)?;

        match (creation, bound) {
            (Creation::Missing, Some(current)) => return Ok(self.adopt(user_id, current)),
            (Creation::Replacing(stale), Some(current)) if current != *stale => {
                return Ok(self.adopt(user_id, current));
            }
            (Creation::Replacing(_), Some(_)) => {
                self.manager.users.clear_bound_customer_id(user_id)?;
            }
            _ => {}
        }

        self.create_remote(overrides).await
    }

    /// Use a binding another handle wrote while this one waited.
    fn adopt(&mut self, user_id: UserId, customer_id: CustomerId) -> CustomerId {
        tracing::debug!(
            user_id = %user_id,
            customer_id = %customer_id,
            "Adopting customer bound concurrently"
        );
        self.remote_id = Some(customer_id.clone());
        self.clear_cache();
        customer_id
    }

    async fn create_remote(&mut self, overrides: CreateCustomerArgs) -> Result<CustomerId> {
        let args = self.default_create_args()?.merged_with(overrides);
        let customer = self.manager.gateway.create_customer(&args).await?;

        let customer_id: CustomerId = customer.id.parse().map_err(|_| {
            CustomerError::Validation("processor returned a customer without an ID".into())
        })?;

        // Bind before the handle holds the ID so a failed write leaves it unbound.
        if let Some(user_id) = self.user_id {
            self.manager
                .users
                .set_bound_customer_id(user_id, &customer_id)?;
        }

        self.remote_id = Some(customer_id.clone());
        self.clear_cache();
        self.snapshot = Some(customer);

        tracing::info!(
            customer_id = %customer_id,
            user_id = ?self.user_id,
            "Created remote customer"
        );
        self.publish(customer_id.clone(), CustomerEventKind::CustomerCreated);

        Ok(customer_id)
    }

    fn default_create_args(&self) -> Result<CreateCustomerArgs> {
        let mut args = CreateCustomerArgs {
            email: self.billing_email.clone(),
            ..CreateCustomerArgs::default()
        };

        if let Some(user_id) = self.user_id {
            let first = self.profile_field(
                user_id,
                ProfileField::BillingFirstName,
                ProfileField::FirstName,
            )?;
            let last = self.profile_field(
                user_id,
                ProfileField::BillingLastName,
                ProfileField::LastName,
            )?;
            let login = self
                .manager
                .users
                .get_profile_field(user_id, ProfileField::Login)?;

            args.description = Some(format!(
                "Name: {} {} Username: {}",
                first.unwrap_or_default(),
                last.unwrap_or_default(),
                login.unwrap_or_default()
            ));

            if let Some(email) = self
                .manager
                .users
                .get_profile_field(user_id, ProfileField::Email)?
            {
                args.email = Some(email);
            }
        }

        if let Some(provider) = &self.manager.metadata {
            args.metadata.extend(provider.metadata(self.user_id));
        }

        Ok(args)
    }

    fn profile_field(
        &self,
        user_id: UserId,
        preferred: ProfileField,
        fallback: ProfileField,
    ) -> Result<Option<String>> {
        let users = &self.manager.users;
        match users.get_profile_field(user_id, preferred)? {
            Some(value) => Ok(Some(value)),
            None => Ok(users.get_profile_field(user_id, fallback)?),
        }
    }

    /// Run an attach call, recreating the customer once if the processor
    /// reports it gone. Returns the result and the customer it was attached to.
    async fn attach_with_recovery<T, F, Fut>(&mut self, attach: F) -> Result<(T, CustomerId)>
    where
        F: Fn(Arc<dyn PaymentGateway>, CustomerId) -> Fut,
        Fut: Future<Output = std::result::Result<T, GatewayError>>,
    {
        let mut customer_id = self.ensure_customer_id().await?;
        let mut retry = true;

        loop {
            match attach(Arc::clone(&self.manager.gateway), customer_id.clone()).await {
                Ok(value) => return Ok((value, customer_id)),
                Err(e) if retry && e.is_no_such_customer() => {
                    retry = false;
                    tracing::warn!(
                        customer_id = %customer_id,
                        user_id = ?self.user_id,
                        "Remote customer is gone; recreating"
                    );
                    self.remote_id = None;
                    customer_id = self
                        .create(CreateCustomerArgs::default(), Creation::Replacing(&customer_id))
                        .await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn publish(&self, customer_id: CustomerId, kind: CustomerEventKind) {
        self.manager
            .events
            .publish(CustomerEvent::now(customer_id, self.user_id, kind));
    }

    fn read_cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.manager.cache.get(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    fn write_cached<T: Serialize>(&self, key: &str, value: &T) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to encode cache entry");
                return;
            }
        };

        if let Err(e) = self.manager.cache.set(key, &bytes) {
            tracing::warn!(key = %key, error = %e, "Cache write failed");
        }
    }
}

impl std::fmt::Debug for Customer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Customer")
            .field("user_id", &self.user_id)
            .field("remote_id", &self.remote_id)
            .finish_non_exhaustive()
    }
}
