//! Shared test utilities for customer manager tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;

use customer_sync::{ChannelEventSink, CustomerEvent, CustomerSourceManager};
use customer_sync_core::{
    CardDetails, CreateCustomerArgs, CustomerId, CustomerObject, CustomerUpdate, GatewayError,
    PaymentGateway, PaymentMethod, ProfileField, RemoteError, SepaDebitDetails, SourceObject,
    StripeList, UserId,
};
use customer_sync_store::{MemoryStore, StoreError, UserStore};

// ============================================================================
// Recorded calls
// ============================================================================

/// A gateway call as seen by [`FakeGateway`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateCustomer(CreateCustomerArgs),
    RetrieveCustomer(String),
    UpdateCustomer(String, Option<String>),
    AttachSource(String, String),
    ListSources(String, u32),
    DeleteSource(String, String),
    AttachPaymentMethod(String, String),
    ListPaymentMethods(String, String, u32),
}

// ============================================================================
// Fake gateway
// ============================================================================

type Scripted<T> = VecDeque<Result<T, GatewayError>>;

#[derive(Default)]
struct FakeState {
    calls: Vec<Call>,
    created: u32,
    create: Scripted<CustomerObject>,
    retrieve: Scripted<CustomerObject>,
    update: Scripted<CustomerObject>,
    attach_source: Scripted<SourceObject>,
    delete_source: Scripted<serde_json::Value>,
    attach_payment_method: Scripted<PaymentMethod>,
    sources: Option<Result<Vec<SourceObject>, GatewayError>>,
    payment_methods: Option<Result<Vec<PaymentMethod>, GatewayError>>,
}

/// In-memory [`PaymentGateway`] that records every call.
///
/// Each operation pops a scripted response if one is queued and otherwise
/// answers with a plausible success.
#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<FakeState>,
}

impl FakeGateway {
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn created_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::CreateCustomer(_)))
            .count()
    }

    pub fn last_create_args(&self) -> Option<CreateCustomerArgs> {
        self.calls().into_iter().rev().find_map(|call| match call {
            Call::CreateCustomer(args) => Some(args),
            _ => None,
        })
    }

    pub fn push_create(&self, result: Result<CustomerObject, GatewayError>) {
        self.state.lock().unwrap().create.push_back(result);
    }

    pub fn push_retrieve(&self, result: Result<CustomerObject, GatewayError>) {
        self.state.lock().unwrap().retrieve.push_back(result);
    }

    pub fn push_update(&self, result: Result<CustomerObject, GatewayError>) {
        self.state.lock().unwrap().update.push_back(result);
    }

    pub fn push_attach_source(&self, result: Result<SourceObject, GatewayError>) {
        self.state.lock().unwrap().attach_source.push_back(result);
    }

    pub fn push_delete_source(&self, result: Result<serde_json::Value, GatewayError>) {
        self.state.lock().unwrap().delete_source.push_back(result);
    }

    pub fn push_attach_payment_method(&self, result: Result<PaymentMethod, GatewayError>) {
        self.state.lock().unwrap().attach_payment_method.push_back(result);
    }

    pub fn set_sources(&self, result: Result<Vec<SourceObject>, GatewayError>) {
        self.state.lock().unwrap().sources = Some(result);
    }

    pub fn set_payment_methods(&self, result: Result<Vec<PaymentMethod>, GatewayError>) {
        self.state.lock().unwrap().payment_methods = Some(result);
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn list<T>(data: Vec<T>) -> StripeList<T> {
    StripeList {
        object: "list".into(),
        data,
        has_more: false,
        url: None,
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_customer(
        &self,
        args: &CreateCustomerArgs,
    ) -> Result<CustomerObject, GatewayError> {
        self.record(Call::CreateCustomer(args.clone()));
        let mut state = self.state.lock().unwrap();
        if let Some(scripted) = state.create.pop_front() {
            return scripted;
        }
        state.created += 1;
        Ok(CustomerObject {
            email: args.email.clone(),
            description: args.description.clone(),
            ..customer(&format!("cus_new_{}", state.created))
        })
    }

    async fn retrieve_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<CustomerObject, GatewayError> {
        self.record(Call::RetrieveCustomer(customer_id.to_string()));
        let scripted = self.state.lock().unwrap().retrieve.pop_front();
        scripted.unwrap_or_else(|| Ok(customer(customer_id.as_str())))
    }

    async fn update_customer(
        &self,
        customer_id: &CustomerId,
        update: &CustomerUpdate,
    ) -> Result<CustomerObject, GatewayError> {
        self.record(Call::UpdateCustomer(
            customer_id.to_string(),
            update.default_source.clone(),
        ));
        let scripted = self.state.lock().unwrap().update.pop_front();
        scripted.unwrap_or_else(|| {
            Ok(CustomerObject {
                default_source: update.default_source.clone(),
                ..customer(customer_id.as_str())
            })
        })
    }

    async fn attach_source(
        &self,
        customer_id: &CustomerId,
        source_id: &str,
    ) -> Result<SourceObject, GatewayError> {
        self.record(Call::AttachSource(customer_id.to_string(), source_id.into()));
        let scripted = self.state.lock().unwrap().attach_source.pop_front();
        scripted.unwrap_or_else(|| {
            Ok(SourceObject {
                customer: Some(customer_id.to_string()),
                ..legacy_card(source_id, "Visa", "4242")
            })
        })
    }

    async fn list_sources(
        &self,
        customer_id: &CustomerId,
        limit: u32,
    ) -> Result<StripeList<SourceObject>, GatewayError> {
        self.record(Call::ListSources(customer_id.to_string(), limit));
        let configured = self.state.lock().unwrap().sources.clone();
        configured.unwrap_or_else(|| Ok(Vec::new())).map(list)
    }

    async fn delete_source(
        &self,
        customer_id: &CustomerId,
        source_id: &str,
    ) -> Result<serde_json::Value, GatewayError> {
        self.record(Call::DeleteSource(customer_id.to_string(), source_id.into()));
        let scripted = self.state.lock().unwrap().delete_source.pop_front();
        scripted.unwrap_or_else(|| Ok(json!({"id": source_id, "deleted": true})))
    }

    async fn attach_payment_method(
        &self,
        customer_id: &CustomerId,
        payment_method_id: &str,
    ) -> Result<PaymentMethod, GatewayError> {
        self.record(Call::AttachPaymentMethod(
            customer_id.to_string(),
            payment_method_id.into(),
        ));
        let scripted = self.state.lock().unwrap().attach_payment_method.pop_front();
        scripted.unwrap_or_else(|| {
            Ok(PaymentMethod {
                customer: Some(customer_id.to_string()),
                ..card_method(payment_method_id, "visa", "4242")
            })
        })
    }

    async fn list_payment_methods(
        &self,
        customer_id: &CustomerId,
        method_type: &str,
        limit: u32,
    ) -> Result<StripeList<PaymentMethod>, GatewayError> {
        self.record(Call::ListPaymentMethods(
            customer_id.to_string(),
            method_type.into(),
            limit,
        ));
        let configured = self.state.lock().unwrap().payment_methods.clone();
        configured.unwrap_or_else(|| Ok(Vec::new())).map(list)
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn customer(id: &str) -> CustomerObject {
    CustomerObject {
        id: id.into(),
        email: None,
        description: None,
        default_source: None,
        metadata: json!({}),
        created: 1_700_000_000,
        deleted: false,
    }
}

pub fn legacy_card(id: &str, brand: &str, last4: &str) -> SourceObject {
    SourceObject {
        id: id.into(),
        object: Some("card".into()),
        brand: Some(brand.into()),
        last4: Some(last4.into()),
        exp_month: Some(12),
        exp_year: Some(2030),
        ..SourceObject::default()
    }
}

pub fn card_source(id: &str, brand: &str, last4: &str) -> SourceObject {
    SourceObject {
        id: id.into(),
        object: Some("source".into()),
        source_type: Some("card".into()),
        card: Some(CardDetails {
            brand: Some(brand.into()),
            last4: Some(last4.into()),
            exp_month: Some(6),
            exp_year: Some(2031),
        }),
        ..SourceObject::default()
    }
}

pub fn sepa_source(id: &str, last4: &str) -> SourceObject {
    SourceObject {
        id: id.into(),
        object: Some("source".into()),
        source_type: Some("sepa_debit".into()),
        sepa_debit: Some(SepaDebitDetails {
            last4: Some(last4.into()),
            bank_code: Some("37040044".into()),
            country: Some("DE".into()),
        }),
        ..SourceObject::default()
    }
}

pub fn alipay_source(id: &str) -> SourceObject {
    SourceObject {
        id: id.into(),
        object: Some("source".into()),
        source_type: Some("alipay".into()),
        ..SourceObject::default()
    }
}

pub fn card_method(id: &str, brand: &str, last4: &str) -> PaymentMethod {
    PaymentMethod {
        id: id.into(),
        object: Some("payment_method".into()),
        method_type: Some("card".into()),
        customer: None,
        card: Some(CardDetails {
            brand: Some(brand.into()),
            last4: Some(last4.into()),
            exp_month: Some(1),
            exp_year: Some(2032),
        }),
    }
}

pub fn remote_error(error_type: &str, message: &str) -> GatewayError {
    GatewayError::Api(RemoteError {
        error_type: error_type.into(),
        message: message.into(),
        code: None,
        param: None,
        raw: json!({"error": {"type": error_type, "message": message}}),
    })
}

pub fn no_such_customer(id: &str) -> GatewayError {
    remote_error("invalid_request_error", &format!("No such customer: '{id}'"))
}

pub fn user(raw: u64) -> UserId {
    UserId::new(raw).unwrap()
}

pub fn customer_id(raw: &str) -> CustomerId {
    raw.parse().unwrap()
}

// ============================================================================
// Harness
// ============================================================================

/// [`UserStore`] whose binding writes fail until a budget runs out.
struct FailingBinds {
    inner: Arc<MemoryStore>,
    remaining: AtomicU32,
}

impl UserStore for FailingBinds {
    fn get_bound_customer_id(
        &self,
        user_id: UserId,
    ) -> customer_sync_store::Result<Option<CustomerId>> {
        self.inner.get_bound_customer_id(user_id)
    }

    fn set_bound_customer_id(
        &self,
        user_id: UserId,
        customer_id: &CustomerId,
    ) -> customer_sync_store::Result<()> {
        let failing = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Database("down".into()));
        }
        self.inner.set_bound_customer_id(user_id, customer_id)
    }

    fn clear_bound_customer_id(&self, user_id: UserId) -> customer_sync_store::Result<()> {
        self.inner.clear_bound_customer_id(user_id)
    }

    fn get_profile_field(
        &self,
        user_id: UserId,
        field: ProfileField,
    ) -> customer_sync_store::Result<Option<String>> {
        self.inner.get_profile_field(user_id, field)
    }
}

/// A manager over a fake gateway and an in-memory store, with events
/// captured on a channel.
pub struct Harness {
    pub gateway: Arc<FakeGateway>,
    pub store: Arc<MemoryStore>,
    pub manager: CustomerSourceManager,
    events: UnboundedReceiver<CustomerEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    pub fn with_store(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Self::build(store.clone(), store)
    }

    /// Fail the first `failures` binding writes.
    pub fn with_failing_binds(failures: u32) -> Self {
        let store = Arc::new(MemoryStore::new());
        let users = Arc::new(FailingBinds {
            inner: store.clone(),
            remaining: AtomicU32::new(failures),
        });
        Self::build(store, users)
    }

    fn build(store: Arc<MemoryStore>, users: Arc<dyn UserStore>) -> Self {
        let gateway = Arc::new(FakeGateway::default());
        let (sink, events) = ChannelEventSink::new();
        let manager =
            CustomerSourceManager::new(gateway.clone(), users, store.clone(), store.clone())
                .with_event_sink(Arc::new(sink));

        Self {
            gateway,
            store,
            manager,
            events,
        }
    }

    /// Bind `user_id` to an existing remote customer.
    pub fn bind(&self, user_id: UserId, remote: &str) {
        self.store
            .set_bound_customer_id(user_id, &customer_id(remote))
            .unwrap();
    }

    pub fn binding(&self, user_id: UserId) -> Option<CustomerId> {
        self.store.get_bound_customer_id(user_id).unwrap()
    }

    /// Give `user_id` a full profile.
    pub fn profile(&self, user_id: UserId) {
        for (field, value) in [
            (ProfileField::BillingFirstName, "Ada"),
            (ProfileField::BillingLastName, "Lovelace"),
            (ProfileField::Login, "ada"),
            (ProfileField::Email, "ada@example.com"),
        ] {
            self.store.put_profile_field(user_id, field, value).unwrap();
        }
    }

    /// Drain every event published so far.
    pub fn events(&mut self) -> Vec<CustomerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}
