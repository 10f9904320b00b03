//! Payment gateway contract and wire types.
//!
//! The shapes here follow the Stripe REST API. Only the fields the
//! reconciliation logic reads are modelled; everything else is ignored on
//! deserialization.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ids::CustomerId;

/// Error type reported by the processor for requests it considers malformed.
pub const INVALID_REQUEST_ERROR: &str = "invalid_request_error";

/// Message fragment the processor uses when a customer record is gone.
const NO_SUCH_CUSTOMER: &str = "no such customer";

/// Remote payment-processor API.
///
/// Implementations perform a single request per call. Retries, rate limiting,
/// and deadlines belong to the implementation, not to callers.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a remote customer.
    async fn create_customer(
        &self,
        args: &CreateCustomerArgs,
    ) -> Result<CustomerObject, GatewayError>;

    /// Retrieve a remote customer.
    async fn retrieve_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<CustomerObject, GatewayError>;

    /// Update fields of a remote customer.
    async fn update_customer(
        &self,
        customer_id: &CustomerId,
        update: &CustomerUpdate,
    ) -> Result<CustomerObject, GatewayError>;

    /// Attach a legacy source to a customer.
    async fn attach_source(
        &self,
        customer_id: &CustomerId,
        source_id: &str,
    ) -> Result<SourceObject, GatewayError>;

    /// List a customer's legacy sources.
    async fn list_sources(
        &self,
        customer_id: &CustomerId,
        limit: u32,
    ) -> Result<StripeList<SourceObject>, GatewayError>;

    /// Delete (detach) a legacy source from a customer.
    async fn delete_source(
        &self,
        customer_id: &CustomerId,
        source_id: &str,
    ) -> Result<serde_json::Value, GatewayError>;

    /// Attach a payment method to a customer.
    async fn attach_payment_method(
        &self,
        customer_id: &CustomerId,
        payment_method_id: &str,
    ) -> Result<PaymentMethod, GatewayError>;

    /// List a customer's payment methods of one type (e.g. `card`).
    async fn list_payment_methods(
        &self,
        customer_id: &CustomerId,
        method_type: &str,
        limit: u32,
    ) -> Result<StripeList<PaymentMethod>, GatewayError>;
}

/// Arguments for creating a remote customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCustomerArgs {
    /// Customer email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Free-form description shown in the processor dashboard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Metadata key/value pairs.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl CreateCustomerArgs {
    /// Merge `overrides` on top of `self`.
    ///
    /// Fields set in `overrides` win; metadata keys are merged with the
    /// override's value taking precedence.
    #[must_use]
    pub fn merged_with(mut self, overrides: Self) -> Self {
        if overrides.email.is_some() {
            self.email = overrides.email;
        }
        if overrides.description.is_some() {
            self.description = overrides.description;
        }
        self.metadata.extend(overrides.metadata);
        self
    }
}

/// Fields to update on a remote customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CustomerUpdate {
    /// New default legacy source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_source: Option<String>,
}

/// Remote customer object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerObject {
    /// Customer ID.
    #[serde(default)]
    pub id: String,
    /// Customer email.
    #[serde(default)]
    pub email: Option<String>,
    /// Customer description.
    #[serde(default)]
    pub description: Option<String>,
    /// Default legacy source ID.
    #[serde(default)]
    pub default_source: Option<String>,
    /// Metadata attached to the customer.
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Created timestamp (Unix).
    #[serde(default)]
    pub created: i64,
    /// Set when the processor returns a tombstone for a deleted customer.
    #[serde(default)]
    pub deleted: bool,
}

/// Card details, as nested in sources and payment methods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    /// Card brand (e.g. "Visa").
    #[serde(default)]
    pub brand: Option<String>,
    /// Last four digits.
    #[serde(default)]
    pub last4: Option<String>,
    /// Expiry month (1-12).
    #[serde(default)]
    pub exp_month: Option<u32>,
    /// Expiry year.
    #[serde(default)]
    pub exp_year: Option<u32>,
}

/// SEPA debit details nested in a source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SepaDebitDetails {
    /// Last four digits of the IBAN.
    #[serde(default)]
    pub last4: Option<String>,
    /// Bank code.
    #[serde(default)]
    pub bank_code: Option<String>,
    /// Two-letter country code.
    #[serde(default)]
    pub country: Option<String>,
}

/// A legacy source as returned by the sources endpoints.
///
/// Covers both shapes: a `source` object with a `type`, and the older
/// `card` object that carries brand/last4/expiry at the top level and has no
/// `type` at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceObject {
    /// Source ID.
    #[serde(default)]
    pub id: String,
    /// Object kind (`source`, `card`, ...).
    #[serde(default)]
    pub object: Option<String>,
    /// Source type (`card`, `sepa_debit`, `alipay`, ...); absent on legacy cards.
    #[serde(default, rename = "type")]
    pub source_type: Option<String>,
    /// Owning customer ID.
    #[serde(default)]
    pub customer: Option<String>,
    /// Card details for `type == "card"` sources.
    #[serde(default)]
    pub card: Option<CardDetails>,
    /// SEPA details for `type == "sepa_debit"` sources.
    #[serde(default)]
    pub sepa_debit: Option<SepaDebitDetails>,
    /// Legacy card brand.
    #[serde(default)]
    pub brand: Option<String>,
    /// Legacy card last four digits.
    #[serde(default)]
    pub last4: Option<String>,
    /// Legacy card expiry month.
    #[serde(default)]
    pub exp_month: Option<u32>,
    /// Legacy card expiry year.
    #[serde(default)]
    pub exp_year: Option<u32>,
}

/// A payment method object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    /// Payment method ID.
    #[serde(default)]
    pub id: String,
    /// Object kind (always `payment_method`).
    #[serde(default)]
    pub object: Option<String>,
    /// Payment method type (e.g. `card`).
    #[serde(default, rename = "type")]
    pub method_type: Option<String>,
    /// Customer the method is attached to, if any.
    #[serde(default)]
    pub customer: Option<String>,
    /// Card details for card payment methods.
    #[serde(default)]
    pub card: Option<CardDetails>,
}

/// List response wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeList<T> {
    /// Object type (always "list").
    #[serde(default)]
    pub object: String,
    /// Data items.
    pub data: Vec<T>,
    /// Whether there are more items.
    #[serde(default)]
    pub has_more: bool,
    /// URL for the list endpoint.
    #[serde(default)]
    pub url: Option<String>,
}

/// Error payload returned by the processor.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteError {
    /// Error type (e.g. `invalid_request_error`).
    pub error_type: String,
    /// Human-readable message.
    pub message: String,
    /// Machine-readable error code.
    pub code: Option<String>,
    /// Parameter that caused the error.
    pub param: Option<String>,
    /// The full response body as received.
    pub raw: serde_json::Value,
}

impl RemoteError {
    /// Whether this error reports that the referenced customer no longer exists.
    #[must_use]
    pub fn is_no_such_customer(&self) -> bool {
        self.error_type == INVALID_REQUEST_ERROR
            && self.message.to_lowercase().contains(NO_SUCH_CUSTOMER)
    }
}

/// Errors returned by a [`PaymentGateway`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// The processor rejected the request.
    #[error("remote API error: {} - {}", .0.error_type, .0.message)]
    Api(RemoteError),

    /// The request did not complete (connection, timeout, undecodable body).
    #[error("transport error: {0}")]
    Transport(String),

    /// The gateway is misconfigured.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    /// Whether this error reports that the referenced customer no longer exists.
    #[must_use]
    pub fn is_no_such_customer(&self) -> bool {
        matches!(self, Self::Api(err) if err.is_no_such_customer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(error_type: &str, message: &str) -> RemoteError {
        RemoteError {
            error_type: error_type.to_string(),
            message: message.to_string(),
            code: None,
            param: None,
            raw: serde_json::Value::Null,
        }
    }

    #[test]
    fn no_such_customer_requires_type_and_message() {
        assert!(remote("invalid_request_error", "No such customer: 'cus_123'").is_no_such_customer());
        assert!(remote("invalid_request_error", "no SUCH customer").is_no_such_customer());
        assert!(!remote("api_error", "No such customer: 'cus_123'").is_no_such_customer());
        assert!(!remote("invalid_request_error", "No such source").is_no_such_customer());
    }

    #[test]
    fn transport_errors_are_never_stale_customer() {
        assert!(!GatewayError::Transport("No such customer".into()).is_no_such_customer());
        assert!(GatewayError::Api(remote("invalid_request_error", "No such customer"))
            .is_no_such_customer());
    }

    #[test]
    fn create_args_overrides_win() {
        let defaults = CreateCustomerArgs {
            email: Some("a@example.com".into()),
            description: Some("Name: A B".into()),
            metadata: BTreeMap::from([("site".to_string(), "shop".to_string())]),
        };
        let overrides = CreateCustomerArgs {
            email: Some("b@example.com".into()),
            description: None,
            metadata: BTreeMap::from([("plan".to_string(), "pro".to_string())]),
        };

        let merged = defaults.merged_with(overrides);
        assert_eq!(merged.email.as_deref(), Some("b@example.com"));
        assert_eq!(merged.description.as_deref(), Some("Name: A B"));
        assert_eq!(merged.metadata.len(), 2);
    }

    #[test]
    fn legacy_card_deserializes_without_type() {
        let source: SourceObject = serde_json::from_value(serde_json::json!({
            "id": "card_123",
            "object": "card",
            "brand": "Visa",
            "last4": "4242",
            "exp_month": 8,
            "exp_year": 2030
        }))
        .unwrap();

        assert!(source.source_type.is_none());
        assert_eq!(source.exp_month, Some(8));
    }
}
