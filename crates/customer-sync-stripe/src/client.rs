//! Stripe API client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Url};

use customer_sync_core::{
    CreateCustomerArgs, CustomerId, CustomerObject, CustomerUpdate, GatewayError, PaymentGateway,
    PaymentMethod, SourceObject, StripeList,
};

use crate::error::{api_error, transport};

/// Largest page size the list endpoints accept.
const MAX_LIST_LIMIT: u32 = 100;

/// Stripe implementation of [`PaymentGateway`].
#[derive(Debug, Clone)]
pub struct StripeGateway {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl StripeGateway {
    /// Stripe API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.stripe.com/v1";

    /// Create a gateway against the live Stripe API.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Stripe secret API key (`sk_test_...` or `sk_live_...`)
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Configuration` if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self, GatewayError> {
        Self::with_options(api_key, GatewayOptions::default())
    }

    /// Create a gateway with custom options.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Configuration` if the base URL is invalid or the
    /// HTTP client cannot be built.
    pub fn with_options(
        api_key: impl Into<String>,
        options: GatewayOptions,
    ) -> Result<Self, GatewayError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GatewayError::Configuration("Stripe API key is empty".into()));
        }

        let base_url = Url::parse(options.base_url.trim_end_matches('/'))
            .map_err(|e| GatewayError::Configuration(format!("invalid base URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::Configuration(format!(
                "base URL cannot carry a path: {base_url}"
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .map_err(|e| GatewayError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }

    /// Build an endpoint URL, percent-encoding each path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GatewayError::Configuration("base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and decode the response.
    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        form: Option<&[(String, String)]>,
    ) -> Result<T, GatewayError> {
        tracing::debug!(method = %method, path = %url.path(), "Sending Stripe request");

        let mut request = self
            .client
            .request(method, url)
            .basic_auth(&self.api_key, Option::<&str>::None);
        if let Some(form) = form {
            request = request.form(form);
        }

        let response = request.send().await.map_err(transport)?;
        self.handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| {
                GatewayError::Transport(format!("failed to decode Stripe response: {e}"))
            });
        }

        Err(api_error(status, &body))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_customer(
        &self,
        args: &CreateCustomerArgs,
    ) -> Result<CustomerObject, GatewayError> {
        let mut params = Vec::new();
        if let Some(email) = &args.email {
            params.push(("email".to_string(), email.clone()));
        }
        if let Some(description) = &args.description {
            params.push(("description".to_string(), description.clone()));
        }
        for (key, value) in &args.metadata {
            params.push((format!("metadata[{key}]"), value.clone()));
        }

        let url = self.endpoint(&["customers"])?;
        self.send(Method::POST, url, Some(params.as_slice())).await
    }

    async fn retrieve_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<CustomerObject, GatewayError> {
        let url = self.endpoint(&["customers", customer_id.as_str()])?;
        self.send(Method::GET, url, None).await
    }

    async fn update_customer(
        &self,
        customer_id: &CustomerId,
        update: &CustomerUpdate,
    ) -> Result<CustomerObject, GatewayError> {
        let mut params = Vec::new();
        if let Some(source) = &update.default_source {
            params.push(("default_source".to_string(), source.clone()));
        }

        let url = self.endpoint(&["customers", customer_id.as_str()])?;
        self.send(Method::POST, url, Some(params.as_slice())).await
    }

    async fn attach_source(
        &self,
        customer_id: &CustomerId,
        source_id: &str,
    ) -> Result<SourceObject, GatewayError> {
        let params = [("source".to_string(), source_id.to_string())];
        let url = self.endpoint(&["customers", customer_id.as_str(), "sources"])?;
        self.send(Method::POST, url, Some(params.as_slice())).await
    }

    async fn list_sources(
        &self,
        customer_id: &CustomerId,
        limit: u32,
    ) -> Result<StripeList<SourceObject>, GatewayError> {
        let mut url = self.endpoint(&["customers", customer_id.as_str(), "sources"])?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.clamp(1, MAX_LIST_LIMIT).to_string());
        self.send(Method::GET, url, None).await
    }

    async fn delete_source(
        &self,
        customer_id: &CustomerId,
        source_id: &str,
    ) -> Result<serde_json::Value, GatewayError> {
        let url = self.endpoint(&["customers", customer_id.as_str(), "sources", source_id])?;
        self.send(Method::DELETE, url, None).await
    }

    async fn attach_payment_method(
        &self,
        customer_id: &CustomerId,
        payment_method_id: &str,
    ) -> Result<PaymentMethod, GatewayError> {
        let params = [("customer".to_string(), customer_id.to_string())];
        let url = self.endpoint(&["payment_methods", payment_method_id, "attach"])?;
        self.send(Method::POST, url, Some(params.as_slice())).await
    }

    async fn list_payment_methods(
        &self,
        customer_id: &CustomerId,
        method_type: &str,
        limit: u32,
    ) -> Result<StripeList<PaymentMethod>, GatewayError> {
        let mut url = self.endpoint(&["payment_methods"])?;
        url.query_pairs_mut()
            .append_pair("customer", customer_id.as_str())
            .append_pair("type", method_type)
            .append_pair("limit", &limit.clamp(1, MAX_LIST_LIMIT).to_string());
        self.send(Method::GET, url, None).await
    }
}

/// Gateway options for customization.
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    /// API base URL (default: the live Stripe API).
    pub base_url: String,
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            base_url: StripeGateway::DEFAULT_BASE_URL.to_string(),
            timeout_seconds: 30,
        }
    }
}

impl GatewayOptions {
    /// Options pointing at a different base URL (e.g. a local mock).
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}
