//! Mapping of Stripe error bodies onto gateway errors.

use serde::Deserialize;

use customer_sync_core::{GatewayError, RemoteError};

/// Stripe API error response.
#[derive(Debug, Clone, Deserialize)]
struct StripeErrorResponse {
    error: StripeErrorDetail,
}

/// Stripe error detail.
#[derive(Debug, Clone, Deserialize)]
struct StripeErrorDetail {
    #[serde(rename = "type")]
    error_type: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    param: Option<String>,
}

/// Build a gateway error from a non-success response body.
///
/// Bodies that are not a Stripe error envelope still produce an `Api` error,
/// typed `unknown` and carrying whatever JSON (or text) was returned.
pub(crate) fn api_error(status: reqwest::StatusCode, body: &str) -> GatewayError {
    let raw: serde_json::Value = serde_json::from_str(body)
        .unwrap_or_else(|_| serde_json::Value::String(body.to_string()));

    match serde_json::from_value::<StripeErrorResponse>(raw.clone()) {
        Ok(envelope) => GatewayError::Api(RemoteError {
            error_type: envelope.error.error_type,
            message: envelope.error.message,
            code: envelope.error.code,
            param: envelope.error.param,
            raw,
        }),
        Err(_) => GatewayError::Api(RemoteError {
            error_type: "unknown".to_string(),
            message: format!("HTTP {status}"),
            code: None,
            param: None,
            raw,
        }),
    }
}

/// Wrap a transport failure.
#[allow(clippy::needless_pass_by_value)] // used as a `map_err` adapter
pub(crate) fn transport(err: reqwest::Error) -> GatewayError {
    GatewayError::Transport(err.to_string())
}
