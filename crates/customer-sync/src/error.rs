//! Error types for customer operations.

use customer_sync_core::GatewayError;
use customer_sync_store::StoreError;

/// Result type for customer operations.
pub type Result<T> = std::result::Result<T, CustomerError>;

/// Errors returned by [`Customer`](crate::Customer) operations.
#[derive(Debug, thiserror::Error)]
pub enum CustomerError {
    /// The payment processor rejected the request.
    #[error("remote error ({error_type}): {message}")]
    Remote {
        /// Human-readable message from the processor.
        message: String,
        /// Processor error type (e.g. `invalid_request_error`).
        error_type: String,
        /// The full error payload as received.
        raw: serde_json::Value,
    },

    /// The request to the processor did not complete.
    #[error("transport error: {0}")]
    Transport(String),

    /// The processor answered, but not with something usable.
    #[error("{0}")]
    Validation(String),

    /// A local store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The manager could not be assembled from its configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<GatewayError> for CustomerError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Api(remote) => Self::Remote {
                message: remote.message,
                error_type: remote.error_type,
                raw: remote.raw,
            },
            GatewayError::Transport(msg) => Self::Transport(msg),
            GatewayError::Configuration(msg) => Self::Configuration(msg),
        }
    }
}
