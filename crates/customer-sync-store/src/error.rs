//! Error types for customer-sync storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored value could not be interpreted.
    #[error("corrupt record in {entity}: {message}")]
    Corrupt {
        /// Kind of record.
        entity: &'static str,
        /// What was wrong with it.
        message: String,
    },
}
