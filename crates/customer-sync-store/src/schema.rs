//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Local user to remote customer binding, keyed by `user_id`.
    pub const CUSTOMER_BINDINGS: &str = "customer_bindings";

    /// Profile fields, keyed by `user_id || field_name`.
    pub const PROFILES: &str = "profiles";

    /// Saved payment tokens, keyed by `token_id` (ULID).
    pub const PAYMENT_TOKENS: &str = "payment_tokens";

    /// Index: tokens by user, keyed by `user_id || token_id`.
    /// Value is empty (index only).
    pub const PAYMENT_TOKENS_BY_USER: &str = "payment_tokens_by_user";

    /// Transient cache entries, keyed by cache key string.
    pub const CACHE: &str = "cache";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::CUSTOMER_BINDINGS,
        cf::PROFILES,
        cf::PAYMENT_TOKENS,
        cf::PAYMENT_TOKENS_BY_USER,
        cf::CACHE,
    ]
}
