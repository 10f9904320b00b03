//! Key encoding utilities for `RocksDB`.
//!
//! This module provides functions for encoding and decoding keys used in column families.

use customer_sync_core::{ProfileField, TokenId, UserId};

use crate::error::{Result, StoreError};

/// Length of an encoded user ID.
const USER_KEY_LEN: usize = 8;

/// Create a binding key from a user ID.
#[must_use]
pub fn binding_key(user_id: UserId) -> Vec<u8> {
    user_id.to_be_bytes().to_vec()
}

/// Create a profile field key.
///
/// Format: `user_id (8 bytes) || field_name`
#[must_use]
pub fn profile_key(user_id: UserId, field: ProfileField) -> Vec<u8> {
    let name = field.as_str().as_bytes();
    let mut key = Vec::with_capacity(USER_KEY_LEN + name.len());
    key.extend_from_slice(&user_id.to_be_bytes());
    key.extend_from_slice(name);
    key
}

/// Create a token key from a token ID.
#[must_use]
pub fn token_key(token_id: &TokenId) -> Vec<u8> {
    token_id.to_bytes().to_vec()
}

/// Create a user-token index key.
///
/// Format: `user_id (8 bytes) || token_id (16 bytes)`
///
/// Since ULIDs are time-ordered, tokens for a user sort by save time.
#[must_use]
pub fn user_token_key(user_id: UserId, token_id: &TokenId) -> Vec<u8> {
    let mut key = Vec::with_capacity(USER_KEY_LEN + 16);
    key.extend_from_slice(&user_id.to_be_bytes());
    key.extend_from_slice(&token_id.to_bytes());
    key
}

/// Create a prefix for iterating all tokens for a user.
#[must_use]
pub fn user_tokens_prefix(user_id: UserId) -> Vec<u8> {
    user_id.to_be_bytes().to_vec()
}

/// Extract the token ID from a user-token index key.
///
/// # Errors
///
/// Returns `StoreError::Corrupt` if the key is not exactly 24 bytes.
pub fn extract_token_id_from_user_key(key: &[u8]) -> Result<TokenId> {
    let bytes: [u8; 16] = key
        .get(USER_KEY_LEN..)
        .and_then(|tail| tail.try_into().ok())
        .ok_or_else(|| StoreError::Corrupt {
            entity: "payment token index",
            message: format!("unexpected key length {}", key.len()),
        })?;
    Ok(TokenId::from_bytes(bytes))
}
