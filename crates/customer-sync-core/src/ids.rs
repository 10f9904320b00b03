//! Identifier types for customer-sync.
//!
//! This module provides strongly-typed identifiers for local users, remote
//! processor customers, and locally saved payment tokens.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use ulid::{Generator, Ulid};

/// Shared generator so IDs minted within one millisecond still sort in order.
static TOKEN_IDS: Mutex<Generator> = Mutex::new(Generator::new());

/// A local user identifier.
///
/// Local user IDs are positive integers. The raw value zero is reserved for
/// "no local user" (guest checkout) and is represented as `Option::<UserId>::None`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct UserId(NonZeroU64);

impl UserId {
    /// Create a user ID from a raw value, returning `None` for the guest value zero.
    #[must_use]
    pub const fn new(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Return the raw integer value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0.get()
    }

    /// Return the big-endian bytes of the ID (8 bytes).
    #[must_use]
    pub const fn to_be_bytes(&self) -> [u8; 8] {
        self.0.get().to_be_bytes()
    }
}

impl FromStr for UserId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u64 = s.trim().parse().map_err(|_| IdError::InvalidUserId)?;
        Self::new(raw).ok_or(IdError::GuestUserId)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u64> for UserId {
    type Error = IdError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(IdError::GuestUserId)
    }
}

impl From<UserId> for u64 {
    fn from(id: UserId) -> Self {
        id.get()
    }
}

/// A remote payment-processor customer identifier (e.g. `cus_...`).
///
/// Never empty: an unbound customer is modelled as `Option<CustomerId>`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CustomerId(String);

impl CustomerId {
    /// Return the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CustomerId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(IdError::EmptyCustomerId);
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl fmt::Debug for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CustomerId({})", self.0)
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CustomerId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CustomerId> for String {
    fn from(id: CustomerId) -> Self {
        id.0
    }
}

impl AsRef<str> for CustomerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A local payment token identifier using ULID for time-ordering.
///
/// Token IDs are time-ordered so a user's saved tokens list in the order
/// they were saved.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenId(Ulid);

impl TokenId {
    /// Generate a new `TokenId` with the current timestamp.
    ///
    /// IDs from one process are strictly increasing.
    #[must_use]
    pub fn generate() -> Self {
        let mut generator = TOKEN_IDS.lock().unwrap_or_else(PoisonError::into_inner);
        // Overflow needs 2^80 IDs in one millisecond; fall back to a fresh random ULID.
        Self(generator.generate().unwrap_or_else(|_| Ulid::new()))
    }

    /// Return the bytes of the ULID (16 bytes).
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 16] {
        self.0.to_bytes()
    }

    /// Create a `TokenId` from bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Ulid::from_bytes(bytes))
    }
}

impl FromStr for TokenId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ulid = Ulid::from_string(s).map_err(|_| IdError::InvalidUlid)?;
        Ok(Self(ulid))
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({})", self.0)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TokenId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TokenId> for String {
    fn from(id: TokenId) -> Self {
        id.0.to_string()
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a valid unsigned integer.
    #[error("invalid user ID format")]
    InvalidUserId,

    /// The input is zero, which denotes a guest rather than a user.
    #[error("user ID zero denotes a guest")]
    GuestUserId,

    /// The customer ID is empty.
    #[error("customer ID must not be empty")]
    EmptyCustomerId,

    /// The input is not a valid ULID.
    #[error("invalid ULID format")]
    InvalidUlid,
}
