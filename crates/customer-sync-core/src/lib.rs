//! Core types for customer-sync.
//!
//! This crate provides the foundational types shared by every customer-sync crate:
//!
//! - **Identifiers**: `UserId`, `CustomerId`, `TokenId`
//! - **Gateway**: the `PaymentGateway` trait and its wire types
//! - **Sources**: `SourceKind`, `PaymentSource`
//! - **Tokens**: `LocalPaymentToken`
//! - **Profiles**: `ProfileField`
//!
//! # Guests
//!
//! A local user ID of zero means "no local user". It is never a `UserId`;
//! guest customers carry `None` instead.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod gateway;
pub mod ids;
pub mod profile;
pub mod source;
pub mod token;

pub use gateway::{
    CardDetails, CreateCustomerArgs, CustomerObject, CustomerUpdate, GatewayError,
    PaymentGateway, PaymentMethod, RemoteError, SepaDebitDetails, SourceObject, StripeList,
    INVALID_REQUEST_ERROR,
};
pub use ids::{CustomerId, IdError, TokenId, UserId};
pub use profile::ProfileField;
pub use source::{PaymentSource, SourceKind};
pub use token::{LocalPaymentToken, CARD_GATEWAY_ID, SEPA_GATEWAY_ID};
