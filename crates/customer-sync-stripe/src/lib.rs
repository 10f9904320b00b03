//! Stripe gateway for customer-sync.
//!
//! This crate implements [`PaymentGateway`](customer_sync_core::PaymentGateway)
//! against the Stripe REST API: form-encoded requests, basic auth with the
//! secret key, one request per call.
//!
//! # Example
//!
//! ```no_run
//! use customer_sync_core::{CreateCustomerArgs, PaymentGateway};
//! use customer_sync_stripe::StripeGateway;
//!
//! # async fn example() -> Result<(), customer_sync_core::GatewayError> {
//! let gateway = StripeGateway::new("sk_test_...")?;
//!
//! let customer = gateway
//!     .create_customer(&CreateCustomerArgs {
//!         email: Some("ada@example.com".to_string()),
//!         ..CreateCustomerArgs::default()
//!     })
//!     .await?;
//!
//! println!("Created customer {}", customer.id);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;

pub use client::{GatewayOptions, StripeGateway};
