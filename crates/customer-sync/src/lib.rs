//! Customer source manager.
//!
//! Keeps a local user account and its payment-processor customer in step:
//!
//! - creates the remote customer lazily and binds it to the user
//! - recreates it once when the processor reports it deleted
//! - attaches legacy sources and payment methods, saving local payment tokens
//! - lists both kinds of saved instruments as one cached list
//! - deletes sources and sets the default source
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use customer_sync::CustomerSourceManager;
//! use customer_sync_core::UserId;
//! use customer_sync_store::MemoryStore;
//! use customer_sync_stripe::StripeGateway;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let gateway = Arc::new(StripeGateway::new("sk_test_...")?);
//! let manager = CustomerSourceManager::new(gateway, store.clone(), store.clone(), store);
//!
//! let mut customer = manager.customer(UserId::new(42).unwrap())?;
//! let source_id = customer.add_source("src_123").await?;
//! let sources = customer.list_sources().await;
//! # let _ = (source_id, sources);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

#[cfg(feature = "rocksdb-backend")]
pub mod bootstrap;
pub mod config;
pub mod customer;
pub mod error;
pub mod events;
pub mod manager;
pub mod telemetry;

#[cfg(feature = "rocksdb-backend")]
pub use bootstrap::build_manager;
pub use config::SyncConfig;
pub use customer::Customer;
pub use error::{CustomerError, Result};
pub use events::{ChannelEventSink, CustomerEvent, CustomerEventKind, EventSink, TracingEventSink};
pub use manager::{CustomerSourceManager, MetadataProvider, DEFAULT_LIST_LIMIT};
pub use telemetry::init_tracing;
