//! Domain events published after successful customer mutations.
//!
//! Publishing is fire and forget: a sink must not block and cannot fail the
//! operation that produced the event.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

use customer_sync_core::{CustomerId, SourceKind, UserId};

/// Something that happened to a remote customer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerEvent {
    /// Remote customer the event is about.
    pub customer_id: CustomerId,
    /// Bound local user, `None` for guests.
    pub user_id: Option<UserId>,
    /// What happened.
    pub kind: CustomerEventKind,
    /// When it happened.
    pub occurred_at: DateTime<Utc>,
}

/// Event payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CustomerEventKind {
    /// A new remote customer was created.
    CustomerCreated,
    /// A legacy source was attached.
    SourceAdded {
        /// Remote source ID.
        source_id: String,
        /// Classified response shape.
        source_kind: SourceKind,
    },
    /// A payment method was attached (or was already attached).
    PaymentMethodAdded {
        /// Remote payment method ID.
        payment_method_id: String,
    },
    /// A legacy source was deleted.
    SourceDeleted {
        /// Remote source ID.
        source_id: String,
    },
    /// The customer's default legacy source changed.
    DefaultSourceSet {
        /// Remote source ID.
        source_id: String,
    },
}

impl CustomerEventKind {
    /// Stable event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CustomerCreated => "customer_created",
            Self::SourceAdded { .. } => "source_added",
            Self::PaymentMethodAdded { .. } => "payment_method_added",
            Self::SourceDeleted { .. } => "source_deleted",
            Self::DefaultSourceSet { .. } => "default_source_set",
        }
    }
}

impl CustomerEvent {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn now(customer_id: CustomerId, user_id: Option<UserId>, kind: CustomerEventKind) -> Self {
        Self {
            customer_id,
            user_id,
            kind,
            occurred_at: Utc::now(),
        }
    }
}

/// Receives customer events.
pub trait EventSink: Send + Sync {
    /// Publish an event.
    fn publish(&self, event: CustomerEvent);
}

/// Sink that records every event as a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, event: CustomerEvent) {
        tracing::info!(
            event = event.kind.name(),
            customer_id = %event.customer_id,
            user_id = ?event.user_id,
            "Customer event"
        );
    }
}

/// Sink that forwards events to an unbounded channel.
///
/// The receiving half decides how and when events are delivered. Events
/// published after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<CustomerEvent>,
}

impl ChannelEventSink {
    /// Create a sink and the receiver its events arrive on.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CustomerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn publish(&self, event: CustomerEvent) {
        if let Err(err) = self.tx.send(event) {
            tracing::debug!(event = err.0.kind.name(), "Event receiver dropped");
        }
    }
}
