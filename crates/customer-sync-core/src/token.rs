//! Locally persisted payment tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gateway::{CardDetails, PaymentMethod, SourceObject};
use crate::ids::{TokenId, UserId};
use crate::source::SourceKind;

/// Gateway ID for card tokens (legacy cards, card sources, card payment methods).
pub const CARD_GATEWAY_ID: &str = "stripe";

/// Gateway ID for SEPA debit tokens.
pub const SEPA_GATEWAY_ID: &str = "stripe_sepa";

/// A saved payment instrument owned by a local user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalPaymentToken {
    /// Local token ID.
    pub id: TokenId,
    /// Remote source or payment method ID.
    pub token: String,
    /// Which local gateway the token belongs to.
    pub gateway_id: String,
    /// Lowercased card brand. `None` for SEPA tokens.
    pub brand: Option<String>,
    /// Last four digits.
    pub last4: Option<String>,
    /// Expiry month.
    pub exp_month: Option<u32>,
    /// Expiry year.
    pub exp_year: Option<u32>,
    /// Owning local user.
    pub user_id: UserId,
    /// When the token was saved.
    pub created_at: DateTime<Utc>,
}

impl LocalPaymentToken {
    fn new(user_id: UserId, token: &str, gateway_id: &str) -> Self {
        Self {
            id: TokenId::generate(),
            token: token.to_string(),
            gateway_id: gateway_id.to_string(),
            brand: None,
            last4: None,
            exp_month: None,
            exp_year: None,
            user_id,
            created_at: Utc::now(),
        }
    }

    fn card(user_id: UserId, token: &str, card: &CardDetails) -> Self {
        Self {
            brand: card.brand.as_deref().map(str::to_lowercase),
            last4: card.last4.clone(),
            exp_month: card.exp_month,
            exp_year: card.exp_year,
            ..Self::new(user_id, token, CARD_GATEWAY_ID)
        }
    }

    /// Build a token for a freshly attached legacy source.
    ///
    /// Returns `None` for shapes that are not reusable stored instruments
    /// (Alipay, unknown source types) or that lack the details a token needs.
    #[must_use]
    pub fn from_source(user_id: UserId, source: &SourceObject) -> Option<Self> {
        match SourceKind::classify(source) {
            SourceKind::Legacy => Some(Self {
                brand: source.brand.as_deref().map(str::to_lowercase),
                last4: source.last4.clone(),
                exp_month: source.exp_month,
                exp_year: source.exp_year,
                ..Self::new(user_id, &source.id, CARD_GATEWAY_ID)
            }),
            SourceKind::Card => source
                .card
                .as_ref()
                .map(|card| Self::card(user_id, &source.id, card)),
            SourceKind::SepaDebit => Some(Self {
                last4: source.sepa_debit.as_ref().and_then(|s| s.last4.clone()),
                ..Self::new(user_id, &source.id, SEPA_GATEWAY_ID)
            }),
            SourceKind::Alipay | SourceKind::PaymentMethod | SourceKind::Other(_) => None,
        }
    }

    /// Build a card token for a payment method.
    ///
    /// Returns `None` when the payment method carries no card details.
    #[must_use]
    pub fn from_payment_method(user_id: UserId, method: &PaymentMethod) -> Option<Self> {
        method
            .card
            .as_ref()
            .map(|card| Self::card(user_id, &method.id, card))
    }
}
