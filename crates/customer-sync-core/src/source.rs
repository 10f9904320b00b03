//! Saved payment sources.
//!
//! The processor describes a saved instrument in several JSON shapes. This
//! module classifies them into [`SourceKind`] and normalizes them into the
//! merged [`PaymentSource`] listing.

use serde::{Deserialize, Serialize};

use crate::gateway::{CardDetails, PaymentMethod, SourceObject};

/// Classification of a saved instrument's response shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "type", rename_all = "snake_case")]
pub enum SourceKind {
    /// Pre-sources card object with top-level brand/last4/expiry and no `type`.
    Legacy,
    /// A `source` object of type `card`.
    Card,
    /// A `source` object of type `sepa_debit`.
    SepaDebit,
    /// A `source` object of type `alipay`; not a reusable stored instrument.
    Alipay,
    /// A `payment_method` object.
    PaymentMethod,
    /// Any other source type.
    Other(String),
}

impl SourceKind {
    /// Classify a legacy-source response.
    #[must_use]
    pub fn classify(source: &SourceObject) -> Self {
        let Some(source_type) = source.source_type.as_deref() else {
            return Self::Legacy;
        };

        match source_type {
            "alipay" => Self::Alipay,
            "sepa_debit" => Self::SepaDebit,
            "card" if source.object.as_deref() == Some("source") => Self::Card,
            other => Self::Other(other.to_string()),
        }
    }

    /// Short label for display and logging.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Legacy => "legacy",
            Self::Card => "card",
            Self::SepaDebit => "sepa_debit",
            Self::Alipay => "alipay",
            Self::PaymentMethod => "payment_method",
            Self::Other(other) => other,
        }
    }
}

/// One entry in the merged list of a customer's saved sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSource {
    /// Remote source or payment method ID.
    pub id: String,
    /// Which representation the entry came from.
    pub kind: SourceKind,
    /// Card brand, when known.
    pub brand: Option<String>,
    /// Last four digits (card or IBAN).
    pub last4: Option<String>,
    /// Expiry month.
    pub exp_month: Option<u32>,
    /// Expiry year.
    pub exp_year: Option<u32>,
}

impl PaymentSource {
    fn with_card(id: &str, kind: SourceKind, card: Option<&CardDetails>) -> Self {
        let card = card.cloned().unwrap_or_default();
        Self {
            id: id.to_string(),
            kind,
            brand: card.brand,
            last4: card.last4,
            exp_month: card.exp_month,
            exp_year: card.exp_year,
        }
    }
}

impl From<&SourceObject> for PaymentSource {
    fn from(source: &SourceObject) -> Self {
        let kind = SourceKind::classify(source);
        match kind {
            SourceKind::Legacy => Self {
                id: source.id.clone(),
                kind,
                brand: source.brand.clone(),
                last4: source.last4.clone(),
                exp_month: source.exp_month,
                exp_year: source.exp_year,
            },
            SourceKind::SepaDebit => Self {
                id: source.id.clone(),
                kind,
                brand: None,
                last4: source.sepa_debit.as_ref().and_then(|s| s.last4.clone()),
                exp_month: None,
                exp_year: None,
            },
            kind => Self::with_card(&source.id, kind, source.card.as_ref()),
        }
    }
}

impl From<&PaymentMethod> for PaymentSource {
    fn from(method: &PaymentMethod) -> Self {
        Self::with_card(&method.id, SourceKind::PaymentMethod, method.card.as_ref())
    }
}
