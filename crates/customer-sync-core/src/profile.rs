//! Local user profile fields.

use serde::{Deserialize, Serialize};

/// A profile field read from the local user store when creating a remote customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    /// First name entered at billing.
    BillingFirstName,
    /// Last name entered at billing.
    BillingLastName,
    /// Account first name.
    FirstName,
    /// Account last name.
    LastName,
    /// Login handle.
    Login,
    /// Account email.
    Email,
}

impl ProfileField {
    /// Stable storage name of the field.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BillingFirstName => "billing_first_name",
            Self::BillingLastName => "billing_last_name",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Login => "login",
            Self::Email => "email",
        }
    }
}
