//! Data models read by the transfer engine
//!
//! Onboarding owns the lifecycle of these records; the engine only reads
//! them, and only the transfer executor ever writes `balance`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

use crate::core_types::{AccountId, CustomerId, UserId, is_active_status};

/// Bank account
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub account_id: AccountId,
    pub customer_id: CustomerId,
    /// External account number, 10-25 digits, globally unique
    pub account_number: String,
    /// Routing code (IFSC)
    pub ifsc_code: String,
    pub bank_name: String,
    pub phone_number_linked: String,
    /// Scale-2 balance, never negative after a committed transfer
    pub balance: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn is_active(&self) -> bool {
        is_active_status(&self.status)
    }
}

/// Account holder. Carries the transfer PIN.
#[derive(Clone, PartialEq)]
pub struct Customer {
    pub customer_id: CustomerId,
    pub name: String,
    pub email: String,
    pub customer_pin: String,
}

impl Customer {
    /// Exact string comparison against the stored PIN
    pub fn pin_matches(&self, entered: &str) -> bool {
        self.customer_pin == entered
    }
}

// PIN stays out of logs and panic messages
impl fmt::Debug for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Customer")
            .field("customer_id", &self.customer_id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("customer_pin", &"******")
            .finish()
    }
}

/// Login user linked to a customer by email
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedUser {
    pub user_id: UserId,
    pub email: String,
    pub active: bool,
}
