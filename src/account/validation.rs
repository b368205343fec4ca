//! Input validation for account numbers and PINs
//!
//! This module provides validated types for the two identifiers a customer
//! types into a transfer form. Fields are private to force validation through
//! the public API.

use std::fmt;

// ============================================================================
// Validation Errors
// ============================================================================

/// Field-level validation errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AccountFieldError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("Invalid length for {field}: expected {min}-{max}, got {actual}")]
    InvalidLength {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Invalid format for {field}: expected {expected}")]
    InvalidFormat {
        field: &'static str,
        expected: &'static str,
    },
}

// ============================================================================
// AccountNumber - Validated External Account Number
// ============================================================================

pub const ACCOUNT_NUMBER_MIN_LEN: usize = 10;
pub const ACCOUNT_NUMBER_MAX_LEN: usize = 25;

/// Validated external account number (digits only, 10-25 characters)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Create a new validated AccountNumber
    ///
    /// # Validation Rules
    /// - Must be non-blank
    /// - Regex: ^[0-9]{10,25}$
    ///
    /// # Examples
    /// ```
    /// use transfer_engine::account::validation::AccountNumber;
    ///
    /// let number = AccountNumber::new("1234567890").unwrap();
    /// assert_eq!(number.as_str(), "1234567890");
    ///
    /// assert!(AccountNumber::new("12345").is_err()); // too short
    /// assert!(AccountNumber::new("12345abcde").is_err()); // not digits
    /// ```
    pub fn new(raw: &str) -> Result<Self, AccountFieldError> {
        let field = "account number";
        if raw.trim().is_empty() {
            return Err(AccountFieldError::Missing { field });
        }

        // Padding is not stripped: " 1234567890" is not a valid number
        if !raw.chars().all(|c| c.is_ascii_digit()) {
            return Err(AccountFieldError::InvalidFormat {
                field,
                expected: "digits only",
            });
        }

        if raw.len() < ACCOUNT_NUMBER_MIN_LEN || raw.len() > ACCOUNT_NUMBER_MAX_LEN {
            return Err(AccountFieldError::InvalidLength {
                field,
                min: ACCOUNT_NUMBER_MIN_LEN,
                max: ACCOUNT_NUMBER_MAX_LEN,
                actual: raw.len(),
            });
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AccountNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Pin - Validated 6-digit Authorization PIN
// ============================================================================

pub const PIN_LEN: usize = 6;

/// Validated transfer PIN. Debug and Display never print the digits.
#[derive(Clone, PartialEq, Eq)]
pub struct Pin(String);

impl Pin {
    /// Regex: ^[0-9]{6}$
    pub fn new(raw: &str) -> Result<Self, AccountFieldError> {
        let field = "PIN";
        if raw.trim().is_empty() {
            return Err(AccountFieldError::Missing { field });
        }
        if raw.len() != PIN_LEN || !raw.chars().all(|c| c.is_ascii_digit()) {
            return Err(AccountFieldError::InvalidFormat {
                field,
                expected: "exactly 6 digits",
            });
        }
        Ok(Self(raw.to_string()))
    }

    /// Raw digits, for comparison against the stored PIN only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin(******)")
    }
}
