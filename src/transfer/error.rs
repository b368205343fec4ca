//! Transfer Error Types
//!
//! One variant per caller-visible error class. Validation and business-rule
//! errors are raised before any mutation; `SystemFailure` is the only class
//! that can originate inside the unit of work, and it always implies rollback.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::sequence::SequenceError;

/// Message shown to callers for store/commit failures; details go to the log.
pub const GENERIC_FAILURE_MESSAGE: &str = "Transaction failed. Please try again later.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransferError {
    /// Client-correctable input problem (format, PIN, type, self-transfer)
    #[error("{0}")]
    Validation(String),

    /// Sender, receiver or owning customer does not exist
    #[error("{0}")]
    NotFound(String),

    /// Sender or receiver account, or the sender's login user, is not active
    #[error("{0}")]
    Deactivated(String),

    #[error("Insufficient balance. Available: {available}, Required: {required}")]
    InsufficientBalance {
        available: Decimal,
        required: Decimal,
    },

    /// Store unavailable, statement or commit failure
    #[error("System failure: {0}")]
    SystemFailure(String),
}

impl TransferError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::Validation(_) => "VALIDATION_ERROR",
            TransferError::NotFound(_) => "NOT_FOUND",
            TransferError::Deactivated(_) => "DEACTIVATED",
            TransferError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            TransferError::SystemFailure(_) => "SYSTEM_FAILURE",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::Validation(_) => 400,
            TransferError::Deactivated(_) => 403,
            TransferError::NotFound(_) => 404,
            TransferError::InsufficientBalance { .. } => 409,
            TransferError::SystemFailure(_) => 500,
        }
    }

    /// Message safe to hand back to the caller
    pub fn caller_message(&self) -> String {
        match self {
            TransferError::SystemFailure(_) => GENERIC_FAILURE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// Only system failures are worth resubmitting unchanged
    pub fn is_transient(&self) -> bool {
        matches!(self, TransferError::SystemFailure(_))
    }
}

impl From<sqlx::Error> for TransferError {
    fn from(e: sqlx::Error) -> Self {
        TransferError::SystemFailure(format!("database error: {}", e))
    }
}

impl From<SequenceError> for TransferError {
    fn from(e: SequenceError) -> Self {
        TransferError::SystemFailure(e.to_string())
    }
}
