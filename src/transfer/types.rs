//! Transfer Core Types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::TransferError;
use super::state::TransferState;
use crate::account::validation::AccountNumber;
use crate::core_types::AccountId;
use crate::sequence::TransactionId;

// ============================================================================
// Request (raw caller input)
// ============================================================================

/// Transfer request exactly as the caller submitted it.
///
/// Every field is optional so the validation pipeline can report each
/// missing or malformed field instead of failing at deserialization.
#[derive(Clone, Default, Deserialize)]
pub struct TransferRequest {
    pub sender_account_number: Option<String>,
    pub receiver_account_number: Option<String>,
    pub amount: Option<Decimal>,
    pub transaction_type: Option<String>,
    pub description: Option<String>,
    pub pin: Option<String>,
}

impl TransferRequest {
    pub fn new(
        sender_account_number: impl Into<String>,
        receiver_account_number: impl Into<String>,
        amount: Decimal,
        pin: impl Into<String>,
    ) -> Self {
        Self {
            sender_account_number: Some(sender_account_number.into()),
            receiver_account_number: Some(receiver_account_number.into()),
            amount: Some(amount),
            transaction_type: None,
            description: None,
            pin: Some(pin.into()),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_type(mut self, transaction_type: impl Into<String>) -> Self {
        self.transaction_type = Some(transaction_type.into());
        self
    }
}

impl fmt::Debug for TransferRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferRequest")
            .field("sender_account_number", &self.sender_account_number)
            .field("receiver_account_number", &self.receiver_account_number)
            .field("amount", &self.amount)
            .field("transaction_type", &self.transaction_type)
            .field("description", &self.description)
            .field("pin", &self.pin.as_ref().map(|_| "******"))
            .finish()
    }
}

// ============================================================================
// Transaction type (closed set)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    #[default]
    Online,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Online => "ONLINE",
        }
    }

    /// Blank or omitted input selects the default type
    pub fn from_input(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim) {
            None | Some("") => Some(TransactionType::default()),
            Some(s) => s.parse().ok(),
        }
    }
}

impl FromStr for TransactionType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("ONLINE") {
            Ok(TransactionType::Online)
        } else {
            Err(())
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Validated transfer (only produced by the validation pipeline)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTransfer {
    sender: AccountNumber,
    receiver: AccountNumber,
    amount: Decimal,
    transaction_type: TransactionType,
    description: Option<String>,
}

impl ValidatedTransfer {
    pub(crate) fn new(
        sender: AccountNumber,
        receiver: AccountNumber,
        amount: Decimal,
        transaction_type: TransactionType,
        description: Option<String>,
    ) -> Self {
        Self {
            sender,
            receiver,
            amount,
            transaction_type,
            description,
        }
    }

    pub fn sender(&self) -> &AccountNumber {
        &self.sender
    }

    pub fn receiver(&self) -> &AccountNumber {
        &self.receiver
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

// ============================================================================
// Transaction record
// ============================================================================

/// Durable record of one committed transfer. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub transaction_id: TransactionId,
    /// Sender's internal account id
    pub account_id: AccountId,
    pub sender_account_number: String,
    pub receiver_account_number: String,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Signed effect of this transaction on `account_number`'s balance
    pub fn signed_amount_for(&self, account_number: &str) -> Decimal {
        if self.sender_account_number == account_number {
            -self.amount
        } else if self.receiver_account_number == account_number {
            self.amount
        } else {
            Decimal::ZERO
        }
    }
}

/// Most recent first; same-instant records fall back to id order
pub(crate) fn sort_most_recent_first(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.transaction_id.cmp(&a.transaction_id))
    });
}

// ============================================================================
// Validation outcome
// ============================================================================

/// Machine-readable reason attached to business-rule rejections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectCode {
    SameAccount,
    SenderNotFound,
    SenderDeactivated,
    ReceiverNotFound,
    ReceiverDeactivated,
    CustomerNotFound,
    UserDeactivated,
    InvalidPin,
    InsufficientBalance,
    /// Directory lookup failed; not the caller's fault
    LookupFailed,
}

impl RejectCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectCode::SameAccount => "SAME_ACCOUNT",
            RejectCode::SenderNotFound => "SENDER_NOT_FOUND",
            RejectCode::SenderDeactivated => "SENDER_DEACTIVATED",
            RejectCode::ReceiverNotFound => "RECEIVER_NOT_FOUND",
            RejectCode::ReceiverDeactivated => "RECEIVER_DEACTIVATED",
            RejectCode::CustomerNotFound => "CUSTOMER_NOT_FOUND",
            RejectCode::UserDeactivated => "USER_DEACTIVATED",
            RejectCode::InvalidPin => "INVALID_PIN",
            RejectCode::InsufficientBalance => "INSUFFICIENT_BALANCE",
            RejectCode::LookupFailed => "LOOKUP_FAILED",
        }
    }
}

impl fmt::Display for RejectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Balance figures behind an `InsufficientBalance` rejection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shortfall {
    pub available: Decimal,
    pub required: Decimal,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationOutcome {
    errors: Vec<String>,
    code: Option<RejectCode>,
    shortfall: Option<Shortfall>,
    validated: Option<ValidatedTransfer>,
}

impl ValidationOutcome {
    pub(crate) fn failure(message: impl Into<String>) -> Self {
        let mut outcome = Self::default();
        outcome.add_error(message);
        outcome
    }

    pub(crate) fn add_error(&mut self, message: impl Into<String>) {
        self.validated = None;
        self.errors.push(message.into());
    }

    pub(crate) fn add_error_with_code(&mut self, message: impl Into<String>, code: RejectCode) {
        self.add_error(message);
        self.code = Some(code);
    }

    pub(crate) fn reject_insufficient(&mut self, shortfall: Shortfall) {
        self.add_error_with_code(
            format!(
                "Insufficient balance. Available: {}, Required: {}",
                shortfall.available, shortfall.required
            ),
            RejectCode::InsufficientBalance,
        );
        self.shortfall = Some(shortfall);
    }

    pub(crate) fn set_validated(&mut self, validated: ValidatedTransfer) {
        if self.errors.is_empty() {
            self.validated = Some(validated);
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// The authoritative, caller-facing message
    pub fn first_error(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }

    pub fn all_errors(&self) -> String {
        self.errors.join("; ")
    }

    pub fn error_code(&self) -> Option<RejectCode> {
        self.code
    }

    pub fn shortfall(&self) -> Option<Shortfall> {
        self.shortfall
    }

    pub fn validated(&self) -> Option<&ValidatedTransfer> {
        self.validated.as_ref()
    }

    /// Convert into the validated transfer or the caller-facing error class
    pub fn into_result(self) -> Result<ValidatedTransfer, TransferError> {
        if let Some(validated) = self.validated {
            return Ok(validated);
        }

        let message = self
            .errors
            .first()
            .cloned()
            .unwrap_or_else(|| "Transfer request is invalid".to_string());

        Err(match self.code {
            Some(RejectCode::SenderNotFound)
            | Some(RejectCode::ReceiverNotFound)
            | Some(RejectCode::CustomerNotFound) => TransferError::NotFound(message),
            Some(RejectCode::SenderDeactivated)
            | Some(RejectCode::ReceiverDeactivated)
            | Some(RejectCode::UserDeactivated) => TransferError::Deactivated(message),
            Some(RejectCode::InsufficientBalance) => match self.shortfall {
                Some(s) => TransferError::InsufficientBalance {
                    available: s.available,
                    required: s.required,
                },
                None => TransferError::Validation(message),
            },
            Some(RejectCode::LookupFailed) => TransferError::SystemFailure(message),
            Some(RejectCode::SameAccount) | Some(RejectCode::InvalidPin) | None => {
                TransferError::Validation(message)
            }
        })
    }
}

// ============================================================================
// Receipt
// ============================================================================

/// Result handed back for a committed transfer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferReceipt {
    pub transaction_id: TransactionId,
    #[serde(serialize_with = "serialize_state")]
    pub state: TransferState,
}

fn serialize_state<S: serde::Serializer>(state: &TransferState, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(state.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_defaults_and_parsing() {
        assert_eq!(TransactionType::from_input(None), Some(TransactionType::Online));
        assert_eq!(TransactionType::from_input(Some("  ")), Some(TransactionType::Online));
        assert_eq!(TransactionType::from_input(Some("online")), Some(TransactionType::Online));
        assert_eq!(TransactionType::from_input(Some("ONLINE")), Some(TransactionType::Online));
        assert_eq!(TransactionType::from_input(Some("WIRE")), None);
    }

    #[test]
    fn test_request_debug_redacts_pin() {
        let req = TransferRequest::new("1234567890", "0987654321", Decimal::ONE, "123456");
        let rendered = format!("{:?}", req);
        assert!(!rendered.contains("123456\""));
        assert!(rendered.contains("******"));
    }

    #[test]
    fn test_request_from_json() {
        let req: TransferRequest = serde_json::from_str(
            r#"{"sender_account_number":"1234567890","receiver_account_number":"0987654321",
                "amount":"100.50","pin":"123456"}"#,
        )
        .unwrap();
        assert_eq!(req.amount, Some(Decimal::new(10050, 2)));
        assert!(req.transaction_type.is_none());
    }

    #[test]
    fn test_outcome_first_error_is_authoritative() {
        let mut outcome = ValidationOutcome::failure("first");
        outcome.add_error("second");
        assert!(!outcome.is_valid());
        assert_eq!(outcome.first_error(), Some("first"));
        assert_eq!(outcome.all_errors(), "first; second");
        assert!(outcome.error_code().is_none());
        assert_eq!(
            outcome.into_result().unwrap_err(),
            TransferError::Validation("first".into())
        );
    }

    #[test]
    fn test_outcome_error_classes() {
        let mut outcome = ValidationOutcome::default();
        outcome.add_error_with_code("Sender account not found", RejectCode::SenderNotFound);
        assert!(matches!(outcome.into_result(), Err(TransferError::NotFound(_))));

        let mut outcome = ValidationOutcome::default();
        outcome.add_error_with_code("deactivated", RejectCode::UserDeactivated);
        assert!(matches!(outcome.into_result(), Err(TransferError::Deactivated(_))));

        let mut outcome = ValidationOutcome::default();
        outcome.reject_insufficient(Shortfall {
            available: Decimal::new(50000, 2),
            required: Decimal::new(100000, 2),
        });
        assert_eq!(
            outcome.first_error(),
            Some("Insufficient balance. Available: 500.00, Required: 1000.00")
        );
        assert!(matches!(
            outcome.into_result(),
            Err(TransferError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn test_signed_amount() {
        let txn = Transaction {
            transaction_id: TransactionId::from_stored("TXN_20240115001"),
            account_id: "ACC_1".into(),
            sender_account_number: "1111111111".into(),
            receiver_account_number: "2222222222".into(),
            amount: Decimal::new(2500, 2),
            transaction_type: TransactionType::Online,
            description: None,
            created_at: Utc::now(),
        };
        assert_eq!(txn.signed_amount_for("1111111111"), Decimal::new(-2500, 2));
        assert_eq!(txn.signed_amount_for("2222222222"), Decimal::new(2500, 2));
        assert_eq!(txn.signed_amount_for("3333333333"), Decimal::ZERO);
    }
}
