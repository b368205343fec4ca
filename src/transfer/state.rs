//! Transfer lifecycle states
//!
//! ```text
//! RECEIVED → VALIDATED → BALANCE_CHECKED → COMMITTED → NOTIFIED
//!     ↓          ↓              ↓               ↘
//! REJECTED   INSUFFICIENT   SYSTEM_FAILURE    NOTIFY_FAILED
//! ```
//!
//! There is no retry state: a failed transfer is resubmitted as a new
//! request and receives a fresh identifier.

use std::fmt;

use super::error::TransferError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferState {
    Received,
    Validated,
    BalanceChecked,
    /// Funds moved and durable; notification still pending
    Committed,
    Notified,
    NotifyFailed,
    RejectedValidation,
    InsufficientBalance,
    SystemFailure,
}

impl TransferState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Notified
                | TransferState::NotifyFailed
                | TransferState::RejectedValidation
                | TransferState::InsufficientBalance
                | TransferState::SystemFailure
        )
    }

    /// Money has moved. True for `Committed` and both notification outcomes.
    #[inline]
    pub fn is_committed(&self) -> bool {
        matches!(
            self,
            TransferState::Committed | TransferState::Notified | TransferState::NotifyFailed
        )
    }

    pub fn can_transition_to(&self, next: TransferState) -> bool {
        use TransferState::*;
        matches!(
            (self, next),
            (Received, Validated)
                | (Received, RejectedValidation)
                // executor re-checks lookups at execution time
                | (Validated, RejectedValidation)
                | (Validated, BalanceChecked)
                | (Validated, InsufficientBalance)
                | (Validated, SystemFailure)
                // conditional debit lost a race
                | (BalanceChecked, InsufficientBalance)
                | (BalanceChecked, Committed)
                | (BalanceChecked, SystemFailure)
                | (Committed, Notified)
                | (Committed, NotifyFailed)
        )
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow
    pub fn transition(self, next: TransferState) -> Result<TransferState, TransferError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransferError::SystemFailure(format!(
                "invalid state transition: {} -> {}",
                self, next
            )))
        }
    }

    /// Terminal failure state for an error class
    pub fn for_error(err: &TransferError) -> TransferState {
        match err {
            TransferError::InsufficientBalance { .. } => TransferState::InsufficientBalance,
            TransferError::SystemFailure(_) => TransferState::SystemFailure,
            TransferError::Validation(_)
            | TransferError::NotFound(_)
            | TransferError::Deactivated(_) => TransferState::RejectedValidation,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Received => "RECEIVED",
            TransferState::Validated => "VALIDATED",
            TransferState::BalanceChecked => "BALANCE_CHECKED",
            TransferState::Committed => "COMMITTED",
            TransferState::Notified => "NOTIFIED",
            TransferState::NotifyFailed => "NOTIFY_FAILED",
            TransferState::RejectedValidation => "REJECTED_VALIDATION",
            TransferState::InsufficientBalance => "INSUFFICIENT_BALANCE",
            TransferState::SystemFailure => "SYSTEM_FAILURE",
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_terminal_states() {
        assert!(TransferState::Notified.is_terminal());
        assert!(TransferState::NotifyFailed.is_terminal());
        assert!(TransferState::RejectedValidation.is_terminal());
        assert!(TransferState::InsufficientBalance.is_terminal());
        assert!(TransferState::SystemFailure.is_terminal());

        assert!(!TransferState::Received.is_terminal());
        assert!(!TransferState::Validated.is_terminal());
        assert!(!TransferState::BalanceChecked.is_terminal());
        assert!(!TransferState::Committed.is_terminal());
    }

    #[test]
    fn test_happy_path_transitions() {
        let state = TransferState::Received
            .transition(TransferState::Validated)
            .and_then(|s| s.transition(TransferState::BalanceChecked))
            .and_then(|s| s.transition(TransferState::Committed))
            .and_then(|s| s.transition(TransferState::Notified))
            .unwrap();
        assert_eq!(state, TransferState::Notified);
        assert!(state.is_committed());
    }

    #[test]
    fn test_no_transition_out_of_terminal() {
        for terminal in [
            TransferState::RejectedValidation,
            TransferState::InsufficientBalance,
            TransferState::SystemFailure,
            TransferState::Notified,
        ] {
            assert!(terminal.transition(TransferState::Received).is_err());
            assert!(terminal.transition(TransferState::Committed).is_err());
        }
    }

    #[test]
    fn test_cannot_skip_balance_check() {
        assert!(
            TransferState::Validated
                .transition(TransferState::Committed)
                .is_err()
        );
        assert!(
            TransferState::Received
                .transition(TransferState::InsufficientBalance)
                .is_err()
        );
    }

    #[test]
    fn test_state_for_error() {
        assert_eq!(
            TransferState::for_error(&TransferError::InsufficientBalance {
                available: Decimal::ZERO,
                required: Decimal::ONE,
            }),
            TransferState::InsufficientBalance
        );
        assert_eq!(
            TransferState::for_error(&TransferError::Deactivated("x".into())),
            TransferState::RejectedValidation
        );
        assert_eq!(
            TransferState::for_error(&TransferError::SystemFailure("x".into())),
            TransferState::SystemFailure
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(TransferState::BalanceChecked.to_string(), "BALANCE_CHECKED");
        assert_eq!(TransferState::NotifyFailed.to_string(), "NOTIFY_FAILED");
    }
}
