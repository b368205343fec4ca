//! Transfer request validation
//!
//! Format checks (PIN, account numbers, amount, type) each contribute at most
//! one message and accumulate. Only when all of them pass does the pipeline
//! read the directory, and from there the first failed rule ends validation.
//! Nothing here writes.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::error::{GENERIC_FAILURE_MESSAGE, TransferError};
use super::types::{
    RejectCode, Shortfall, TransactionType, TransferRequest, ValidatedTransfer, ValidationOutcome,
};
use crate::account::directory::AccountDirectory;
use crate::account::validation::{AccountFieldError, AccountNumber, Pin};
use crate::money::{MONEY_SCALE, declared_scale};

pub const MSG_REQUEST_REQUIRED: &str = "Transfer request is required";
pub const MSG_PIN_REQUIRED: &str = "Customer PIN is required";
pub const MSG_PIN_FORMAT: &str = "PIN must be exactly 6 digits";
pub const MSG_SAME_ACCOUNT: &str = "Sender and receiver account numbers must be different";
pub const MSG_AMOUNT_REQUIRED: &str = "Transaction amount is required";
pub const MSG_AMOUNT_NOT_POSITIVE: &str = "Transaction amount must be greater than zero";
pub const MSG_AMOUNT_SCALE: &str = "Transaction amount cannot have more than 2 decimal places";
pub const MSG_TYPE_INVALID: &str = "Transaction type must be 'ONLINE'";
pub const MSG_SENDER_NOT_FOUND: &str = "Sender account not found";
pub const MSG_SENDER_DEACTIVATED: &str =
    "Your account is deactivated. Please contact admin or report an issue.";
pub const MSG_RECEIVER_NOT_FOUND: &str = "Receiver account not found";
pub const MSG_RECEIVER_DEACTIVATED: &str =
    "Receiver account is deactivated. Transaction cannot be processed.";
pub const MSG_CUSTOMER_NOT_FOUND: &str = "Customer not found";
pub const MSG_INVALID_PIN: &str = "Invalid PIN";

/// Which side of the transfer an account number belongs to
#[derive(Debug, Clone, Copy)]
enum Party {
    Sender,
    Receiver,
}

impl Party {
    fn label(&self) -> &'static str {
        match self {
            Party::Sender => "Sender",
            Party::Receiver => "Receiver",
        }
    }
}

fn check_account_number(raw: Option<&str>, party: Party) -> Result<AccountNumber, String> {
    match AccountNumber::new(raw.unwrap_or_default()) {
        Ok(number) => Ok(number),
        Err(AccountFieldError::Missing { .. }) => {
            Err(format!("{} account number is required", party.label()))
        }
        Err(_) => Err(format!(
            "{} account number must be 10-25 digits",
            party.label()
        )),
    }
}

fn check_pin(raw: Option<&str>) -> Result<Pin, &'static str> {
    match Pin::new(raw.unwrap_or_default()) {
        Ok(pin) => Ok(pin),
        Err(AccountFieldError::Missing { .. }) => Err(MSG_PIN_REQUIRED),
        Err(_) => Err(MSG_PIN_FORMAT),
    }
}

fn check_amount(amount: Option<Decimal>) -> Result<Decimal, &'static str> {
    let amount = amount.ok_or(MSG_AMOUNT_REQUIRED)?;
    if amount <= Decimal::ZERO {
        return Err(MSG_AMOUNT_NOT_POSITIVE);
    }
    // Declared scale, so "1.500" is rejected like "1.505"
    if declared_scale(&amount) > MONEY_SCALE {
        return Err(MSG_AMOUNT_SCALE);
    }
    Ok(amount)
}

/// Request validation against format rules and current directory state
#[derive(Clone)]
pub struct ValidationPipeline {
    directory: Arc<dyn AccountDirectory>,
}

impl ValidationPipeline {
    pub fn new(directory: Arc<dyn AccountDirectory>) -> Self {
        Self { directory }
    }

    pub async fn validate(&self, request: Option<&TransferRequest>) -> ValidationOutcome {
        let Some(request) = request else {
            return ValidationOutcome::failure(MSG_REQUEST_REQUIRED);
        };

        let mut outcome = ValidationOutcome::default();

        let pin = check_pin(request.pin.as_deref())
            .map_err(|msg| outcome.add_error(msg))
            .ok();

        let sender = check_account_number(request.sender_account_number.as_deref(), Party::Sender)
            .map_err(|msg| outcome.add_error(msg))
            .ok();
        let receiver =
            check_account_number(request.receiver_account_number.as_deref(), Party::Receiver)
                .map_err(|msg| outcome.add_error(msg))
                .ok();
        if let (Some(s), Some(r)) = (&sender, &receiver) {
            if s == r {
                outcome.add_error_with_code(MSG_SAME_ACCOUNT, RejectCode::SameAccount);
            }
        }

        let amount = check_amount(request.amount)
            .map_err(|msg| outcome.add_error(msg))
            .ok();

        let transaction_type = TransactionType::from_input(request.transaction_type.as_deref());
        if transaction_type.is_none() {
            outcome.add_error(MSG_TYPE_INVALID);
        }

        let (pin, sender, receiver, amount, transaction_type) =
            match (pin, sender, receiver, amount, transaction_type) {
                (Some(p), Some(s), Some(r), Some(a), Some(t)) if outcome.is_valid() => {
                    (p, s, r, a, t)
                }
                _ => {
                    debug!(errors = %outcome.all_errors(), "Transfer request failed format checks");
                    return outcome;
                }
            };

        let description = request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        let validated =
            ValidatedTransfer::new(sender, receiver, amount, transaction_type, description);

        match self.check_business_rules(&validated, &pin).await {
            Ok(()) => outcome.set_validated(validated),
            Err(rejection) => {
                let code = match rejection {
                    Rejection::Rule(message, code) => {
                        outcome.add_error_with_code(message, code);
                        code
                    }
                    Rejection::Insufficient(shortfall) => {
                        outcome.reject_insufficient(shortfall);
                        RejectCode::InsufficientBalance
                    }
                };
                debug!(
                    sender = %validated.sender(),
                    receiver = %validated.receiver(),
                    code = %code,
                    "Transfer request rejected"
                );
            }
        }
        outcome
    }

    /// Checks 6-10, first failure wins
    async fn check_business_rules(
        &self,
        transfer: &ValidatedTransfer,
        pin: &Pin,
    ) -> Result<(), Rejection> {
        let sender = self
            .directory
            .find_account_by_number(transfer.sender().as_str())
            .await
            .map_err(lookup_failed)?
            .ok_or(Rejection::Rule(MSG_SENDER_NOT_FOUND, RejectCode::SenderNotFound))?;
        if !sender.is_active() {
            return Err(Rejection::Rule(
                MSG_SENDER_DEACTIVATED,
                RejectCode::SenderDeactivated,
            ));
        }

        let receiver = self
            .directory
            .find_account_by_number(transfer.receiver().as_str())
            .await
            .map_err(lookup_failed)?
            .ok_or(Rejection::Rule(
                MSG_RECEIVER_NOT_FOUND,
                RejectCode::ReceiverNotFound,
            ))?;
        if !receiver.is_active() {
            return Err(Rejection::Rule(
                MSG_RECEIVER_DEACTIVATED,
                RejectCode::ReceiverDeactivated,
            ));
        }

        let customer = self
            .directory
            .find_customer(&sender.customer_id)
            .await
            .map_err(lookup_failed)?
            .ok_or(Rejection::Rule(
                MSG_CUSTOMER_NOT_FOUND,
                RejectCode::CustomerNotFound,
            ))?;

        match self
            .directory
            .find_linked_user(&customer)
            .await
            .map_err(lookup_failed)?
        {
            Some(user) if !user.active => {
                return Err(Rejection::Rule(
                    MSG_SENDER_DEACTIVATED,
                    RejectCode::UserDeactivated,
                ));
            }
            Some(_) => {}
            None => {
                warn!(
                    customer_id = %customer.customer_id,
                    "No login user linked to customer, skipping user status check"
                );
            }
        }

        if !customer.pin_matches(pin.expose()) {
            return Err(Rejection::Rule(MSG_INVALID_PIN, RejectCode::InvalidPin));
        }

        if sender.balance < transfer.amount() {
            return Err(Rejection::Insufficient(Shortfall {
                available: sender.balance,
                required: transfer.amount(),
            }));
        }

        Ok(())
    }
}

enum Rejection {
    Rule(&'static str, RejectCode),
    Insufficient(Shortfall),
}

fn lookup_failed(e: TransferError) -> Rejection {
    error!(error = %e, "Directory lookup failed during validation");
    Rejection::Rule(GENERIC_FAILURE_MESSAGE, RejectCode::LookupFailed)
}
