//! Transfer Executor
//!
//! Moves funds for a validated transfer inside one ledger unit of work:
//!
//! 1. Lock sender and receiver rows (ascending account number, so two
//!    opposite transfers cannot deadlock) and re-check existence and status.
//! 2. Compare the locked sender balance against the amount.
//! 3. Allocate the transaction id, insert the record, debit the sender with
//!    a conditional update, credit the receiver.
//! 4. Commit, then hand debit/credit notices to the notification queue.
//!
//! Any error before commit rolls the whole unit back.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::error::TransferError;
use super::state::TransferState;
use super::types::{Transaction, ValidatedTransfer};
use super::validation::{
    MSG_RECEIVER_DEACTIVATED, MSG_RECEIVER_NOT_FOUND, MSG_SENDER_DEACTIVATED, MSG_SENDER_NOT_FOUND,
};
use crate::clock::Clock;
use crate::ledger::{Ledger, LedgerTx, LockedAccount};
use crate::money::format_money;
use crate::notification::TransferNotice;
use crate::notification::queue::{NoticePair, NotificationQueue};
use crate::sequence::{TransactionId, TransactionIdSource};

/// Balances of both parties as written by a committed transfer
#[derive(Debug, Clone)]
struct Posting {
    transaction: Transaction,
    sender: LockedAccount,
    receiver: LockedAccount,
    sender_balance_after: Decimal,
    receiver_balance_after: Decimal,
}

pub struct TransferExecutor {
    ledger: Arc<dyn Ledger>,
    ids: Arc<dyn TransactionIdSource>,
    clock: Arc<dyn Clock>,
    notifications: NotificationQueue,
}

impl TransferExecutor {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        ids: Arc<dyn TransactionIdSource>,
        clock: Arc<dyn Clock>,
        notifications: NotificationQueue,
    ) -> Self {
        Self {
            ledger,
            ids,
            clock,
            notifications,
        }
    }

    pub async fn execute(
        &self,
        transfer: &ValidatedTransfer,
    ) -> Result<TransactionId, TransferError> {
        let mut state = TransferState::Validated;

        let mut tx = self.ledger.begin().await.inspect_err(|e| {
            error!(error = %e, "Failed to open unit of work");
        })?;

        let posting = match self.post(tx.as_mut(), transfer, &mut state).await {
            Ok(posting) => posting,
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "Rollback failed");
                }
                let failed = TransferState::for_error(&e);
                advance(&mut state, failed);
                log_failure(transfer, &e, state);
                return Err(e);
            }
        };

        if let Err(e) = tx.commit().await {
            advance(&mut state, TransferState::SystemFailure);
            log_failure(transfer, &e, state);
            return Err(e);
        }
        advance(&mut state, TransferState::Committed);

        info!(
            transaction_id = %posting.transaction.transaction_id,
            sender = %posting.sender.account_number,
            receiver = %posting.receiver.account_number,
            amount = %format_money(posting.transaction.amount),
            sender_previous_balance = %format_money(posting.sender.balance),
            sender_new_balance = %format_money(posting.sender_balance_after),
            receiver_new_balance = %format_money(posting.receiver_balance_after),
            state = %state,
            "Transfer committed"
        );

        let transaction_id = posting.transaction.transaction_id.clone();
        self.dispatch_notices(posting);
        Ok(transaction_id)
    }

    /// Everything between begin and commit
    async fn post(
        &self,
        tx: &mut dyn LedgerTx,
        transfer: &ValidatedTransfer,
        state: &mut TransferState,
    ) -> Result<Posting, TransferError> {
        let (sender, receiver) = lock_pair(tx, transfer).await?;
        let amount = transfer.amount();

        if sender.balance < amount {
            return Err(TransferError::InsufficientBalance {
                available: sender.balance,
                required: amount,
            });
        }
        advance(state, TransferState::BalanceChecked);

        let created_at: DateTime<Utc> = self.clock.now();
        let transaction_id = self.ids.next_id(tx, self.clock.today()).await?;
        debug!(transaction_id = %transaction_id, sequence = self.ids.name(), "Transaction id allocated");

        let transaction = Transaction {
            transaction_id,
            account_id: sender.account_id.clone(),
            sender_account_number: sender.account_number.clone(),
            receiver_account_number: receiver.account_number.clone(),
            amount,
            transaction_type: transfer.transaction_type(),
            description: transfer.description().map(str::to_string),
            created_at,
        };
        tx.insert_transaction(&transaction).await?;

        if !tx.debit_if_sufficient(&sender.account_id, amount).await? {
            // Locked row changed under us; treat as a balance rejection
            return Err(TransferError::InsufficientBalance {
                available: sender.balance,
                required: amount,
            });
        }
        tx.credit(&receiver.account_id, amount).await?;

        Ok(Posting {
            sender_balance_after: sender.balance - amount,
            receiver_balance_after: receiver.balance + amount,
            transaction,
            sender,
            receiver,
        })
    }

    fn dispatch_notices(&self, posting: Posting) {
        if !self.notifications.is_enabled() {
            return;
        }

        let Posting {
            transaction,
            sender,
            receiver,
            sender_balance_after,
            receiver_balance_after,
        } = posting;

        let debit = TransferNotice {
            transaction_id: transaction.transaction_id.clone(),
            customer_id: sender.customer_id,
            account_number: sender.account_number.clone(),
            counterparty_account_number: receiver.account_number.clone(),
            amount: transaction.amount,
            balance_after: sender_balance_after,
            occurred_at: transaction.created_at,
        };
        let credit = TransferNotice {
            transaction_id: transaction.transaction_id,
            customer_id: receiver.customer_id,
            account_number: receiver.account_number,
            counterparty_account_number: sender.account_number,
            amount: transaction.amount,
            balance_after: receiver_balance_after,
            occurred_at: transaction.created_at,
        };

        self.notifications.enqueue(NoticePair { debit, credit });
    }
}

/// Lock both rows in ascending account-number order
async fn lock_pair(
    tx: &mut dyn LedgerTx,
    transfer: &ValidatedTransfer,
) -> Result<(LockedAccount, LockedAccount), TransferError> {
    let sender_number = transfer.sender().as_str();
    let receiver_number = transfer.receiver().as_str();

    let (sender, receiver) = if sender_number <= receiver_number {
        let s = tx.lock_account(sender_number).await?;
        let r = tx.lock_account(receiver_number).await?;
        (s, r)
    } else {
        let r = tx.lock_account(receiver_number).await?;
        let s = tx.lock_account(sender_number).await?;
        (s, r)
    };

    let sender = sender.ok_or_else(|| TransferError::NotFound(MSG_SENDER_NOT_FOUND.into()))?;
    let receiver =
        receiver.ok_or_else(|| TransferError::NotFound(MSG_RECEIVER_NOT_FOUND.into()))?;

    if !sender.is_active() {
        return Err(TransferError::Deactivated(MSG_SENDER_DEACTIVATED.into()));
    }
    if !receiver.is_active() {
        return Err(TransferError::Deactivated(MSG_RECEIVER_DEACTIVATED.into()));
    }
    Ok((sender, receiver))
}

fn advance(state: &mut TransferState, next: TransferState) {
    match state.transition(next) {
        Ok(s) => *state = s,
        Err(e) => {
            warn!(from = %state, to = %next, error = %e, "Unexpected transfer state change");
            *state = next;
        }
    }
}

fn log_failure(transfer: &ValidatedTransfer, err: &TransferError, state: TransferState) {
    match err {
        TransferError::SystemFailure(_) => error!(
            sender = %transfer.sender(),
            receiver = %transfer.receiver(),
            amount = %format_money(transfer.amount()),
            error = %err,
            state = %state,
            "Transfer rolled back"
        ),
        _ => info!(
            sender = %transfer.sender(),
            receiver = %transfer.receiver(),
            amount = %format_money(transfer.amount()),
            code = err.code(),
            state = %state,
            "Transfer rejected at execution"
        ),
    }
}
