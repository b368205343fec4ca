//! Transfer notices
//!
//! After a transfer commits, the sender gets a debit notice and the receiver
//! a credit notice. Delivery is best effort and happens off the transfer's
//! call path via [`NotificationQueue`]; a failure is logged and dropped.

pub mod queue;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::core_types::CustomerId;
use crate::sequence::TransactionId;

pub use queue::{DispatchStats, NotificationQueue};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotificationError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("Recipient not found for customer {0}")]
    RecipientNotFound(CustomerId),
}

/// One side of a committed transfer, addressed to the account owner
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferNotice {
    pub transaction_id: TransactionId,
    pub customer_id: CustomerId,
    pub account_number: String,
    pub counterparty_account_number: String,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Delivery channel for transfer notices
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn notify_debit(&self, notice: &TransferNotice) -> Result<(), NotificationError>;

    async fn notify_credit(&self, notice: &TransferNotice) -> Result<(), NotificationError>;
}

/// Writes notices to the log instead of delivering them
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationDispatcher for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn notify_debit(&self, notice: &TransferNotice) -> Result<(), NotificationError> {
        info!(
            transaction_id = %notice.transaction_id,
            customer_id = %notice.customer_id,
            account = %notice.account_number,
            to = %notice.counterparty_account_number,
            amount = %notice.amount,
            balance_after = %notice.balance_after,
            "Debit notice"
        );
        Ok(())
    }

    async fn notify_credit(&self, notice: &TransferNotice) -> Result<(), NotificationError> {
        info!(
            transaction_id = %notice.transaction_id,
            customer_id = %notice.customer_id,
            account = %notice.account_number,
            from = %notice.counterparty_account_number,
            amount = %notice.amount,
            balance_after = %notice.balance_after,
            "Credit notice"
        );
        Ok(())
    }
}
