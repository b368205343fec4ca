//! Transfer Engine
//!
//! Entry point for callers: validation, execution and history queries over
//! one set of collaborators.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::error::TransferError;
use super::executor::TransferExecutor;
use super::state::TransferState;
use super::types::{
    Transaction, TransferReceipt, TransferRequest, ValidatedTransfer, ValidationOutcome,
};
use super::validation::ValidationPipeline;
use crate::account::directory::AccountDirectory;
use crate::account::repository::PgAccountDirectory;
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::db::Database;
use crate::ledger::{Ledger, PgLedger};
use crate::notification::queue::{DispatchStats, NotificationQueue};
use crate::notification::{LogNotifier, NotificationDispatcher};
use crate::sequence::{PersistedDailySequence, TransactionId, TransactionIdSource};

pub const DEFAULT_TRANSACTION_PREFIX: &str = "TXN_";

pub struct TransferEngine {
    validation: ValidationPipeline,
    executor: TransferExecutor,
    ledger: Arc<dyn Ledger>,
}

impl TransferEngine {
    pub fn builder(
        directory: Arc<dyn AccountDirectory>,
        ledger: Arc<dyn Ledger>,
    ) -> TransferEngineBuilder {
        TransferEngineBuilder {
            directory,
            ledger,
            ids: None,
            clock: None,
            notifications: NotificationQueue::disabled(),
        }
    }

    /// PostgreSQL-backed engine configured from `config`.
    ///
    /// Returns the notification worker handle when notifications are enabled.
    pub fn from_config(
        db: &Database,
        config: &AppConfig,
    ) -> (Self, Option<JoinHandle<DispatchStats>>) {
        let directory = Arc::new(PgAccountDirectory::new(db.pool().clone()));
        let ledger = Arc::new(PgLedger::new(db.pool().clone()));

        let (notifications, worker) = if config.notifications.enabled {
            let dispatcher: Arc<dyn NotificationDispatcher> = Arc::new(LogNotifier);
            let (queue, handle) =
                NotificationQueue::spawn(dispatcher, config.notifications.queue_size);
            (queue, Some(handle))
        } else {
            (NotificationQueue::disabled(), None)
        };

        let engine = Self::builder(directory, ledger)
            .with_id_source(crate::sequence::transaction_id_source(&config.sequences))
            .with_notifications(notifications)
            .build();
        (engine, worker)
    }

    /// Run every pre-mutation check. Reads only.
    pub async fn validate_transfer(&self, request: Option<&TransferRequest>) -> ValidationOutcome {
        self.validation.validate(request).await
    }

    /// Move funds for an already validated transfer
    pub async fn execute_transfer(
        &self,
        validated: &ValidatedTransfer,
    ) -> Result<TransactionId, TransferError> {
        self.executor.execute(validated).await
    }

    /// Validate, then execute
    pub async fn submit_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferReceipt, TransferError> {
        let outcome = self.validate_transfer(Some(request)).await;
        if !outcome.is_valid() {
            warn!(
                code = outcome.error_code().map(|c| c.as_str()).unwrap_or("VALIDATION_ERROR"),
                errors = %outcome.all_errors(),
                "Transfer rejected by validation"
            );
        }
        let validated = outcome.into_result()?;

        let transaction_id = self.execute_transfer(&validated).await?;
        info!(transaction_id = %transaction_id, "Transfer accepted");

        Ok(TransferReceipt {
            transaction_id,
            state: TransferState::Committed,
        })
    }

    /// Transactions where the account is sender or receiver, most recent first
    pub async fn list_transactions_for_account(
        &self,
        account_number: &str,
    ) -> Result<Vec<Transaction>, TransferError> {
        let account_number = account_number.trim();
        if account_number.is_empty() {
            return Err(TransferError::Validation(
                "Account number is required".to_string(),
            ));
        }
        self.ledger.transactions_for_account(account_number).await
    }

    /// Every stored transaction, most recent first
    pub async fn list_all_transactions(&self) -> Result<Vec<Transaction>, TransferError> {
        self.ledger.all_transactions().await
    }
}

pub struct TransferEngineBuilder {
    directory: Arc<dyn AccountDirectory>,
    ledger: Arc<dyn Ledger>,
    ids: Option<Arc<dyn TransactionIdSource>>,
    clock: Option<Arc<dyn Clock>>,
    notifications: NotificationQueue,
}

impl TransferEngineBuilder {
    pub fn with_id_source(mut self, ids: Arc<dyn TransactionIdSource>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_notifications(mut self, notifications: NotificationQueue) -> Self {
        self.notifications = notifications;
        self
    }

    pub fn build(self) -> TransferEngine {
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(PersistedDailySequence::new(DEFAULT_TRANSACTION_PREFIX)));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        info!(
            ledger = self.ledger.name(),
            sequence = ids.name(),
            notifications = self.notifications.is_enabled(),
            "Transfer engine ready"
        );

        TransferEngine {
            validation: ValidationPipeline::new(self.directory),
            executor: TransferExecutor::new(self.ledger.clone(), ids, clock, self.notifications),
            ledger: self.ledger,
        }
    }
}
