//! Ledger - balances and transaction records under one unit of work
//!
//! A [`LedgerTx`] is a single all-or-nothing scope: row locks taken with
//! [`LedgerTx::lock_account`] are held until `commit` or `rollback`, and no
//! write becomes visible to other units of work before `commit`.
//!
//! Backends:
//! - [`postgres::PgLedger`]: `SELECT ... FOR UPDATE` inside a sqlx transaction
//! - [`memory::MemoryBank`]: single-writer in-memory store for tests and demos

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::core_types::{AccountId, CustomerId, is_active_status};
use crate::transfer::error::TransferError;
use crate::transfer::types::Transaction;

pub use memory::{FaultPoint, MemoryBank};
pub use postgres::PgLedger;

/// Account row as seen under its row lock
#[derive(Debug, Clone, PartialEq)]
pub struct LockedAccount {
    pub account_id: AccountId,
    pub customer_id: CustomerId,
    pub account_number: String,
    pub balance: Decimal,
    pub status: String,
}

impl LockedAccount {
    pub fn is_active(&self) -> bool {
        is_active_status(&self.status)
    }
}

#[async_trait]
pub trait Ledger: Send + Sync {
    fn name(&self) -> &'static str;

    /// Open a unit of work
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, TransferError>;

    /// Transactions where `account_number` is sender or receiver, most recent first
    async fn transactions_for_account(
        &self,
        account_number: &str,
    ) -> Result<Vec<Transaction>, TransferError>;

    /// Every stored transaction, most recent first
    async fn all_transactions(&self) -> Result<Vec<Transaction>, TransferError>;
}

#[async_trait]
pub trait LedgerTx: Send {
    /// Lock the account row until the unit of work ends
    async fn lock_account(
        &mut self,
        account_number: &str,
    ) -> Result<Option<LockedAccount>, TransferError>;

    /// Subtract `amount` only if the balance covers it.
    /// Returns `false` (and changes nothing) when it does not.
    async fn debit_if_sufficient(
        &mut self,
        account_id: &str,
        amount: Decimal,
    ) -> Result<bool, TransferError>;

    async fn credit(&mut self, account_id: &str, amount: Decimal) -> Result<(), TransferError>;

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), TransferError>;

    /// Bump and return the `(prefix, date)` counter. Rolled back with the unit of work.
    async fn next_daily_ordinal(
        &mut self,
        prefix: &str,
        date: NaiveDate,
    ) -> Result<u64, TransferError>;

    /// Highest ordinal among stored transaction ids for `date`, 0 when none
    async fn max_daily_ordinal(
        &mut self,
        prefix: &str,
        date: NaiveDate,
    ) -> Result<u64, TransferError>;

    async fn commit(self: Box<Self>) -> Result<(), TransferError>;

    async fn rollback(self: Box<Self>) -> Result<(), TransferError>;
}
