//! Transfer Engine - fund transfers for a retail bank simulator
//!
//! Validates transfer requests, moves balances between accounts atomically,
//! issues date-partitioned transaction ids and hands post-commit notices to a
//! best-effort delivery queue.
//!
//! # Modules
//!
//! - [`transfer`] - Validation pipeline, executor and the [`TransferEngine`] facade
//! - [`ledger`] - Units of work over balances and transaction records (PostgreSQL, in-memory)
//! - [`account`] - Account/customer/user models and directory lookups
//! - [`sequence`] - Prefixed and daily identifier sequences
//! - [`notification`] - Debit/credit notices and the delivery queue
//! - [`money`] - Fixed-point amount parsing and formatting
//! - [`config`] / [`logging`] / [`db`] - Process setup

// Core types - must be first!
pub mod core_types;

pub mod account;
pub mod clock;
pub mod config;
pub mod db;
pub mod ledger;
pub mod logging;
pub mod money;
pub mod notification;
pub mod sequence;
pub mod transfer;

// Convenient re-exports at crate root
pub use account::{Account, AccountDirectory, Customer, LinkedUser};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use core_types::{AccountId, CustomerId, UserId};
pub use ledger::{Ledger, LedgerTx, MemoryBank, PgLedger};
pub use notification::{NotificationDispatcher, NotificationQueue, TransferNotice};
pub use sequence::TransactionId;
pub use transfer::{
    Transaction, TransferEngine, TransferError, TransferReceipt, TransferRequest, TransferState,
    ValidatedTransfer, ValidationOutcome,
};
