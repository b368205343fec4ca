//! Fund transfers between customer accounts
//!
//! # Flow
//!
//! ```text
//! request → ValidationPipeline → TransferExecutor → commit → NotificationQueue
//!              (reads only)        (one unit of work)         (best effort)
//! ```
//!
//! # Invariants
//!
//! 1. **Conservation**: a committed transfer debits the sender and credits the
//!    receiver by the same amount, together with exactly one transaction row
//! 2. **No overdraft**: the debit is conditional on the locked balance
//! 3. **All or nothing**: any failure before commit leaves no trace
//! 4. **Notices never fail a transfer**: delivery happens after commit, off
//!    the caller's path

pub mod engine;
pub mod error;
pub mod executor;
pub mod state;
pub mod types;
pub mod validation;

mod integration_tests;

pub use engine::{TransferEngine, TransferEngineBuilder};
pub use error::TransferError;
pub use executor::TransferExecutor;
pub use state::TransferState;
pub use types::{
    RejectCode, Shortfall, Transaction, TransactionType, TransferReceipt, TransferRequest,
    ValidatedTransfer, ValidationOutcome,
};
pub use validation::ValidationPipeline;
