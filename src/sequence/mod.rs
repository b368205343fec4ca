//! Identifier sequences
//!
//! - Prefixed running ids for accounts, customers and users
//! - Date-partitioned transaction ids

pub mod daily;
pub mod error;
pub mod prefixed;

pub use daily::{
    InProcessDailySequence, PersistedDailySequence, TransactionId, TransactionIdSource,
};
pub use error::SequenceError;
pub use prefixed::{IdKind, IdentifierSet, PrefixedSequence, SequenceSeed};

use std::sync::Arc;

use crate::config::{SequenceConfig, SequenceMode};

/// Build the transaction id allocator selected by configuration
pub fn transaction_id_source(config: &SequenceConfig) -> Arc<dyn TransactionIdSource> {
    match config.transaction_mode {
        SequenceMode::Persisted => Arc::new(PersistedDailySequence::new(
            config.transaction_prefix.clone(),
        )),
        SequenceMode::InProcess => Arc::new(InProcessDailySequence::new(
            config.transaction_prefix.clone(),
        )),
    }
}
