//! Date-partitioned transaction identifiers
//!
//! Format: `<prefix><YYYYMMDD><ordinal>`, ordinal zero-padded to 3 digits and
//! restarting at 1 every calendar day, e.g. `TXN_20240115007`.
//!
//! Two allocators produce this format:
//! - [`PersistedDailySequence`] bumps a `(prefix, date)` counter row inside
//!   the caller's unit of work. An aborted transfer rolls the bump back, and
//!   uniqueness holds across processes sharing the database.
//! - [`InProcessDailySequence`] keeps the counter in memory and reseeds it
//!   from the highest stored ordinal whenever the date changes (including the
//!   first call after start). Single-process only; an aborted transfer
//!   leaves a gap.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::Mutex;
use tracing::info;

use super::error::SequenceError;
use crate::ledger::LedgerTx;
use crate::transfer::error::TransferError;

const DATE_FORMAT: &str = "%Y%m%d";
const DATE_LEN: usize = 8;
const ORDINAL_WIDTH: usize = 3;

/// Durable transaction identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn format(prefix: &str, date: NaiveDate, ordinal: u64) -> Self {
        Self(format!(
            "{}{}{:0width$}",
            prefix,
            date.format(DATE_FORMAT),
            ordinal,
            width = ORDINAL_WIDTH
        ))
    }

    /// Wrap an id read back from storage
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Split into `(date, ordinal)`
    pub fn parse(&self, prefix: &str) -> Result<(NaiveDate, u64), SequenceError> {
        let malformed = || SequenceError::MalformedId(self.0.clone());
        let rest = self.0.strip_prefix(prefix).ok_or_else(malformed)?;
        if rest.len() < DATE_LEN + ORDINAL_WIDTH || !rest.chars().all(|c| c.is_ascii_digit()) {
            return Err(malformed());
        }
        let (date_part, ordinal_part) = rest.split_at(DATE_LEN);
        let date = NaiveDate::parse_from_str(date_part, DATE_FORMAT).map_err(|_| malformed())?;
        let ordinal = ordinal_part.parse().map_err(|_| malformed())?;
        Ok((date, ordinal))
    }

    /// `<prefix><YYYYMMDD>` shared by every id issued on `date`
    pub fn day_prefix(prefix: &str, date: NaiveDate) -> String {
        format!("{}{}", prefix, date.format(DATE_FORMAT))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Allocates the next transaction id for `date` within an open unit of work
#[async_trait]
pub trait TransactionIdSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn prefix(&self) -> &str;

    async fn next_id(
        &self,
        tx: &mut dyn LedgerTx,
        date: NaiveDate,
    ) -> Result<TransactionId, TransferError>;
}

// ============================================================================
// Persisted counter row
// ============================================================================

#[derive(Debug, Clone)]
pub struct PersistedDailySequence {
    prefix: String,
}

impl PersistedDailySequence {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl TransactionIdSource for PersistedDailySequence {
    fn name(&self) -> &'static str {
        "persisted"
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    async fn next_id(
        &self,
        tx: &mut dyn LedgerTx,
        date: NaiveDate,
    ) -> Result<TransactionId, TransferError> {
        let ordinal = tx.next_daily_ordinal(&self.prefix, date).await?;
        Ok(TransactionId::format(&self.prefix, date, ordinal))
    }
}

// ============================================================================
// In-process counter with lazy rollover
// ============================================================================

#[derive(Debug, Default)]
struct DayCounter {
    date: Option<NaiveDate>,
    next: u64,
}

#[derive(Debug)]
pub struct InProcessDailySequence {
    prefix: String,
    // Held across the reseed query so only one task observes the new day
    state: Mutex<DayCounter>,
}

impl InProcessDailySequence {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            state: Mutex::new(DayCounter::default()),
        }
    }
}

#[async_trait]
impl TransactionIdSource for InProcessDailySequence {
    fn name(&self) -> &'static str {
        "in_process"
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    async fn next_id(
        &self,
        tx: &mut dyn LedgerTx,
        date: NaiveDate,
    ) -> Result<TransactionId, TransferError> {
        let mut counter = self.state.lock().await;

        if counter.date != Some(date) {
            let max = tx.max_daily_ordinal(&self.prefix, date).await?;
            info!(
                date = %date,
                previous_date = ?counter.date,
                max_ordinal = max,
                next = max + 1,
                "Transaction sequence rolled over"
            );
            counter.date = Some(date);
            counter.next = max + 1;
        }

        let ordinal = counter.next;
        counter.next += 1;
        Ok(TransactionId::format(&self.prefix, date, ordinal))
    }
}
