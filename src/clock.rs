//! Wall-clock abstraction
//!
//! Transaction ids are partitioned by calendar date, so the day rollover has
//! to be observable in tests without waiting for midnight.

use chrono::{DateTime, Local, NaiveDate, Utc};
use std::sync::Mutex;

/// Source of "now" for id generation and record timestamps.
pub trait Clock: Send + Sync {
    /// Current instant, used for `created_at`.
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar date used to partition transaction ids.
    fn today(&self) -> NaiveDate;
}

/// Real clock. Dates follow the server's local calendar.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Manually driven clock for tests and replay tools.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Start the clock at noon UTC on the given date.
    pub fn at_date(date: NaiveDate) -> Self {
        let noon = date
            .and_hms_opt(12, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now);
        Self::new(noon)
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    // Manual clocks partition by UTC date so tests are timezone independent.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}
