//! Prefixed running identifiers (`ACC_17`, `CUST_4`, `USER_9`)
//!
//! Seeded once at startup from the highest suffix already stored, then
//! advanced with a lock-free atomic increment. Values never repeat within a
//! process; two processes sharing one database can still collide.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use super::error::SequenceError;
use crate::config::SequenceConfig;

/// Which table an identifier family lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Account,
    Customer,
    User,
}

impl IdKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdKind::Account => "account",
            IdKind::Customer => "customer",
            IdKind::User => "user",
        }
    }
}

/// Store query used to resume a sequence after restart
#[async_trait]
pub trait SequenceSeed: Send + Sync {
    /// Highest numeric suffix among stored ids with this prefix, 0 when none
    async fn max_suffix(&self, kind: IdKind, prefix: &str) -> Result<u64, SequenceError>;
}

#[derive(Debug)]
pub struct PrefixedSequence {
    kind: IdKind,
    prefix: String,
    next: AtomicU64,
}

impl PrefixedSequence {
    pub fn starting_at(kind: IdKind, prefix: impl Into<String>, next: u64) -> Self {
        Self {
            kind,
            prefix: prefix.into(),
            next: AtomicU64::new(next.max(1)),
        }
    }

    /// Resume from max stored suffix + 1
    pub async fn seeded(
        kind: IdKind,
        prefix: impl Into<String>,
        seed: &dyn SequenceSeed,
    ) -> Result<Self, SequenceError> {
        let prefix = prefix.into();
        let max = seed.max_suffix(kind, &prefix).await?;
        info!(
            kind = kind.as_str(),
            prefix = %prefix,
            max_suffix = max,
            next = max + 1,
            "Identifier sequence seeded from store"
        );
        Ok(Self::starting_at(kind, prefix, max + 1))
    }

    pub fn kind(&self) -> IdKind {
        self.kind
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Issue the next identifier. Never blocks.
    pub fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, n)
    }

    /// Value the next call to `next_id` will use
    pub fn peek_next(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }

    /// Numeric suffix of an id in this family
    pub fn parse_suffix(&self, id: &str) -> Result<u64, SequenceError> {
        id.strip_prefix(self.prefix.as_str())
            .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| SequenceError::MalformedId(id.to_string()))
    }
}

/// Account, customer and user sequences for one process
#[derive(Debug)]
pub struct IdentifierSet {
    pub accounts: PrefixedSequence,
    pub customers: PrefixedSequence,
    pub users: PrefixedSequence,
}

impl IdentifierSet {
    pub async fn bootstrap(
        config: &SequenceConfig,
        seed: &dyn SequenceSeed,
    ) -> Result<Self, SequenceError> {
        Ok(Self {
            accounts: PrefixedSequence::seeded(IdKind::Account, &*config.account_prefix, seed)
                .await?,
            customers: PrefixedSequence::seeded(IdKind::Customer, &*config.customer_prefix, seed)
                .await?,
            users: PrefixedSequence::seeded(IdKind::User, &*config.user_prefix, seed).await?,
        })
    }
}
