//! In-memory bank
//!
//! Implements the ledger, the account directory and the sequence seed over a
//! single `BankState`. A unit of work holds the state lock from `begin` until
//! it ends and mutates a private copy, so units of work are fully serialized
//! and a rollback (or a dropped unit of work) leaves no trace.
//!
//! Faults can be armed per operation to exercise rollback paths.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use super::{Ledger, LedgerTx, LockedAccount};
use crate::account::directory::AccountDirectory;
use crate::account::models::{Account, Customer, LinkedUser};
use crate::core_types::STATUS_ACTIVE;
use crate::sequence::{IdKind, SequenceError, SequenceSeed, TransactionId};
use crate::transfer::error::TransferError;
use crate::transfer::types::{Transaction, TransactionType, sort_most_recent_first};

/// Operation a fault can be armed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    Begin,
    LockAccount,
    Debit,
    Credit,
    InsertTransaction,
    NextOrdinal,
    Commit,
}

#[derive(Debug, Clone, Default)]
struct BankState {
    /// Keyed by account number
    accounts: HashMap<String, Account>,
    customers: HashMap<String, Customer>,
    /// Keyed by email
    users: HashMap<String, LinkedUser>,
    transactions: Vec<Transaction>,
    sequences: HashMap<(String, NaiveDate), u64>,
}

impl BankState {
    fn account_by_id_mut(&mut self, account_id: &str) -> Option<&mut Account> {
        self.accounts
            .values_mut()
            .find(|a| a.account_id == account_id)
    }

    fn max_daily_ordinal(&self, prefix: &str, date: NaiveDate) -> u64 {
        self.transactions
            .iter()
            .filter_map(|t| t.transaction_id.parse(prefix).ok())
            .filter(|(d, _)| *d == date)
            .map(|(_, ordinal)| ordinal)
            .max()
            .unwrap_or(0)
    }
}

#[derive(Clone, Default)]
pub struct MemoryBank {
    state: Arc<Mutex<BankState>>,
    faults: Arc<std::sync::Mutex<HashSet<FaultPoint>>>,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call at `point` fail with a system failure
    pub fn fail_next(&self, point: FaultPoint) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(point);
    }

    pub async fn add_customer(&self, customer: Customer) {
        let mut state = self.state.lock().await;
        state.customers.insert(customer.customer_id.clone(), customer);
    }

    pub async fn add_user(&self, user: LinkedUser) {
        let mut state = self.state.lock().await;
        state.users.insert(user.email.clone(), user);
    }

    pub async fn add_account(&self, account: Account) {
        let mut state = self.state.lock().await;
        state.accounts.insert(account.account_number.clone(), account);
    }

    /// Register an active account with default bank details
    pub async fn open_account(
        &self,
        customer_id: &str,
        account_number: &str,
        balance: Decimal,
    ) -> Account {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let account = Account {
            account_id: format!("ACC_{}", state.accounts.len() + 1),
            customer_id: customer_id.to_string(),
            account_number: account_number.to_string(),
            ifsc_code: "SIMB0000001".to_string(),
            bank_name: "Simulator Bank".to_string(),
            phone_number_linked: "9000000000".to_string(),
            balance,
            status: STATUS_ACTIVE.to_string(),
            created_at: now,
            updated_at: now,
        };
        state
            .accounts
            .insert(account.account_number.clone(), account.clone());
        account
    }

    pub async fn set_account_status(&self, account_number: &str, status: &str) {
        let mut state = self.state.lock().await;
        if let Some(account) = state.accounts.get_mut(account_number) {
            account.status = status.to_string();
        }
    }

    pub async fn set_user_active(&self, email: &str, active: bool) {
        let mut state = self.state.lock().await;
        if let Some(user) = state.users.get_mut(email) {
            user.active = active;
        }
    }

    pub async fn balance(&self, account_number: &str) -> Option<Decimal> {
        let state = self.state.lock().await;
        state.accounts.get(account_number).map(|a| a.balance)
    }

    pub async fn transaction_count(&self) -> usize {
        self.state.lock().await.transactions.len()
    }

    /// Store a bare id as if an earlier process had issued it
    pub async fn insert_raw_transaction_id(&self, raw: &str) {
        let mut state = self.state.lock().await;
        state.transactions.push(Transaction {
            transaction_id: TransactionId::from_stored(raw),
            account_id: String::new(),
            sender_account_number: String::new(),
            receiver_account_number: String::new(),
            amount: Decimal::ZERO,
            transaction_type: TransactionType::Online,
            description: None,
            created_at: DateTime::<Utc>::default(),
        });
    }

    pub async fn delete_transaction(&self, transaction_id: &TransactionId) -> bool {
        let mut state = self.state.lock().await;
        let before = state.transactions.len();
        state
            .transactions
            .retain(|t| &t.transaction_id != transaction_id);
        state.transactions.len() != before
    }
}

fn take_fault(
    faults: &std::sync::Mutex<HashSet<FaultPoint>>,
    point: FaultPoint,
) -> Result<(), TransferError> {
    let armed = faults
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&point);
    if armed {
        debug!(?point, "Injected fault fired");
        return Err(TransferError::SystemFailure(format!(
            "injected fault at {:?}",
            point
        )));
    }
    Ok(())
}

#[async_trait]
impl Ledger for MemoryBank {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTx>, TransferError> {
        take_fault(&self.faults, FaultPoint::Begin)?;
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            working,
            faults: self.faults.clone(),
        }))
    }

    async fn transactions_for_account(
        &self,
        account_number: &str,
    ) -> Result<Vec<Transaction>, TransferError> {
        let state = self.state.lock().await;
        let mut found: Vec<Transaction> = state
            .transactions
            .iter()
            .filter(|t| {
                t.sender_account_number == account_number
                    || t.receiver_account_number == account_number
            })
            .cloned()
            .collect();
        sort_most_recent_first(&mut found);
        Ok(found)
    }

    async fn all_transactions(&self) -> Result<Vec<Transaction>, TransferError> {
        let mut all = self.state.lock().await.transactions.clone();
        sort_most_recent_first(&mut all);
        Ok(all)
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<BankState>,
    working: BankState,
    faults: Arc<std::sync::Mutex<HashSet<FaultPoint>>>,
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn lock_account(
        &mut self,
        account_number: &str,
    ) -> Result<Option<LockedAccount>, TransferError> {
        take_fault(&self.faults, FaultPoint::LockAccount)?;
        Ok(self
            .working
            .accounts
            .get(account_number)
            .map(|a| LockedAccount {
                account_id: a.account_id.clone(),
                customer_id: a.customer_id.clone(),
                account_number: a.account_number.clone(),
                balance: a.balance,
                status: a.status.clone(),
            }))
    }

    async fn debit_if_sufficient(
        &mut self,
        account_id: &str,
        amount: Decimal,
    ) -> Result<bool, TransferError> {
        take_fault(&self.faults, FaultPoint::Debit)?;
        match self.working.account_by_id_mut(account_id) {
            Some(account) if account.balance >= amount => {
                account.balance -= amount;
                account.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn credit(&mut self, account_id: &str, amount: Decimal) -> Result<(), TransferError> {
        take_fault(&self.faults, FaultPoint::Credit)?;
        let account = self.working.account_by_id_mut(account_id).ok_or_else(|| {
            TransferError::SystemFailure(format!("credit target {} missing", account_id))
        })?;
        account.balance += amount;
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), TransferError> {
        take_fault(&self.faults, FaultPoint::InsertTransaction)?;
        if self
            .working
            .transactions
            .iter()
            .any(|t| t.transaction_id == transaction.transaction_id)
        {
            return Err(TransferError::SystemFailure(format!(
                "duplicate transaction id {}",
                transaction.transaction_id
            )));
        }
        self.working.transactions.push(transaction.clone());
        Ok(())
    }

    async fn next_daily_ordinal(
        &mut self,
        prefix: &str,
        date: NaiveDate,
    ) -> Result<u64, TransferError> {
        take_fault(&self.faults, FaultPoint::NextOrdinal)?;
        let stored_max = self.working.max_daily_ordinal(prefix, date);
        let counter = self
            .working
            .sequences
            .entry((prefix.to_string(), date))
            .or_insert(0);
        *counter = (*counter + 1).max(stored_max + 1);
        Ok(*counter)
    }

    async fn max_daily_ordinal(
        &mut self,
        prefix: &str,
        date: NaiveDate,
    ) -> Result<u64, TransferError> {
        Ok(self.working.max_daily_ordinal(prefix, date))
    }

    async fn commit(self: Box<Self>) -> Result<(), TransferError> {
        take_fault(&self.faults, FaultPoint::Commit)?;
        let MemoryTx {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), TransferError> {
        Ok(())
    }
}

#[async_trait]
impl AccountDirectory for MemoryBank {
    async fn find_account_by_number(
        &self,
        account_number: &str,
    ) -> Result<Option<Account>, TransferError> {
        Ok(self.state.lock().await.accounts.get(account_number).cloned())
    }

    async fn find_customer(&self, customer_id: &str) -> Result<Option<Customer>, TransferError> {
        Ok(self.state.lock().await.customers.get(customer_id).cloned())
    }

    async fn find_linked_user(
        &self,
        customer: &Customer,
    ) -> Result<Option<LinkedUser>, TransferError> {
        Ok(self.state.lock().await.users.get(&customer.email).cloned())
    }
}

#[async_trait]
impl SequenceSeed for MemoryBank {
    async fn max_suffix(&self, kind: IdKind, prefix: &str) -> Result<u64, SequenceError> {
        let state = self.state.lock().await;
        let ids: Vec<&str> = match kind {
            IdKind::Account => state.accounts.values().map(|a| a.account_id.as_str()).collect(),
            IdKind::Customer => state.customers.keys().map(String::as_str).collect(),
            IdKind::User => state.users.values().map(|u| u.user_id.as_str()).collect(),
        };
        Ok(ids
            .into_iter()
            .filter_map(|id| id.strip_prefix(prefix))
            .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
            .filter_map(|s| s.parse::<u64>().ok())
            .max()
            .unwrap_or(0))
    }
}
