//! PostgreSQL ledger
//!
//! One sqlx transaction per unit of work. Account rows are locked with
//! `SELECT ... FOR UPDATE`; the debit is a conditional `UPDATE` so the
//! non-negative balance rule also holds at the statement level.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row};
use tracing::{debug, warn};

use super::{Ledger, LedgerTx, LockedAccount};
use crate::db::like_prefix;
use crate::sequence::TransactionId;
use crate::transfer::error::TransferError;
use crate::transfer::types::{Transaction, TransactionType};

const TRANSACTION_COLUMNS: &str = "transaction_id, account_id, sender_account_number, \
     receiver_account_number, amount, transaction_type, description, created_at";

#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_transaction(row: &PgRow) -> Result<Transaction, TransferError> {
        let raw_type: String = row.try_get("transaction_type")?;
        let transaction_type = raw_type.parse().unwrap_or_else(|_| {
            warn!(transaction_type = %raw_type, "Unknown stored transaction type");
            TransactionType::default()
        });

        Ok(Transaction {
            transaction_id: TransactionId::from_stored(row.try_get::<String, _>("transaction_id")?),
            account_id: row.try_get("account_id")?,
            sender_account_number: row.try_get("sender_account_number")?,
            receiver_account_number: row.try_get("receiver_account_number")?,
            amount: row.try_get("amount")?,
            transaction_type,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl Ledger for PgLedger {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTx>, TransferError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLedgerTx { tx }))
    }

    async fn transactions_for_account(
        &self,
        account_number: &str,
    ) -> Result<Vec<Transaction>, TransferError> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions_tb
             WHERE sender_account_number = $1 OR receiver_account_number = $1
             ORDER BY created_at DESC, transaction_id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(account_number)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    async fn all_transactions(&self) -> Result<Vec<Transaction>, TransferError> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions_tb
             ORDER BY created_at DESC, transaction_id DESC"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(Self::row_to_transaction).collect()
    }
}

pub struct PgLedgerTx {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn lock_account(
        &mut self,
        account_number: &str,
    ) -> Result<Option<LockedAccount>, TransferError> {
        let row = sqlx::query(
            r#"
            SELECT account_id, customer_id, account_number, balance, status
            FROM accounts_tb
            WHERE account_number = $1
            FOR UPDATE
            "#,
        )
        .bind(account_number)
        .fetch_optional(&mut *self.tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(LockedAccount {
            account_id: row.try_get("account_id")?,
            customer_id: row.try_get("customer_id")?,
            account_number: row.try_get("account_number")?,
            balance: row.try_get("balance")?,
            status: row.try_get("status")?,
        }))
    }

    async fn debit_if_sufficient(
        &mut self,
        account_id: &str,
        amount: Decimal,
    ) -> Result<bool, TransferError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts_tb
            SET balance = balance - $1, updated_at = NOW()
            WHERE account_id = $2 AND balance >= $1
            "#,
        )
        .bind(amount)
        .bind(account_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn credit(&mut self, account_id: &str, amount: Decimal) -> Result<(), TransferError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts_tb
            SET balance = balance + $1, updated_at = NOW()
            WHERE account_id = $2
            "#,
        )
        .bind(amount)
        .bind(account_id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() != 1 {
            return Err(TransferError::SystemFailure(format!(
                "credit affected {} rows for account {}",
                result.rows_affected(),
                account_id
            )));
        }
        Ok(())
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), TransferError> {
        sqlx::query(
            r#"
            INSERT INTO transactions_tb
                (transaction_id, account_id, sender_account_number, receiver_account_number,
                 amount, transaction_type, description, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(transaction.transaction_id.as_str())
        .bind(&transaction.account_id)
        .bind(&transaction.sender_account_number)
        .bind(&transaction.receiver_account_number)
        .bind(transaction.amount)
        .bind(transaction.transaction_type.as_str())
        .bind(&transaction.description)
        .bind(transaction.created_at)
        .execute(&mut *self.tx)
        .await?;

        debug!(transaction_id = %transaction.transaction_id, "Transaction row inserted");
        Ok(())
    }

    async fn next_daily_ordinal(
        &mut self,
        prefix: &str,
        date: NaiveDate,
    ) -> Result<u64, TransferError> {
        let bumped: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE id_sequences_tb
            SET last_value = last_value + 1
            WHERE prefix = $1 AND seq_date = $2
            RETURNING last_value
            "#,
        )
        .bind(prefix)
        .bind(date)
        .fetch_optional(&mut *self.tx)
        .await?;

        let value = match bumped {
            Some(value) => value,
            None => {
                // First id of the day: resume after any ids already stored.
                // A concurrent first insert lands on the conflict arm.
                let stored_max = self.max_daily_ordinal(prefix, date).await?;
                sqlx::query_scalar(
                    r#"
                    INSERT INTO id_sequences_tb (prefix, seq_date, last_value)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (prefix, seq_date)
                    DO UPDATE SET last_value = GREATEST(id_sequences_tb.last_value + 1, EXCLUDED.last_value)
                    RETURNING last_value
                    "#,
                )
                .bind(prefix)
                .bind(date)
                .bind(stored_max as i64 + 1)
                .fetch_one(&mut *self.tx)
                .await?
            }
        };

        u64::try_from(value).map_err(|_| {
            TransferError::SystemFailure(format!("negative sequence value {} for {}", value, prefix))
        })
    }

    async fn max_daily_ordinal(
        &mut self,
        prefix: &str,
        date: NaiveDate,
    ) -> Result<u64, TransferError> {
        let day_prefix = TransactionId::day_prefix(prefix, date);
        let max: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(MAX(CAST(SUBSTRING(transaction_id FROM $2) AS BIGINT)), 0)
            FROM transactions_tb
            WHERE transaction_id LIKE $1
              AND SUBSTRING(transaction_id FROM $2) ~ '^[0-9]+$'
            "#,
        )
        .bind(like_prefix(&day_prefix))
        .bind(day_prefix.len() as i32 + 1)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(max.max(0) as u64)
    }

    async fn commit(self: Box<Self>) -> Result<(), TransferError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), TransferError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
