//! Repository layer for account/customer/user lookups

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::directory::AccountDirectory;
use super::models::{Account, Customer, LinkedUser};
use crate::db::like_prefix;
use crate::sequence::{IdKind, SequenceError, SequenceSeed};
use crate::transfer::error::TransferError;

/// PostgreSQL-backed directory
#[derive(Clone)]
pub struct PgAccountDirectory {
    pool: PgPool,
}

impl PgAccountDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_account(r: &sqlx::postgres::PgRow) -> Account {
        Account {
            account_id: r.get("account_id"),
            customer_id: r.get("customer_id"),
            account_number: r.get("account_number"),
            ifsc_code: r.get("ifsc_code"),
            bank_name: r.get("bank_name"),
            phone_number_linked: r.get("phone_number_linked"),
            balance: r.get("balance"),
            status: r.get("status"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }
    }
}

#[async_trait]
impl AccountDirectory for PgAccountDirectory {
    async fn find_account_by_number(
        &self,
        account_number: &str,
    ) -> Result<Option<Account>, TransferError> {
        let row = sqlx::query(
            r#"SELECT account_id, customer_id, account_number, ifsc_code, bank_name,
                      phone_number_linked, balance, status, created_at, updated_at
               FROM accounts_tb WHERE account_number = $1"#,
        )
        .bind(account_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::row_to_account))
    }

    async fn find_customer(&self, customer_id: &str) -> Result<Option<Customer>, TransferError> {
        let row = sqlx::query(
            r#"SELECT customer_id, name, email, customer_pin
               FROM customers_tb WHERE customer_id = $1"#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Customer {
            customer_id: r.get("customer_id"),
            name: r.get("name"),
            email: r.get("email"),
            customer_pin: r.get("customer_pin"),
        }))
    }

    async fn find_linked_user(
        &self,
        customer: &Customer,
    ) -> Result<Option<LinkedUser>, TransferError> {
        let row = sqlx::query(r#"SELECT user_id, email, active FROM users_tb WHERE email = $1"#)
            .bind(&customer.email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| LinkedUser {
            user_id: r.get("user_id"),
            email: r.get("email"),
            active: r.get("active"),
        }))
    }
}

#[async_trait]
impl SequenceSeed for PgAccountDirectory {
    async fn max_suffix(&self, kind: IdKind, prefix: &str) -> Result<u64, SequenceError> {
        let (table, column) = match kind {
            IdKind::Account => ("accounts_tb", "account_id"),
            IdKind::Customer => ("customers_tb", "customer_id"),
            IdKind::User => ("users_tb", "user_id"),
        };

        // Only ids whose suffix is purely numeric count toward the seed
        let sql = format!(
            "SELECT COALESCE(MAX(CAST(SUBSTRING({column} FROM $2) AS BIGINT)), 0) AS max_id
             FROM {table}
             WHERE {column} LIKE $1
               AND SUBSTRING({column} FROM $2) ~ '^[0-9]+$'"
        );
        let max_id: i64 = sqlx::query_scalar(&sql)
            .bind(like_prefix(prefix))
            .bind(prefix.len() as i32 + 1)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SequenceError::Storage(e.to_string()))?;

        Ok(max_id.max(0) as u64)
    }
}
