//! Account/Customer directory
//!
//! Read-only lookups the validation pipeline runs against persisted state.
//! Every call is a fresh read; nothing is cached between requests.

use async_trait::async_trait;

use super::models::{Account, Customer, LinkedUser};
use crate::transfer::error::TransferError;

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Look up an account by its external account number
    async fn find_account_by_number(
        &self,
        account_number: &str,
    ) -> Result<Option<Account>, TransferError>;

    /// Look up the customer owning an account
    async fn find_customer(&self, customer_id: &str) -> Result<Option<Customer>, TransferError>;

    /// Login user linked to the customer, if one was ever created
    async fn find_linked_user(
        &self,
        customer: &Customer,
    ) -> Result<Option<LinkedUser>, TransferError>;
}
