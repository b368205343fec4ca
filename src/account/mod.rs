//! Account directory module
//!
//! Read-side view of accounts, customers and login users, plus the
//! validated field types customers type into a transfer form.

pub mod directory;
pub mod models;
pub mod repository;
pub mod validation;

// Re-export commonly used types
pub use directory::AccountDirectory;
pub use models::{Account, Customer, LinkedUser};
pub use repository::PgAccountDirectory;
pub use validation::{AccountFieldError, AccountNumber, Pin};

// Re-export Database from top-level db module
pub use crate::db::Database;
