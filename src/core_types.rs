//! Core types used throughout the engine
//!
//! Identifiers in this system are human-readable strings (`ACC_12`,
//! `CUST_3`, `TXN_20240115001`), so the aliases below exist to give them
//! semantic meaning at call sites.

/// Internal account identifier (`ACC_<n>`).
///
/// # Constraints:
/// - **Opaque**: system-generated, never typed by customers
/// - **Immutable**: assigned once by onboarding
pub type AccountId = String;

/// Owning customer identifier (`CUST_<n>`).
pub type CustomerId = String;

/// Login user identifier (`USER_<n>`).
pub type UserId = String;

/// Account status value that allows sending and receiving funds.
pub const STATUS_ACTIVE: &str = "ACTIVE";

/// Returns true when a stored status string means the account may move funds.
///
/// Stored statuses are free text; comparison ignores case and padding.
#[inline]
pub fn is_active_status(status: &str) -> bool {
    status.trim().eq_ignore_ascii_case(STATUS_ACTIVE)
}
