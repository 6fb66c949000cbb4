//! User account record.

use crate::domain::{Money, TimeMs, UserId};
use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};

/// The fixed onboarding grant every account starts with: 1000.00.
pub fn initial_grant() -> Money {
    Money::new(RustDecimal::new(100_000, 2))
}

/// A registered account with its spendable balance.
///
/// `balance` is mutated only by the ledger engine; `initial_balance` is fixed
/// at registration and serves as the baseline for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub username: String,
    pub balance: Money,
    pub initial_balance: Money,
    pub created_at: TimeMs,
}
