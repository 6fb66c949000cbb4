//! Balance movement audit trail entries.

use crate::domain::{Money, TimeMs, UserId};
use serde::{Deserialize, Serialize};

/// Direction of an explicit funds operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Deposit,
    Withdrawal,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Deposit => "deposit",
            MovementType::Withdrawal => "withdrawal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(MovementType::Deposit),
            "withdrawal" => Some(MovementType::Withdrawal),
            _ => None,
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Requested funds operation on the wire (`add` / `withdraw`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceOperation {
    Add,
    Withdraw,
}

impl BalanceOperation {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add" => Some(BalanceOperation::Add),
            "withdraw" => Some(BalanceOperation::Withdraw),
            _ => None,
        }
    }
}

/// One append-only audit row for an explicit deposit or withdrawal.
///
/// Written in the same transaction as the balance update it records;
/// `new_balance` always equals `previous_balance` plus (deposit) or minus
/// (withdrawal) `amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceMovement {
    pub id: i64,
    pub user_id: UserId,
    pub movement_type: MovementType,
    pub amount: Money,
    pub previous_balance: Money,
    pub new_balance: Money,
    pub description: String,
    pub created_at: TimeMs,
}
