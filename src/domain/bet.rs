//! Bet record and result-transition rules.

use crate::domain::{BetId, Money, TimeMs, UserId};
use serde::{Deserialize, Serialize};

/// Outcome state of a bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetResult {
    Pending,
    Won,
    Lost,
}

impl BetResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetResult::Pending => "pending",
            BetResult::Won => "won",
            BetResult::Lost => "lost",
        }
    }

    /// Parse from the wire/storage form. Unknown values return None.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BetResult::Pending),
            "won" => Some(BetResult::Won),
            "lost" => Some(BetResult::Lost),
            _ => None,
        }
    }
}

impl std::fmt::Display for BetResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single wager record.
///
/// The stake is deducted from the owner's balance exactly once, at creation;
/// result transitions afterwards only move the payout (see
/// [`settlement_delta`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    pub id: BetId,
    pub user_id: UserId,
    /// Free-form sport label, e.g. "Football".
    pub sport: String,
    /// Free-form bet category label, e.g. "Match Winner".
    pub category: String,
    /// Stake, always > 0.
    pub amount: Money,
    /// Decimal multiplier, always >= 1.0; payout on win = amount * odds.
    pub odds: Money,
    pub result: BetResult,
    pub description: Option<String>,
    pub created_at: TimeMs,
    pub updated_at: TimeMs,
}

impl Bet {
    /// Payout credited when this bet is won.
    pub fn payout(&self) -> Money {
        self.amount * self.odds
    }
}

/// Balance delta for a result transition.
///
/// Winnings are credited on entering `won` from a non-won state and debited
/// on leaving `won` for a non-won state; every other transition is neutral.
/// Repeating a transition never double-applies, and correcting a result
/// undoes exactly what the earlier transition applied.
pub fn settlement_delta(old: BetResult, new: BetResult, payout: Money) -> Money {
    match (old == BetResult::Won, new == BetResult::Won) {
        (false, true) => payout,
        (true, false) => -payout,
        _ => Money::zero(),
    }
}
