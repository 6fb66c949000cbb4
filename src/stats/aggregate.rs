//! Read-side derivation of performance metrics.
//!
//! Everything is recomputed from the stored bet rows on each request; no
//! cached or incrementally maintained counters exist, so reads can never go
//! stale relative to the bet table. Sums run in Rust on [`Money`] values
//! rather than through SQLite aggregates, which would coerce the TEXT-stored
//! decimals to REAL and lose precision.

use crate::domain::{Bet, BetResult, Money};
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregate performance figures over a set of bets.
///
/// `net_profit` counts only won-bet profit (`amount * odds - amount`); lost
/// stakes are deliberately not subtracted. `win_rate` is over settled bets
/// only, `roi` is net profit over total staked. Percentages and currency are
/// rounded half-up to 2 decimals; empty denominators yield 0, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BetMetrics {
    pub total_bets: i64,
    pub won_bets: i64,
    pub lost_bets: i64,
    pub pending_bets: i64,
    pub total_amount: Money,
    pub total_winnings: Money,
    pub net_profit: Money,
    pub avg_odds: Money,
    pub win_rate: Money,
    pub roi: Money,
}

/// Compute the full metric set over one user's bets (or one group of them).
pub fn compute_metrics<'a, I>(bets: I) -> BetMetrics
where
    I: IntoIterator<Item = &'a Bet>,
{
    let mut total_bets = 0i64;
    let mut won_bets = 0i64;
    let mut lost_bets = 0i64;
    let mut pending_bets = 0i64;
    let mut total_amount = Money::zero();
    let mut total_winnings = Money::zero();
    let mut net_profit = Money::zero();
    let mut odds_sum = Money::zero();

    for bet in bets {
        total_bets += 1;
        total_amount = total_amount + bet.amount;
        odds_sum = odds_sum + bet.odds;
        match bet.result {
            BetResult::Won => {
                won_bets += 1;
                let payout = bet.payout();
                total_winnings = total_winnings + payout;
                net_profit = net_profit + payout - bet.amount;
            }
            BetResult::Lost => lost_bets += 1,
            BetResult::Pending => pending_bets += 1,
        }
    }

    let settled = won_bets + lost_bets;
    let avg_odds = if total_bets > 0 {
        (odds_sum / Money::from_i64(total_bets)).round_2()
    } else {
        Money::zero()
    };
    let win_rate = if settled > 0 {
        (Money::from_i64(won_bets) / Money::from_i64(settled) * Money::hundred()).round_2()
    } else {
        Money::zero()
    };
    let roi = if total_amount.is_positive() {
        (net_profit / total_amount * Money::hundred()).round_2()
    } else {
        Money::zero()
    };

    BetMetrics {
        total_bets,
        won_bets,
        lost_bets,
        pending_bets,
        total_amount: total_amount.round_2(),
        total_winnings: total_winnings.round_2(),
        net_profit: net_profit.round_2(),
        avg_odds,
        win_rate,
        roi,
    }
}

/// Per-sport metrics, ordered by descending bet count (name ascending on ties).
pub fn group_by_sport(bets: &[Bet]) -> Vec<(String, BetMetrics)> {
    group_metrics(bets, |bet| &bet.sport)
}

/// Per-category metrics, ordered by descending bet count (name ascending on ties).
pub fn group_by_category(bets: &[Bet]) -> Vec<(String, BetMetrics)> {
    group_metrics(bets, |bet| &bet.category)
}

fn group_metrics<F>(bets: &[Bet], key: F) -> Vec<(String, BetMetrics)>
where
    F: Fn(&Bet) -> &str,
{
    // Group keys are user-supplied free text; BTreeMap keeps ties deterministic.
    let mut groups: BTreeMap<&str, Vec<&Bet>> = BTreeMap::new();
    for bet in bets {
        groups.entry(key(bet)).or_default().push(bet);
    }

    let mut rows: Vec<(String, BetMetrics)> = groups
        .into_iter()
        .map(|(name, group)| (name.to_string(), compute_metrics(group.iter().copied())))
        .collect();
    rows.sort_by(|a, b| b.1.total_bets.cmp(&a.1.total_bets).then(a.0.cmp(&b.0)));
    rows
}
