//! Bet read queries.

use super::{parse_money, Repository};
use crate::domain::{Bet, BetId, BetResult, TimeMs, UserId};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::warn;

/// Map a `bets` row into a [`Bet`].
///
/// A result value outside the CHECK-constrained set is treated as pending
/// after a warning, mirroring the decimal-parse fallback.
pub(crate) fn bet_from_row(row: &SqliteRow) -> Bet {
    let result_str: String = row.get("result");
    let result = BetResult::parse(&result_str).unwrap_or_else(|| {
        warn!(value = %result_str, "Unknown bet result in storage, treating as pending");
        BetResult::Pending
    });

    Bet {
        id: BetId::new(row.get("id")),
        user_id: UserId::new(row.get("user_id")),
        sport: row.get("sport"),
        category: row.get("category"),
        amount: parse_money("bets.amount", &row.get::<String, _>("amount")),
        odds: parse_money("bets.odds", &row.get::<String, _>("odds")),
        result,
        description: row.get("description"),
        created_at: TimeMs::new(row.get("created_at")),
        updated_at: TimeMs::new(row.get("updated_at")),
    }
}

impl Repository {
    /// All bets for a user, newest first.
    pub async fn list_bets(&self, user_id: UserId) -> Result<Vec<Bet>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, sport, category, amount, odds, result, description, created_at, updated_at
            FROM bets
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(bet_from_row).collect())
    }

    /// The `limit` most recently created bets for a user, newest first.
    pub async fn list_recent_bets(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<Bet>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, sport, category, amount, odds, result, description, created_at, updated_at
            FROM bets
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id.as_i64())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(bet_from_row).collect())
    }
}
