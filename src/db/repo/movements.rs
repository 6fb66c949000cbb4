//! Balance movement history queries.
//!
//! Movements are append-only; they are written by the ledger engine and only
//! ever read back here.

use super::{parse_money, Repository};
use crate::domain::{BalanceMovement, MovementType, TimeMs, UserId};
use sqlx::Row;
use tracing::warn;

impl Repository {
    /// The `limit` most recent balance movements for a user, newest first.
    pub async fn list_movements(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<BalanceMovement>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, type, amount, previous_balance, new_balance, description, created_at
            FROM balance_movements
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id.as_i64())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let movements = rows
            .iter()
            .map(|row| {
                let type_str: String = row.get("type");
                let movement_type = MovementType::parse(&type_str).unwrap_or_else(|| {
                    warn!(value = %type_str, "Unknown movement type in storage, treating as deposit");
                    MovementType::Deposit
                });

                BalanceMovement {
                    id: row.get("id"),
                    user_id: UserId::new(row.get("user_id")),
                    movement_type,
                    amount: parse_money("balance_movements.amount", &row.get::<String, _>("amount")),
                    previous_balance: parse_money(
                        "balance_movements.previous_balance",
                        &row.get::<String, _>("previous_balance"),
                    ),
                    new_balance: parse_money(
                        "balance_movements.new_balance",
                        &row.get::<String, _>("new_balance"),
                    ),
                    description: row.get("description"),
                    created_at: TimeMs::new(row.get("created_at")),
                }
            })
            .collect();

        Ok(movements)
    }
}
