//! Transactional rules keeping `users.balance` consistent with bet lifecycle
//! transitions and explicit deposits/withdrawals.
//!
//! Every operation runs as one database transaction: take the write lock on
//! the caller's account row, read current state, validate, write the
//! bet/movement row and the new balance together. Locking before any read
//! means concurrent mutations queue on SQLite's busy timeout rather than
//! reading a snapshot that goes stale mid-transaction. The balance write is
//! still a compare-and-swap against the observed value, retried a bounded
//! number of times, so two concurrent affordability checks can never both
//! pass against a stale balance.

use crate::db::repo::bet_from_row;
use crate::domain::{
    settlement_delta, BalanceMovement, BalanceOperation, Bet, BetId, BetResult, Money,
    MovementType, TimeMs, UserId,
};
use crate::error::{AppError, FieldError};
use sqlx::sqlite::SqlitePool;
use sqlx::{Row, Sqlite, Transaction};
use tracing::warn;

const MAX_ATTEMPTS: u32 = 3;

/// Fields for a bet about to be placed.
#[derive(Debug, Clone)]
pub struct NewBet {
    pub sport: String,
    pub category: String,
    pub amount: Money,
    pub odds: Money,
    pub result: BetResult,
    pub description: Option<String>,
}

/// Why a single transaction attempt did not commit.
enum TxFailure {
    /// Another writer touched the balance row; the operation should rerun.
    Conflict,
    /// A definitive business or storage failure; surface it.
    App(AppError),
}

impl From<sqlx::Error> for TxFailure {
    fn from(e: sqlx::Error) -> Self {
        if is_write_conflict(&e) {
            TxFailure::Conflict
        } else {
            TxFailure::App(AppError::from(e))
        }
    }
}

impl From<AppError> for TxFailure {
    fn from(e: AppError) -> Self {
        TxFailure::App(e)
    }
}

/// SQLITE_BUSY / SQLITE_LOCKED and their extended codes: the write lock was
/// contended or the read snapshot went stale. Retryable.
fn is_write_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => matches!(
            db.code().as_deref(),
            Some("5") | Some("6") | Some("261") | Some("517")
        ),
        _ => false,
    }
}

pub struct LedgerEngine {
    pool: SqlitePool,
}

impl LedgerEngine {
    pub fn new(pool: SqlitePool) -> Self {
        LedgerEngine { pool }
    }

    // =========================================================================
    // Bet lifecycle
    // =========================================================================

    /// Place a bet, deducting the stake from the owner's balance.
    ///
    /// The stake is deducted whatever the initial result is; a bet created
    /// already-`won` is NOT credited its winnings here — only a later
    /// transition into `won` pays out. That mirrors the historical contract
    /// and is covered by tests, so do not "fix" it in passing.
    ///
    /// # Errors
    /// `Validation` for out-of-range fields, `InsufficientBalance` when the
    /// stake exceeds the current balance.
    pub async fn create_bet(&self, user_id: UserId, new_bet: &NewBet) -> Result<Bet, AppError> {
        validate_new_bet(new_bet)?;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.try_create_bet(user_id, new_bet).await {
                Ok(bet) => return Ok(bet),
                Err(TxFailure::App(e)) => return Err(e),
                Err(TxFailure::Conflict) => {
                    warn!(user_id = user_id.as_i64(), attempt, "balance write conflict, retrying");
                }
            }
        }
        Err(conflict_exhausted(user_id))
    }

    /// Apply a result transition, moving the payout per the transition table.
    ///
    /// # Errors
    /// `NotFound` when the bet does not exist or is not owned by the caller.
    pub async fn update_bet_result(
        &self,
        user_id: UserId,
        bet_id: BetId,
        new_result: BetResult,
    ) -> Result<Bet, AppError> {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.try_update_bet_result(user_id, bet_id, new_result).await {
                Ok(bet) => return Ok(bet),
                Err(TxFailure::App(e)) => return Err(e),
                Err(TxFailure::Conflict) => {
                    warn!(user_id = user_id.as_i64(), attempt, "balance write conflict, retrying");
                }
            }
        }
        Err(conflict_exhausted(user_id))
    }

    /// Delete a bet, refunding the stake iff it is still pending.
    ///
    /// Settled bets are deleted without any balance adjustment: their stake
    /// deduction and settlement credit/debit stand permanently.
    pub async fn delete_bet(&self, user_id: UserId, bet_id: BetId) -> Result<(), AppError> {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.try_delete_bet(user_id, bet_id).await {
                Ok(()) => return Ok(()),
                Err(TxFailure::App(e)) => return Err(e),
                Err(TxFailure::Conflict) => {
                    warn!(user_id = user_id.as_i64(), attempt, "balance write conflict, retrying");
                }
            }
        }
        Err(conflict_exhausted(user_id))
    }

    // =========================================================================
    // Explicit funds operations
    // =========================================================================

    /// Deposit or withdraw funds, appending one audit movement in the same
    /// transaction as the balance update.
    ///
    /// # Errors
    /// `Validation` for a non-positive amount, `InsufficientFunds` when a
    /// withdrawal exceeds the current balance.
    pub async fn adjust_balance(
        &self,
        user_id: UserId,
        amount: Money,
        operation: BalanceOperation,
    ) -> Result<BalanceMovement, AppError> {
        if !amount.is_positive() {
            return Err(AppError::Validation(vec![FieldError::new(
                "amount",
                "Amount must be a positive number",
            )]));
        }

        for attempt in 1..=MAX_ATTEMPTS {
            match self.try_adjust_balance(user_id, amount, operation).await {
                Ok(movement) => return Ok(movement),
                Err(TxFailure::App(e)) => return Err(e),
                Err(TxFailure::Conflict) => {
                    warn!(user_id = user_id.as_i64(), attempt, "balance write conflict, retrying");
                }
            }
        }
        Err(conflict_exhausted(user_id))
    }

    // =========================================================================
    // Single transaction attempts
    // =========================================================================

    async fn try_create_bet(&self, user_id: UserId, new_bet: &NewBet) -> Result<Bet, TxFailure> {
        let mut tx = self.pool.begin().await.map_err(TxFailure::from)?;
        lock_user_row(&mut tx, user_id).await?;

        let balance = fetch_balance(&mut tx, user_id).await?;
        if new_bet.amount > balance {
            return Err(TxFailure::App(AppError::InsufficientBalance));
        }

        let now = TimeMs::now();
        let result = sqlx::query(
            r#"
            INSERT INTO bets (user_id, sport, category, amount, odds, result, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id.as_i64())
        .bind(&new_bet.sport)
        .bind(&new_bet.category)
        .bind(new_bet.amount.to_canonical_string())
        .bind(new_bet.odds.to_canonical_string())
        .bind(new_bet.result.as_str())
        .bind(new_bet.description.as_deref())
        .bind(now.as_i64())
        .bind(now.as_i64())
        .execute(&mut *tx)
        .await?;
        let bet_id = result.last_insert_rowid();

        cas_balance(&mut tx, user_id, balance, balance - new_bet.amount).await?;

        tx.commit().await?;

        Ok(Bet {
            id: BetId::new(bet_id),
            user_id,
            sport: new_bet.sport.clone(),
            category: new_bet.category.clone(),
            amount: new_bet.amount,
            odds: new_bet.odds,
            result: new_bet.result,
            description: new_bet.description.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn try_update_bet_result(
        &self,
        user_id: UserId,
        bet_id: BetId,
        new_result: BetResult,
    ) -> Result<Bet, TxFailure> {
        let mut tx = self.pool.begin().await.map_err(TxFailure::from)?;
        lock_user_row(&mut tx, user_id).await?;

        let bet = fetch_bet(&mut tx, user_id, bet_id).await?;
        let delta = settlement_delta(bet.result, new_result, bet.payout());

        let now = TimeMs::now();
        sqlx::query("UPDATE bets SET result = ?, updated_at = ? WHERE id = ?")
            .bind(new_result.as_str())
            .bind(now.as_i64())
            .bind(bet_id.as_i64())
            .execute(&mut *tx)
            .await?;

        if !delta.is_zero() {
            let balance = fetch_balance(&mut tx, user_id).await?;
            cas_balance(&mut tx, user_id, balance, balance + delta).await?;
        }

        tx.commit().await?;

        Ok(Bet {
            result: new_result,
            updated_at: now,
            ..bet
        })
    }

    async fn try_delete_bet(&self, user_id: UserId, bet_id: BetId) -> Result<(), TxFailure> {
        let mut tx = self.pool.begin().await.map_err(TxFailure::from)?;
        lock_user_row(&mut tx, user_id).await?;

        let bet = fetch_bet(&mut tx, user_id, bet_id).await?;

        // Only an unsettled stake comes back; settlement history stands.
        if bet.result == BetResult::Pending {
            let balance = fetch_balance(&mut tx, user_id).await?;
            cas_balance(&mut tx, user_id, balance, balance + bet.amount).await?;
        }

        sqlx::query("DELETE FROM bets WHERE id = ?")
            .bind(bet_id.as_i64())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn try_adjust_balance(
        &self,
        user_id: UserId,
        amount: Money,
        operation: BalanceOperation,
    ) -> Result<BalanceMovement, TxFailure> {
        let mut tx = self.pool.begin().await.map_err(TxFailure::from)?;
        lock_user_row(&mut tx, user_id).await?;

        let balance = fetch_balance(&mut tx, user_id).await?;

        let (movement_type, new_balance) = match operation {
            BalanceOperation::Add => (MovementType::Deposit, balance + amount),
            BalanceOperation::Withdraw => {
                if amount > balance {
                    return Err(TxFailure::App(AppError::InsufficientFunds));
                }
                (MovementType::Withdrawal, balance - amount)
            }
        };

        cas_balance(&mut tx, user_id, balance, new_balance).await?;

        let description = match movement_type {
            MovementType::Deposit => format!("Deposit of ${}", amount),
            MovementType::Withdrawal => format!("Withdrawal of ${}", amount),
        };
        let now = TimeMs::now();

        let result = sqlx::query(
            r#"
            INSERT INTO balance_movements (user_id, type, amount, previous_balance, new_balance, description, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id.as_i64())
        .bind(movement_type.as_str())
        .bind(amount.to_canonical_string())
        .bind(balance.to_canonical_string())
        .bind(new_balance.to_canonical_string())
        .bind(&description)
        .bind(now.as_i64())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(BalanceMovement {
            id: result.last_insert_rowid(),
            user_id,
            movement_type,
            amount,
            previous_balance: balance,
            new_balance,
            description,
            created_at: now,
        })
    }
}

/// First statement of every mutation: a self-assignment on the caller's row
/// acquires SQLite's write lock before anything is read. Contending writers
/// wait on the busy timeout here instead of failing with SQLITE_BUSY_SNAPSHOT
/// after their read snapshot goes stale (the busy handler does not apply to
/// that upgrade path).
async fn lock_user_row(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: UserId,
) -> Result<(), TxFailure> {
    let result = sqlx::query("UPDATE users SET balance = balance WHERE id = ?")
        .bind(user_id.as_i64())
        .execute(&mut **tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(TxFailure::App(AppError::NotFound(
            "User not found".to_string(),
        )));
    }
    Ok(())
}

/// Read the caller's balance inside the transaction.
async fn fetch_balance(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: UserId,
) -> Result<Money, TxFailure> {
    let row = sqlx::query("SELECT balance FROM users WHERE id = ?")
        .bind(user_id.as_i64())
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| TxFailure::App(AppError::NotFound("User not found".to_string())))?;

    let stored: String = row.get("balance");
    Money::from_str_canonical(&stored).map_err(|e| {
        TxFailure::App(AppError::Internal(format!(
            "stored balance is not a valid decimal: {}",
            e
        )))
    })
}

/// Read a bet owned by the caller inside the transaction.
async fn fetch_bet(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: UserId,
    bet_id: BetId,
) -> Result<Bet, TxFailure> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, sport, category, amount, odds, result, description, created_at, updated_at
        FROM bets
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(bet_id.as_i64())
    .bind(user_id.as_i64())
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| TxFailure::App(AppError::NotFound("Bet not found".to_string())))?;

    Ok(bet_from_row(&row))
}

/// Compare-and-swap the balance: the update only lands when the row still
/// holds the value observed earlier in this transaction.
async fn cas_balance(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: UserId,
    observed: Money,
    updated: Money,
) -> Result<(), TxFailure> {
    let result = sqlx::query("UPDATE users SET balance = ? WHERE id = ? AND balance = ?")
        .bind(updated.to_canonical_string())
        .bind(user_id.as_i64())
        .bind(observed.to_canonical_string())
        .execute(&mut **tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(TxFailure::Conflict);
    }
    Ok(())
}

fn conflict_exhausted(user_id: UserId) -> AppError {
    AppError::Internal(format!(
        "balance update for user {} kept conflicting after {} attempts",
        user_id, MAX_ATTEMPTS
    ))
}

fn validate_new_bet(new_bet: &NewBet) -> Result<(), AppError> {
    let mut errors = Vec::new();
    if new_bet.sport.trim().is_empty() {
        errors.push(FieldError::new("sport", "Sport is required"));
    }
    if new_bet.category.trim().is_empty() {
        errors.push(FieldError::new("category", "Category is required"));
    }
    if !new_bet.amount.is_positive() {
        errors.push(FieldError::new("amount", "Amount must be a positive number"));
    }
    if new_bet.odds < Money::from_i64(1) {
        errors.push(FieldError::new("odds", "Odds must be at least 1.0"));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    fn new_bet(amount: &str, odds: &str) -> NewBet {
        NewBet {
            sport: "Football".to_string(),
            category: "Match Winner".to_string(),
            amount: money(amount),
            odds: money(odds),
            result: BetResult::Pending,
            description: None,
        }
    }

    #[test]
    fn test_validate_accepts_boundary_odds() {
        assert!(validate_new_bet(&new_bet("0.01", "1.0")).is_ok());
    }

    #[test]
    fn test_validate_collects_all_field_errors() {
        let bad = NewBet {
            sport: " ".to_string(),
            category: String::new(),
            amount: money("0"),
            odds: money("0.9"),
            result: BetResult::Pending,
            description: None,
        };
        match validate_new_bet(&bad) {
            Err(AppError::Validation(errors)) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
                assert_eq!(fields, vec!["sport", "category", "amount", "odds"]);
            }
            _ => panic!("expected validation error"),
        }
    }

    #[test]
    fn test_validate_rejects_negative_amount() {
        let result = validate_new_bet(&new_bet("-5", "2.0"));
        match result {
            Err(AppError::Validation(errors)) => assert_eq!(errors[0].field, "amount"),
            _ => panic!("expected validation error"),
        }
    }
}
