//! Repository layer for database reads and account creation.
//!
//! Methods are organized across submodules by domain:
//! - `bets.rs` - bet list/lookup queries
//! - `movements.rs` - balance movement history
//!
//! All monetary columns are canonical decimal TEXT and are parsed back into
//! [`Money`] here; aggregation over them happens in Rust (see
//! [`crate::stats`]) to avoid SQLite's REAL coercion.

mod bets;
mod movements;

pub(crate) use bets::bet_from_row;

use crate::domain::{initial_grant, Money, TimeMs, UserAccount, UserId};
use crate::error::{AppError, FieldError};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // =========================================================================
    // User operations
    // =========================================================================

    /// Create an account with the fixed onboarding grant.
    ///
    /// # Errors
    /// Returns a field-level validation error when the username is taken.
    pub async fn insert_user(&self, username: &str) -> Result<UserAccount, AppError> {
        let grant = initial_grant();
        let now = TimeMs::now();

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, balance, initial_balance, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(username)
        .bind(grant.to_canonical_string())
        .bind(grant.to_canonical_string())
        .bind(now.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db)
                if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
            {
                AppError::Validation(vec![FieldError::new(
                    "username",
                    "Username is already taken",
                )])
            }
            _ => AppError::from(e),
        })?;

        Ok(UserAccount {
            id: UserId::new(result.last_insert_rowid()),
            username: username.to_string(),
            balance: grant,
            initial_balance: grant,
            created_at: now,
        })
    }

    /// Point lookup of an account by id.
    pub async fn get_user(&self, user_id: UserId) -> Result<Option<UserAccount>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, username, balance, initial_balance, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| UserAccount {
            id: UserId::new(row.get("id")),
            username: row.get("username"),
            balance: parse_money("users.balance", &row.get::<String, _>("balance")),
            initial_balance: parse_money(
                "users.initial_balance",
                &row.get::<String, _>("initial_balance"),
            ),
            created_at: TimeMs::new(row.get("created_at")),
        }))
    }
}

/// Parse a stored decimal TEXT column, warning and falling back to zero on
/// corruption rather than failing the whole read.
pub(crate) fn parse_money(column: &str, s: &str) -> Money {
    Money::from_str(s).unwrap_or_else(|e| {
        warn!(column, value = %s, error = %e, "Failed to parse stored decimal, using default");
        Money::default()
    })
}
