use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::auth::AuthUser;
use crate::api::bets::BetDto;
use crate::api::AppState;
use crate::domain::{BalanceMovement, BalanceOperation, Money};
use crate::error::{AppError, FieldError};
use crate::stats::{compute_metrics, group_by_category, group_by_sport, BetMetrics};

const RECENT_BETS_LIMIT: i64 = 10;
const MOVEMENT_HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(flatten)]
    pub metrics: BetMetrics,
    pub initial_balance: Money,
    pub current_balance: Money,
    pub available_balance: Money,
}

#[derive(Debug, Serialize)]
pub struct SportStats {
    pub sport: String,
    #[serde(flatten)]
    pub metrics: BetMetrics,
}

#[derive(Debug, Serialize)]
pub struct CategoryStats {
    pub category: String,
    #[serde(flatten)]
    pub metrics: BetMetrics,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementDto {
    pub id: i64,
    #[serde(rename = "type")]
    pub movement_type: String,
    pub amount: Money,
    pub previous_balance: Money,
    pub new_balance: Money,
    pub description: String,
    pub created_at: i64,
}

impl From<BalanceMovement> for MovementDto {
    fn from(m: BalanceMovement) -> Self {
        MovementDto {
            id: m.id,
            movement_type: m.movement_type.as_str().to_string(),
            amount: m.amount,
            previous_balance: m.previous_balance,
            new_balance: m.new_balance,
            description: m.description,
            created_at: m.created_at.as_i64(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AdjustBalanceRequest {
    pub amount: Option<Money>,
    pub operation: Option<String>,
}

/// Full-history dashboard summary, recomputed per request.
pub async fn dashboard(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = state
        .repo
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let bets = state.repo.list_bets(user_id).await?;

    let metrics = compute_metrics(&bets);
    // Display figure only; affordability checks always use the raw balance.
    let available_balance = (user.balance + metrics.total_winnings).round_2();

    let stats = DashboardStats {
        metrics,
        initial_balance: user.initial_balance.round_2(),
        current_balance: user.balance.round_2(),
        available_balance,
    };

    Ok(Json(serde_json::json!({ "stats": stats })))
}

/// Per-sport metrics, most-played first.
pub async fn by_sport(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let bets = state.repo.list_bets(user_id).await?;
    let stats: Vec<SportStats> = group_by_sport(&bets)
        .into_iter()
        .map(|(sport, metrics)| SportStats { sport, metrics })
        .collect();

    Ok(Json(serde_json::json!({ "stats": stats })))
}

/// Per-category metrics, most-played first.
pub async fn by_category(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let bets = state.repo.list_bets(user_id).await?;
    let stats: Vec<CategoryStats> = group_by_category(&bets)
        .into_iter()
        .map(|(category, metrics)| CategoryStats { category, metrics })
        .collect();

    Ok(Json(serde_json::json!({ "stats": stats })))
}

/// The 10 most recently created bets.
pub async fn recent_bets(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let bets = state.repo.list_recent_bets(user_id, RECENT_BETS_LIMIT).await?;
    let bets: Vec<BetDto> = bets.into_iter().map(BetDto::from).collect();
    Ok(Json(serde_json::json!({ "recentBets": bets })))
}

/// Deposit or withdraw funds.
pub async fn adjust_balance(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<AdjustBalanceRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut errors = Vec::new();
    let amount = req.amount.unwrap_or_else(Money::zero);
    if !amount.is_positive() {
        errors.push(FieldError::new("amount", "Amount must be a positive number"));
    }
    let Some(operation) = req.operation.as_deref().and_then(BalanceOperation::parse) else {
        errors.push(FieldError::new(
            "operation",
            "Operation must be add or withdraw",
        ));
        return Err(AppError::Validation(errors));
    };
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let movement = state.ledger.adjust_balance(user_id, amount, operation).await?;

    let message = match operation {
        BalanceOperation::Add => "Funds added successfully",
        BalanceOperation::Withdraw => "Funds withdrawn successfully",
    };

    Ok(Json(serde_json::json!({
        "message": message,
        "newBalance": movement.new_balance,
    })))
}

/// The 50 most recent balance movements, newest first.
pub async fn balance_history(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let movements = state
        .repo
        .list_movements(user_id, MOVEMENT_HISTORY_LIMIT)
        .await?;
    let movements: Vec<MovementDto> = movements.into_iter().map(MovementDto::from).collect();
    Ok(Json(serde_json::json!({ "movements": movements })))
}
