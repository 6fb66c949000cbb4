use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::auth::AuthUser;
use crate::api::AppState;
use crate::domain::{Bet, BetId, BetResult, Money};
use crate::error::{AppError, FieldError};
use crate::ledger::NewBet;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BetDto {
    pub id: i64,
    pub sport: String,
    pub category: String,
    pub amount: Money,
    pub odds: Money,
    pub result: BetResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Bet> for BetDto {
    fn from(bet: Bet) -> Self {
        BetDto {
            id: bet.id.as_i64(),
            sport: bet.sport,
            category: bet.category,
            amount: bet.amount,
            odds: bet.odds,
            result: bet.result,
            description: bet.description,
            created_at: bet.created_at.as_i64(),
            updated_at: bet.updated_at.as_i64(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateBetRequest {
    pub sport: Option<String>,
    pub category: Option<String>,
    pub amount: Option<Money>,
    pub odds: Option<Money>,
    pub result: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBetRequest {
    pub result: Option<String>,
}

/// All bets for the caller, newest first.
pub async fn list_bets(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let bets = state.repo.list_bets(user_id).await?;
    let bets: Vec<BetDto> = bets.into_iter().map(BetDto::from).collect();
    Ok(Json(serde_json::json!({ "bets": bets })))
}

/// Place a bet; the stake is deducted from the caller's balance.
pub async fn create_bet(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateBetRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let new_bet = parse_create_request(req)?;
    let bet = state.ledger.create_bet(user_id, &new_bet).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Bet created successfully",
            "bet": BetDto::from(bet),
        })),
    ))
}

/// Change a bet's result, moving the payout per the transition table.
pub async fn update_bet(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateBetRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let new_result = req
        .result
        .as_deref()
        .and_then(BetResult::parse)
        .ok_or_else(|| {
            AppError::Validation(vec![FieldError::new(
                "result",
                "Result must be pending, won, or lost",
            )])
        })?;

    let bet = state
        .ledger
        .update_bet_result(user_id, BetId::new(id), new_result)
        .await?;

    Ok(Json(serde_json::json!({
        "message": "Bet updated successfully",
        "bet": BetDto::from(bet),
    })))
}

/// Delete a bet; the stake is refunded only while it is still pending.
pub async fn delete_bet(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.ledger.delete_bet(user_id, BetId::new(id)).await?;
    Ok(Json(
        serde_json::json!({ "message": "Bet deleted successfully" }),
    ))
}

/// Presence/shape checks; range checks live in the ledger engine.
fn parse_create_request(req: CreateBetRequest) -> Result<NewBet, AppError> {
    let mut errors = Vec::new();

    let sport = req.sport.unwrap_or_default();
    if sport.trim().is_empty() {
        errors.push(FieldError::new("sport", "Sport is required"));
    }
    let category = req.category.unwrap_or_default();
    if category.trim().is_empty() {
        errors.push(FieldError::new("category", "Category is required"));
    }
    if req.amount.is_none() {
        errors.push(FieldError::new("amount", "Amount must be a positive number"));
    }
    if req.odds.is_none() {
        errors.push(FieldError::new("odds", "Odds must be at least 1.0"));
    }

    // Bets may be created already settled; the default is pending.
    let result = match req.result.as_deref() {
        None => BetResult::Pending,
        Some(s) => BetResult::parse(s).unwrap_or_else(|| {
            errors.push(FieldError::new(
                "result",
                "Result must be pending, won, or lost",
            ));
            BetResult::Pending
        }),
    };

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    Ok(NewBet {
        sport: sport.trim().to_string(),
        category: category.trim().to_string(),
        amount: req.amount.unwrap_or_else(Money::zero),
        odds: req.odds.unwrap_or_else(Money::zero),
        result,
        description: req.description.filter(|d| !d.trim().is_empty()),
    })
}
