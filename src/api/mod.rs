pub mod auth;
pub mod bets;
pub mod health;
pub mod stats;
pub mod users;

use crate::db::Repository;
use crate::ledger::LedgerEngine;
use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub ledger: Arc<LedgerEngine>,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, ledger: Arc<LedgerEngine>) -> Self {
        Self { repo, ledger }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/users", post(users::register))
        .route("/api/users/me", get(users::me))
        .route("/api/bets", get(bets::list_bets).post(bets::create_bet))
        .route(
            "/api/bets/:id",
            put(bets::update_bet).delete(bets::delete_bet),
        )
        .route("/api/stats/dashboard", get(stats::dashboard))
        .route("/api/stats/by-sport", get(stats::by_sport))
        .route("/api/stats/by-category", get(stats::by_category))
        .route("/api/stats/recent", get(stats::recent_bets))
        .route("/api/stats/balance", post(stats::adjust_balance))
        .route("/api/stats/balance/history", get(stats::balance_history))
        .layer(cors)
        .with_state(state)
}
