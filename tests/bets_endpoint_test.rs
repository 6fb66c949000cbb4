use axum::http::StatusCode;
use betledger::{api, db::init_db, LedgerEngine, Repository};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

struct TestApp {
    app: axum::Router,
    _temp: TempDir,
}

async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool.clone()));
    let ledger = Arc::new(LedgerEngine::new(pool));
    let app = api::create_router(api::AppState::new(repo, ledger));
    TestApp {
        app,
        _temp: temp_dir,
    }
}

async fn request(
    app: axum::Router,
    method: &str,
    uri: &str,
    user_id: Option<i64>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = axum::http::Request::builder().method(method).uri(uri);
    if let Some(id) = user_id {
        builder = builder.header("x-user-id", id.to_string());
    }
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };

    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn register_user(app: &axum::Router, username: &str) -> i64 {
    let (status, body) = request(
        app.clone(),
        "POST",
        "/api/users",
        None,
        Some(json!({ "username": username })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["user"]["id"].as_i64().unwrap()
}

async fn balance_of(app: &axum::Router, user_id: i64) -> f64 {
    let (status, body) = request(app.clone(), "GET", "/api/users/me", Some(user_id), None).await;
    assert_eq!(status, StatusCode::OK);
    body["user"]["balance"].as_f64().unwrap()
}

fn bet_body(amount: f64, odds: f64, result: &str) -> serde_json::Value {
    json!({
        "sport": "Football",
        "category": "Match Winner",
        "amount": amount,
        "odds": odds,
        "result": result,
    })
}

async fn create_bet(app: &axum::Router, user_id: i64, body: serde_json::Value) -> i64 {
    let (status, body) = request(app.clone(), "POST", "/api/bets", Some(user_id), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "create bet failed: {}", body);
    body["bet"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_create_bet_deducts_stake() {
    let t = setup_test_app().await;
    let user = register_user(&t.app, "alice").await;

    let (status, body) = request(
        t.app.clone(),
        "POST",
        "/api/bets",
        Some(user),
        Some(bet_body(100.0, 1.5, "pending")),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Bet created successfully");
    assert_eq!(body["bet"]["sport"], "Football");
    assert_eq!(body["bet"]["amount"], json!(100.0));
    assert_eq!(body["bet"]["result"], "pending");

    assert_eq!(balance_of(&t.app, user).await, 900.0);
}

#[tokio::test]
async fn test_create_bet_exact_balance_leaves_zero() {
    let t = setup_test_app().await;
    let user = register_user(&t.app, "alice").await;

    create_bet(&t.app, user, bet_body(1000.0, 2.0, "pending")).await;
    assert_eq!(balance_of(&t.app, user).await, 0.0);
}

#[tokio::test]
async fn test_create_bet_one_cent_over_balance_rejected() {
    let t = setup_test_app().await;
    let user = register_user(&t.app, "alice").await;

    let (status, body) = request(
        t.app.clone(),
        "POST",
        "/api/bets",
        Some(user),
        Some(bet_body(1000.01, 2.0, "pending")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Insufficient balance");
    assert_eq!(balance_of(&t.app, user).await, 1000.0);
}

#[tokio::test]
async fn test_create_bet_as_won_deducts_but_never_credits() {
    // Literal historical behavior: the stake goes out whatever the initial
    // result is, and winnings are only paid on a transition INTO won.
    let t = setup_test_app().await;
    let user = register_user(&t.app, "alice").await;

    create_bet(&t.app, user, bet_body(100.0, 1.5, "won")).await;
    assert_eq!(balance_of(&t.app, user).await, 900.0);
}

#[tokio::test]
async fn test_create_bet_validation_errors() {
    let t = setup_test_app().await;
    let user = register_user(&t.app, "alice").await;

    let (status, body) = request(
        t.app.clone(),
        "POST",
        "/api/bets",
        Some(user),
        Some(json!({
            "sport": "Football",
            "category": "Match Winner",
            "amount": 50.0,
            "odds": 0.5,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors[0]["field"], "odds");
    assert_eq!(balance_of(&t.app, user).await, 1000.0);
}

#[tokio::test]
async fn test_list_bets_newest_first() {
    let t = setup_test_app().await;
    let user = register_user(&t.app, "alice").await;

    let first = create_bet(&t.app, user, bet_body(10.0, 1.5, "pending")).await;
    let second = create_bet(&t.app, user, bet_body(20.0, 1.5, "pending")).await;

    let (status, body) = request(t.app.clone(), "GET", "/api/bets", Some(user), None).await;
    assert_eq!(status, StatusCode::OK);
    let bets = body["bets"].as_array().unwrap();
    assert_eq!(bets.len(), 2);
    assert_eq!(bets[0]["id"].as_i64().unwrap(), second);
    assert_eq!(bets[1]["id"].as_i64().unwrap(), first);
}

#[tokio::test]
async fn test_bets_require_identity() {
    let t = setup_test_app().await;

    let (status, _body) = request(t.app.clone(), "GET", "/api/bets", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _body) = request(
        t.app.clone(),
        "POST",
        "/api/bets",
        None,
        Some(bet_body(10.0, 1.5, "pending")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_settle_pending_to_won_credits_payout() {
    let t = setup_test_app().await;
    let user = register_user(&t.app, "alice").await;
    let bet = create_bet(&t.app, user, bet_body(100.0, 1.5, "pending")).await;

    let (status, body) = request(
        t.app.clone(),
        "PUT",
        &format!("/api/bets/{}", bet),
        Some(user),
        Some(json!({ "result": "won" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Bet updated successfully");
    // 1000 - 100 + 100 * 1.5
    assert_eq!(balance_of(&t.app, user).await, 1050.0);
}

#[tokio::test]
async fn test_settle_pending_to_lost_is_neutral() {
    let t = setup_test_app().await;
    let user = register_user(&t.app, "alice").await;
    let bet = create_bet(&t.app, user, bet_body(100.0, 1.5, "pending")).await;

    let (status, _body) = request(
        t.app.clone(),
        "PUT",
        &format!("/api/bets/{}", bet),
        Some(user),
        Some(json!({ "result": "lost" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance_of(&t.app, user).await, 900.0);
}

#[tokio::test]
async fn test_repeated_settlement_is_idempotent() {
    let t = setup_test_app().await;
    let user = register_user(&t.app, "alice").await;
    let bet = create_bet(&t.app, user, bet_body(100.0, 1.5, "pending")).await;

    for _ in 0..3 {
        let (status, _body) = request(
            t.app.clone(),
            "PUT",
            &format!("/api/bets/{}", bet),
            Some(user),
            Some(json!({ "result": "won" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(balance_of(&t.app, user).await, 1050.0);
}

#[tokio::test]
async fn test_correcting_result_reverses_payout() {
    let t = setup_test_app().await;
    let user = register_user(&t.app, "alice").await;
    let bet = create_bet(&t.app, user, bet_body(100.0, 1.5, "pending")).await;

    for result in ["won", "pending"] {
        request(
            t.app.clone(),
            "PUT",
            &format!("/api/bets/{}", bet),
            Some(user),
            Some(json!({ "result": result })),
        )
        .await;
    }
    assert_eq!(balance_of(&t.app, user).await, 900.0);

    for result in ["won", "lost", "won"] {
        request(
            t.app.clone(),
            "PUT",
            &format!("/api/bets/{}", bet),
            Some(user),
            Some(json!({ "result": result })),
        )
        .await;
    }
    assert_eq!(balance_of(&t.app, user).await, 1050.0);
}

#[tokio::test]
async fn test_update_unknown_bet_is_404() {
    let t = setup_test_app().await;
    let user = register_user(&t.app, "alice").await;

    let (status, body) = request(
        t.app.clone(),
        "PUT",
        "/api/bets/999",
        Some(user),
        Some(json!({ "result": "won" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Bet not found");
}

#[tokio::test]
async fn test_update_other_users_bet_is_404() {
    let t = setup_test_app().await;
    let alice = register_user(&t.app, "alice").await;
    let bob = register_user(&t.app, "bob").await;
    let bet = create_bet(&t.app, alice, bet_body(100.0, 1.5, "pending")).await;

    let (status, _body) = request(
        t.app.clone(),
        "PUT",
        &format!("/api/bets/{}", bet),
        Some(bob),
        Some(json!({ "result": "won" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    // Alice's balance untouched by bob's attempt.
    assert_eq!(balance_of(&t.app, alice).await, 900.0);
}

#[tokio::test]
async fn test_update_invalid_result_rejected() {
    let t = setup_test_app().await;
    let user = register_user(&t.app, "alice").await;
    let bet = create_bet(&t.app, user, bet_body(100.0, 1.5, "pending")).await;

    let (status, body) = request(
        t.app.clone(),
        "PUT",
        &format!("/api/bets/{}", bet),
        Some(user),
        Some(json!({ "result": "void" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "result");
}

#[tokio::test]
async fn test_delete_pending_bet_refunds_stake() {
    let t = setup_test_app().await;
    let user = register_user(&t.app, "alice").await;
    let bet = create_bet(&t.app, user, bet_body(100.0, 1.5, "pending")).await;

    let (status, body) = request(
        t.app.clone(),
        "DELETE",
        &format!("/api/bets/{}", bet),
        Some(user),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Bet deleted successfully");
    assert_eq!(balance_of(&t.app, user).await, 1000.0);

    let (_status, body) = request(t.app.clone(), "GET", "/api/bets", Some(user), None).await;
    assert!(body["bets"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_settled_bet_keeps_balance() {
    let t = setup_test_app().await;
    let user = register_user(&t.app, "alice").await;

    // Won bet: balance 1000 - 100 + 150 = 1050; deletion must not claw back.
    let won = create_bet(&t.app, user, bet_body(100.0, 1.5, "pending")).await;
    request(
        t.app.clone(),
        "PUT",
        &format!("/api/bets/{}", won),
        Some(user),
        Some(json!({ "result": "won" })),
    )
    .await;
    let (status, _body) = request(
        t.app.clone(),
        "DELETE",
        &format!("/api/bets/{}", won),
        Some(user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance_of(&t.app, user).await, 1050.0);

    // Lost bet: stake stays spent after deletion.
    let lost = create_bet(&t.app, user, bet_body(50.0, 2.0, "lost")).await;
    request(
        t.app.clone(),
        "DELETE",
        &format!("/api/bets/{}", lost),
        Some(user),
        None,
    )
    .await;
    assert_eq!(balance_of(&t.app, user).await, 1000.0);
}

#[tokio::test]
async fn test_delete_unknown_bet_is_404() {
    let t = setup_test_app().await;
    let user = register_user(&t.app, "alice").await;

    let (status, _body) = request(t.app.clone(), "DELETE", "/api/bets/999", Some(user), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
