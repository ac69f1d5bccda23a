//! Integration tests for the bot identity endpoints.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use serde_json::json;

use petal_core::Role;
use petal_integration_tests::{BOT_KEY, TestApp};

#[tokio::test]
async fn test_identity_endpoints_require_bot_key() {
    let app = TestApp::new();
    let anna = app.user("anna", Role::Customer).await;

    let (status, _) = app.get("/api/bot/identities/555/", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A user token is not the bot key.
    let (status, _) = app
        .get("/api/bot/identities/555/", Some(&anna.token))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_then_lookup() {
    let app = TestApp::new();

    let (status, _) = app.get("/api/bot/identities/555/", Some(BOT_KEY)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, registered) = app
        .post(
            "/api/bot/identities/",
            Some(BOT_KEY),
            json!({"telegram_id": 555, "name": "Anna", "phone": "+7 (912) 345-67-89"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(registered["user"]["username"], "tg555");
    assert_eq!(registered["user"]["display_name"], "Anna");
    assert_eq!(registered["user"]["phone_number"], "+79123456789");
    assert_eq!(registered["user"]["role"], "customer");
    assert_eq!(registered["token"].as_str().unwrap().len(), 40);

    let (status, found) = app.get("/api/bot/identities/555/", Some(BOT_KEY)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["token"], registered["token"]);

    // The token works as a user credential.
    let token = found["token"].as_str().unwrap();
    let (status, _) = app.get("/api/orders/", Some(token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = TestApp::new();
    let body = json!({"telegram_id": 555, "name": "Anna", "phone": "+79123456789"});

    let (status, _) = app
        .post("/api/bot/identities/", Some(BOT_KEY), body)
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post(
            "/api/bot/identities/",
            Some(BOT_KEY),
            json!({"telegram_id": 556, "name": "Anna", "phone": "+79123456789"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_register_rejects_bad_phone() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/bot/identities/",
            Some(BOT_KEY),
            json!({"telegram_id": 555, "name": "Anna", "phone": "call me"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn test_link_existing_account() {
    let app = TestApp::new();
    let anna = app.user("anna", Role::Customer).await;

    let (status, linked) = app
        .post(
            "/api/bot/identities/link/",
            Some(BOT_KEY),
            json!({"telegram_id": 777, "user_id": anna.user.id}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(linked["user"]["telegram_id"], 777);
    assert_eq!(linked["token"], anna.token.as_str());

    let (status, _) = app
        .post(
            "/api/bot/identities/link/",
            Some(BOT_KEY),
            json!({"telegram_id": 888, "user_id": anna.user.id}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post(
            "/api/bot/identities/link/",
            Some(BOT_KEY),
            json!({"telegram_id": 999, "user_id": 12345}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_chat_cannot_take_over_staff_account() {
    let app = TestApp::new();

    for (name, role) in [("florist", Role::Staff), ("owner", Role::Admin)] {
        let account = app.user(name, role).await;
        let (status, body) = app
            .post(
                "/api/bot/identities/link/",
                Some(BOT_KEY),
                json!({"telegram_id": 777, "user_id": account.user.id}),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");
        assert!(body.get("token").is_none());
    }

    let (status, _) = app.get("/api/bot/identities/777/", Some(BOT_KEY)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_telegram_id() {
    let app = TestApp::new();
    let (status, _) = app.get("/api/bot/identities/abc/", Some(BOT_KEY)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
