//! The chat dispatcher talking HTTP to a live gateway.
//!
//! These tests serve the real router on a local port and drive it through
//! the bot's `HttpGateway`, covering the path a Telegram user takes.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use petal_bot::gateway::HttpGateway;
use petal_bot::session::{ChatState, InMemorySessions, SessionStore};
use petal_bot::{Dispatcher, Inbound, Outbound};
use petal_core::{OrderStatus, Role, TelegramId};
use petal_gateway::db::OrderStore;
use petal_integration_tests::{BOT_KEY, TestApp};

const ADMIN_CHAT: TelegramId = TelegramId::new(1);
const CUSTOMER_CHAT: TelegramId = TelegramId::new(555);
const STAFF_CHAT: TelegramId = TelegramId::new(100);

type TestDispatcher = Dispatcher<HttpGateway, InMemorySessions>;

async fn dispatcher(app: &TestApp) -> TestDispatcher {
    Dispatcher::new(
        app.http_gateway().await,
        InMemorySessions::new(),
        Some(ADMIN_CHAT),
    )
}

fn text(from: TelegramId, text: &str) -> Inbound {
    Inbound::Text {
        from,
        text: text.to_string(),
    }
}

fn callback(from: TelegramId, data: &str) -> Inbound {
    Inbound::Callback {
        from,
        data: data.to_string(),
    }
}

async fn say(d: &TestDispatcher, event: Inbound) -> String {
    let out: Vec<Outbound> = d.handle(event).await;
    out[0].reply.text.clone()
}

async fn register_customer(d: &TestDispatcher) -> Vec<Outbound> {
    say(d, text(CUSTOMER_CHAT, "/start")).await;
    say(d, text(CUSTOMER_CHAT, "Anna")).await;
    d.handle(Inbound::Contact {
        from: CUSTOMER_CHAT,
        phone: "+7 912 345 67 89".to_string(),
        contact_user: Some(CUSTOMER_CHAT),
    })
    .await
}

#[tokio::test]
async fn test_registration_creates_customer() {
    let app = TestApp::new();
    let d = dispatcher(&app).await;

    let out = register_customer(&d).await;

    assert!(out[0].reply.text.contains("registered, Anna"));
    assert_eq!(out[1].chat_id, ADMIN_CHAT.as_i64());

    let user = app
        .store
        .find_user_by_telegram(CUSTOMER_CHAT)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.username, "tg555");
    assert_eq!(user.phone_number.as_deref(), Some("+79123456789"));
    assert_eq!(user.role, Role::Customer);

    // A second /start greets instead of registering again.
    let again = say(&d, text(CUSTOMER_CHAT, "/start")).await;
    assert!(again.contains("Welcome back, Anna"));
}

#[tokio::test]
async fn test_checkout_and_staff_confirmation() {
    let app = TestApp::new();
    let roses = app.product("Roses", "10.00").await;
    let staff = app.user("florist", Role::Staff).await;
    let d = dispatcher(&app).await;
    register_customer(&d).await;

    // Checkout with a typed address.
    let ask = say(&d, text(CUSTOMER_CHAT, &format!("/neworder {}", roses.id))).await;
    assert!(ask.contains("type the delivery address"));
    let placed = say(&d, text(CUSTOMER_CHAT, "Oak Ave 5")).await;
    assert!(placed.contains("placed"));
    assert_eq!(d.sessions().get(CUSTOMER_CHAT).await, ChatState::Idle);

    let orders = app.store.list_orders(None).await.unwrap();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.delivery_address.as_deref(), Some("Oak Ave 5"));
    assert_eq!(order.total_price.to_string(), "10.00");

    // The address was saved, so the next checkout offers it.
    let mut out = d
        .handle(text(CUSTOMER_CHAT, &format!("/neworder {}", roses.id)))
        .await;
    assert_eq!(
        out.remove(0).reply.button_data(),
        vec!["use_saved_address", "new_address"]
    );
    say(&d, text(CUSTOMER_CHAT, "/cancel")).await;

    // A chat cannot claim the staff account; an administrator links it.
    let refused = say(&d, text(STAFF_CHAT, &format!("/link {}", staff.user.id))).await;
    assert!(refused.contains("permission"));
    app.state
        .users()
        .assign_telegram(STAFF_CHAT, staff.user.id)
        .await
        .unwrap();

    let confirmed = say(&d, callback(STAFF_CHAT, &format!("confirm_{}", order.id))).await;
    assert!(confirmed.contains("is now In progress"));
    let stored = app.store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Processing);

    // The customer sees the order but cannot change it.
    let detail = say(&d, text(CUSTOMER_CHAT, &format!("/order {}", order.id))).await;
    assert!(detail.contains("In progress"));
    let denied = say(&d, callback(CUSTOMER_CHAT, &format!("cancel_{}", order.id))).await;
    assert!(denied.contains("permission"));

    // Completed orders are frozen.
    say(&d, callback(STAFF_CHAT, &format!("complete_{}", order.id))).await;
    let frozen = say(&d, callback(STAFF_CHAT, &format!("cancel_{}", order.id))).await;
    assert!(frozen.contains("isn't allowed"));
    let stored = app.store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Completed);

    // Staff reads the report.
    let report = say(&d, text(STAFF_CHAT, "/analytics")).await;
    assert!(report.contains("Total: 1 orders, revenue 10.00"));
}

#[tokio::test]
async fn test_malformed_callback_changes_nothing() {
    let app = TestApp::new();
    let roses = app.product("Roses", "10.00").await;
    let anna = app.user("anna", Role::Customer).await;
    let staff = app.user("florist", Role::Staff).await;
    let order = app.order(&anna, &[roses.id]).await;
    app.store
        .link_telegram(staff.user.id, STAFF_CHAT)
        .await
        .unwrap();
    let d = dispatcher(&app).await;

    let reply = say(&d, callback(STAFF_CHAT, "confirm_abc")).await;
    assert!(reply.contains("no longer valid"));

    let stored = app.store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_customer_has_no_analytics() {
    let app = TestApp::new();
    let d = dispatcher(&app).await;
    register_customer(&d).await;

    let reply = say(&d, text(CUSTOMER_CHAT, "/analytics")).await;
    assert!(reply.contains("permission"));
}

#[tokio::test]
async fn test_unreachable_gateway_is_reported() {
    // Nothing listens on the discard port.
    let gateway = HttpGateway::new(
        Url::parse("http://127.0.0.1:9/").unwrap(),
        SecretString::from(BOT_KEY),
        Duration::from_secs(1),
    )
    .unwrap();
    let d = Dispatcher::new(gateway, InMemorySessions::new(), None);

    let reply = say(&d, text(CUSTOMER_CHAT, "/orders")).await;
    assert!(reply.contains("unavailable"));
}
