//! Integration tests for Petal.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p petal-integration-tests
//! ```
//!
//! No database is needed: the gateway runs over the in-memory store.
//!
//! # Test Categories
//!
//! - `gateway_orders` - Order and address endpoints
//! - `gateway_reports` - Report endpoints
//! - `gateway_identities` - Bot identity endpoints
//! - `bot_end_to_end` - Chat dispatcher talking HTTP to a live gateway

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;
use url::Url;

use petal_bot::gateway::HttpGateway;
use petal_core::{Price, ProductId, Role};
use petal_gateway::config::GatewayConfig;
use petal_gateway::db::{MemoryStore, OrderStore};
use petal_gateway::models::{Identity, NewProduct, Order, Product};
use petal_gateway::state::AppState;

/// Bot API key used by every test gateway.
pub const BOT_KEY: &str = "kT9#mQ2$vL7@xR4!pW8^nJ3&hF6*bZ1%";

/// A gateway over a fresh in-memory store.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    router: Router,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(
            GatewayConfig::for_memory(BOT_KEY),
            Arc::clone(&store) as Arc<dyn OrderStore>,
        );
        let router = petal_gateway::app(state.clone());
        Self {
            store,
            state,
            router,
        }
    }

    /// Send a request through the router and return status and JSON body.
    ///
    /// Non-JSON bodies come back as a JSON string.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("valid request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    /// `GET` shorthand.
    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, path, token, None).await
    }

    /// `POST` shorthand.
    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, path, token, Some(body)).await
    }

    /// Create a user with a token.
    ///
    /// # Panics
    ///
    /// Panics if the username is taken.
    pub async fn user(&self, username: &str, role: Role) -> Identity {
        self.state
            .users()
            .create(username, role, None)
            .await
            .expect("user created")
    }

    /// Create a product.
    ///
    /// # Panics
    ///
    /// Panics if the price does not parse.
    pub async fn product(&self, name: &str, price: &str) -> Product {
        self.store
            .create_product(NewProduct {
                name: name.to_string(),
                price: price.parse::<Price>().expect("valid price"),
                image: format!("products/{name}.jpg"),
            })
            .await
            .expect("product created")
    }

    /// Place an order for `owner` through the order service.
    ///
    /// # Panics
    ///
    /// Panics if the order is rejected.
    pub async fn order(&self, owner: &Identity, products: &[ProductId]) -> Order {
        self.state
            .orders()
            .create(&owner.user, products.to_vec(), Some("Main St 1".to_string()))
            .await
            .expect("order created")
    }

    /// Serve the router on an ephemeral local port and return its base URL.
    ///
    /// # Panics
    ///
    /// Panics if the port cannot be bound.
    pub async fn serve(&self) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local address");
        let router = self.router.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Url::parse(&format!("http://{addr}/")).expect("valid url")
    }

    /// A bot-side gateway client connected to this app over HTTP.
    ///
    /// # Panics
    ///
    /// Panics if the server cannot start.
    pub async fn http_gateway(&self) -> HttpGateway {
        HttpGateway::new(
            self.serve().await,
            SecretString::from(BOT_KEY),
            Duration::from_secs(5),
        )
        .expect("gateway client")
    }
}
