//! Petal Bot - Telegram front end of the flower shop.
//!
//! Long-polls the Telegram Bot API and talks to the gateway over HTTP.
//! Updates are handled on a single-threaded runtime; handlers interleave
//! while they wait on the network.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use petal_bot::config::BotConfig;
use petal_bot::gateway::HttpGateway;
use petal_bot::session::InMemorySessions;
use petal_bot::telegram::TelegramClient;
use petal_bot::{Dispatcher, runner};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &BotConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = BotConfig::from_env().expect("Failed to load configuration");

    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "petal_bot=info".into());

    let json_logs = std::env::var("PETAL_LOG_JSON").is_ok();
    let json_layer = json_logs.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json_logs).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let gateway = HttpGateway::new(
        config.gateway_url.clone(),
        config.gateway_api_key.clone(),
        config.gateway_timeout,
    )
    .expect("Failed to build gateway client");
    let telegram = TelegramClient::new(config.telegram_token.clone(), config.poll_timeout);
    let dispatcher = Arc::new(Dispatcher::new(
        gateway,
        InMemorySessions::new(),
        config.admin_chat,
    ));

    tracing::info!(gateway = %config.gateway_url, "petal-bot starting");
    runner::run(telegram, dispatcher, shutdown_signal()).await;
    tracing::info!("petal-bot stopped");
}

/// Wait for Ctrl+C.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
