//! Petal Bot - Telegram chat bot for customers and staff.
//!
//! Customers register, browse the catalog, place orders and follow their
//! status. Staff move orders through the workflow with inline buttons and
//! read the sales report. All data goes through the REST gateway.
//!
//! # Modules
//!
//! - [`config`] - Environment configuration
//! - [`dispatcher`] - Routes chat events to gateway calls
//! - [`commands`] - Command and callback payload parsing
//! - [`session`] - Per-chat flow state
//! - [`gateway`] - Gateway client
//! - [`telegram`] - Telegram Bot API client
//! - [`runner`] - Long-polling loop

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod gateway;
pub mod render;
pub mod reply;
pub mod runner;
pub mod session;
pub mod telegram;

pub use dispatcher::{Dispatcher, Inbound};
pub use reply::{Outbound, Reply};
