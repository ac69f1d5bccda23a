//! Petal Core - Shared domain types library.
//!
//! This crate provides the types used across all Petal components:
//! - `gateway` - REST API and order store
//! - `bot` - Telegram chat bot for customers and staff
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. The order status workflow and the report
//! aggregation live here so the gateway and the bot consult the same tables.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, prices, roles, order statuses and report figures

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
