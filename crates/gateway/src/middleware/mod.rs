//! HTTP middleware and extractors for the gateway.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//!
//! Authentication is done per handler with the [`RequireUser`] and
//! [`RequireBot`] extractors.

pub mod auth;
pub mod request_id;

pub use auth::{RequireBot, RequireUser};
pub use request_id::request_id_middleware;
