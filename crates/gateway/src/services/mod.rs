//! Business logic between the routes and the order store.
//!
//! # Services
//!
//! - [`orders::OrderService`] - create, read and move orders through their
//!   status workflow
//! - [`reports::ReportService`] - sales snapshots and CSV export
//! - [`users::UserService`] - bearer tokens, chat-account linking and saved
//!   addresses
//! - [`notify`] - order events and the admin chat notifier

pub mod notify;
pub mod orders;
pub mod reports;
pub mod users;

pub use notify::{AdminNotifier, OrderEvent};
pub use orders::OrderService;
pub use reports::ReportService;
pub use users::UserService;
