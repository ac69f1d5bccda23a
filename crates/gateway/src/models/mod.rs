//! Domain models for the order store.
//!
//! These types represent validated domain objects separate from database row
//! types. They are also the JSON shapes the REST API returns.

mod order;
mod report;
mod user;

pub use order::{NewOrder, NewProduct, Order, Product};
pub use report::{NewReport, Report};
pub use user::{Identity, NewUser, User};
