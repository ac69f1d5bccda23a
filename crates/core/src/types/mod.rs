//! Core types for Petal.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod phone;
pub mod price;
pub mod report;
pub mod role;
pub mod status;

pub use id::*;
pub use phone::{PhoneError, PhoneNumber};
pub use price::Price;
pub use report::{ReportFigures, StatusFigures};
pub use role::{Capability, Role};
pub use status::*;
