//! HTTP request handlers.

pub mod fairs;
pub mod health;
pub mod sales;

pub use health::{health_check, readiness_check};
