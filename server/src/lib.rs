//! Feria POS server wiring.
//!
//! The binary in `main.rs` reads a [`Config`], connects the `PostgreSQL`
//! store, and serves the HTTP API from `feria-web`.

#![forbid(unsafe_code)]

pub mod config;

pub use config::Config;
