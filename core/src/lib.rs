//! # Feria Core
//!
//! Domain model and business rules for Feria POS, a point-of-sale for fairs
//! that sell two product types (pintas and litros) against two payment
//! methods (digital and cash).
//!
//! ## Modules
//!
//! - [`types`]: identifiers, `Money`, `Fair`, `Sale`
//! - [`commands`]: validated inputs (`FairDraft`, `FairUpdate`, `SaleRequest`)
//! - [`report`]: the aggregation engine, `summarize`
//! - [`lifecycle`]: `FairLifecycle`, which enforces the single-active-fair rule
//! - [`store`]: storage traits implemented by the in-memory and PostgreSQL stores
//! - [`auth`]: roles, capabilities and token authentication
//! - [`environment`]: injected clock
//! - [`error`]: error enums
//! - [`metrics`]: business metric names and recorders
//!
//! ## Example
//!
//! ```ignore
//! use feria_core::{FairLifecycle, commands::FairDraft};
//!
//! let lifecycle = FairLifecycle::new(store, Arc::new(SystemClock));
//! let fair = lifecycle.activate(draft).await?;
//! let report = lifecycle.report(fair.id).await?;
//! ```

pub mod auth;
pub mod commands;
pub mod environment;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod report;
pub mod store;
pub mod types;

pub use error::{FeriaError, StoreError, ValidationError};
pub use lifecycle::FairLifecycle;
pub use report::{FairReport, Report, summarize};
pub use types::{Fair, FairId, FairStatus, Money, PaymentMethod, Sale, SaleAttemptId, SaleId, UnitType};
