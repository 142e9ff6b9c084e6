//! HTTP API for Feria POS.
//!
//! Thin shell over [`feria_core::FairLifecycle`]: handlers parse requests,
//! check the caller's role, call one lifecycle operation and map the result
//! (or [`feria_core::FeriaError`]) to a JSON response.
//!
//! # Request Flow
//!
//! 1. Correlation middleware assigns a request id and opens a span
//! 2. Extractors authenticate the bearer token and check capabilities
//! 3. The handler calls the lifecycle
//! 4. [`AppError`] maps failures to status codes
//!
//! # Example
//!
//! ```ignore
//! use feria_web::{AppState, build_router};
//!
//! let app = build_router(AppState::new(lifecycle, Arc::new(authenticator)));
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::AppError;
pub use extractors::{AuthenticatedUser, CorrelationId, FairManager, ReportViewer, SaleRecorder};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use router::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
