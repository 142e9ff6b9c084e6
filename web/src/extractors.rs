//! Custom Axum extractors.
//!
//! - [`CorrelationId`]: the request's correlation id
//! - [`BearerToken`]: raw `Authorization: Bearer <token>` value
//! - [`AuthenticatedUser`]: any known principal
//! - [`FairManager`], [`ReportViewer`], [`SaleRecorder`]: a principal holding
//!   the matching capability
//! - [`IdempotencyKey`]: optional `Idempotency-Key` header
//!
//! # Usage
//!
//! ```rust,ignore
//! async fn close_fair(
//!     State(state): State<AppState>,
//!     FairManager(principal): FairManager,
//!     Path(id): Path<FairId>,
//! ) -> Result<Json<CloseResponse>, AppError> {
//!     // principal is guaranteed to hold Capability::ManageFairs
//! }
//! ```

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use crate::state::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use feria_core::SaleAttemptId;
use feria_core::auth::{Capability, Principal};
use uuid::Uuid;

/// Header carrying the client-generated sale attempt id
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Correlation ID for request tracing.
///
/// Read from request extensions when the correlation middleware is
/// installed, otherwise from the `X-Correlation-ID` header, otherwise a new
/// UUID v4.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<CorrelationId>() {
            return Ok(*id);
        }
        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// Bearer token extracted from `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| {
                AppError::unauthorized("Invalid authorization format. Expected 'Bearer <token>'")
            })?
            .trim();

        if token.is_empty() {
            return Err(AppError::unauthorized("Empty bearer token"));
        }

        Ok(Self(token.to_string()))
    }
}

/// Any authenticated principal.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let principal = state
            .authenticator
            .authenticate(&token)
            .ok_or_else(|| AppError::unauthorized("Unknown token"))?;
        Ok(Self(principal))
    }
}

async fn require(
    parts: &mut Parts,
    state: &AppState,
    capability: Capability,
) -> Result<Principal, AppError> {
    let AuthenticatedUser(principal) = AuthenticatedUser::from_request_parts(parts, state).await?;
    if principal.can(capability) {
        Ok(principal)
    } else {
        tracing::warn!(
            user = %principal.name,
            role = %principal.role,
            ?capability,
            "Access denied"
        );
        Err(AppError::forbidden(format!(
            "role {} may not perform this action",
            principal.role
        )))
    }
}

/// Principal allowed to activate, edit, close and archive fairs.
#[derive(Debug, Clone)]
pub struct FairManager(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for FairManager {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, Capability::ManageFairs).await.map(Self)
    }
}

/// Principal allowed to read history, sales and reports.
#[derive(Debug, Clone)]
pub struct ReportViewer(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for ReportViewer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, Capability::ViewReports).await.map(Self)
    }
}

/// Principal allowed to record sales.
#[derive(Debug, Clone)]
pub struct SaleRecorder(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for SaleRecorder {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, Capability::RecordSales).await.map(Self)
    }
}

/// Optional `Idempotency-Key` header, parsed as a sale attempt id.
///
/// A present but malformed key is rejected rather than ignored, so a client
/// never believes it is protected when it is not.
#[derive(Debug, Clone, Copy)]
pub struct IdempotencyKey(pub Option<SaleAttemptId>);

impl IdempotencyKey {
    /// The supplied key, or a fresh one
    #[must_use]
    pub fn or_new(self) -> SaleAttemptId {
        self.0.unwrap_or_default()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for IdempotencyKey
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(IDEMPOTENCY_KEY_HEADER) else {
            return Ok(Self(None));
        };
        let key = value
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .ok_or_else(|| AppError::bad_request("Idempotency-Key must be a UUID"))?;
        Ok(Self(Some(SaleAttemptId::from_uuid(key))))
    }
}
