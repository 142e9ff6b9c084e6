//! Fair configuration, lifecycle and reporting endpoints.

use crate::error::AppError;
use crate::extractors::{AuthenticatedUser, FairManager, ReportViewer, SaleRecorder};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use feria_core::commands::{FairDraft, FairUpdate};
use feria_core::store::CloseOutcome;
use feria_core::{Fair, FairId, FairReport, FairStatus, Money};
use serde::{Deserialize, Serialize};

/// A fair together with its derived status.
#[derive(Debug, Serialize)]
pub struct FairResponse {
    /// The stored fair
    #[serde(flatten)]
    pub fair: Fair,
    /// Derived lifecycle status
    pub status: FairStatus,
}

impl From<Fair> for FairResponse {
    fn from(fair: Fair) -> Self {
        let status = fair.status();
        Self { fair, status }
    }
}

/// Result of a close request.
#[derive(Debug, Serialize)]
pub struct CloseResponse {
    /// `true` if the fair had already been closed
    pub already_closed: bool,
    /// The fair after the call
    pub fair: FairResponse,
}

/// Body of an archive request.
#[derive(Debug, Deserialize)]
pub struct ArchiveRequest {
    /// Must be `true`; purging sales cannot be undone
    #[serde(default)]
    pub confirm: bool,
}

/// Result of an archive request.
#[derive(Debug, Serialize)]
pub struct ArchiveResponse {
    /// The fair after the call
    pub fair: FairResponse,
    /// Sale records deleted by this call
    pub sales_deleted: u64,
}

/// Query of a quote request.
#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    /// Pintas in the cart
    #[serde(default)]
    pub pintas: u32,
    /// Litros in the cart
    #[serde(default)]
    pub litros: u32,
}

/// Partial total of a cart.
#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    /// Pintas in the cart
    pub pintas: u32,
    /// Litros in the cart
    pub litros: u32,
    /// Amount due at current prices
    pub total: Money,
}

/// `POST /api/fairs`: create a fair and make it the active one.
///
/// # Errors
///
/// 422 on invalid configuration, 409 if a concurrent activation won.
pub async fn activate_fair(
    State(state): State<AppState>,
    FairManager(admin): FairManager,
    Json(draft): Json<FairDraft>,
) -> Result<(StatusCode, Json<FairResponse>), AppError> {
    let fair = state.lifecycle.activate(draft).await?;
    tracing::info!(fair_id = %fair.id, by = %admin.name, "Fair activated via API");
    Ok((StatusCode::CREATED, Json(fair.into())))
}

/// `GET /api/fairs`: every fair, latest start date first.
///
/// # Errors
///
/// 503 if the store is unreachable.
pub async fn list_fairs(
    State(state): State<AppState>,
    _viewer: ReportViewer,
) -> Result<Json<Vec<FairResponse>>, AppError> {
    let fairs = state.lifecycle.history().await?;
    Ok(Json(fairs.into_iter().map(FairResponse::from).collect()))
}

/// `GET /api/fairs/active`: the fair currently accepting sales.
///
/// # Errors
///
/// 404 if no fair is active.
pub async fn active_fair(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<FairResponse>, AppError> {
    state
        .lifecycle
        .active_fair()
        .await?
        .map(|fair| Json(fair.into()))
        .ok_or_else(|| AppError::not_found("no fair is active"))
}

/// `GET /api/fairs/:id`
///
/// # Errors
///
/// 404 for an unknown fair.
pub async fn get_fair(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<FairId>,
) -> Result<Json<FairResponse>, AppError> {
    Ok(Json(state.lifecycle.get_fair(id).await?.into()))
}

/// `PUT /api/fairs/:id`: edit name, dates or prices.
///
/// # Errors
///
/// 404 unknown fair, 409 closed fair, 422 invalid merged configuration.
pub async fn update_fair(
    State(state): State<AppState>,
    FairManager(admin): FairManager,
    Path(id): Path<FairId>,
    Json(changes): Json<FairUpdate>,
) -> Result<Json<FairResponse>, AppError> {
    let fair = state.lifecycle.update(id, changes).await?;
    tracing::info!(fair_id = %id, by = %admin.name, "Fair updated via API");
    Ok(Json(fair.into()))
}

/// `POST /api/fairs/:id/close`
///
/// # Errors
///
/// 404 for an unknown fair.
pub async fn close_fair(
    State(state): State<AppState>,
    FairManager(admin): FairManager,
    Path(id): Path<FairId>,
) -> Result<Json<CloseResponse>, AppError> {
    let outcome = state.lifecycle.close(id).await?;
    tracing::info!(fair_id = %id, by = %admin.name, "Fair close requested via API");
    let already_closed = matches!(outcome, CloseOutcome::AlreadyClosed(_));
    Ok(Json(CloseResponse {
        already_closed,
        fair: outcome.into_fair().into(),
    }))
}

/// `POST /api/fairs/:id/archive`: delete all sales and deactivate.
///
/// Requires `{"confirm": true}`.
///
/// # Errors
///
/// 400 without confirmation, 404 for an unknown fair.
pub async fn archive_fair(
    State(state): State<AppState>,
    FairManager(admin): FairManager,
    Path(id): Path<FairId>,
    Json(request): Json<ArchiveRequest>,
) -> Result<Json<ArchiveResponse>, AppError> {
    if !request.confirm {
        return Err(AppError::bad_request(
            "archiving deletes every sale of the fair; resend with {\"confirm\": true}",
        ));
    }
    let outcome = state.lifecycle.finalize_and_purge(id).await?;
    tracing::warn!(
        fair_id = %id,
        by = %admin.name,
        sales_deleted = outcome.sales_deleted,
        "Fair archived via API"
    );
    Ok(Json(ArchiveResponse {
        fair: outcome.fair.into(),
        sales_deleted: outcome.sales_deleted,
    }))
}

/// `GET /api/fairs/:id/report`: aggregated totals.
///
/// # Errors
///
/// 404 for an unknown fair, 500 if stored sales cannot be decoded.
pub async fn fair_report(
    State(state): State<AppState>,
    _viewer: ReportViewer,
    Path(id): Path<FairId>,
) -> Result<Json<FairReport>, AppError> {
    Ok(Json(state.lifecycle.report(id).await?))
}

/// `GET /api/fairs/:id/quote?pintas=&litros=`
///
/// # Errors
///
/// 404 unknown fair, 409 fair not active, 422 on overflow.
pub async fn quote(
    State(state): State<AppState>,
    _seller: SaleRecorder,
    Path(id): Path<FairId>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<QuoteResponse>, AppError> {
    let total = state.lifecycle.quote(id, query.pintas, query.litros).await?;
    Ok(Json(QuoteResponse {
        pintas: query.pintas,
        litros: query.litros,
        total,
    }))
}
