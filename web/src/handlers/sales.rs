//! Sale recording and listing endpoints.

use crate::error::AppError;
use crate::extractors::{IdempotencyKey, ReportViewer, SaleRecorder};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use feria_core::commands::SaleRequest;
use feria_core::{FairId, Money, PaymentMethod, Sale, SaleAttemptId};
use serde::{Deserialize, Serialize};

/// Body of a sale request. The seller is the authenticated caller.
#[derive(Debug, Deserialize)]
pub struct RecordSaleRequest {
    /// Pintas in the cart
    #[serde(default)]
    pub pintas: u32,
    /// Litros in the cart
    #[serde(default)]
    pub litros: u32,
    /// How the customer paid
    pub payment_method: PaymentMethod,
}

/// Records written for one sale attempt.
#[derive(Debug, Serialize)]
pub struct RecordSaleResponse {
    /// Key to resend for a safe retry
    pub attempt_id: SaleAttemptId,
    /// One record per unit type in the cart
    pub sales: Vec<Sale>,
    /// Sum of the records' amounts
    pub total: Money,
    /// The attempt had already been recorded
    pub replayed: bool,
}

/// `POST /api/fairs/:id/sales`
///
/// Sending the same `Idempotency-Key` again returns the original records.
///
/// # Errors
///
/// 404 unknown fair, 409 fair not active or key used on another fair,
/// 422 empty cart or out-of-range quantity.
pub async fn record_sale(
    State(state): State<AppState>,
    SaleRecorder(seller): SaleRecorder,
    key: IdempotencyKey,
    Path(id): Path<FairId>,
    Json(body): Json<RecordSaleRequest>,
) -> Result<(StatusCode, Json<RecordSaleResponse>), AppError> {
    let attempt_id = key.or_new();
    let request = SaleRequest {
        pintas: body.pintas,
        litros: body.litros,
        payment_method: body.payment_method,
        seller_name: seller.name,
        attempt_id,
    };
    let outcome = state.lifecycle.record_sale(id, request).await?;
    let total = outcome.sales.iter().map(|s| s.total_amount).sum();
    Ok((
        StatusCode::CREATED,
        Json(RecordSaleResponse {
            attempt_id,
            sales: outcome.sales,
            total,
            replayed: outcome.replayed,
        }),
    ))
}

/// `GET /api/fairs/:id/sales`: most recent first.
///
/// # Errors
///
/// 404 for an unknown fair.
pub async fn list_sales(
    State(state): State<AppState>,
    _viewer: ReportViewer,
    Path(id): Path<FairId>,
) -> Result<Json<Vec<Sale>>, AppError> {
    Ok(Json(state.lifecycle.sales(id).await?))
}
