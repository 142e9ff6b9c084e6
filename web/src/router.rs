//! Router configuration.

use crate::handlers::{fairs, health_check, readiness_check, sales};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// - `/health`, `/ready`: unauthenticated health checks
/// - `/api/fairs/...`: fair lifecycle, sales and reports, bearer-token auth
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/fairs", post(fairs::activate_fair).get(fairs::list_fairs))
        .route("/fairs/active", get(fairs::active_fair))
        .route("/fairs/:id", get(fairs::get_fair).put(fairs::update_fair))
        .route("/fairs/:id/close", post(fairs::close_fair))
        .route("/fairs/:id/archive", post(fairs::archive_fair))
        .route(
            "/fairs/:id/sales",
            post(sales::record_sale).get(sales::list_sales),
        )
        .route("/fairs/:id/report", get(fairs::fair_report))
        .route("/fairs/:id/quote", get(fairs::quote));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
