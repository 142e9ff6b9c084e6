//! Request tracking middleware.
//!
//! [`correlation_id_layer`] gives every request a correlation id (taken from
//! the `X-Correlation-ID` header when it holds a UUID, generated otherwise),
//! runs the request inside a tracing span carrying that id, records request
//! metrics, and echoes the id back in the response header.
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/api/fairs", get(list_fairs))
//!     .layer(correlation_id_layer());
//! ```

use crate::extractors::CorrelationId;
use axum::{extract::Request, http::HeaderValue, response::Response};
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Create the correlation id layer.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Middleware service for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);
        req.extensions_mut().insert(CorrelationId(correlation_id));

        let method = req.method().clone();
        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            method = %method,
            uri = %req.uri(),
        );
        let started = Instant::now();
        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.instrument(span.clone()).await?;

            let status = response.status();
            let elapsed = started.elapsed();
            metrics::counter!(
                "feria_http_requests_total",
                "method" => method.to_string(),
                "status" => status.as_u16().to_string()
            )
            .increment(1);
            metrics::histogram!("feria_http_request_duration_seconds")
                .record(elapsed.as_secs_f64());
            span.in_scope(|| {
                tracing::debug!(
                    status = status.as_u16(),
                    elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    "Request finished"
                );
            });

            if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
                response
                    .headers_mut()
                    .insert(CORRELATION_ID_HEADER, header_value);
            }
            Ok(response)
        })
    }
}
