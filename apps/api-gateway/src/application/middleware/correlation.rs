use axum::{extract::Request, middleware::Next, response::Response};
use http::HeaderValue;
use tracing::{Instrument, info_span};
use uuid::Uuid;

use super::TENANT_ID_HEADER;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Correlation id of the current request, available as a request extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorrelationId(pub String);

/// Middleware that tags every request with a correlation id.
///
/// Reuses an inbound `X-Correlation-ID` when present, otherwise generates one.
/// The id and the raw tenant header are recorded on a span wrapping the rest
/// of the request, and the id is echoed back on the response.
pub async fn correlation_id(mut req: Request, next: Next) -> Response {
    let correlation_id = req
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let tenant_id = req
        .headers()
        .get(TENANT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let span = info_span!(
        "request",
        correlation_id = %correlation_id,
        tenant_id = %tenant_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    req.extensions_mut()
        .insert(CorrelationId(correlation_id.clone()));

    let mut response = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}
