use axum::{
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// Response header carrying the request reference number.
pub const REFERENCE_HEADER: &str = "x-reference-number";

/// Tag every request with a UUIDv7 reference number.
///
/// The reference is recorded on a span wrapping the handler, so every log line
/// emitted while serving the request carries it, and is echoed back to the
/// caller in [`REFERENCE_HEADER`].
pub async fn request_reference(req: Request<axum::body::Body>, next: Next) -> Response {
    let reference = Uuid::now_v7();
    let span = tracing::info_span!(
        "request",
        reference = %reference,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let mut response = next.run(req).instrument(span.clone()).await;
    span.in_scope(|| tracing::info!(status = response.status().as_u16(), "request completed"));

    if let Ok(value) = HeaderValue::from_str(&reference.to_string()) {
        response.headers_mut().insert(REFERENCE_HEADER, value);
    }
    response
}
