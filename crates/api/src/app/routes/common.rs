use axum::Json;
use axum::extract::rejection::JsonRejection;
use serde::Serialize;

use pinledger_core::DomainResult;

use crate::app::{envelope, errors};

/// Unwrap a JSON body, turning extractor rejections into an envelope.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    payload
        .map(|Json(body)| body)
        .map_err(errors::rejection_to_response)
}

/// Success envelope for `Ok`, mapped error envelope otherwise.
pub fn respond<T, R, F>(result: DomainResult<T>, message: &str, map: F) -> axum::response::Response
where
    R: Serialize,
    F: FnOnce(T) -> R,
{
    match result {
        Ok(value) => envelope::ok(message, map(value)),
        Err(err) => errors::domain_error_to_response(err),
    }
}
