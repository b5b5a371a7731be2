use axum::{Json, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;

use pinledger_core::StatusCode as Code;

/// Body shape shared by every response, success or failure.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub status_code: Code,
    pub message: String,
    pub result: Option<T>,
    pub response_datetime: DateTime<Utc>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(message: impl Into<String>, result: T) -> Self {
        Self {
            success: true,
            status_code: Code::Success,
            message: message.into(),
            result: Some(result),
            response_datetime: Utc::now(),
        }
    }
}

impl Envelope<()> {
    pub fn failure(code: Code, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code: code,
            message: message.into(),
            result: None,
            response_datetime: Utc::now(),
        }
    }
}

/// `200 OK` with a success envelope around `result`.
pub fn ok<T: Serialize>(message: impl Into<String>, result: T) -> axum::response::Response {
    (StatusCode::OK, Json(Envelope::success(message, result))).into_response()
}
