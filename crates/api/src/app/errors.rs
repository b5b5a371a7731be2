use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use pinledger_core::{DomainError, StatusCode as Code};

use crate::app::envelope::Envelope;

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let status = match &err {
        DomainError::Validation(_) | DomainError::BelowMinimumBalance(_) => StatusCode::BAD_REQUEST,
        DomainError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::System(detail) => {
            tracing::error!(error = %detail, "system error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    json_error(status, err.code(), err.public_message())
}

/// Malformed or mistyped JSON body.
pub fn rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(
        StatusCode::BAD_REQUEST,
        Code::ValidationError,
        rejection.body_text(),
    )
}

pub fn json_error(
    status: StatusCode,
    code: Code,
    message: impl Into<String>,
) -> axum::response::Response {
    (status, Json(Envelope::failure(code, message))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_http_statuses() {
        let cases = [
            (DomainError::validation("bad"), StatusCode::BAD_REQUEST),
            (DomainError::below_minimum("low"), StatusCode::BAD_REQUEST),
            (
                DomainError::Unauthorized {
                    remaining_attempts: 2,
                },
                StatusCode::UNAUTHORIZED,
            ),
            (DomainError::forbidden("blocked"), StatusCode::FORBIDDEN),
            (DomainError::not_found("Account"), StatusCode::NOT_FOUND),
            (DomainError::system("pool timed out"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(domain_error_to_response(err).status(), status);
        }
    }
}
