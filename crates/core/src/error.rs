//! Domain error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every failure a caller can observe resolves to one of these variants.
/// Infrastructure errors are translated into `System` (or `NotFound` for
/// "no rows") at the repository boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or out-of-range input (user-correctable).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The requested account or transaction does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// PIN mismatch on an active account.
    #[error("invalid PIN, {remaining_attempts} attempt(s) remaining")]
    Unauthorized { remaining_attempts: u32 },

    /// Account is PIN-blocked, or a reset token is expired/invalid.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The balance would go below the allowed minimum.
    #[error("balance below minimum: {0}")]
    BelowMinimumBalance(String),

    /// Store failure, commit failure or any other internal problem.
    #[error("system error: {0}")]
    System(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn below_minimum(msg: impl Into<String>) -> Self {
        Self::BelowMinimumBalance(msg.into())
    }

    pub fn system(msg: impl Into<String>) -> Self {
        Self::System(msg.into())
    }

    /// Stable response code for this error.
    pub fn code(&self) -> StatusCode {
        match self {
            DomainError::Validation(_)
            | DomainError::Unauthorized { .. }
            | DomainError::Forbidden(_) => StatusCode::ValidationError,
            DomainError::NotFound(_) => StatusCode::NotFound,
            DomainError::BelowMinimumBalance(_) => StatusCode::BelowMinimumBalance,
            DomainError::System(_) => StatusCode::SystemError,
        }
    }

    /// Message safe to show to a caller.
    ///
    /// System errors never leak store text.
    pub fn public_message(&self) -> String {
        match self {
            DomainError::Validation(msg) => msg.clone(),
            DomainError::NotFound(what) => format!("{what} not found"),
            DomainError::Unauthorized { remaining_attempts } => {
                format!("Invalid PIN. {remaining_attempts} attempt(s) remaining")
            }
            DomainError::Forbidden(msg) => msg.clone(),
            DomainError::BelowMinimumBalance(msg) => msg.clone(),
            DomainError::System(_) => "Internal system error".to_string(),
        }
    }
}

/// Response status codes of the uniform envelope.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    #[serde(rename = "101")]
    Success,
    #[serde(rename = "102")]
    Pending,
    #[serde(rename = "103")]
    Failure,
    #[serde(rename = "201")]
    NotFound,
    #[serde(rename = "202")]
    ValidationError,
    #[serde(rename = "402")]
    BelowMinimumBalance,
    #[serde(rename = "501")]
    SystemError,
}

impl StatusCode {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::Success => "101",
            StatusCode::Pending => "102",
            StatusCode::Failure => "103",
            StatusCode::NotFound => "201",
            StatusCode::ValidationError => "202",
            StatusCode::BelowMinimumBalance => "402",
            StatusCode::SystemError => "501",
        }
    }
}

impl core::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
