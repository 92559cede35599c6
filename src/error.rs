//! Error taxonomy for the leave engine.
//!
//! Every fallible operation in the core returns [`LeaveError`]. The variants
//! map one-to-one onto HTTP responses via [`actix_web::ResponseError`], so
//! handlers can bubble errors with `?` and still produce the JSON bodies the
//! dashboard expects.

use actix_web::{HttpResponse, http::StatusCode};
use chrono::NaiveDate;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LeaveError {
    /// Malformed or ineligible input. Surfaced directly, never retried.
    #[error("{message}")]
    Validation { message: String },

    /// The requested range intersects an existing pending/approved
    /// application. Carries the conflicting range.
    #[error("requested range overlaps an existing application ({from} to {to})")]
    Overlap { from: NaiveDate, to: NaiveDate },

    /// Not enough balance and no substitution applies.
    #[error("insufficient leave balance: available {available}, requested {requested}")]
    InsufficientBalance { available: f64, requested: f64 },

    /// Operation not valid for the current lifecycle state.
    #[error("invalid state transition: {message}")]
    InvalidStateTransition { message: String },

    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("storage error: {0}")]
    Storage(String),
}

impl LeaveError {
    pub fn validation(message: impl Into<String>) -> Self {
        LeaveError::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_transition(message: impl Into<String>) -> Self {
        LeaveError::InvalidStateTransition {
            message: message.into(),
        }
    }

    pub fn permission(message: impl Into<String>) -> Self {
        LeaveError::PermissionDenied {
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        LeaveError::NotFound { what: what.into() }
    }
}

impl From<sqlx::Error> for LeaveError {
    fn from(err: sqlx::Error) -> Self {
        LeaveError::Storage(err.to_string())
    }
}

impl actix_web::ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::Validation { .. } | LeaveError::InsufficientBalance { .. } => {
                StatusCode::BAD_REQUEST
            }
            LeaveError::Overlap { .. } | LeaveError::InvalidStateTransition { .. } => {
                StatusCode::CONFLICT
            }
            LeaveError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            LeaveError::NotFound { .. } => StatusCode::NOT_FOUND,
            LeaveError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let LeaveError::Storage(detail) = self {
            tracing::error!(error = %detail, "storage failure");
            // Internal detail stays in the logs.
            return HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            }));
        }
        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string()
        }))
    }
}

pub type LeaveResult<T> = Result<T, LeaveError>;
