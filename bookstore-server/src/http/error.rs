//! API error types with IntoResponse
//!
//! Every error becomes an envelope with `error: true` and a status code.
//! Store failures are logged and reported to the client generically.

use std::time::Duration;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::envelope::Envelope;
use crate::auth::{AuthError, PasswordError};
use crate::db::DbError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or missing request data (400)
    InvalidInput { message: String },

    /// Resource not found (404)
    NotFound { resource: &'static str, id: String },

    /// Unique constraint hit (409)
    Conflict {
        resource: &'static str,
        field: &'static str,
    },

    /// Well-formed but unacceptable value (422)
    Validation { field: &'static str, reason: String },

    /// Bad credentials, inactive account, or bad token (401)
    Unauthorized { message: &'static str },

    /// Per-call store deadline elapsed (504)
    Timeout { timeout: Duration },

    /// Store error (500, logged)
    Store(DbError),

    /// Internal error (500, logged)
    Internal { message: String },
}

impl ApiError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Store(_) | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::InvalidInput { message } => message.clone(),
            Self::NotFound { resource, id } => format!("{} '{}' not found", resource, id),
            Self::Conflict { resource, field } => {
                format!("{} with this {} already exists", resource, field)
            }
            Self::Validation { field, reason } => format!("{}: {}", field, reason),
            Self::Unauthorized { message } => (*message).to_string(),
            Self::Timeout { timeout } => {
                format!("operation timed out after {} seconds", timeout.as_secs())
            }
            Self::Store(_) | Self::Internal { .. } => "an internal error occurred".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Store(e) => tracing::error!("Database error: {}", e),
            Self::Internal { message } => tracing::error!("Internal error: {}", message),
            Self::Timeout { timeout } => tracing::warn!(?timeout, "store deadline exceeded"),
            _ => {}
        }

        (self.status(), Json(Envelope::error(self.client_message()))).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, id } => Self::NotFound { resource, id },
            DbError::Conflict { resource, field } => Self::Conflict { resource, field },
            DbError::MissingReference { resource } => Self::Validation {
                field: resource,
                reason: "referenced record does not exist".to_string(),
            },
            DbError::Timeout { timeout } => Self::Timeout { timeout },
            DbError::Sqlx(_) => Self::Store(e),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => Self::Unauthorized {
                message: "invalid username/password",
            },
            AuthError::AccountInactive => Self::Unauthorized {
                message: "user is not active",
            },
            AuthError::InvalidToken => Self::Unauthorized {
                message: "invalid or expired token",
            },
            AuthError::Store(e) => e.into(),
            AuthError::Password(e) => e.into(),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::Empty => Self::Validation {
                field: "password",
                reason: "cannot be empty".to_string(),
            },
            other => Self::Internal {
                message: other.to_string(),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "rejected JSON body");
        Self::invalid_input("invalid json supplied, or json missing entirely")
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::invalid_input(rejection.body_text())
    }
}
