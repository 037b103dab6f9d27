//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("duplicate context: '{0}' (context names are case-insensitive)")]
    DuplicateContext(String),
}

/// Strict-mode coercion failures. Lenient coercion never surfaces these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoerceError {
    #[error("cannot convert null input to non-nullable type '{target}'")]
    NullInput { target: &'static str },
    #[error("cannot convert value '{value}' of type '{source_type}' to type '{target}'")]
    Conversion {
        source_type: &'static str,
        value: String,
        target: &'static str,
    },
}

impl CoerceError {
    pub(crate) fn conversion(source_type: &'static str, value: impl ToString, target: &'static str) -> Self {
        CoerceError::Conversion {
            source_type,
            value: value.to_string(),
            target,
        }
    }
}

/// Command descriptor documents that cannot be compiled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("malformed command descriptor: {0}")]
    Malformed(String),
    #[error("unresolved parameter type '{token}' for parameter '{parameter}'")]
    UnresolvedType { parameter: String, token: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("{0}")]
    TenantNotFound(String),
    #[error("no connection string configured for context '{0}'")]
    BadConnection(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::Descriptor(_) => (StatusCode::BAD_REQUEST, "descriptor_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::TenantNotFound(_) => (StatusCode::BAD_REQUEST, "invalid_context"),
            AppError::BadConnection(_) => (StatusCode::BAD_REQUEST, "bad_connection"),
            AppError::Db(e) => {
                if let sqlx::Error::Configuration(_) = e {
                    (StatusCode::BAD_REQUEST, "bad_connection")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
        }
    }

    /// Structured fields of the failure, when it carries any beyond its message.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Descriptor(DescriptorError::UnresolvedType { parameter, token }) => {
                Some(serde_json::json!({ "parameter": parameter, "type": token }))
            }
            AppError::BadConnection(context) => Some(serde_json::json!({ "context": context })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: self.details(),
            },
        };
        (status, Json(body)).into_response()
    }
}
