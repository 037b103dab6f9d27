//! Response helpers: raw data-source content and the database listing envelope.

use crate::error::AppError;
use crate::resolver::MediaType;
use crate::service::DatabaseInfo;
use axum::{
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Raw `body` with the media type's content type; blank bodies are not found.
pub fn content_response(media: MediaType, body: String, endpoint: &str) -> Result<Response, AppError> {
    if body.trim().is_empty() {
        return Err(AppError::NotFound(endpoint.to_string()));
    }
    Ok((StatusCode::OK, [(CONTENT_TYPE, media.content_type())], body).into_response())
}

#[derive(Serialize)]
pub struct DatabasesBody {
    pub databases: Vec<DatabaseInfo>,
}

pub fn databases_ok(databases: Vec<DatabaseInfo>) -> (StatusCode, Json<DatabasesBody>) {
    (StatusCode::OK, Json(DatabasesBody { databases }))
}
