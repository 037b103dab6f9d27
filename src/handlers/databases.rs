//! Catalog handlers: database listing, object search and object detail.

use crate::command::ParameterValues;
use crate::error::AppError;
use crate::extractors::RequestContext;
use crate::resolver::MediaType;
use crate::response::{content_response, databases_ok, DatabasesBody};
use crate::state::AppState;
use crate::tenant::TenantContext;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
    Json,
};

pub const MISSING_CONTEXT: &str = "Missing or invalid context. Use ?ctx=... or 'X-API-Context' header.";

fn require_tenant<'a>(state: &'a AppState, context: &RequestContext) -> Result<&'a TenantContext, AppError> {
    context
        .as_deref()
        .and_then(|key| state.tenants.get(key))
        .ok_or_else(|| AppError::TenantNotFound(MISSING_CONTEXT.into()))
}

pub async fn list_databases(
    State(state): State<AppState>,
    context: RequestContext,
) -> Result<(StatusCode, Json<DatabasesBody>), AppError> {
    let tenant = require_tenant(&state, &context)?;
    let databases = state.catalog.list_databases(tenant).await?;
    Ok(databases_ok(databases))
}

pub async fn search_objects(
    State(state): State<AppState>,
    context: RequestContext,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let tenant = require_tenant(&state, &context)?;
    let body = state
        .catalog
        .search_objects(tenant, ParameterValues::from_query_pairs(pairs))
        .await?;
    content_response(MediaType::Json, body, "dbobjects")
}

pub async fn object_detail(
    State(state): State<AppState>,
    context: RequestContext,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let tenant = require_tenant(&state, &context)?;
    let body = state
        .catalog
        .object_detail(tenant, ParameterValues::from_query_pairs(pairs))
        .await?;
    content_response(MediaType::Json, body, "dbobject")
}
