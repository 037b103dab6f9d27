//! Gateway routes: catalog endpoints plus the `api/{endpoint}` fallback.

use crate::handlers::{data_source, list_databases, object_detail, search_objects};
use crate::routes::common::common_routes;
use crate::state::AppState;
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

pub fn gateway_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/dbdatabases", get(list_databases))
        .route("/api/dbobjects", get(search_objects))
        .route("/api/dbobject", get(object_detail))
        .fallback(data_source)
        .with_state(state)
}

/// Full application router with request tracing.
pub fn app(state: AppState) -> Router {
    common_routes(state.clone())
        .merge(gateway_routes(state))
        .layer(TraceLayer::new_for_http())
}
