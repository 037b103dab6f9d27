//! Fallback handler serving `api/{endpoint}` from the data-source root.

use crate::command::ParameterValues;
use crate::error::AppError;
use crate::extractors::RequestContext;
use crate::resolver::AcceptedMedia;
use crate::response::content_response;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::Uri,
    response::Response,
};
use std::borrow::Cow;

/// Percent-decoded endpoint named by a path of the form `/api/{endpoint}[/...]`.
pub fn endpoint_from_path(path: &str) -> Option<Cow<'_, str>> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    match segments.next() {
        Some(first) if first.eq_ignore_ascii_case("api") => {
            segments.next().and_then(|s| urlencoding::decode(s).ok())
        }
        _ => None,
    }
}

pub async fn data_source(
    State(state): State<AppState>,
    context: RequestContext,
    accepted: AcceptedMedia,
    uri: Uri,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let endpoint = endpoint_from_path(uri.path()).ok_or_else(|| AppError::NotFound(uri.path().to_string()))?;
    let tenant = context.as_deref().and_then(|key| {
        let tenant = state.tenants.get(key);
        if tenant.is_none() {
            tracing::debug!(context = key, "unknown context, serving generic data sources");
        }
        tenant
    });
    let values = ParameterValues::from_query_pairs(pairs);
    let resolution = state.resolver.resolve(tenant, &endpoint, &accepted).await;
    let body = state.executor.execute(&resolution, &values).await?;
    content_response(resolution.media, body, &endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_follows_api_segment() {
        assert_eq!(endpoint_from_path("/api/widgets").as_deref(), Some("widgets"));
        assert_eq!(endpoint_from_path("/API/widgets/extra").as_deref(), Some("widgets"));
        assert_eq!(endpoint_from_path("//api//widgets").as_deref(), Some("widgets"));
        assert_eq!(endpoint_from_path("/api"), None);
        assert_eq!(endpoint_from_path("/other/widgets"), None);
        assert_eq!(endpoint_from_path("/"), None);
    }

    #[test]
    fn endpoint_is_percent_decoded() {
        assert_eq!(endpoint_from_path("/api/my%20widgets").as_deref(), Some("my widgets"));
        assert_eq!(endpoint_from_path("/api/..%2Fwidgets").as_deref(), Some("../widgets"));
        assert_eq!(endpoint_from_path("/api/%FF"), None);
    }
}
