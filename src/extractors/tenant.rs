//! Extract the request context (tenant) from `?ctx=` or the `X-API-Context` header.

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};

/// Header carrying the request context when the query string does not.
pub const CONTEXT_HEADER: &str = "X-API-Context";

/// Query parameter carrying the request context. Wins over the header.
pub const CONTEXT_QUERY_PARAM: &str = "ctx";

/// Extractor for the optional request context. Blank values count as absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext(pub Option<String>);

impl RequestContext {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

fn non_blank(s: &str) -> Option<String> {
    Some(s.trim().to_string()).filter(|s| !s.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let from_query = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(pairs)| {
                pairs
                    .into_iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(CONTEXT_QUERY_PARAM))
                    .and_then(|(_, v)| non_blank(&v))
            });
        let value = from_query.or_else(|| {
            parts
                .headers
                .get(CONTEXT_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(non_blank)
        });
        Ok(RequestContext(value))
    }
}
