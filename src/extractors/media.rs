//! `Accept` header negotiation between the two served media types.

use crate::resolver::AcceptedMedia;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::ACCEPT, request::Parts},
};

#[async_trait]
impl<S> FromRequestParts<S> for AcceptedMedia
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get_all(ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(",");
        Ok(AcceptedMedia::parse(&header))
    }
}
