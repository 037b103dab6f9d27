//! Request extractors: request context and accepted media types.

mod media;
pub mod tenant;

pub use tenant::{RequestContext, CONTEXT_HEADER, CONTEXT_QUERY_PARAM};
