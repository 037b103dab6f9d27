//! Picks the artifact that answers a data request. With a tenant: templated query, then the
//! tenant's static file. Without one: the generic static file. Otherwise nothing.

use crate::tenant::TenantContext;
use std::path::{Path, PathBuf};

pub const MEDIA_TYPE_XML: &str = "application/xml";
pub const MEDIA_TYPE_JSON: &str = "application/json";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaType {
    Json,
    Xml,
}

impl MediaType {
    pub fn content_type(&self) -> &'static str {
        match self {
            MediaType::Json => MEDIA_TYPE_JSON,
            MediaType::Xml => MEDIA_TYPE_XML,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::Json => "json",
            MediaType::Xml => "xml",
        }
    }
}

/// Which of the two served media types the client listed in `Accept`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AcceptedMedia {
    pub xml: bool,
    pub json: bool,
}

impl AcceptedMedia {
    /// Parses an `Accept` header value; parameters after `;` are ignored.
    pub fn parse(header: &str) -> Self {
        let header = header.to_lowercase();
        let mut accepted = AcceptedMedia::default();
        for item in header.split(',') {
            match item.split(';').next().unwrap_or_default().trim() {
                MEDIA_TYPE_XML => accepted.xml = true,
                MEDIA_TYPE_JSON => accepted.json = true,
                _ => {}
            }
        }
        accepted
    }

    /// XML only when XML is accepted and JSON is not.
    pub fn preferred(&self) -> MediaType {
        if self.xml && !self.json {
            MediaType::Xml
        } else {
            MediaType::Json
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedArtifact {
    TemplatedQuery { descriptor: PathBuf, tenant: TenantContext },
    StaticFile { path: PathBuf },
    None,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub media: MediaType,
    pub artifact: ResolvedArtifact,
}

/// Looks artifacts up under a fixed root. Only checks file presence.
#[derive(Clone, Debug)]
pub struct DataSourceResolver {
    root: PathBuf,
}

impl DataSourceResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DataSourceResolver { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `file_name` under the root, if it exists as a file.
    pub async fn find(&self, file_name: &str) -> Option<PathBuf> {
        let path = self.root.join(file_name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    pub async fn resolve(
        &self,
        tenant: Option<&TenantContext>,
        endpoint: &str,
        accepted: &AcceptedMedia,
    ) -> Resolution {
        let media = accepted.preferred();
        let artifact = self.resolve_artifact(tenant, endpoint, media).await;
        tracing::debug!(endpoint, tenant = tenant.map(|t| t.key.as_str()), ?media, ?artifact, "resolved data source");
        Resolution { media, artifact }
    }

    async fn resolve_artifact(
        &self,
        tenant: Option<&TenantContext>,
        endpoint: &str,
        media: MediaType,
    ) -> ResolvedArtifact {
        if !is_safe_endpoint(endpoint) {
            return ResolvedArtifact::None;
        }
        let ext = media.extension();
        let static_name = match tenant {
            Some(tenant) => {
                if let Some(descriptor) = self.find(&format!("{}.{}ds", endpoint, ext)).await {
                    return ResolvedArtifact::TemplatedQuery {
                        descriptor,
                        tenant: tenant.clone(),
                    };
                }
                format!("{}.[{}].{}", endpoint, tenant.key, ext)
            }
            None => format!("{}.{}", endpoint, ext),
        };
        match self.find(&static_name).await {
            Some(path) => ResolvedArtifact::StaticFile { path },
            None => ResolvedArtifact::None,
        }
    }
}

/// Endpoint names stay a single file-name stem under the root.
fn is_safe_endpoint(endpoint: &str) -> bool {
    !endpoint.is_empty()
        && !endpoint.starts_with('.')
        && !endpoint.contains(['/', '\\'])
        && !endpoint.contains("..")
}
