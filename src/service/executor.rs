//! Serves a resolved artifact: runs templated queries, reads static files.

use crate::command::{bind, ParameterValues};
use crate::error::AppError;
use crate::resolver::{Resolution, ResolvedArtifact};
use crate::service::cache::DescriptorCache;
use crate::service::runner::{CommandRunner, ConnectionTarget, PreparedCommand};
use crate::sql::build_statement;
use crate::tenant::{TenantContext, TenantRegistry};
use std::path::Path;
use std::sync::Arc;

pub struct GatewayExecutor {
    tenants: Arc<TenantRegistry>,
    cache: DescriptorCache,
    runner: Arc<dyn CommandRunner>,
}

impl GatewayExecutor {
    pub fn new(tenants: Arc<TenantRegistry>, cache: DescriptorCache, runner: Arc<dyn CommandRunner>) -> Self {
        GatewayExecutor {
            tenants,
            cache,
            runner,
        }
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    /// Response body for `resolution`. Empty text when nothing was resolved.
    pub async fn execute(&self, resolution: &Resolution, values: &ParameterValues) -> Result<String, AppError> {
        match &resolution.artifact {
            ResolvedArtifact::TemplatedQuery { descriptor, tenant } => {
                let target = self.connection_target(tenant)?;
                self.run_text(&target, descriptor, values).await
            }
            ResolvedArtifact::StaticFile { path } => Ok(tokio::fs::read_to_string(path).await?),
            ResolvedArtifact::None => Ok(String::new()),
        }
    }

    /// Connection target of `tenant`; `BadConnection` when it has no usable connection string.
    pub fn connection_target(&self, tenant: &TenantContext) -> Result<ConnectionTarget, AppError> {
        self.tenants
            .connection_string(tenant)
            .map(ConnectionTarget::new)
            .map_err(|e| {
                tracing::warn!("context {}: no connection string", tenant.key);
                e
            })
    }

    /// Loads the descriptor at `descriptor`, binds `values` and builds the statement.
    pub async fn prepare(&self, descriptor: &Path, values: &ParameterValues) -> Result<PreparedCommand, AppError> {
        let command = self.cache.load(descriptor).await?;
        let timeout_seconds = command.timeout_seconds;
        let bound = bind(command, values);
        let query = build_statement(&bound)?;
        Ok(PreparedCommand {
            query,
            timeout_seconds,
        })
    }

    /// Runs a templated query and concatenates the first column of every row.
    pub async fn run_text(
        &self,
        target: &ConnectionTarget,
        descriptor: &Path,
        values: &ParameterValues,
    ) -> Result<String, AppError> {
        let command = self.prepare(descriptor, values).await?;
        let parts = self.runner.fetch_first_column(target, &command).await?;
        Ok(parts.concat())
    }
}
