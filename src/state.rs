//! Shared application state for all routes. Read-only after startup.

use crate::config::{data_sources_root, GatewaySettings};
use crate::resolver::DataSourceResolver;
use crate::service::{CommandRunner, DatabaseCatalog, DescriptorCache, GatewayExecutor};
use crate::tenant::TenantRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub tenants: Arc<TenantRegistry>,
    pub resolver: Arc<DataSourceResolver>,
    pub executor: Arc<GatewayExecutor>,
    pub catalog: Arc<DatabaseCatalog>,
}

impl AppState {
    /// Wires registry, resolver, executor and catalog from `settings`, running commands
    /// through `runner`.
    pub fn new(settings: &GatewaySettings, runner: Arc<dyn CommandRunner>) -> Self {
        let tenants = Arc::new(TenantRegistry::from_settings(settings));
        let resolver = Arc::new(DataSourceResolver::new(data_sources_root(settings)));
        let cache = DescriptorCache::new(settings.cache_descriptors);
        let executor = Arc::new(GatewayExecutor::new(tenants.clone(), cache, runner));
        let catalog = Arc::new(DatabaseCatalog::new(resolver.clone(), executor.clone()));
        AppState {
            tenants,
            resolver,
            executor,
            catalog,
        }
    }
}
