//! Multi-tenant registry: request contexts and their connection strings, loaded from settings.

use crate::config::GatewaySettings;
use crate::error::AppError;
use std::collections::HashMap;

/// Maps a short database abbreviation used in requests to the actual database name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseAlias {
    pub abbreviation: String,
    pub actual_name: String,
}

/// One configured request context. Read-only after load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TenantContext {
    /// Lowercased registry key; also used in tenant-specific static file names.
    pub key: String,
    pub name: String,
    pub connection_string_key: String,
    pub databases: Vec<DatabaseAlias>,
}

impl TenantContext {
    /// `abbr=name` pairs joined by `;`, in configured order.
    pub fn alias_mappings(&self) -> String {
        self.databases
            .iter()
            .map(|db| format!("{}={}", db.abbreviation, db.actual_name))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// In-memory tenant registry built from settings. Thread-safe via Arc.
#[derive(Clone, Debug, Default)]
pub struct TenantRegistry {
    by_key: HashMap<String, TenantContext>,
    connection_strings: HashMap<String, String>,
}

impl TenantRegistry {
    /// Builds the registry from validated settings. Contexts whose connection string key is
    /// not configured are kept; requests needing a connection fail for them later.
    pub fn from_settings(settings: &GatewaySettings) -> Self {
        let mut by_key = HashMap::new();
        for (key, ctx) in &settings.contexts {
            let key = key.trim().to_lowercase();
            if !ctx.connection_string_key.trim().is_empty()
                && !settings.connection_strings.contains_key(ctx.connection_string_key.trim())
            {
                tracing::warn!(
                    "context {}: connection string '{}' is not configured",
                    key,
                    ctx.connection_string_key
                );
            }
            let databases = ctx
                .databases
                .iter()
                .map(|db| DatabaseAlias {
                    abbreviation: db.abbr.trim().to_string(),
                    actual_name: db.name.trim().to_string(),
                })
                .collect();
            by_key.insert(
                key.clone(),
                TenantContext {
                    key,
                    name: ctx.name.clone(),
                    connection_string_key: ctx.connection_string_key.trim().to_string(),
                    databases,
                },
            );
        }
        TenantRegistry {
            by_key,
            connection_strings: settings.connection_strings.clone(),
        }
    }

    /// Case-insensitive lookup; blank identifiers never match.
    pub fn get(&self, tenant_id: &str) -> Option<&TenantContext> {
        let key = tenant_id.trim();
        if key.is_empty() {
            return None;
        }
        self.by_key.get(&key.to_lowercase())
    }

    /// Connection string of `tenant`; blank key or blank configured value is `BadConnection`.
    pub fn connection_string(&self, tenant: &TenantContext) -> Result<&str, AppError> {
        if tenant.connection_string_key.is_empty() {
            return Err(AppError::BadConnection(tenant.key.clone()));
        }
        self.connection_strings
            .get(&tenant.connection_string_key)
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppError::BadConnection(tenant.key.clone()))
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
