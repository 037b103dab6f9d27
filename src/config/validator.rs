//! Settings validation: context key uniqueness and alias completeness.

use crate::config::GatewaySettings;
use crate::error::ConfigError;
use std::collections::HashSet;

pub fn validate(settings: &GatewaySettings) -> Result<(), ConfigError> {
    if settings.data_sources_path.trim().is_empty() {
        return Err(ConfigError::Validation("dataSourcesPath must not be blank".into()));
    }

    let mut keys = HashSet::new();
    for (key, ctx) in &settings.contexts {
        let normalized = key.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(ConfigError::Validation("context key must not be blank".into()));
        }
        if !keys.insert(normalized) {
            return Err(ConfigError::DuplicateContext(key.clone()));
        }
        for db in &ctx.databases {
            if db.abbr.trim().is_empty() || db.name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "context {}: database alias requires abbr and name",
                    key
                )));
            }
        }
    }
    Ok(())
}
