//! Load settings from a JSON file, with environment overrides.

use crate::config::{validate, GatewaySettings};
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Settings file used when `GATEWAY_SETTINGS` is unset.
pub const DEFAULT_SETTINGS_FILE: &str = "appsettings.json";

/// Parse and validate settings JSON.
pub fn parse_settings(json: &str) -> Result<GatewaySettings, ConfigError> {
    let settings: GatewaySettings =
        serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))?;
    validate(&settings)?;
    Ok(settings)
}

/// Read settings from `path`. A missing file yields defaults.
pub async fn load_settings(path: &Path) -> Result<GatewaySettings, ConfigError> {
    match tokio::fs::read_to_string(path).await {
        Ok(json) => parse_settings(&json),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("settings file {} not found, using defaults", path.display());
            Ok(GatewaySettings::default())
        }
        Err(e) => Err(ConfigError::Load(format!("{}: {}", path.display(), e))),
    }
}

/// Load settings from `GATEWAY_SETTINGS` (default `appsettings.json`); `DATA_SOURCES_PATH`
/// overrides the artifact root.
pub async fn load_settings_from_env() -> Result<GatewaySettings, ConfigError> {
    let path = std::env::var("GATEWAY_SETTINGS").unwrap_or_else(|_| DEFAULT_SETTINGS_FILE.into());
    let mut settings = load_settings(Path::new(&path)).await?;
    if let Ok(root) = std::env::var("DATA_SOURCES_PATH") {
        if !root.trim().is_empty() {
            settings.data_sources_path = root;
        }
    }
    Ok(settings)
}

/// Artifact root as a path.
pub fn data_sources_root(settings: &GatewaySettings) -> PathBuf {
    PathBuf::from(settings.data_sources_path.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_and_pascal_case() {
        let camel = parse_settings(
            r#"{ "dataSourcesPath": "ds", "cacheDescriptors": false,
                 "connectionStrings": { "A": "postgres://a" },
                 "contexts": { "dev": { "name": "Dev", "connectionStringKey": "A",
                                        "databases": [ { "abbr": "x", "name": "y" } ] } } }"#,
        )
        .unwrap();
        let pascal = parse_settings(
            r#"{ "DataSourcesPath": "ds", "CacheDescriptors": false,
                 "ConnectionStrings": { "A": "postgres://a" },
                 "Contexts": { "dev": { "Name": "Dev", "ConnectionStringKey": "A",
                                        "Databases": [ { "Abbr": "x", "Name": "y" } ] } } }"#,
        )
        .unwrap();
        for s in [camel, pascal] {
            assert_eq!(s.data_sources_path, "ds");
            assert!(!s.cache_descriptors);
            assert_eq!(s.connection_strings["A"], "postgres://a");
            let dev = &s.contexts["dev"];
            assert_eq!(dev.connection_string_key, "A");
            assert_eq!(dev.databases[0].name, "y");
        }
    }

    #[test]
    fn empty_object_gets_defaults() {
        let s = parse_settings("{}").unwrap();
        assert_eq!(s.data_sources_path, "data-sources");
        assert!(s.cache_descriptors);
        assert!(s.contexts.is_empty());
    }

    #[test]
    fn invalid_json_is_load_error() {
        assert!(matches!(parse_settings("{ nope"), Err(ConfigError::Load(_))));
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings(&dir.path().join("absent.json")).await.unwrap();
        assert_eq!(data_sources_root(&s), PathBuf::from("data-sources"));
    }

    #[tokio::test]
    async fn reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("appsettings.json");
        std::fs::write(&path, r#"{ "dataSourcesPath": " /srv/ds " }"#).unwrap();
        let s = load_settings(&path).await.unwrap();
        assert_eq!(data_sources_root(&s), PathBuf::from("/srv/ds"));
    }
}
