//! Raw settings types matching the settings JSON.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Artifact root used when neither settings nor environment name one.
pub const DEFAULT_DATA_SOURCES_PATH: &str = "data-sources";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySettings {
    #[serde(default = "default_data_sources_path", alias = "DataSourcesPath")]
    pub data_sources_path: String,
    /// Keep compiled descriptors for the life of the process.
    #[serde(default = "default_true", alias = "CacheDescriptors")]
    pub cache_descriptors: bool,
    #[serde(default, alias = "ConnectionStrings")]
    pub connection_strings: HashMap<String, String>,
    #[serde(default, alias = "Contexts")]
    pub contexts: HashMap<String, ContextConfig>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        GatewaySettings {
            data_sources_path: default_data_sources_path(),
            cache_descriptors: true,
            connection_strings: HashMap::new(),
            contexts: HashMap::new(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextConfig {
    #[serde(default, alias = "Name")]
    pub name: String,
    #[serde(default, alias = "ConnectionStringKey")]
    pub connection_string_key: String,
    #[serde(default, alias = "Databases")]
    pub databases: Vec<DatabaseAliasConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseAliasConfig {
    #[serde(alias = "Abbr")]
    pub abbr: String,
    #[serde(alias = "Name")]
    pub name: String,
}

fn default_data_sources_path() -> String {
    DEFAULT_DATA_SOURCES_PATH.into()
}

fn default_true() -> bool {
    true
}
