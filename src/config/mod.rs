//! Configuration loading and management

use crate::core::meta::FieldsetMeta;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default nesting depth accepted when building fieldsets
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Default cap on handler bodies buffered for shaping (10 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Names of the selector query parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Parameter carrying the field selector
    pub fields_kw: String,

    /// Parameter carrying the embed selector
    #[serde(alias = "embedd_kw")]
    pub embed_kw: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            fields_kw: "fields".to_string(),
            embed_kw: "embedd".to_string(),
        }
    }
}

/// Complete configuration for fieldsets
///
/// # Example
///
/// ```yaml
/// query:
///   fields_kw: fields
///   embed_kw: embedd
/// max_depth: 16
/// max_body_bytes: 1048576
/// fieldsets:
///   topic:
///     default_fields: [tid, title]
///   post:
///     default_embedd: []
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldsetsConfig {
    /// Selector parameter names
    #[serde(default)]
    pub query: QueryConfig,

    /// Depth guard for nested fieldsets
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Largest handler body the marshal layer buffers
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Meta overrides keyed by fieldset name
    #[serde(default)]
    pub fieldsets: HashMap<String, FieldsetMeta>,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

impl Default for FieldsetsConfig {
    fn default() -> Self {
        Self {
            query: QueryConfig::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            fieldsets: HashMap::new(),
        }
    }
}

impl FieldsetsConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Meta override for a fieldset, if any
    pub fn meta_for(&self, fieldset: &str) -> Option<&FieldsetMeta> {
        self.fieldsets.get(fieldset)
    }

    /// Merge several configurations
    ///
    /// Later configs win for scalar settings; fieldset overrides are merged
    /// key by key with the later config taking precedence.
    pub fn merge(configs: Vec<FieldsetsConfig>) -> Self {
        let mut merged = FieldsetsConfig::default();

        for config in configs {
            merged.query = config.query;
            merged.max_depth = config.max_depth;
            merged.max_body_bytes = config.max_body_bytes;
            for (name, meta) in config.fieldsets {
                let combined = match merged.fieldsets.get(&name) {
                    Some(existing) => existing.merge(&meta),
                    None => meta,
                };
                merged.fieldsets.insert(name, combined);
            }
        }

        merged
    }
}
