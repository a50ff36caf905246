//! Service configuration loading and types.

use anyhow::{Context, Result};
use ngsi_protocol::{Entity, NgsiError, NgsiResult};
use serde::Deserialize;
use std::path::Path;

/// Service configuration loaded from a YAML file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Prefix for the links returned by the entry point (empty for relative links).
    #[serde(default)]
    pub base_url: String,

    /// Pagination limits.
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Subscription settings.
    #[serde(default)]
    pub subscriptions: SubscriptionsConfig,

    /// Entities loaded into the in-memory backend at startup.
    #[serde(default)]
    pub seed_entities: Vec<Entity>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            pagination: PaginationConfig::default(),
            subscriptions: SubscriptionsConfig::default(),
            seed_entities: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                "Config file {} does not exist, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read: {:?}", path))?;

        let config: ServerConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse: {:?}", path))?;

        tracing::info!(
            seed_entities = config.seed_entities.len(),
            "Loaded configuration from {:?}",
            path
        );

        Ok(config)
    }

    /// Root of the API as advertised by the entry point.
    pub fn api_root(&self) -> String {
        format!("{}/v2", self.base_url.trim_end_matches('/'))
    }
}

/// Page size limits applied to list operations.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    /// Limit used when the request does not give one.
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Largest limit a request may ask for.
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

fn default_limit() -> usize {
    20
}

fn default_max_limit() -> usize {
    1000
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl PaginationConfig {
    /// Resolve the effective limit for a request (0 means not given).
    pub fn resolve_limit(&self, requested: usize) -> NgsiResult<usize> {
        match requested {
            0 => Ok(self.default_limit),
            limit if limit > self.max_limit => Err(NgsiError::BadRequest(format!(
                "Bad pagination limit: /{}/ [max: {}]",
                limit, self.max_limit
            ))),
            limit => Ok(limit),
        }
    }
}

/// Subscription settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionsConfig {
    /// Whether the subscription operations are served.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SubscriptionsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::load(dir.path().join("absent.yaml")).unwrap();

        assert_eq!(config.pagination.default_limit, 20);
        assert_eq!(config.pagination.max_limit, 1000);
        assert!(config.subscriptions.enabled);
        assert!(config.seed_entities.is_empty());
        assert_eq!(config.api_root(), "/v2");
    }

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
base_url: "http://broker:1026/"
pagination:
  max_limit: 50
subscriptions:
  enabled: false
seed_entities:
  - id: Room1
    type: Room
    temperature:
      value: 21.7
      type: Number
"#
        )
        .unwrap();

        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.api_root(), "http://broker:1026/v2");
        assert_eq!(config.pagination.default_limit, 20);
        assert_eq!(config.pagination.max_limit, 50);
        assert!(!config.subscriptions.enabled);

        let room = &config.seed_entities[0];
        assert_eq!(room.id, "Room1");
        assert_eq!(
            room.attribute("temperature").unwrap().type_.as_deref(),
            Some("Number")
        );
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "pagination: [").unwrap();
        assert!(ServerConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_resolve_limit() {
        let pagination = PaginationConfig::default();
        assert_eq!(pagination.resolve_limit(0), Ok(20));
        assert_eq!(pagination.resolve_limit(1000), Ok(1000));
        assert!(matches!(
            pagination.resolve_limit(1001),
            Err(NgsiError::BadRequest(_))
        ));
    }
}
