//! Gateway configuration
//!
//! Loaded from an optional YAML file (`DMN_GATEWAY_CONFIG`), with the
//! listening port overridable through `DMN_GATEWAY_PORT`. Every field has a
//! default, so an empty file or no file at all serves the embedded dinner
//! model on port 50051.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::{Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use dmn_gateway_core::{HandlePolicy, ModelIdentifier, RuntimeOptions};

use crate::dinner::{DINNER_ARTIFACT, DINNER_MODEL, DINNER_NAMESPACE};

pub const CONFIG_PATH_ENV: &str = "DMN_GATEWAY_CONFIG";
pub const PORT_ENV: &str = "DMN_GATEWAY_PORT";
pub const DEFAULT_PORT: u16 = 50051;

/// Root configuration for the gateway server
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    pub port: u16,
    pub model: ModelConfig,
    pub handle_policy: HandlePolicy,
    /// Reject ill-typed inputs and decision outputs
    pub strict_type_check: bool,
    /// Per-call evaluation bound; unset means unbounded
    pub evaluation_timeout_ms: Option<u64>,
}

/// Which model to serve and where its artifact lives
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub namespace: String,
    pub name: String,
    pub artifact: String,
    /// Directory to read `artifact` from; unset serves the embedded copy
    pub directory: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            model: ModelConfig::default(),
            handle_policy: HandlePolicy::default(),
            strict_type_check: true,
            evaluation_timeout_ms: None,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            namespace: DINNER_NAMESPACE.to_string(),
            name: DINNER_MODEL.to_string(),
            artifact: DINNER_ARTIFACT.to_string(),
            directory: None,
        }
    }
}

impl GatewayConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).context("invalid gateway configuration")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&yaml).with_context(|| format!("in {}", path.display()))
    }

    /// Load from the process environment.
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match lookup(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(port) = lookup(PORT_ENV) {
            config.port = port
                .trim()
                .parse()
                .with_context(|| format!("{PORT_ENV} is not a valid port: {port:?}"))?;
        }

        Ok(config)
    }

    /// Listen on every interface, IPv4 and IPv6.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, self.port))
    }

    pub fn evaluation_timeout(&self) -> Option<Duration> {
        self.evaluation_timeout_ms.map(Duration::from_millis)
    }

    pub fn model_identifier(&self) -> ModelIdentifier {
        ModelIdentifier::new(&self.model.namespace, &self.model.name, &self.model.artifact)
    }

    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            strict_type_check: self.strict_type_check,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::from_yaml("").unwrap();
        assert_eq!(config, GatewayConfig::default());
        assert_eq!(config.port, 50051);
        assert_eq!(config.handle_policy, HandlePolicy::PerCall);
        assert!(config.strict_type_check);
        assert_eq!(config.evaluation_timeout(), None);
        assert_eq!(config.model_identifier().name(), "Dinner");
    }

    #[test]
    fn test_full_file() {
        let config = GatewayConfig::from_yaml(
            r#"
port: 6000
handle_policy: cached
strict_type_check: false
evaluation_timeout_ms: 250
model:
  namespace: urn:test
  name: Lunch
  artifact: lunch.yaml
  directory: /srv/models
"#,
        )
        .unwrap();

        assert_eq!(config.port, 6000);
        assert_eq!(config.handle_policy, HandlePolicy::Cached);
        assert!(!config.runtime_options().strict_type_check);
        assert_eq!(config.evaluation_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.model.directory, Some(PathBuf::from("/srv/models")));
        assert_eq!(config.model_identifier().artifact(), "lunch.yaml");
    }

    #[test]
    fn test_example_file_parses_to_defaults() {
        let config = GatewayConfig::from_yaml(include_str!("../../config/gateway.example.yaml"))
            .unwrap();
        assert_eq!(config, GatewayConfig::default());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(GatewayConfig::from_yaml("prot: 1").is_err());
    }

    #[test]
    fn test_env_overrides_port() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.yaml");
        std::fs::write(&path, "port: 7000\nhandle_policy: cached\n").unwrap();

        let env: HashMap<&str, String> = HashMap::from([
            (CONFIG_PATH_ENV, path.display().to_string()),
            (PORT_ENV, "7100".to_string()),
        ]);
        let config = GatewayConfig::load_with(|k| env.get(k).cloned()).unwrap();

        assert_eq!(config.port, 7100);
        assert_eq!(config.handle_policy, HandlePolicy::Cached);
    }

    #[test]
    fn test_bad_port_rejected() {
        let result = GatewayConfig::load_with(|k| (k == PORT_ENV).then(|| "http".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_config_file_rejected() {
        let result = GatewayConfig::load_with(|k| {
            (k == CONFIG_PATH_ENV).then(|| "/nonexistent/gateway.yaml".to_string())
        });
        assert!(result.is_err());
    }
}
