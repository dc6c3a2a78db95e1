// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use url::Url;

use crate::classify::{PatternError, RuleSet};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("environment variable '{0}' is referenced but not set")]
    MissingEnv(String),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_store_prefix() -> String {
    "cachette".to_string()
}

fn default_gateway_address() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8787
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Version tag. Changing it is what rolls a deployment over: the
    /// store name embeds it, and activation retires every other version.
    #[serde(default = "default_version")]
    pub version: String,

    /// Namespace prefix for store names
    #[serde(default = "default_store_prefix")]
    pub store_prefix: String,

    /// The origin this manager serves; relative manifest entries and the
    /// same-origin persistence rule resolve against it
    pub origin: String,

    /// Manifest of URLs precached at install, relative to the origin or
    /// absolute for third-party assets
    #[serde(default)]
    pub precache: Vec<String>,

    /// Classification rule groups
    #[serde(default)]
    pub rules: RulesConfig,

    /// Gateway listener settings
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Regular-expression groups, matched against the full absolute URL.
/// The first group with a match decides the strategy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub network_first: Vec<String>,

    #[serde(default)]
    pub cache_first: Vec<String>,

    #[serde(default)]
    pub stale_while_revalidate: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_address")]
    pub address: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            address: default_gateway_address(),
            port: default_gateway_port(),
        }
    }
}

impl GatewayConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, ConfigError> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| ConfigError::MissingEnv(var_name.to_string()))?;
        }

        // Now perform the substitution (we know all vars exist)
        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap() // Safe because we checked above
        });

        let config: Config = serde_yaml::from_str(&substituted)?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_with_env(&yaml)
    }

    /// The configured origin as a parsed URL
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin).map_err(|e| {
            ConfigError::Invalid(format!("origin '{}' is not a valid URL: {}", self.origin, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "origin '{}' must use http or https",
                self.origin
            )));
        }
        if url.host_str().is_none() {
            return Err(ConfigError::Invalid(format!(
                "origin '{}' has no host",
                self.origin
            )));
        }

        Ok(url)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.is_empty() {
            return Err(ConfigError::Invalid("version cannot be empty".to_string()));
        }

        if self.store_prefix.is_empty() {
            return Err(ConfigError::Invalid(
                "store_prefix cannot be empty".to_string(),
            ));
        }

        let origin = self.origin_url()?;

        // Every manifest entry must resolve to a fetchable URL
        for entry in &self.precache {
            match Url::parse(entry) {
                Ok(url) => {
                    if !matches!(url.scheme(), "http" | "https") {
                        return Err(ConfigError::Invalid(format!(
                            "precache entry '{}' must use http or https",
                            entry
                        )));
                    }
                }
                Err(url::ParseError::RelativeUrlWithoutBase) => {
                    origin.join(entry).map_err(|e| {
                        ConfigError::Invalid(format!(
                            "precache entry '{}' does not resolve against the origin: {}",
                            entry, e
                        ))
                    })?;
                }
                Err(e) => {
                    return Err(ConfigError::Invalid(format!(
                        "precache entry '{}' is not a valid URL: {}",
                        entry, e
                    )));
                }
            }
        }

        // Rule groups must compile
        RuleSet::compile(
            &self.rules.network_first,
            &self.rules.cache_first,
            &self.rules.stale_while_revalidate,
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        "origin: \"https://dashboard.example.org\"\n"
    }

    fn full_yaml() -> &'static str {
        r#"
version: "v1.0"
store_prefix: "report"
origin: "https://dashboard.example.org"
precache:
  - "/"
  - "/styles.css"
  - "https://fonts.googleapis.com/css2?family=Inter"
rules:
  network_first:
    - '/$'
    - '\.html$'
  cache_first:
    - '\.(?:css|js)$'
  stale_while_revalidate:
    - '\.png$'
gateway:
  address: "0.0.0.0"
  port: 9000
"#
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = Config::from_yaml_with_env(minimal_yaml()).unwrap();

        assert_eq!(config.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(config.store_prefix, "cachette");
        assert!(config.precache.is_empty());
        assert!(config.rules.network_first.is_empty());
        assert_eq!(config.gateway.address, "127.0.0.1");
        assert_eq!(config.gateway.port, 8787);
    }

    #[test]
    fn test_full_config_parses_every_section() {
        let config = Config::from_yaml_with_env(full_yaml()).unwrap();

        assert_eq!(config.version, "v1.0");
        assert_eq!(config.store_prefix, "report");
        assert_eq!(config.precache.len(), 3);
        assert_eq!(config.rules.network_first.len(), 2);
        assert_eq!(config.rules.cache_first.len(), 1);
        assert_eq!(config.gateway.bind_addr(), "0.0.0.0:9000");
    }

    #[test]
    fn test_full_config_validates() {
        let config = Config::from_yaml_with_env(full_yaml()).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CACHETTE_TEST_ORIGIN", "https://env.example.org");
        let yaml = "origin: \"${CACHETTE_TEST_ORIGIN}\"\n";

        let config = Config::from_yaml_with_env(yaml).unwrap();
        assert_eq!(config.origin, "https://env.example.org");
    }

    #[test]
    fn test_missing_env_var_is_an_error() {
        let yaml = "origin: \"${CACHETTE_TEST_UNSET_VARIABLE}\"\n";
        let err = Config::from_yaml_with_env(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(_)));
        assert!(err.to_string().contains("CACHETTE_TEST_UNSET_VARIABLE"));
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        let err = Config::from_yaml_with_env("origin: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_empty_version_fails_validation() {
        let mut config = Config::from_yaml_with_env(minimal_yaml()).unwrap();
        config.version = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_store_prefix_fails_validation() {
        let mut config = Config::from_yaml_with_env(minimal_yaml()).unwrap();
        config.store_prefix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unparseable_origin_fails_validation() {
        let mut config = Config::from_yaml_with_env(minimal_yaml()).unwrap();
        config.origin = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_http_origin_fails_validation() {
        let mut config = Config::from_yaml_with_env(minimal_yaml()).unwrap();
        config.origin = "ftp://dashboard.example.org".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn test_non_http_precache_entry_fails_validation() {
        let mut config = Config::from_yaml_with_env(minimal_yaml()).unwrap();
        config.precache = vec!["file:///etc/passwd".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_relative_precache_entries_resolve_against_the_origin() {
        let mut config = Config::from_yaml_with_env(minimal_yaml()).unwrap();
        config.precache = vec!["/".to_string(), "assets/icon.png".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_broken_rule_pattern_fails_validation() {
        let mut config = Config::from_yaml_with_env(minimal_yaml()).unwrap();
        config.rules.cache_first = vec!["([unclosed".to_string()];

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Pattern(_)));
    }

    #[test]
    fn test_origin_url_parses_the_origin() {
        let config = Config::from_yaml_with_env(minimal_yaml()).unwrap();
        let origin = config.origin_url().unwrap();
        assert_eq!(origin.host_str(), Some("dashboard.example.org"));
        assert_eq!(origin.scheme(), "https");
    }

    #[test]
    fn test_missing_config_file_reports_io_error() {
        let err = Config::from_file("/nonexistent/cachette.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
