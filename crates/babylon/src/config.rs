use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use tokio::fs;

use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    /// Actors the hub handshakes with at startup, keyed by name.
    #[serde(default, alias = "actor")]
    pub actors: BTreeMap<String, PeerConfig>,
    /// Drivers the hub handshakes with at startup, keyed by name.
    #[serde(default, alias = "driver")]
    pub drivers: BTreeMap<String, PeerConfig>,
    /// Reporters the hub handshakes with at startup, keyed by name.
    #[serde(default, alias = "reporter")]
    pub reporters: BTreeMap<String, PeerConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_saphyr::Error),

    #[error("environment variable '{0}' is not set")]
    MissingEnvVar(String),

    #[error("unclosed variable reference '${{' (missing '}}')")]
    UnclosedVarReference,
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        Self::parse(&contents)
    }

    /// Parse configuration text after expanding environment variables.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        if expanded.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_saphyr::from_str(&expanded)?)
    }
}

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "babylon.yaml";

// ============================================================================
// Private Helpers (Serde Defaults)
// ============================================================================

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_hostname() -> String {
    "localhost".to_string()
}

fn default_request_timeout() -> u64 {
    300
}

fn default_outbound_timeout() -> u64 {
    30
}

fn default_max_connections() -> usize {
    256
}

fn default_inactivity_timeout() -> u64 {
    300
}

fn default_sweep_interval() -> u64 {
    5
}

/// Serde default for bool fields that should be `true` (serde's default is `false`).
fn default_true() -> bool {
    true
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Substitute `${NAME}` and `${NAME:-fallback}` references in raw config text.
///
/// A reference without a fallback must name a set variable. `$$` yields a
/// literal `$`; any other `$` is copied through unchanged. References do not
/// nest: the first `}` closes the reference.
///
/// ```yaml
/// drivers:
///   web:
///     callback: ${WEB_DRIVER_URL:-http://localhost:8082/}
///     secret: ${WEB_DRIVER_SECRET}
/// ```
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
        } else if let Some(body) = after.strip_prefix('{') {
            let end = body.find('}').ok_or(ConfigError::UnclosedVarReference)?;
            out.push_str(&resolve_var(&body[..end])?);
            rest = &body[end + 1..];
        } else {
            out.push('$');
            rest = after;
        }
    }

    out.push_str(rest);
    Ok(out)
}

fn resolve_var(reference: &str) -> Result<String, ConfigError> {
    let (name, fallback) = match reference.split_once(":-") {
        Some((name, fallback)) => (name, Some(fallback)),
        None => (reference, None),
    };

    match (std::env::var(name), fallback) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(fallback)) => Ok(fallback.to_string()),
        (Err(_), None) => Err(ConfigError::MissingEnvVar(name.to_string())),
    }
}

// ============================================================================
// ServerConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Host name peers use to reach this hub, advertised during handshakes.
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Bound on every outbound call to a backend or reporter.
    #[serde(default = "default_outbound_timeout")]
    pub outbound_timeout_seconds: u64,
    /// Upper bound on requests handled concurrently.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            hostname: default_hostname(),
            request_timeout_seconds: default_request_timeout(),
            outbound_timeout_seconds: default_outbound_timeout(),
            max_connections: default_max_connections(),
        }
    }
}

impl ServerConfig {
    /// Callback base URL this hub offers to preconfigured peers.
    pub fn server_callback(&self) -> String {
        format!("http://{}:{}/", self.hostname, self.port)
    }

    pub fn outbound_timeout(&self) -> Duration {
        Duration::from_secs(self.outbound_timeout_seconds)
    }
}

// ============================================================================
// SessionsConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SessionsConfig {
    /// Sessions idle longer than this are evicted.
    #[serde(default = "default_inactivity_timeout")]
    pub inactivity_timeout_seconds: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_seconds: default_inactivity_timeout(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

// ============================================================================
// SecurityConfig
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub actor: SelfManagementConfig,
    #[serde(default)]
    pub driver: SelfManagementConfig,
    #[serde(default)]
    pub reporter: SelfManagementConfig,
}

/// Whether peers of one kind may register and deregister themselves.
#[derive(Debug, Deserialize)]
pub struct SelfManagementConfig {
    #[serde(default = "default_true", alias = "selfManagement")]
    pub self_management: bool,
}

impl Default for SelfManagementConfig {
    fn default() -> Self {
        Self {
            self_management: true,
        }
    }
}

// ============================================================================
// PeerConfig
// ============================================================================

/// A preconfigured backend or reporter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeerConfig {
    #[serde(default)]
    pub callback: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    // ========================================================================
    // Config Tests
    // ========================================================================

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.hostname, "localhost");
        assert_eq!(config.server.request_timeout_seconds, 300);
        assert_eq!(config.server.outbound_timeout_seconds, 30);
        assert_eq!(config.server.max_connections, 256);
        assert_eq!(config.sessions.inactivity_timeout_seconds, 300);
        assert_eq!(config.sessions.sweep_interval_seconds, 5);
        assert!(config.security.actor.self_management);
        assert!(config.security.driver.self_management);
        assert!(config.security.reporter.self_management);
        assert!(config.actors.is_empty());
        assert!(config.drivers.is_empty());
        assert!(config.reporters.is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_file_returns_defaults() {
        let tmp_dir = TempDir::new().unwrap();
        let missing_path = tmp_dir.path().join("missing-config.yaml");
        let config = Config::load(missing_path.to_str().unwrap()).await.unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
    }

    #[tokio::test]
    async fn test_load_valid_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 3000
  hostname: hub.internal
  outbound_timeout_seconds: 5
sessions:
  inactivity_timeout_seconds: 60
  sweep_interval_seconds: 1
security:
  driver:
    self_management: false
drivers:
  web:
    callback: "http://driver-host:8082/"
    secret: s3cret
reporters:
  junit:
    callback: "http://reporter-host:8080"
"#
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.server_callback(), "http://hub.internal:3000/");
        assert_eq!(config.server.outbound_timeout(), Duration::from_secs(5));
        assert_eq!(config.sessions.inactivity_timeout_seconds, 60);
        assert_eq!(config.sessions.sweep_interval_seconds, 1);
        assert!(config.security.actor.self_management);
        assert!(!config.security.driver.self_management);

        let web = &config.drivers["web"];
        assert_eq!(web.callback.as_deref(), Some("http://driver-host:8082/"));
        assert_eq!(web.secret.as_deref(), Some("s3cret"));

        let junit = &config.reporters["junit"];
        assert!(junit.secret.is_none());
    }

    #[tokio::test]
    async fn test_load_partial_yaml_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server:
  port: 9000
"#
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(config.server.host, "0.0.0.0"); // default
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.request_timeout_seconds, 300); // default
        assert_eq!(config.sessions.sweep_interval_seconds, 5); // default
        assert!(config.security.reporter.self_management); // default
    }

    #[tokio::test]
    async fn test_load_invalid_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load(file.path().to_str().unwrap()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_empty_returns_defaults() {
        let config = Config::parse("\n").unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_self_management_camel_case_alias() {
        let config = Config::parse(
            r#"
security:
  actor:
    selfManagement: false
"#,
        )
        .unwrap();
        assert!(!config.security.actor.self_management);
        assert!(config.security.driver.self_management);
    }

    #[test]
    fn test_config_error_display() {
        let io_error = ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "test",
        ));
        assert!(io_error.to_string().contains("failed to read config file"));
    }

    // ========================================================================
    // Environment Variable Expansion Tests
    // ========================================================================

    #[test]
    fn expansion_passes_plain_text_through() {
        for input in ["no references here", "costs $50", "trailing $", "a $b c"] {
            assert_eq!(expand_env_vars(input).unwrap(), input);
        }
        assert_eq!(expand_env_vars("$${HOME}").unwrap(), "${HOME}");
    }

    #[test]
    fn expansion_rejects_unterminated_reference() {
        for input in ["secret: ${WEB_SECRET", "port: ${PORT:-8080"] {
            assert!(matches!(
                expand_env_vars(input),
                Err(ConfigError::UnclosedVarReference)
            ));
        }
    }

    #[test]
    fn expansion_resolves_set_variables() {
        // SAFETY: variable names are unique to this test
        unsafe { std::env::set_var("BABYLON_EXPAND_SET", "s3cret") };

        assert_eq!(
            expand_env_vars("secret: ${BABYLON_EXPAND_SET}").unwrap(),
            "secret: s3cret"
        );
        assert_eq!(
            expand_env_vars("secret: ${BABYLON_EXPAND_SET:-unused}").unwrap(),
            "secret: s3cret"
        );

        unsafe { std::env::remove_var("BABYLON_EXPAND_SET") };
    }

    #[test]
    fn expansion_falls_back_for_unset_variables() {
        // SAFETY: variable names are unique to this test
        unsafe { std::env::remove_var("BABYLON_EXPAND_UNSET") };

        assert_eq!(
            expand_env_vars("cb: ${BABYLON_EXPAND_UNSET:-http://localhost:8082/}").unwrap(),
            "cb: http://localhost:8082/"
        );
        assert_eq!(expand_env_vars("x${BABYLON_EXPAND_UNSET:-}y").unwrap(), "xy");

        match expand_env_vars("${BABYLON_EXPAND_UNSET}") {
            Err(ConfigError::MissingEnvVar(name)) => assert_eq!(name, "BABYLON_EXPAND_UNSET"),
            other => panic!("expected MissingEnvVar, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_config_load_with_env_var() {
        // SAFETY: Single-threaded test
        unsafe { std::env::set_var("BABYLON_TEST_DRIVER_SECRET", "env_secret_value") };

        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
drivers:
  web:
    callback: http://localhost:8082/
    secret: ${{BABYLON_TEST_DRIVER_SECRET}}
"#
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).await.unwrap();
        let web = config.drivers.get("web").expect("web driver should exist");
        assert_eq!(web.secret.as_deref(), Some("env_secret_value"));

        unsafe { std::env::remove_var("BABYLON_TEST_DRIVER_SECRET") };
    }

    #[tokio::test]
    async fn test_config_load_missing_env_var_errors() {
        // SAFETY: Single-threaded test
        unsafe { std::env::remove_var("DEFINITELY_MISSING_VAR_XYZ") };

        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
actors:
  shell:
    secret: ${{DEFINITELY_MISSING_VAR_XYZ}}
"#
        )
        .unwrap();

        let result = Config::load(file.path().to_str().unwrap()).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("DEFINITELY_MISSING_VAR_XYZ"));
    }
}
