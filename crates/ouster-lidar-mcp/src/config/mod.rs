//! Configuration loading and resolution.
//!
//! Every setting resolves as: explicit CLI value, then environment variable,
//! then built-in default.

use std::time::Duration;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_DISCOVER_COMMAND: &str = "ouster-cli discover";

/// Resolved runtime settings for the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub capture_timeout: Duration,
    pub discovery_timeout: Duration,
    pub discover_command: String,
    pub token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            capture_timeout: DEFAULT_CAPTURE_TIMEOUT,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            discover_command: DEFAULT_DISCOVER_COMMAND.to_string(),
            token: None,
        }
    }
}

/// Values given on the command line, if any.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub connect_timeout_secs: Option<f64>,
    pub capture_timeout_secs: Option<f64>,
    pub discover_command: Option<String>,
    pub token: Option<String>,
}

impl ServerConfig {
    /// Resolve against the process environment.
    pub fn resolve(overrides: ConfigOverrides) -> Self {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary variable lookup.
    pub fn resolve_with(overrides: ConfigOverrides, env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| env(key).and_then(|v| v.trim().parse::<f64>().ok());

        Self {
            host: overrides
                .host
                .or_else(|| env("MCP_HOST"))
                .unwrap_or(defaults.host),
            port: overrides
                .port
                .or_else(|| env("MCP_PORT").and_then(|p| p.trim().parse().ok()))
                .unwrap_or(defaults.port),
            connect_timeout: resolve_timeout(
                overrides.connect_timeout_secs.or_else(|| parsed("OUSTER_CONNECT_TIMEOUT")),
                defaults.connect_timeout,
            ),
            capture_timeout: resolve_timeout(
                overrides.capture_timeout_secs.or_else(|| parsed("OUSTER_CAPTURE_TIMEOUT")),
                defaults.capture_timeout,
            ),
            discovery_timeout: defaults.discovery_timeout,
            discover_command: overrides
                .discover_command
                .or_else(|| env("OUSTER_DISCOVER_CMD"))
                .filter(|c| !c.trim().is_empty())
                .unwrap_or(defaults.discover_command),
            token: overrides
                .token
                .or_else(|| env("OUSTER_MCP_TOKEN"))
                .filter(|t| !t.is_empty()),
        }
    }

    /// `host:port` for the HTTP listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Seconds to a duration; non-positive or non-finite values fall back to the default.
fn resolve_timeout(secs: Option<f64>, default: Duration) -> Duration {
    secs.filter(|s| s.is_finite() && *s > 0.0)
        .map(Duration::from_secs_f64)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::resolve_with(ConfigOverrides::default(), env(&[]));
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.listen_addr(), "localhost:8080");
    }

    #[test]
    fn test_env_over_default() {
        let config = ServerConfig::resolve_with(
            ConfigOverrides::default(),
            env(&[
                ("MCP_HOST", "0.0.0.0"),
                ("MCP_PORT", "9000"),
                ("OUSTER_CAPTURE_TIMEOUT", "2.5"),
                ("OUSTER_MCP_TOKEN", "secret"),
            ]),
        );
        assert_eq!(config.listen_addr(), "0.0.0.0:9000");
        assert_eq!(config.capture_timeout, Duration::from_millis(2500));
        assert_eq!(config.token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_cli_over_env() {
        let overrides = ConfigOverrides {
            port: Some(7000),
            connect_timeout_secs: Some(1.0),
            discover_command: Some("my-discover --json".to_string()),
            ..Default::default()
        };
        let config = ServerConfig::resolve_with(
            overrides,
            env(&[("MCP_PORT", "9000"), ("OUSTER_CONNECT_TIMEOUT", "30")]),
        );
        assert_eq!(config.port, 7000);
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.discover_command, "my-discover --json");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ServerConfig::resolve_with(
            ConfigOverrides::default(),
            env(&[
                ("MCP_PORT", "not-a-port"),
                ("OUSTER_CONNECT_TIMEOUT", "-3"),
                ("OUSTER_DISCOVER_CMD", "  "),
            ]),
        );
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.discover_command, DEFAULT_DISCOVER_COMMAND);
    }
}
