//! Supervisor Configuration
//!
//! Loads deployment settings from a TOML file. Every key is optional; missing
//! keys fall back to the layout of a locally installed worker under
//! `/tmp/c3qo-0.0.7-local`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default absolute path of the worker binary
pub const DEFAULT_EXECUTABLE_PATH: &str = "/tmp/c3qo-0.0.7-local/bin/c3qo";

/// Default process-name pattern used when stopping workers
///
/// Anchored so that `c3qo-ctl` and other tools sharing the prefix are left
/// alone; a worker is caught whatever path it was started from.
pub const DEFAULT_PROCESS_NAME: &str = "^c3qo$";

/// Upper bound for any configured timeout or interval, in milliseconds
const MAX_TIMEOUT_MS: u64 = 60_000;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Absolute path of the worker binary; liveness matches on it exactly
    #[serde(default = "default_executable_path")]
    pub executable_path: PathBuf,

    /// Pattern matched against process names by `stop_all`
    #[serde(default = "default_process_name")]
    pub process_name: String,

    /// Root of the live-process table
    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,

    #[serde(default)]
    pub control: ControlConfig,

    #[serde(default)]
    pub liveness: LivenessConfig,
}

/// Control-plane settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Worker control endpoint (ZeroMQ address)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Time to wait for a statistics reply
    #[serde(default = "default_stats_timeout_ms")]
    pub stats_timeout_ms: u64,

    /// How long closing the channel may wait to flush queued messages
    #[serde(default = "default_linger_ms")]
    pub linger_ms: u64,
}

/// Bounded polling used when waiting for a worker to appear or disappear
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LivenessConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_executable_path() -> PathBuf {
    PathBuf::from(DEFAULT_EXECUTABLE_PATH)
}

fn default_process_name() -> String {
    DEFAULT_PROCESS_NAME.to_string()
}

fn default_proc_root() -> PathBuf {
    PathBuf::from("/proc")
}

fn default_endpoint() -> String {
    c3qo_protocol::DEFAULT_CONTROL_ENDPOINT.to_string()
}

fn default_stats_timeout_ms() -> u64 {
    100
}

fn default_linger_ms() -> u64 {
    1000
}

fn default_attempts() -> u32 {
    3
}

fn default_interval_ms() -> u64 {
    1000
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            executable_path: default_executable_path(),
            process_name: default_process_name(),
            proc_root: default_proc_root(),
            control: ControlConfig::default(),
            liveness: LivenessConfig::default(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            stats_timeout_ms: default_stats_timeout_ms(),
            linger_ms: default_linger_ms(),
        }
    }
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl ControlConfig {
    pub fn stats_timeout(&self) -> Duration {
        Duration::from_millis(self.stats_timeout_ms)
    }

    pub fn linger(&self) -> Duration {
        Duration::from_millis(self.linger_ms)
    }
}

impl LivenessConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl SupervisorConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load from `path` when given, otherwise use the defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: SupervisorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.executable_path.is_absolute() {
            return Err(ConfigError::InvalidValue {
                field: "executable_path",
                reason: format!("must be absolute, got {}", self.executable_path.display()),
            });
        }

        if self.process_name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "process_name",
                reason: "must not be empty".to_string(),
            });
        }
        if let Err(e) = regex_lite::Regex::new(&self.process_name) {
            return Err(ConfigError::InvalidValue {
                field: "process_name",
                reason: e.to_string(),
            });
        }

        match self.control.endpoint.split_once("://") {
            Some((scheme, rest)) if !scheme.is_empty() && !rest.is_empty() => {}
            _ => {
                return Err(ConfigError::InvalidValue {
                    field: "control.endpoint",
                    reason: format!("expected <transport>://<address>, got '{}'", self.control.endpoint),
                });
            }
        }

        check_millis("control.stats_timeout_ms", self.control.stats_timeout_ms)?;
        check_millis("liveness.interval_ms", self.liveness.interval_ms)?;

        // Zero is allowed: discard unsent messages on close
        if self.control.linger_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::InvalidValue {
                field: "control.linger_ms",
                reason: format!("must be at most {}, got {}", MAX_TIMEOUT_MS, self.control.linger_ms),
            });
        }

        if self.liveness.attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "liveness.attempts",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

fn check_millis(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_TIMEOUT_MS {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!("must be in (0, {}], got {}", MAX_TIMEOUT_MS, value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SupervisorConfig::parse("").unwrap();
        assert_eq!(config.executable_path, PathBuf::from(DEFAULT_EXECUTABLE_PATH));
        assert_eq!(config.process_name, "^c3qo$");
        assert_eq!(config.control.endpoint, "tcp://127.0.0.1:1664");
        assert_eq!(config.control.stats_timeout(), Duration::from_millis(100));
        assert_eq!(config.control.linger(), Duration::from_secs(1));
        assert_eq!(config.liveness.attempts, 3);
        assert_eq!(config.liveness.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_full_config_parsed() {
        let content = r#"
            executable_path = "/opt/c3qo/bin/c3qo"
            process_name = "c3qo-dev"
            proc_root = "/host/proc"

            [control]
            endpoint = "tcp://10.0.0.2:6666"
            stats_timeout_ms = 250
            linger_ms = 0

            [liveness]
            attempts = 5
            interval_ms = 200
        "#;

        let config = SupervisorConfig::parse(content).unwrap();
        assert_eq!(config.executable_path, PathBuf::from("/opt/c3qo/bin/c3qo"));
        assert_eq!(config.process_name, "c3qo-dev");
        assert_eq!(config.proc_root, PathBuf::from("/host/proc"));
        assert_eq!(config.control.endpoint, "tcp://10.0.0.2:6666");
        assert_eq!(config.control.stats_timeout_ms, 250);
        assert_eq!(config.control.linger_ms, 0);
        assert_eq!(config.liveness.attempts, 5);
        assert_eq!(config.liveness.interval_ms, 200);
    }

    #[test]
    fn test_relative_executable_rejected() {
        let err = SupervisorConfig::parse(r#"executable_path = "bin/c3qo""#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "executable_path", .. }));
    }

    #[test]
    fn test_bad_process_pattern_rejected() {
        let err = SupervisorConfig::parse(r#"process_name = "c3qo(""#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "process_name", .. }));
    }

    #[test]
    fn test_endpoint_needs_transport() {
        let err = SupervisorConfig::parse("[control]\nendpoint = \"127.0.0.1:1664\"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "control.endpoint", .. }));
    }

    #[test]
    fn test_timeout_bounds() {
        let err = SupervisorConfig::parse("[control]\nstats_timeout_ms = 0").unwrap_err();
        assert!(err.to_string().contains("stats_timeout_ms"));

        let err = SupervisorConfig::parse("[liveness]\ninterval_ms = 60001").unwrap_err();
        assert!(err.to_string().contains("interval_ms"));

        let err = SupervisorConfig::parse("[liveness]\nattempts = 0").unwrap_err();
        assert!(err.to_string().contains("attempts"));

        let err = SupervisorConfig::parse("[control]\nlinger_ms = 60001").unwrap_err();
        assert!(err.to_string().contains("linger_ms"));
    }

    #[test]
    fn test_default_pattern_spares_prefixed_names() {
        let pattern = regex_lite::Regex::new(DEFAULT_PROCESS_NAME).unwrap();
        assert!(pattern.is_match("c3qo"));
        assert!(!pattern.is_match("c3qo-ctl"));
        assert!(!pattern.is_match("c3qo-dev"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SupervisorConfig::load(Path::new("/nonexistent/c3qo.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c3qo.toml");
        std::fs::write(&path, "process_name = \"worker\"\n").unwrap();

        let config = SupervisorConfig::load(&path).unwrap();
        assert_eq!(config.process_name, "worker");
    }

    #[test]
    fn test_load_or_default_without_path() {
        let config = SupervisorConfig::load_or_default(None).unwrap();
        assert_eq!(config.process_name, DEFAULT_PROCESS_NAME);
    }
}
