// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading, validation, and merging for the OCAN daemon.
//!
//! [`DaemonConfig`] is the top-level runtime settings struct. It loads from
//! an optional TOML file, is overlaid by environment variables, and is
//! validated into hard errors plus advisory [`ConfigWarning`]s.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors that can occur loading or validating a [`DaemonConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

/// Advisory-level issues that do not prevent startup but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// `result_processed_ttl_secs` is unusually large, which keeps
    /// at-least-once dedup markers around far longer than an actor's
    /// mailbox backlog would normally need.
    LargeProcessedTtl {
        /// Configured TTL in seconds.
        secs: u64,
    },
    /// `max_subscribers_per_connection` is unset; every connection may
    /// subscribe to an unbounded number of resources.
    UnboundedSubscriptions,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LargeProcessedTtl { secs } => {
                write!(f, "result_processed_ttl_secs is unusually large ({secs}s)")
            }
            Self::UnboundedSubscriptions => {
                write!(f, "max_subscribers_per_connection is unset; subscriptions are unbounded")
            }
        }
    }
}

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";
const DEFAULT_PROCESSED_TTL_SECS: u64 = 300;
const DEFAULT_INIT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";
const LARGE_TTL_THRESHOLD_SECS: u64 = 86_400;
const MAX_INIT_TIMEOUT_SECS: u64 = 3_600;

/// Top-level runtime configuration for the OCAN daemon.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Address the HTTP/WebSocket server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// How long a `(work_id)` at-least-once dedup marker is retained before
    /// it's safe to garbage-collect.
    #[serde(default = "default_processed_ttl_secs")]
    pub result_processed_ttl_secs: u64,

    /// How long a connection may stay in the post-`initialize`,
    /// pre-`notifications/initialized` limbo before being dropped.
    #[serde(default = "default_init_timeout_secs")]
    pub init_timeout_secs: u64,

    /// MCP protocol version this daemon negotiates during `initialize`.
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,

    /// Maximum live subscriptions a single connection may hold. `None`
    /// means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_subscribers_per_connection: Option<u32>,

    /// Log level override (e.g. `"debug"`, `"info"`, `"warn"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            result_processed_ttl_secs: default_processed_ttl_secs(),
            init_timeout_secs: default_init_timeout_secs(),
            protocol_version: default_protocol_version(),
            max_subscribers_per_connection: None,
            log_level: Some("info".into()),
        }
    }
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.into()
}

fn default_processed_ttl_secs() -> u64 {
    DEFAULT_PROCESSED_TTL_SECS
}

fn default_init_timeout_secs() -> u64 {
    DEFAULT_INIT_TIMEOUT_SECS
}

fn default_protocol_version() -> String {
    DEFAULT_PROTOCOL_VERSION.into()
}

/// Load a [`DaemonConfig`] from an optional TOML file path, then apply
/// environment variable overrides.
///
/// * If `path` is `Some`, reads and parses the file.
/// * If `path` is `None`, starts from [`DaemonConfig::default()`].
pub fn load_config(path: Option<&Path>) -> Result<DaemonConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p)
                .map_err(|_| ConfigError::FileNotFound { path: p.display().to_string() })?;
            parse_toml(&content)?
        }
        None => DaemonConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a TOML string into a [`DaemonConfig`].
pub fn parse_toml(content: &str) -> Result<DaemonConfig, ConfigError> {
    toml::from_str::<DaemonConfig>(content).map_err(|e| ConfigError::ParseError { reason: e.to_string() })
}

/// Apply environment variable overrides.
///
/// Recognised variables: `OCAN_BIND_ADDR`, `OCAN_LOG_LEVEL`,
/// `OCAN_RESULT_PROCESSED_TTL_SECS`, `OCAN_INIT_TIMEOUT_SECS`.
pub fn apply_env_overrides(config: &mut DaemonConfig) {
    if let Ok(val) = std::env::var("OCAN_BIND_ADDR") {
        config.bind_addr = val;
    }
    if let Ok(val) = std::env::var("OCAN_LOG_LEVEL") {
        config.log_level = Some(val);
    }
    if let Ok(val) = std::env::var("OCAN_RESULT_PROCESSED_TTL_SECS") {
        if let Ok(secs) = val.parse() {
            config.result_processed_ttl_secs = secs;
        }
    }
    if let Ok(val) = std::env::var("OCAN_INIT_TIMEOUT_SECS") {
        if let Ok(secs) = val.parse() {
            config.init_timeout_secs = secs;
        }
    }
}

/// Validate a parsed configuration, returning advisory warnings.
///
/// Hard errors (empty bind address, zero/overlong timeouts) are returned
/// as a [`ConfigError::ValidationError`]; soft issues come back as
/// warnings.
pub fn validate_config(config: &DaemonConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    if config.bind_addr.trim().is_empty() {
        errors.push("bind_addr must not be empty".into());
    }
    if config.init_timeout_secs == 0 || config.init_timeout_secs > MAX_INIT_TIMEOUT_SECS {
        errors.push(format!(
            "init_timeout_secs {} out of range (1..{MAX_INIT_TIMEOUT_SECS})",
            config.init_timeout_secs
        ));
    }
    if config.protocol_version.trim().is_empty() {
        errors.push("protocol_version must not be empty".into());
    }

    if config.result_processed_ttl_secs > LARGE_TTL_THRESHOLD_SECS {
        warnings.push(ConfigWarning::LargeProcessedTtl { secs: config.result_processed_ttl_secs });
    }
    if config.max_subscribers_per_connection.is_none() {
        warnings.push(ConfigWarning::UnboundedSubscriptions);
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

/// Merge two configurations. Values in `overlay` take precedence over `base`.
#[must_use]
pub fn merge_configs(base: DaemonConfig, overlay: DaemonConfig) -> DaemonConfig {
    let defaults = DaemonConfig::default();
    DaemonConfig {
        bind_addr: pick_overlay(&overlay.bind_addr, &base.bind_addr, &defaults.bind_addr),
        result_processed_ttl_secs: pick_overlay_num(
            overlay.result_processed_ttl_secs,
            base.result_processed_ttl_secs,
            defaults.result_processed_ttl_secs,
        ),
        init_timeout_secs: pick_overlay_num(
            overlay.init_timeout_secs,
            base.init_timeout_secs,
            defaults.init_timeout_secs,
        ),
        protocol_version: pick_overlay(&overlay.protocol_version, &base.protocol_version, &defaults.protocol_version),
        max_subscribers_per_connection: overlay.max_subscribers_per_connection.or(base.max_subscribers_per_connection),
        log_level: overlay.log_level.or(base.log_level),
    }
}

fn pick_overlay(overlay: &str, base: &str, default: &str) -> String {
    if overlay != default {
        overlay.to_string()
    } else {
        base.to_string()
    }
}

fn pick_overlay_num(overlay: u64, base: u64, default: u64) -> u64 {
    if overlay != default {
        overlay
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid_with_advisory_warnings() {
        let cfg = DaemonConfig::default();
        let warnings = validate_config(&cfg).expect("default config should be valid");
        assert!(warnings.contains(&ConfigWarning::UnboundedSubscriptions));
    }

    #[test]
    fn default_config_has_sensible_defaults() {
        let cfg = DaemonConfig::default();
        assert_eq!(cfg.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(cfg.result_processed_ttl_secs, 300);
        assert_eq!(cfg.init_timeout_secs, 10);
        assert_eq!(cfg.protocol_version, DEFAULT_PROTOCOL_VERSION);
    }

    #[test]
    fn parse_valid_toml_string() {
        let toml_str = r#"
            bind_addr = "0.0.0.0:9000"
            init_timeout_secs = 30
        "#;
        let cfg = parse_toml(toml_str).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:9000");
        assert_eq!(cfg.init_timeout_secs, 30);
        assert_eq!(cfg.result_processed_ttl_secs, 300);
    }

    #[test]
    fn parse_invalid_toml_gives_parse_error() {
        let bad = "this is [not valid toml =";
        let err = parse_toml(bad).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn validation_catches_zero_init_timeout() {
        let cfg = DaemonConfig { init_timeout_secs: 0, ..Default::default() };
        let err = validate_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn validation_catches_excessive_init_timeout() {
        let cfg = DaemonConfig { init_timeout_secs: MAX_INIT_TIMEOUT_SECS + 1, ..Default::default() };
        let err = validate_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn validation_catches_empty_bind_addr() {
        let cfg = DaemonConfig { bind_addr: "  ".into(), ..Default::default() };
        let err = validate_config(&cfg).unwrap_err();
        match err {
            ConfigError::ValidationError { reasons } => {
                assert!(reasons.iter().any(|r| r.contains("bind_addr")));
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn large_ttl_produces_warning() {
        let cfg = DaemonConfig {
            max_subscribers_per_connection: Some(100),
            result_processed_ttl_secs: LARGE_TTL_THRESHOLD_SECS + 1,
            ..Default::default()
        };
        let warnings = validate_config(&cfg).unwrap();
        assert!(warnings.iter().any(|w| matches!(w, ConfigWarning::LargeProcessedTtl { .. })));
    }

    #[test]
    fn merge_overlay_overrides_base() {
        let base = DaemonConfig { bind_addr: "127.0.0.1:1".into(), ..Default::default() };
        let overlay = DaemonConfig { bind_addr: "127.0.0.1:2".into(), ..Default::default() };
        let merged = merge_configs(base, overlay);
        assert_eq!(merged.bind_addr, "127.0.0.1:2");
    }

    #[test]
    fn merge_preserves_base_when_overlay_is_default() {
        let base = DaemonConfig {
            bind_addr: "127.0.0.1:9001".into(),
            max_subscribers_per_connection: Some(5),
            ..Default::default()
        };
        let merged = merge_configs(base.clone(), DaemonConfig::default());
        assert_eq!(merged.bind_addr, base.bind_addr);
        assert_eq!(merged.max_subscribers_per_connection, Some(5));
    }

    #[test]
    fn toml_roundtrip() {
        let cfg = DaemonConfig {
            bind_addr: "0.0.0.0:8080".into(),
            max_subscribers_per_connection: Some(16),
            ..Default::default()
        };
        let serialized = toml::to_string(&cfg).unwrap();
        let deserialized: DaemonConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(cfg, deserialized);
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocan.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "bind_addr = \"0.0.0.0:7000\"\ninit_timeout_secs = 20").unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:7000");
        assert_eq!(cfg.init_timeout_secs, 20);
    }

    #[test]
    fn load_missing_file_gives_file_not_found() {
        let err = load_config(Some(Path::new("/nonexistent/ocan.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn load_none_returns_default() {
        let cfg = load_config(None).unwrap();
        assert_eq!(cfg.bind_addr, DEFAULT_BIND_ADDR);
    }
}
