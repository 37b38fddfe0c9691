//! Configuration types for the bridge instance
//!
//! `InstanceConfig` controls how the native instance is created and how the
//! dispatch trampoline reports on callbacks. It can be built in code, parsed
//! from JSON, or read from the environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors produced while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The JSON document could not be parsed
    #[error("Invalid configuration document: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment variable held an unusable value
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Application identity reported to the native library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppName {
    /// Human-readable application name
    pub name: String,
    /// HTTP user agent used when a protocol requires one
    pub user_agent: String,
}

/// Configuration for an [`Instance`](crate::Instance)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    /// Command-line style arguments passed to native instance creation
    /// Default: empty
    pub args: Vec<String>,

    /// Application identity, applied right after instance creation
    /// Default: None
    pub app_name: Option<AppName>,

    /// Callbacks running longer than this are reported with a warning.
    /// `None` disables the check.
    /// Default: 50 milliseconds
    pub slow_callback_threshold_ms: Option<u64>,

    /// Log every dispatched event at debug level instead of trace
    /// Default: false
    pub verbose_dispatch: bool,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            app_name: None,
            slow_callback_threshold_ms: Some(50),
            verbose_dispatch: false,
        }
    }
}

impl InstanceConfig {
    /// Create a new InstanceConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from a JSON document
    ///
    /// Missing fields take their default values.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build a configuration from environment variables
    ///
    /// - `VLC_BRIDGE_ARGS`: whitespace-separated native arguments
    /// - `VLC_BRIDGE_SLOW_CALLBACK_MS`: slow-callback threshold, `0` disables it
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(args) = lookup("VLC_BRIDGE_ARGS") {
            config.args = args.split_whitespace().map(str::to_string).collect();
        }

        if let Some(raw) = lookup("VLC_BRIDGE_SLOW_CALLBACK_MS") {
            let millis: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "VLC_BRIDGE_SLOW_CALLBACK_MS",
                value: raw.clone(),
            })?;
            config.slow_callback_threshold_ms = (millis > 0).then_some(millis);
        }

        Ok(config)
    }

    /// Set the native instance arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the application identity
    pub fn with_app_name(mut self, name: impl Into<String>, user_agent: impl Into<String>) -> Self {
        self.app_name = Some(AppName {
            name: name.into(),
            user_agent: user_agent.into(),
        });
        self
    }

    /// Set the slow-callback threshold; `None` disables the check
    pub fn with_slow_callback_threshold(mut self, threshold: Option<Duration>) -> Self {
        self.slow_callback_threshold_ms = threshold.map(|d| d.as_millis() as u64);
        self
    }

    /// Log every dispatched event at debug level
    pub fn with_verbose_dispatch(mut self, verbose: bool) -> Self {
        self.verbose_dispatch = verbose;
        self
    }

    /// The slow-callback threshold as a duration
    pub fn slow_callback_threshold(&self) -> Option<Duration> {
        self.slow_callback_threshold_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = InstanceConfig::default();
        assert!(config.args.is_empty());
        assert_eq!(config.slow_callback_threshold(), Some(Duration::from_millis(50)));
        assert!(!config.verbose_dispatch);
    }

    #[test]
    fn test_builder_methods() {
        let config = InstanceConfig::new()
            .with_args(["--no-video", "--quiet"])
            .with_app_name("Jukebox", "Jukebox/1.0")
            .with_slow_callback_threshold(None)
            .with_verbose_dispatch(true);

        assert_eq!(config.args, vec!["--no-video", "--quiet"]);
        assert_eq!(config.app_name.as_ref().unwrap().user_agent, "Jukebox/1.0");
        assert_eq!(config.slow_callback_threshold(), None);
        assert!(config.verbose_dispatch);
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = InstanceConfig::from_json_str(r#"{ "args": ["--intf=dummy"] }"#).unwrap();
        assert_eq!(config.args, vec!["--intf=dummy"]);
        assert_eq!(config.slow_callback_threshold_ms, Some(50));

        assert!(matches!(
            InstanceConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("VLC_BRIDGE_ARGS", "--no-xlib  --verbose=2"),
            ("VLC_BRIDGE_SLOW_CALLBACK_MS", "0"),
        ]
        .into_iter()
        .collect();

        let config = InstanceConfig::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.args, vec!["--no-xlib", "--verbose=2"]);
        assert_eq!(config.slow_callback_threshold_ms, None);
    }

    #[test]
    fn test_from_lookup_rejects_bad_threshold() {
        let result = InstanceConfig::from_lookup(|key| {
            (key == "VLC_BRIDGE_SLOW_CALLBACK_MS").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
