//! Configuration system for oemkey.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. Environment variables (highest priority)
//! 2. `oemkey.toml` file in the working directory
//! 3. Default values (lowest priority)
//!
//! The defaults give the plain behaviour: copy to the clipboard, show
//! dialogs, no logging.
//!
//! # Environment Variables
//!
//! - `OEMKEY_LOGGING_ENABLED` - Enable diagnostic logging to stderr
//! - `OEMKEY_LOG_LEVEL` - Log level (trace, debug, info, warn, error)
//! - `OEMKEY_CLIPBOARD_ENABLED` - Copy the key to the clipboard
//! - `OEMKEY_DIALOGS_ENABLED` - Use dialogs; when false, print to the console

use config::{Config, ConfigBuilder, builder::DefaultState};
use serde::Deserialize;
use std::env;
use std::sync::OnceLock;

use crate::errors::{OemKeyError, OemKeyResult};

/// Global configuration singleton.
static CONFIG: OnceLock<OemKeyConfig> = OnceLock::new();

/// Base name of the optional configuration file.
pub const CONFIG_FILE: &str = "oemkey";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OemKeyConfig {
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Clipboard configuration
    pub clipboard: ClipboardConfig,
    /// Display configuration
    pub display: DisplayConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Enable logging
    pub enabled: bool,
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClipboardConfig {
    /// Copy the extracted key to the clipboard
    pub enabled: bool,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Show dialogs where the platform has them
    pub dialogs: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { dialogs: true }
    }
}

fn config_err(e: config::ConfigError) -> OemKeyError {
    OemKeyError::ConfigError(e.to_string())
}

fn env_bool(name: &str) -> Option<bool> {
    env::var(name).ok().and_then(|v| v.parse::<bool>().ok())
}

impl OemKeyConfig {
    /// Load configuration from file and environment.
    pub fn load() -> OemKeyResult<Self> {
        Self::load_from(
            Config::builder().add_source(config::File::with_name(CONFIG_FILE).required(false)),
        )
    }

    /// Load configuration from `source` layered between the defaults and the
    /// environment overrides.
    pub fn load_from(source: ConfigBuilder<DefaultState>) -> OemKeyResult<Self> {
        let builder = source
            // Defaults
            .set_default("logging.enabled", false)
            .map_err(config_err)?
            .set_default("logging.level", "info")
            .map_err(config_err)?
            .set_default("clipboard.enabled", true)
            .map_err(config_err)?
            .set_default("display.dialogs", true)
            .map_err(config_err)?
            // Override with environment variables
            .set_override_option("logging.enabled", env_bool("OEMKEY_LOGGING_ENABLED"))
            .map_err(config_err)?
            .set_override_option("logging.level", env::var("OEMKEY_LOG_LEVEL").ok())
            .map_err(config_err)?
            .set_override_option("clipboard.enabled", env_bool("OEMKEY_CLIPBOARD_ENABLED"))
            .map_err(config_err)?
            .set_override_option("display.dialogs", env_bool("OEMKEY_DIALOGS_ENABLED"))
            .map_err(config_err)?;

        let settings = builder
            .build()
            .map_err(|e| OemKeyError::ConfigError(format!("failed to build config: {e}")))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| OemKeyError::ConfigError(format!("failed to deserialize config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> OemKeyResult<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(OemKeyError::ConfigError(format!(
                "logging.level must be one of: trace, debug, info, warn, error. Got '{other}'"
            ))),
        }
    }
}

/// Get the global configuration.
///
/// Loads on first access and caches the result. A configuration that fails
/// to load or validate is reported in the error; callers usually fall back to
/// [`OemKeyConfig::default`].
pub fn get_config() -> OemKeyResult<&'static OemKeyConfig> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    let config = OemKeyConfig::load()?;
    Ok(CONFIG.get_or_init(|| config))
}
