//! Registry policy configuration.
//!
//! Loaded from environment variables or a YAML file. Every field has a
//! default, so a partial file is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ContextError;

pub const ENV_WARN_ON_KEY_COLLISION: &str = "CTXWIRE_WARN_ON_KEY_COLLISION";
pub const ENV_STRICT_REGISTRATION: &str = "CTXWIRE_STRICT_REGISTRATION";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Log a warning when a marshaler replaces the value of a wire key written
    /// earlier in the same marshal call. Only logging depends on this flag;
    /// the later value wins either way.
    pub warn_on_key_collision: bool,

    /// Reject process-wide registrations that arrive after the first
    /// marshal or unmarshal instead of only logging them.
    pub strict_registration: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            warn_on_key_collision: true,
            strict_registration: false,
        }
    }
}

impl RegistryConfig {
    /// Build a config from `CTXWIRE_*` environment variables.
    ///
    /// Unset variables keep their defaults; unparseable ones are an error.
    pub fn from_env() -> Result<Self, ContextError> {
        let defaults = Self::default();
        Ok(Self {
            warn_on_key_collision: env_flag(ENV_WARN_ON_KEY_COLLISION, defaults.warn_on_key_collision)?,
            strict_registration: env_flag(ENV_STRICT_REGISTRATION, defaults.strict_registration)?,
        })
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ContextError> {
        // An empty document parses as null; treat it as all defaults
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Load config from a YAML file.
    ///
    /// # Example
    /// ```ignore
    /// use ctxwire::RegistryConfig;
    ///
    /// let config = RegistryConfig::load_from_file("config/ctxwire.yaml")?;
    /// ```
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ContextError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ContextError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&contents)
    }
}

fn env_flag(name: &str, default: bool) -> Result<bool, ContextError> {
    match std::env::var(name) {
        Ok(raw) => parse_flag(&raw)
            .ok_or_else(|| ContextError::Config(format!("{} must be a boolean, got '{}'", name, raw))),
        Err(_) => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
