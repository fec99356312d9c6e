//! Error type for registry configuration and envelope handling.
//!
//! Marshal and unmarshal never fail; only the surrounding plumbing does.

use std::fmt;

#[derive(Debug)]
pub enum ContextError {
    /// A process-wide registration arrived after the registry was first used
    /// while strict registration is enabled.
    LateRegistration {
        kind: &'static str,
    },
    Config(String),
    JsonError(serde_json::Error),
    IoError(std::io::Error),
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextError::LateRegistration { kind } => {
                write!(f, "Context {} registered after first use", kind)
            }
            ContextError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ContextError::JsonError(e) => write!(f, "JSON error: {}", e),
            ContextError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ContextError::JsonError(e) => Some(e),
            ContextError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ContextError {
    fn from(err: serde_json::Error) -> Self {
        ContextError::JsonError(err)
    }
}

impl From<std::io::Error> for ContextError {
    fn from(err: std::io::Error) -> Self {
        ContextError::IoError(err)
    }
}

impl From<serde_yaml::Error> for ContextError {
    fn from(err: serde_yaml::Error) -> Self {
        ContextError::Config(format!("Failed to parse YAML: {}", err))
    }
}
