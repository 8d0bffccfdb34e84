//! Error types for Outrider operations.
//!
//! This module defines [`OutriderError`], the error enum shared across the
//! Outrider crates. Errors are designed for visibility - no silent failures,
//! clear actionable messages. Transport-level errors live in the store and
//! dispatch crates and compose this type where they need to.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`OutriderError`].
pub type Result<T> = std::result::Result<T, OutriderError>;

/// Error type for configuration, I/O, and parsing across Outrider.
#[derive(Debug, Error)]
pub enum OutriderError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration file not found
    #[error("Configuration not found at {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration file is invalid YAML
    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    /// Configuration validation failed
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// An environment variable named by the configuration is not set
    #[error("Environment variable {name} (for {purpose}) is not set")]
    ConfigMissingEnv { name: String, purpose: String },

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error with context
    #[error("I/O error {operation}: {path}")]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory creation failed
    #[error("Failed to create directory: {path}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Parsing Errors
    // =========================================================================
    /// JSON parsing error
    #[error("JSON parse error in {context}: {message}")]
    JsonParse {
        context: String,
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// YAML parsing error
    #[error("YAML parse error in {context}: {message}")]
    YamlParse { context: String, message: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error (bug in Outrider)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl OutriderError {
    // =========================================================================
    // Constructor helpers for common error patterns
    // =========================================================================

    /// Create a ConfigNotFound error
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ConfigNotFound {
            path: path.into(),
            source: None,
        }
    }

    /// Create a ConfigNotFound error with source
    pub fn config_not_found_with_source(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigNotFound {
            path: path.into(),
            source: Some(source),
        }
    }

    /// Create a ConfigValidation error
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create a ConfigMissingEnv error
    pub fn missing_env(name: impl Into<String>, purpose: impl Into<String>) -> Self {
        Self::ConfigMissingEnv {
            name: name.into(),
            purpose: purpose.into(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// Create a JSON parse error
    pub fn json_parse(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::JsonParse {
            context: context.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a YAML parse error
    pub fn yaml_parse(context: impl Into<String>, source: serde_yaml::Error) -> Self {
        Self::YamlParse {
            context: context.into(),
            message: source.to_string(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    // =========================================================================
    // Error classification helpers
    // =========================================================================

    /// Returns true if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. }
                | Self::ConfigInvalid { .. }
                | Self::ConfigValidation { .. }
                | Self::ConfigMissingEnv { .. }
        )
    }

    /// Returns true if this error is fatal (the daemon should not start)
    pub fn is_fatal(&self) -> bool {
        self.is_config_error() || matches!(self, Self::Internal { .. })
    }

    /// Returns actionable guidance for the user
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            Self::ConfigNotFound { .. } => {
                Some("Create ~/.outrider/config.yaml or pass --config with an explicit path")
            }
            Self::ConfigInvalid { .. } => Some("Check YAML syntax in the configuration file"),
            Self::ConfigMissingEnv { .. } => {
                Some("Export the environment variable named in the config before starting")
            }
            Self::DirectoryCreation { .. } => {
                Some("Check filesystem permissions for the target directory")
            }
            _ => None,
        }
    }
}
