//! Daemon configuration.
//!
//! Loaded from a YAML file (default `~/.outrider/config.yaml`, overridable
//! with `--config`). Each outbound dependency has a `backend` selector so the
//! daemon can run against the real services or the in-process test doubles.
//! Secrets never live in the file: the file names environment variables and
//! the clients read them at construction time.
//!
//! ## Example
//!
//! ```yaml
//! store:
//!   backend: rtdb
//!   base_url: http://127.0.0.1:9000
//!   auth_token_env: OUTRIDER_STORE_TOKEN
//! queue:
//!   backend: http
//!   base_url: http://127.0.0.1:8082
//!   topic: whatsapp-notifications
//! push:
//!   backend: fcm
//!   endpoint: https://fcm.googleapis.com/fcm/send
//!   server_key_env: OUTRIDER_FCM_SERVER_KEY
//! alerts:
//!   accident_confirm_delay_secs: 15
//!   face_handler_url: https://faces.example.com
//!   static_map:
//!     base_url: https://maps.geoapify.com/v1/staticmap
//!     api_key_env: OUTRIDER_MAP_API_KEY
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OutriderError, Result};

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Realtime document store backend
    #[serde(default)]
    pub store: StoreConfig,

    /// Outbound chat queue backend
    #[serde(default)]
    pub queue: QueueConfig,

    /// Push notification backend
    #[serde(default)]
    pub push: PushConfig,

    /// Alerting behavior knobs
    #[serde(default)]
    pub alerts: AlertsConfig,
}

impl Config {
    /// Load configuration from a YAML file: read, parse, validate.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| OutriderError::config_not_found_with_source(path, e))?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| OutriderError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        match &self.store {
            StoreConfig::Rtdb { base_url, .. } if base_url.is_empty() => {
                return Err(OutriderError::config_validation("store.base_url must not be empty"));
            }
            _ => {}
        }
        match &self.queue {
            QueueConfig::Http { base_url, topic } => {
                if base_url.is_empty() {
                    return Err(OutriderError::config_validation("queue.base_url must not be empty"));
                }
                if topic.is_empty() {
                    return Err(OutriderError::config_validation("queue.topic must not be empty"));
                }
            }
            QueueConfig::Mock => {}
        }
        if let PushConfig::Fcm { endpoint, .. } = &self.push
            && endpoint.is_empty()
        {
            return Err(OutriderError::config_validation("push.endpoint must not be empty"));
        }
        Ok(())
    }
}

/// Default config file path: `~/.outrider/config.yaml`.
pub fn default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| OutriderError::Internal {
        message: "home directory not resolvable".into(),
    })?;
    Ok(home.join(".outrider").join("config.yaml"))
}

/// Realtime store backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// RTDB-style HTTP backend (REST reads/writes, SSE change stream)
    Rtdb {
        /// Database root URL, no trailing slash
        base_url: String,
        /// Name of the env var holding the auth token; `None` = unauthenticated
        #[serde(default)]
        auth_token_env: Option<String>,
    },
    /// In-process store (development and tests)
    Memory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        // RTDB emulator default
        Self::Rtdb {
            base_url: "http://127.0.0.1:9000".to_string(),
            auth_token_env: None,
        }
    }
}

/// Chat queue backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum QueueConfig {
    /// REST-proxy-style HTTP producer
    Http {
        /// Proxy root URL, no trailing slash
        base_url: String,
        /// Topic all chat notifications are published under
        #[serde(default = "default_topic")]
        topic: String,
    },
    /// Recording mock (development and tests)
    Mock,
}

fn default_topic() -> String {
    "whatsapp-notifications".to_string()
}

impl Default for QueueConfig {
    fn default() -> Self {
        // Kafka REST proxy default port
        Self::Http {
            base_url: "http://127.0.0.1:8082".to_string(),
            topic: default_topic(),
        }
    }
}

/// Push backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum PushConfig {
    /// FCM legacy HTTP endpoint
    Fcm {
        /// Full send endpoint URL
        endpoint: String,
        /// Name of the env var holding the server key
        #[serde(default = "default_server_key_env")]
        server_key_env: String,
    },
    /// Recording mock (development and tests)
    Mock,
}

fn default_server_key_env() -> String {
    "OUTRIDER_FCM_SERVER_KEY".to_string()
}

impl Default for PushConfig {
    fn default() -> Self {
        Self::Fcm {
            endpoint: "https://fcm.googleapis.com/fcm/send".to_string(),
            server_key_env: default_server_key_env(),
        }
    }
}

/// Alerting behavior knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// Seconds between the accident confirmation message and the emergency
    /// escalation; the abort window.
    #[serde(default = "default_confirm_delay_secs")]
    pub accident_confirm_delay_secs: u64,

    /// Base URL of the face-capture handler; the intruder push image is
    /// `{url}/{vehicle_id}/intruder_photo/latest.jpg`. `None` = no image.
    #[serde(default)]
    pub face_handler_url: Option<String>,

    /// Static map rendering for the geofence push image. `None` = no image.
    #[serde(default)]
    pub static_map: Option<StaticMapConfig>,
}

fn default_confirm_delay_secs() -> u64 {
    15
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            accident_confirm_delay_secs: default_confirm_delay_secs(),
            face_handler_url: None,
            static_map: None,
        }
    }
}

/// Static map provider used for geofence push images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticMapConfig {
    /// Map provider base URL
    pub base_url: String,
    /// Name of the env var holding the provider API key
    pub api_key_env: String,
}

impl StaticMapConfig {
    /// Resolve the API key from the named environment variable.
    ///
    /// An unset variable is not fatal: the geofence alert still fires, just
    /// without a map image. Callers decide how to log it.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
store:
  backend: rtdb
  base_url: http://127.0.0.1:9000
queue:
  backend: http
  base_url: http://queue.internal:8082
  topic: whatsapp-notifications
push:
  backend: mock
alerts:
  accident_confirm_delay_secs: 30
  face_handler_url: https://faces.example.com
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.alerts.accident_confirm_delay_secs, 30);
        assert_eq!(
            config.alerts.face_handler_url.as_deref(),
            Some("https://faces.example.com")
        );
        match config.queue {
            QueueConfig::Http { base_url, topic } => {
                assert_eq!(base_url, "http://queue.internal:8082");
                assert_eq!(topic, "whatsapp-notifications");
            }
            QueueConfig::Mock => panic!("expected http queue"),
        }
        assert!(matches!(config.push, PushConfig::Mock));
    }

    #[test]
    fn test_topic_defaults_when_omitted() {
        let yaml = r#"
queue:
  backend: http
  base_url: http://127.0.0.1:8082
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        match config.queue {
            QueueConfig::Http { topic, .. } => assert_eq!(topic, "whatsapp-notifications"),
            QueueConfig::Mock => panic!("expected http queue"),
        }
    }

    #[test]
    fn test_memory_backend_parses() {
        let yaml = r#"
store:
  backend: memory
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(config.store, StoreConfig::Memory));
    }

    #[test]
    fn test_validation_rejects_empty_base_url() {
        let config = Config {
            queue: QueueConfig::Http {
                base_url: String::new(),
                topic: default_topic(),
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("queue.base_url"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/outrider.yaml")).unwrap_err();
        assert!(matches!(err, OutriderError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_load_from_tempfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "store:\n  backend: memory\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert!(matches!(config.store, StoreConfig::Memory));
    }
}
