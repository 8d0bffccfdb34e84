//! Device push delivery over FCM.
//!
//! The sender takes the full token list for a vehicle and batches it under
//! the FCM limit of 500 registration ids per request. Individual token
//! failures (expired, unregistered) are logged and counted but never turned
//! into errors; only transport and endpoint-level failures are.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use outrider_core::config::PushConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{DispatchError, Result};

/// FCM rejects requests with more than 500 registration ids.
const BATCH_SIZE: usize = 500;

/// One push notification, before token fan-out.
#[derive(Debug, Clone, PartialEq)]
pub struct PushNote {
    pub title: String,
    pub body: String,
    pub image_url: Option<String>,
}

impl PushNote {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            image_url: None,
        }
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

/// Delivery counts across every batch of one send.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PushReport {
    pub success: u32,
    pub failure: u32,
}

/// Sends one note to a set of device tokens.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, tokens: &[String], note: &PushNote) -> Result<PushReport>;
}

#[derive(Serialize)]
struct FcmRequest<'a> {
    registration_ids: &'a [String],
    notification: FcmNotification<'a>,
}

#[derive(Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct FcmResponse {
    #[serde(default)]
    success: u32,
    #[serde(default)]
    failure: u32,
    #[serde(default)]
    results: Vec<FcmResult>,
}

#[derive(Debug, Deserialize)]
struct FcmResult {
    #[serde(default)]
    error: Option<String>,
}

/// Client for the FCM legacy HTTP endpoint.
#[derive(Debug)]
pub struct FcmClient {
    client: reqwest::Client,
    endpoint: String,
    server_key: String,
}

impl FcmClient {
    /// Build a client, resolving the server key from the named environment
    /// variable.
    pub fn from_config(endpoint: &str, server_key_env: &str) -> Result<Self> {
        let server_key = std::env::var(server_key_env).map_err(|_| {
            DispatchError::Config(format!(
                "push server key environment variable '{server_key_env}' is not set"
            ))
        })?;
        Self::new(endpoint, server_key)
    }

    pub fn new(endpoint: &str, server_key: String) -> Result<Self> {
        if endpoint.is_empty() {
            return Err(DispatchError::Config("push endpoint is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            server_key,
        })
    }

    async fn send_batch(&self, tokens: &[String], note: &PushNote) -> Result<FcmResponse> {
        let request = FcmRequest {
            registration_ids: tokens,
            notification: FcmNotification {
                title: &note.title,
                body: &note.body,
                image: note.image_url.as_deref(),
            },
        };
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Push {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl PushSender for FcmClient {
    async fn send(&self, tokens: &[String], note: &PushNote) -> Result<PushReport> {
        let mut report = PushReport::default();
        for batch in tokens.chunks(BATCH_SIZE) {
            let response = self.send_batch(batch, note).await?;
            report.success += response.success;
            report.failure += response.failure;
            for (token, result) in batch.iter().zip(&response.results) {
                if let Some(error) = &result.error {
                    warn!(token = %token, error = %error, "push token rejected");
                }
            }
        }
        Ok(report)
    }
}

/// In-memory sender that records every call.
#[derive(Default)]
pub struct MockPush {
    sent: Mutex<Vec<(Vec<String>, PushNote)>>,
}

impl MockPush {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(Vec<String>, PushNote)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl PushSender for MockPush {
    async fn send(&self, tokens: &[String], note: &PushNote) -> Result<PushReport> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((tokens.to_vec(), note.clone()));
        Ok(PushReport {
            success: tokens.len() as u32,
            failure: 0,
        })
    }
}

/// Build the push sender selected by configuration.
pub fn create_push(config: &PushConfig) -> Result<Arc<dyn PushSender>> {
    match config {
        PushConfig::Fcm {
            endpoint,
            server_key_env,
        } => Ok(Arc::new(FcmClient::from_config(endpoint, server_key_env)?)),
        PushConfig::Mock => Ok(Arc::new(MockPush::new())),
    }
}
