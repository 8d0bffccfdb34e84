//! Chat message queue producer.
//!
//! Alert messages reach the chat gateway through a message queue topic. The
//! HTTP producer speaks the Kafka REST proxy v2 surface; the mock producer
//! records messages in memory for tests.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use outrider_core::config::QueueConfig;
use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, Result};

/// Media type of the Kafka REST proxy v2 JSON embedding.
const KAFKA_JSON_V2: &str = "application/vnd.kafka.json.v2+json";

/// One chat alert on the wire.
///
/// Field names are fixed by the downstream gateway, which expects camelCase
/// keys. `number` is the recipient's chat contact id and `is_group` tells the
/// gateway whether that id addresses a group conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub vehicle_id: String,
    pub message: String,
    pub number: String,
    pub is_group: bool,
}

/// Publishes chat messages to the notification topic.
#[async_trait]
pub trait QueueProducer: Send + Sync {
    async fn publish(&self, message: &ChatMessage) -> Result<()>;
}

#[derive(Serialize)]
struct ProduceRecord<'a> {
    value: &'a ChatMessage,
}

#[derive(Serialize)]
struct ProduceRequest<'a> {
    records: Vec<ProduceRecord<'a>>,
}

/// Producer for a Kafka REST proxy, one record per publish.
pub struct HttpQueueProducer {
    client: reqwest::Client,
    url: String,
}

impl HttpQueueProducer {
    pub fn new(base_url: &str, topic: &str) -> Result<Self> {
        if base_url.is_empty() || topic.is_empty() {
            return Err(DispatchError::Config(
                "queue base URL and topic must be set".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/topics/{}", base_url.trim_end_matches('/'), topic),
        })
    }
}

#[async_trait]
impl QueueProducer for HttpQueueProducer {
    async fn publish(&self, message: &ChatMessage) -> Result<()> {
        let request = ProduceRequest {
            records: vec![ProduceRecord { value: message }],
        };
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", KAFKA_JSON_V2)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Queue {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// In-memory producer that records everything published to it.
#[derive(Default)]
pub struct MockQueue {
    published: Mutex<Vec<ChatMessage>>,
}

impl MockQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<ChatMessage> {
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl QueueProducer for MockQueue {
    async fn publish(&self, message: &ChatMessage) -> Result<()> {
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.clone());
        Ok(())
    }
}

/// Build the queue producer selected by configuration.
pub fn create_queue(config: &QueueConfig) -> Result<Arc<dyn QueueProducer>> {
    match config {
        QueueConfig::Http { base_url, topic } => {
            Ok(Arc::new(HttpQueueProducer::new(base_url, topic)?))
        }
        QueueConfig::Mock => Ok(Arc::new(MockQueue::new())),
    }
}
