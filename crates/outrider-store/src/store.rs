//! The [`RealtimeStore`] trait and backend factory.
//!
//! Alert evaluators never talk to a concrete backend. They hold an
//! `Arc<dyn RealtimeStore>` and the factory decides at startup whether that
//! is the HTTP-backed RTDB client or the in-memory store used by tests.

use std::sync::Arc;

use async_trait::async_trait;
use outrider_core::config::StoreConfig;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::memory::MemoryStore;
use crate::rtdb::RtdbClient;

/// Buffer size for change-event channels.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// A changed child inside a watched collection.
///
/// `key` is the child's key under the collection (for `vehicle` this is the
/// vehicle id) and `snapshot` is the child's full value after the change.
#[derive(Debug, Clone)]
pub struct ChildEvent {
    pub key: String,
    pub snapshot: Value,
}

/// Path-addressed JSON document store with child-level change streams.
///
/// Paths are slash-separated (`settings/truck-7/emergency_number`) and values
/// are arbitrary JSON. Absent paths read as `None`, never as an error.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Point read. `Ok(None)` when nothing exists at `path`.
    async fn read(&self, path: &str) -> Result<Option<Value>>;

    /// Replace the value at `path`, creating intermediate nodes as needed.
    async fn set(&self, path: &str, value: Value) -> Result<()>;

    /// Shallow merge of `value`'s top-level fields into the node at `path`.
    /// Fields not named in `value` are left alone.
    async fn update(&self, path: &str, value: Value) -> Result<()>;

    /// Remove the node at `path`. Deleting an absent path is not an error.
    async fn delete(&self, path: &str) -> Result<()>;

    /// All children of `collection` whose field `child_key` equals `value`,
    /// as `(key, child)` pairs.
    async fn query_by_child(
        &self,
        collection: &str,
        child_key: &str,
        value: &str,
    ) -> Result<Vec<(String, Value)>>;

    /// Subscribe to child changes under `collection`.
    ///
    /// Each call is an independent subscription with its own channel. Events
    /// fire for children that already existed and were then mutated; the
    /// initial contents of the collection are not replayed. The subscription
    /// survives transport errors: backends reconnect internally rather than
    /// closing the channel.
    async fn watch_children(&self, collection: &str) -> mpsc::Receiver<ChildEvent>;
}

/// Build the store backend selected by configuration.
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn RealtimeStore>> {
    match config {
        StoreConfig::Rtdb {
            base_url,
            auth_token_env,
        } => {
            let client = RtdbClient::from_config(base_url, auth_token_env.as_deref())?;
            Ok(Arc::new(client))
        }
        StoreConfig::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_store_memory() {
        let store = create_store(&StoreConfig::Memory);
        assert!(store.is_ok());
    }

    #[test]
    fn test_create_store_rtdb() {
        let config = StoreConfig::Rtdb {
            base_url: "http://localhost:9000".to_string(),
            auth_token_env: None,
        };
        let store = create_store(&config);
        assert!(store.is_ok());
    }

    #[test]
    fn test_create_store_rtdb_missing_token_env() {
        let config = StoreConfig::Rtdb {
            base_url: "http://localhost:9000".to_string(),
            auth_token_env: Some("OUTRIDER_TEST_TOKEN_THAT_IS_NOT_SET".to_string()),
        };
        let store = create_store(&config);
        assert!(store.is_err());
    }
}
