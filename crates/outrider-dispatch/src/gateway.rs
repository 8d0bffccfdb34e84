//! Dispatch facade used by alert evaluators.
//!
//! Evaluators decide *that* an alert fires; the [`Dispatcher`] owns *how* it
//! leaves the process. Delivery failures are logged and swallowed here so an
//! alert cycle never aborts because the queue or the push endpoint was down.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use outrider_core::types::Recipient;
use outrider_store::{paths, RealtimeStore};

use crate::push::{PushNote, PushSender};
use crate::queue::{ChatMessage, QueueProducer};

/// Sends chat and push notifications for one vehicle.
pub struct Dispatcher {
    store: Arc<dyn RealtimeStore>,
    queue: Arc<dyn QueueProducer>,
    push: Arc<dyn PushSender>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn RealtimeStore>,
        queue: Arc<dyn QueueProducer>,
        push: Arc<dyn PushSender>,
    ) -> Self {
        Self { store, queue, push }
    }

    /// Queue one chat message for one recipient.
    pub async fn send_chat(&self, vehicle_id: &str, recipient: &Recipient, message: &str) {
        let chat = ChatMessage {
            vehicle_id: vehicle_id.to_string(),
            message: message.to_string(),
            number: recipient.contact_id.clone(),
            is_group: recipient.is_group,
        };
        match self.queue.publish(&chat).await {
            Ok(()) => {
                debug!(vehicle_id = %vehicle_id, number = %chat.number, "chat alert queued");
            }
            Err(e) => {
                error!(vehicle_id = %vehicle_id, number = %chat.number, error = %e, "failed to queue chat alert");
            }
        }
    }

    /// Push one note to every device registered for the vehicle.
    pub async fn send_push(&self, vehicle_id: &str, note: &PushNote) {
        let tokens = match self.device_tokens(vehicle_id).await {
            Ok(tokens) => tokens,
            Err(e) => {
                error!(vehicle_id = %vehicle_id, error = %e, "failed to read push tokens");
                return;
            }
        };
        if tokens.is_empty() {
            warn!(vehicle_id = %vehicle_id, "no push tokens registered, skipping push");
            return;
        }
        match self.push.send(&tokens, note).await {
            Ok(report) if report.failure > 0 => {
                warn!(
                    vehicle_id = %vehicle_id,
                    success = report.success,
                    failure = report.failure,
                    "push sent with failures"
                );
            }
            Ok(report) => {
                debug!(vehicle_id = %vehicle_id, success = report.success, "push sent");
            }
            Err(e) => {
                error!(vehicle_id = %vehicle_id, error = %e, "failed to send push");
            }
        }
    }

    async fn device_tokens(&self, vehicle_id: &str) -> outrider_store::Result<Vec<String>> {
        let registry = self.store.read(&paths::fcm_tokens(vehicle_id)).await?;
        Ok(registry.as_ref().map(collect_tokens).unwrap_or_default())
    }
}

/// Extract token strings from a `{ push_key: { token, updatedAt } }` registry
/// node. Records without a string `token` field are skipped.
fn collect_tokens(registry: &Value) -> Vec<String> {
    registry
        .as_object()
        .map(|records| {
            records
                .values()
                .filter_map(|record| record.get("token").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
