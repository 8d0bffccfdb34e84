//! Notification dispatch for Outrider.
//!
//! Alerts leave the process two ways: as chat messages published to the
//! notification topic and as device pushes over FCM. Evaluators go through
//! the [`Dispatcher`] facade, which looks up a vehicle's push tokens, fans
//! messages out and logs delivery failures without propagating them.

pub mod error;
pub mod gateway;
pub mod push;
pub mod queue;

pub use error::{DispatchError, Result};
pub use gateway::Dispatcher;
pub use push::{create_push, FcmClient, MockPush, PushNote, PushReport, PushSender};
pub use queue::{create_queue, ChatMessage, HttpQueueProducer, MockQueue, QueueProducer};
