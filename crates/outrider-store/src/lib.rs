//! Realtime document store access for Outrider.
//!
//! Everything above this crate talks to the fleet backend through the
//! [`RealtimeStore`] trait: path-addressed JSON reads and writes plus
//! child-level change streams. Two backends implement it:
//!
//! - [`RtdbClient`]: the RTDB REST surface with an SSE change stream
//! - [`MemoryStore`]: an in-process tree with the same change semantics,
//!   used by tests and local development
//!
//! ```no_run
//! use outrider_core::config::StoreConfig;
//! use outrider_store::{create_store, RealtimeStore};
//!
//! # async fn demo() -> outrider_store::Result<()> {
//! let store = create_store(&StoreConfig::Memory)?;
//! let settings = store.read("settings/truck-7").await?;
//! assert!(settings.is_none());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod memory;
pub mod paths;
pub mod rtdb;
pub mod sse;
pub mod store;
mod tree;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use rtdb::RtdbClient;
pub use store::{create_store, ChildEvent, RealtimeStore, DEFAULT_CHANNEL_BUFFER};
