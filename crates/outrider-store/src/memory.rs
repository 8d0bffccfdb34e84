//! In-memory store backend.
//!
//! Holds the whole tree as one JSON value behind a mutex and implements the
//! same child-changed semantics as the RTDB backend: a watcher fires when an
//! existing child of the watched collection is mutated, not when a child
//! first appears or when the collection is read.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use crate::error::Result;
use crate::store::{ChildEvent, RealtimeStore, DEFAULT_CHANNEL_BUFFER};
use crate::tree::{child_keys, get_path, merge_path, set_path};

/// Where a mutated path sits relative to a watched collection.
enum Placement {
    /// The mutation replaced the collection node itself.
    Whole,
    /// The mutation touched one child (or something nested inside it).
    Child(String),
    /// Unrelated path.
    Outside,
}

fn placement(collection: &str, path: &str) -> Placement {
    if path == collection {
        return Placement::Whole;
    }
    match path.strip_prefix(collection).and_then(|r| r.strip_prefix('/')) {
        Some(rest) => {
            let child = rest.split('/').next().unwrap_or(rest);
            Placement::Child(child.to_string())
        }
        None => Placement::Outside,
    }
}

/// In-memory [`RealtimeStore`].
pub struct MemoryStore {
    tree: Mutex<Value>,
    watchers: Mutex<HashMap<String, Vec<mpsc::Sender<ChildEvent>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tree: Mutex::new(Value::Object(Map::new())),
            watchers: Mutex::new(HashMap::new()),
        }
    }

    /// Apply a mutation under the tree lock, then notify watchers whose
    /// collection contains the mutated path.
    fn apply<F: FnOnce(&mut Value)>(&self, path: &str, mutate: F) {
        let watched: Vec<String> = {
            let watchers = self.watchers.lock().unwrap_or_else(|e| e.into_inner());
            watchers.keys().cloned().collect()
        };

        let mut events: Vec<(String, ChildEvent)> = Vec::new();
        {
            let mut tree = self.tree.lock().unwrap_or_else(|e| e.into_inner());
            let before: Vec<(String, HashSet<String>)> = watched
                .iter()
                .map(|c| (c.clone(), child_keys(&tree, c)))
                .collect();

            mutate(&mut *tree);

            for (collection, existing) in before {
                let changed: Vec<String> = match placement(&collection, path) {
                    Placement::Outside => continue,
                    Placement::Child(key) => vec![key],
                    Placement::Whole => {
                        let after = child_keys(&tree, &collection);
                        existing.union(&after).cloned().collect()
                    }
                };
                for key in changed {
                    // A child that was not there before is an addition, and a
                    // child that is gone afterwards is a removal. Neither is a
                    // child-changed event.
                    if !existing.contains(&key) {
                        continue;
                    }
                    let Some(snapshot) = get_path(&tree, &format!("{collection}/{key}")) else {
                        continue;
                    };
                    events.push((collection.clone(), ChildEvent { key, snapshot }));
                }
            }
        }

        let mut watchers = self.watchers.lock().unwrap_or_else(|e| e.into_inner());
        for (collection, event) in events {
            if let Some(senders) = watchers.get_mut(&collection) {
                senders.retain(|tx| !tx.is_closed());
                for tx in senders.iter() {
                    if let Err(TrySendError::Full(_)) = tx.try_send(event.clone()) {
                        warn!(collection = %collection, key = %event.key, "change channel full, dropping event");
                    }
                }
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<Option<Value>> {
        let tree = self.tree.lock().unwrap_or_else(|e| e.into_inner());
        Ok(get_path(&tree, path.trim_matches('/')))
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        let path = path.trim_matches('/');
        self.apply(path, |tree| set_path(tree, path, value));
        Ok(())
    }

    async fn update(&self, path: &str, value: Value) -> Result<()> {
        let path = path.trim_matches('/');
        self.apply(path, |tree| merge_path(tree, path, value));
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let path = path.trim_matches('/');
        self.apply(path, |tree| set_path(tree, path, Value::Null));
        Ok(())
    }

    async fn query_by_child(
        &self,
        collection: &str,
        child_key: &str,
        value: &str,
    ) -> Result<Vec<(String, Value)>> {
        let tree = self.tree.lock().unwrap_or_else(|e| e.into_inner());
        let mut matches = Vec::new();
        if let Some(Value::Object(children)) = get_path(&tree, collection.trim_matches('/')).as_ref()
        {
            for (key, child) in children {
                if child.get(child_key).and_then(Value::as_str) == Some(value) {
                    matches.push((key.clone(), child.clone()));
                }
            }
        }
        Ok(matches)
    }

    async fn watch_children(&self, collection: &str) -> mpsc::Receiver<ChildEvent> {
        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_BUFFER);
        let mut watchers = self.watchers.lock().unwrap_or_else(|e| e.into_inner());
        watchers
            .entry(collection.trim_matches('/').to_string())
            .or_default()
            .push(tx);
        rx
    }
}
