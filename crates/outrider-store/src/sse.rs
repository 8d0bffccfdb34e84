//! Server-sent-events parsing for the RTDB change stream.
//!
//! The REST streaming protocol delivers `put` and `patch` events whose data
//! is `{"path": "/truck-7/location", "data": {...}}`. The client keeps a
//! local mirror of the watched collection and applies each event to it; the
//! functions here are pure so the protocol handling can be tested without a
//! live connection.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;

use crate::tree;

/// One parsed SSE event.
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental SSE frame decoder. Feed it raw chunks as they arrive; it
/// yields events once their terminating blank line has been seen.
pub struct SseBuffer {
    pending: String,
}

impl SseBuffer {
    pub fn new() -> Self {
        Self {
            pending: String::new(),
        }
    }

    pub fn push(&mut self, chunk: &str) -> Vec<SseEvent> {
        self.pending.push_str(chunk);
        let mut events = Vec::new();
        while let Some(idx) = self.pending.find("\n\n") {
            let block: String = self.pending.drain(..idx + 2).collect();
            if let Some(event) = parse_block(&block) {
                events.push(event);
            }
        }
        events
    }
}

impl Default for SseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event = String::new();
    let mut data_lines: Vec<&str> = Vec::new();
    for line in block.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        match field {
            "event" => event = value.to_string(),
            "data" => data_lines.push(value),
            _ => {}
        }
    }
    if event.is_empty() && data_lines.is_empty() {
        return None;
    }
    Some(SseEvent {
        event,
        data: data_lines.join("\n"),
    })
}

/// Payload of a `put` or `patch` stream event.
#[derive(Debug, Deserialize)]
pub struct StreamChange {
    pub path: String,
    pub data: Value,
}

/// Apply a `put` (replace) to the mirrored collection. Returns the top-level
/// child keys the write touched.
pub fn apply_put(cache: &mut Value, path: &str, data: Value) -> Vec<String> {
    let parts: Vec<&str> = tree::segments(path).collect();
    if parts.is_empty() {
        let mut affected: HashSet<String> = cache
            .as_object()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        if let Some(children) = data.as_object() {
            affected.extend(children.keys().cloned());
        }
        *cache = data;
        affected.into_iter().collect()
    } else {
        tree::set_path(cache, path, data);
        vec![parts[0].to_string()]
    }
}

/// Apply a `patch` (shallow merge) to the mirrored collection. Returns the
/// top-level child keys the merge touched.
pub fn apply_patch(cache: &mut Value, path: &str, data: Value) -> Vec<String> {
    let parts: Vec<&str> = tree::segments(path).collect();
    if parts.is_empty() {
        let affected: Vec<String> = data
            .as_object()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        tree::merge_path(cache, "", data);
        affected
    } else {
        tree::merge_path(cache, path, data);
        vec![parts[0].to_string()]
    }
}
