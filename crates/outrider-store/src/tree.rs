//! JSON tree helpers shared by store backends.
//!
//! Paths are slash-separated field chains (`settings/truck-7/radius`).
//! Writing a null value removes the node, matching RTDB write semantics.

use std::collections::HashSet;

use serde_json::{Map, Value};

pub(crate) fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

pub(crate) fn get_path(root: &Value, path: &str) -> Option<Value> {
    let mut node = root;
    for seg in segments(path) {
        node = node.get(seg)?;
    }
    if node.is_null() {
        None
    } else {
        Some(node.clone())
    }
}

pub(crate) fn set_path(root: &mut Value, path: &str, value: Value) {
    let parts: Vec<&str> = segments(path).collect();
    if parts.is_empty() {
        *root = value;
        return;
    }
    let mut node = root;
    for seg in &parts[..parts.len() - 1] {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = node
            .as_object_mut()
            .unwrap()
            .entry(seg.to_string())
            .or_insert(Value::Object(Map::new()));
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    let fields = node.as_object_mut().unwrap();
    let last = parts[parts.len() - 1];
    if value.is_null() {
        fields.remove(last);
    } else {
        fields.insert(last.to_string(), value);
    }
}

/// Shallow merge of an object's fields at `path`. Null field values remove
/// the field. Non-object values degrade to a plain set.
pub(crate) fn merge_path(root: &mut Value, path: &str, value: Value) {
    let Value::Object(fields) = value else {
        set_path(root, path, value);
        return;
    };
    for (key, field) in fields {
        let field_path = if path.is_empty() {
            key
        } else {
            format!("{path}/{key}")
        };
        set_path(root, &field_path, field);
    }
}

pub(crate) fn child_keys(root: &Value, collection: &str) -> HashSet<String> {
    get_path(root, collection)
        .and_then(|v| {
            v.as_object()
                .map(|m| m.keys().cloned().collect::<HashSet<_>>())
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_creates_intermediate_objects() {
        let mut root = Value::Object(Map::new());
        set_path(&mut root, "settings/truck-7/radius/value", json!(2.5));
        assert_eq!(root, json!({"settings": {"truck-7": {"radius": {"value": 2.5}}}}));
    }

    #[test]
    fn test_set_null_removes_node() {
        let mut root = json!({"incidents": {"truck-7": {"aborted": false}}});
        set_path(&mut root, "incidents/truck-7", Value::Null);
        assert_eq!(root, json!({"incidents": {}}));
    }

    #[test]
    fn test_get_null_reads_as_absent() {
        let root = json!({"a": {"b": null}});
        assert_eq!(get_path(&root, "a/b"), None);
        assert_eq!(get_path(&root, "a/missing"), None);
    }

    #[test]
    fn test_merge_keeps_unnamed_fields() {
        let mut root = json!({"rec": {"aborted": false, "created_at": 100}});
        merge_path(&mut root, "rec", json!({"aborted": true, "note": "x"}));
        assert_eq!(
            root,
            json!({"rec": {"aborted": true, "created_at": 100, "note": "x"}})
        );
    }

    #[test]
    fn test_child_keys() {
        let root = json!({"vehicle": {"a": 1, "b": 2}, "other": 3});
        let keys = child_keys(&root, "vehicle");
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("a"));
        assert!(keys.contains("b"));
        assert!(child_keys(&root, "missing").is_empty());
    }
}
