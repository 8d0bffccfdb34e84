//! RTDB-style HTTP backend.
//!
//! Point operations map onto the REST surface (`GET`/`PUT`/`PATCH`/`DELETE`
//! on `{base}/{path}.json`), and [`RealtimeStore::watch_children`] consumes
//! the SSE change stream, mirroring the watched collection locally so each
//! `put`/`patch` can be turned into a full-child event.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::sse::{apply_patch, apply_put, SseBuffer, SseEvent, StreamChange};
use crate::store::{ChildEvent, RealtimeStore, DEFAULT_CHANNEL_BUFFER};

/// Wait between change-stream reconnect attempts.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Timeout for point operations. The change stream is exempt since it is a
/// deliberately long-lived response.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for an RTDB-compatible store.
#[derive(Clone)]
pub struct RtdbClient {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl RtdbClient {
    /// Build a client, resolving the auth token from the named environment
    /// variable when one is configured.
    pub fn from_config(base_url: &str, auth_token_env: Option<&str>) -> Result<Self> {
        let auth_token = match auth_token_env {
            Some(name) => match std::env::var(name) {
                Ok(token) => Some(token),
                Err(_) => {
                    return Err(StoreError::Config(format!(
                        "auth token environment variable '{name}' is not set"
                    )));
                }
            },
            None => None,
        };
        Self::new(base_url, auth_token)
    }

    pub fn new(base_url: &str, auth_token: Option<String>) -> Result<Self> {
        if base_url.is_empty() {
            return Err(StoreError::Config("store base URL is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.query(&[("auth", token.as_str())]),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder, path: &str) -> Result<Value> {
        let response = self
            .with_auth(request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                path: path.to_string(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    async fn stream_loop(&self, collection: String, tx: mpsc::Sender<ChildEvent>) {
        info!(collection = %collection, "starting change stream");
        loop {
            if tx.is_closed() {
                debug!(collection = %collection, "all receivers dropped, stopping change stream");
                return;
            }
            match self.stream_once(&collection, &tx).await {
                Ok(()) => {
                    warn!(collection = %collection, "change stream ended, reconnecting");
                }
                Err(e) => {
                    warn!(collection = %collection, error = %e, "change stream failed, reconnecting");
                }
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    /// One connection lifetime. Returns `Ok` when the server closes the
    /// stream or every receiver is gone; the caller decides about reconnects.
    async fn stream_once(&self, collection: &str, tx: &mpsc::Sender<ChildEvent>) -> Result<()> {
        let request = self
            .with_auth(self.client.get(self.url(collection)))
            .header("Accept", "text/event-stream");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                path: collection.to_string(),
                body,
            });
        }

        let mut mirror = Value::Null;
        let mut buffer = SseBuffer::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for event in buffer.push(&String::from_utf8_lossy(&chunk)) {
                for child in handle_stream_event(&mut mirror, &event)? {
                    if tx.send(child).await.is_err() {
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }
}

/// Turn one stream event into zero or more child-changed events, updating the
/// mirrored collection as a side effect.
fn handle_stream_event(mirror: &mut Value, event: &SseEvent) -> Result<Vec<ChildEvent>> {
    match event.event.as_str() {
        "put" | "patch" => {
            let change: StreamChange = serde_json::from_str(&event.data)?;
            let existing: HashSet<String> = mirror
                .as_object()
                .map(|m| m.keys().cloned().collect())
                .unwrap_or_default();
            let affected = if event.event == "put" {
                apply_put(mirror, &change.path, change.data)
            } else {
                apply_patch(mirror, &change.path, change.data)
            };

            let mut children = Vec::new();
            for key in affected {
                // A key not in the mirror yet is an addition (including the
                // whole initial snapshot), and a key gone after the write is
                // a removal. Only mutations of known children fire.
                if !existing.contains(&key) {
                    continue;
                }
                if let Some(snapshot) = mirror.get(key.as_str())
                    && !snapshot.is_null()
                {
                    children.push(ChildEvent {
                        key,
                        snapshot: snapshot.clone(),
                    });
                }
            }
            Ok(children)
        }
        "keep-alive" => Ok(Vec::new()),
        "cancel" => Err(StoreError::Stream("stream cancelled by server".to_string())),
        "auth_revoked" => Err(StoreError::Stream(
            "auth credential revoked".to_string(),
        )),
        other => {
            debug!(event = %other, "ignoring unknown stream event");
            Ok(Vec::new())
        }
    }
}

#[async_trait]
impl RealtimeStore for RtdbClient {
    async fn read(&self, path: &str) -> Result<Option<Value>> {
        let value = self.send(self.client.get(self.url(path)), path).await?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        self.send(self.client.put(self.url(path)).json(&value), path)
            .await?;
        Ok(())
    }

    async fn update(&self, path: &str, value: Value) -> Result<()> {
        self.send(self.client.patch(self.url(path)).json(&value), path)
            .await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.send(self.client.delete(self.url(path)), path).await?;
        Ok(())
    }

    async fn query_by_child(
        &self,
        collection: &str,
        child_key: &str,
        value: &str,
    ) -> Result<Vec<(String, Value)>> {
        let request = self.client.get(self.url(collection)).query(&[
            ("orderBy", format!("\"{child_key}\"")),
            ("equalTo", format!("\"{value}\"")),
        ]);
        let body = self.send(request, collection).await?;
        match body {
            Value::Object(children) => Ok(children.into_iter().collect()),
            _ => Ok(Vec::new()),
        }
    }

    async fn watch_children(&self, collection: &str) -> mpsc::Receiver<ChildEvent> {
        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_BUFFER);
        let watcher = self.clone();
        let collection = collection.trim_matches('/').to_string();
        tokio::spawn(async move { watcher.stream_loop(collection, tx).await });
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_url_building() {
        let client = RtdbClient::new("http://localhost:9000/", None).unwrap();
        assert_eq!(
            client.url("settings/truck-7"),
            "http://localhost:9000/settings/truck-7.json"
        );
        assert_eq!(client.url("/vehicle/"), "http://localhost:9000/vehicle.json");
    }

    #[test]
    fn test_empty_base_url_rejected() {
        assert!(RtdbClient::new("", None).is_err());
    }

    #[test]
    fn test_from_config_reads_token_env() {
        // SAFETY: variable name is unique to this test, nothing reads it
        // concurrently.
        unsafe { std::env::set_var("OUTRIDER_RTDB_TOKEN_TEST", "sekrit") };
        let client =
            RtdbClient::from_config("http://localhost:9000", Some("OUTRIDER_RTDB_TOKEN_TEST"))
                .unwrap();
        assert_eq!(client.auth_token.as_deref(), Some("sekrit"));
    }

    #[tokio::test]
    async fn test_read_present_and_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/settings/truck-7.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"enabled": true})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/settings/ghost.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
            .mount(&server)
            .await;

        let client = RtdbClient::new(&server.uri(), None).unwrap();
        let present = client.read("settings/truck-7").await.unwrap();
        assert_eq!(present, Some(json!({"enabled": true})));
        let absent = client.read("settings/ghost").await.unwrap();
        assert_eq!(absent, None);
    }

    #[tokio::test]
    async fn test_set_puts_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/incidents/truck-7.json"))
            .and(body_json(json!({"aborted": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"aborted": false})))
            .expect(1)
            .mount(&server)
            .await;

        let client = RtdbClient::new(&server.uri(), None).unwrap();
        client
            .set("incidents/truck-7", json!({"aborted": false}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_patches_and_delete_deletes() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/vehicle/truck-7/master_switch.json"))
            .and(body_json(json!({"value": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": false})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/incidents/truck-7.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
            .expect(1)
            .mount(&server)
            .await;

        let client = RtdbClient::new(&server.uri(), None).unwrap();
        client
            .update("vehicle/truck-7/master_switch", json!({"value": false}))
            .await
            .unwrap();
        client.delete("incidents/truck-7").await.unwrap();
    }

    #[tokio::test]
    async fn test_query_by_child_quotes_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wausers.json"))
            .and(query_param("orderBy", "\"vehicleId\""))
            .and(query_param("equalTo", "\"truck-7\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "u1": {"vehicleId": "truck-7", "remote_jid": "628111"},
            })))
            .mount(&server)
            .await;

        let client = RtdbClient::new(&server.uri(), None).unwrap();
        let matches = client
            .query_by_child("wausers", "vehicleId", "truck-7")
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].0, "u1");
    }

    #[tokio::test]
    async fn test_auth_token_sent_as_query_param() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vehicle.json"))
            .and(query_param("auth", "sekrit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
            .expect(1)
            .mount(&server)
            .await;

        let client = RtdbClient::new(&server.uri(), Some("sekrit".to_string())).unwrap();
        client.read("vehicle").await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vehicle.json"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Permission denied"))
            .mount(&server)
            .await;

        let client = RtdbClient::new(&server.uri(), None).unwrap();
        let err = client.read("vehicle").await.unwrap_err();
        match err {
            StoreError::Status { status, body, .. } => {
                assert_eq!(status, 401);
                assert!(body.contains("Permission denied"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_initial_snapshot_does_not_fire() {
        let mut mirror = Value::Null;
        let event = SseEvent {
            event: "put".to_string(),
            data: "{\"path\":\"/\",\"data\":{\"truck-7\":{\"n\":1}}}".to_string(),
        };
        let children = handle_stream_event(&mut mirror, &event).unwrap();
        assert!(children.is_empty());
        assert_eq!(mirror["truck-7"]["n"], json!(1));
    }

    #[test]
    fn test_known_child_mutation_fires_with_full_snapshot() {
        let mut mirror = json!({"truck-7": {"location": {"lat": 1.0}, "name": "Seven"}});
        let event = SseEvent {
            event: "put".to_string(),
            data: "{\"path\":\"/truck-7/location\",\"data\":{\"lat\":2.0}}".to_string(),
        };
        let children = handle_stream_event(&mut mirror, &event).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].key, "truck-7");
        assert_eq!(children[0].snapshot["location"]["lat"], json!(2.0));
        assert_eq!(children[0].snapshot["name"], json!("Seven"));
    }

    #[test]
    fn test_new_child_is_an_addition_not_a_change() {
        let mut mirror = json!({"truck-7": {"n": 1}});
        let event = SseEvent {
            event: "put".to_string(),
            data: "{\"path\":\"/truck-9\",\"data\":{\"n\":2}}".to_string(),
        };
        let children = handle_stream_event(&mut mirror, &event).unwrap();
        assert!(children.is_empty());
        assert_eq!(mirror["truck-9"]["n"], json!(2));
    }

    #[test]
    fn test_keep_alive_is_quiet_and_cancel_errors() {
        let mut mirror = Value::Null;
        let keep_alive = SseEvent {
            event: "keep-alive".to_string(),
            data: "null".to_string(),
        };
        assert!(handle_stream_event(&mut mirror, &keep_alive)
            .unwrap()
            .is_empty());

        let cancel = SseEvent {
            event: "cancel".to_string(),
            data: "null".to_string(),
        };
        assert!(handle_stream_event(&mut mirror, &cancel).is_err());
    }

    #[tokio::test]
    async fn test_watch_children_over_sse() {
        let body = "event: put\ndata: {\"path\":\"/\",\"data\":{\"truck-7\":{\"n\":1}}}\n\n\
                    event: keep-alive\ndata: null\n\n\
                    event: put\ndata: {\"path\":\"/truck-7/n\",\"data\":2}\n\n";
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vehicle.json"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let client = RtdbClient::new(&server.uri(), None).unwrap();
        let mut rx = client.watch_children("vehicle").await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.key, "truck-7");
        assert_eq!(event.snapshot["n"], json!(2));
    }
}
