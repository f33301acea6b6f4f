//! Versioned object store and tracked (time-series) store client.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vsfetch_core::{TrackObject, Version};

use crate::error::Result;
use crate::http::{json, send};

/// Base URL and per-request timeout of one store.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub base_url: String,
    pub timeout: Duration,
}

impl Endpoint {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Acknowledgement returned by both stores.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct KeysResponse {
    #[serde(default)]
    keys: Vec<String>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    data: &'a BTreeMap<String, Value>,
}

#[derive(Debug, Serialize)]
struct DeleteKey<'a> {
    key: &'a str,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    data: Vec<DeleteKey<'a>>,
    version: Version,
}

#[derive(Debug, Serialize)]
struct TracksRequest<'a> {
    data: &'a [TrackObject],
}

/// Key/value store holding the latest version of every entity.
#[async_trait]
pub trait VersionedStore: Send + Sync {
    /// Upsert a batch of serialized versioned objects.
    async fn upsert_objects(&self, objects: &BTreeMap<String, Value>) -> Result<StatusResponse>;

    /// List every key under a prefix.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Delete keys, conditioned on `version`.
    async fn delete_objects(&self, keys: &BTreeSet<String>, version: Version) -> Result<StatusResponse>;
}

/// Append-only time-series store for pilot tracks.
#[async_trait]
pub trait TrackStore: Send + Sync {
    async fn store_tracks(&self, tracks: &[TrackObject]) -> Result<StatusResponse>;
}

/// HTTP client for the versioned and tracked stores.
pub struct StoreClient {
    client: Client,
    versioned: Endpoint,
    tracked: Endpoint,
}

impl StoreClient {
    pub fn new(client: Client, versioned: Endpoint, tracked: Endpoint) -> Self {
        Self {
            client,
            versioned,
            tracked,
        }
    }
}

#[async_trait]
impl VersionedStore for StoreClient {
    async fn upsert_objects(&self, objects: &BTreeMap<String, Value>) -> Result<StatusResponse> {
        let url = self.versioned.url("/api/v1/objects/");
        tracing::debug!("storing {} objects to {}", objects.len(), url);

        let request = self.client.post(&url).json(&UpsertRequest { data: objects });
        let response = send(&url, request, self.versioned.timeout).await?;
        json(&url, response).await
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let url = self.versioned.url("/api/v1/keys/");
        tracing::debug!("collecting existing keys with prefix \"{}\" from {}", prefix, url);

        let request = self.client.get(&url).query(&[("prefix", prefix)]);
        let response = send(&url, request, self.versioned.timeout).await?;
        let payload: KeysResponse = json(&url, response).await?;
        Ok(payload.keys)
    }

    async fn delete_objects(&self, keys: &BTreeSet<String>, version: Version) -> Result<StatusResponse> {
        let url = self.versioned.url("/api/v1/objects/");
        let started = Instant::now();

        let body = DeleteRequest {
            data: keys.iter().map(|key| DeleteKey { key }).collect(),
            version,
        };
        let request = self.client.delete(&url).json(&body);
        let response = send(&url, request, self.versioned.timeout).await?;
        let status: StatusResponse = json(&url, response).await?;

        tracing::debug!(
            "deleted {} keys in {:.3}s: {}",
            keys.len(),
            started.elapsed().as_secs_f64(),
            status.status
        );
        Ok(status)
    }
}

#[async_trait]
impl TrackStore for StoreClient {
    async fn store_tracks(&self, tracks: &[TrackObject]) -> Result<StatusResponse> {
        let url = self.tracked.url("/api/v1/tracks/");
        tracing::debug!("storing track data to {}", url);

        let request = self.client.post(&url).json(&TracksRequest { data: tracks });
        let response = send(&url, request, self.tracked.timeout).await?;
        json(&url, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsfetch_core::TrackPoint;

    #[test]
    fn endpoint_strips_trailing_slash() {
        let endpoint = Endpoint::new("http://localhost:9440/", Duration::from_secs(3));
        assert_eq!(
            endpoint.url("/api/v1/objects/"),
            "http://localhost:9440/api/v1/objects/"
        );
    }

    #[test]
    fn delete_body_carries_keys_and_version() {
        let keys: BTreeSet<String> = ["pilot:A".to_string(), "pilot:B".to_string()].into();
        let body = DeleteRequest {
            data: keys.iter().map(|key| DeleteKey { key }).collect(),
            version: 101,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"data": [{"key": "pilot:A"}, {"key": "pilot:B"}], "version": 101})
        );
    }

    #[test]
    fn track_body_wraps_objects_in_data() {
        let tracks = vec![TrackObject {
            track_id: "DLH1.1.0".to_string(),
            point: TrackPoint { ts: 5, lat: 1.0, lng: 2.0, hdg: 90, alt: 3000, gs: 200 },
        }];
        let value = serde_json::to_value(TracksRequest { data: &tracks }).unwrap();
        assert_eq!(value["data"][0]["track_id"], "DLH1.1.0");
        assert_eq!(value["data"][0]["point"]["gs"], 200);
    }

    #[test]
    fn status_response_tolerates_missing_status() {
        let status: StatusResponse = serde_json::from_str("{}").unwrap();
        assert!(status.status.is_null());
        let keys: KeysResponse = serde_json::from_str(r#"{"keys": ["fir:EDGG"]}"#).unwrap();
        assert_eq!(keys.keys, vec!["fir:EDGG"]);
    }

    #[tokio::test]
    async fn unreachable_store_is_a_transport_error() {
        let client = StoreClient::new(
            Client::new(),
            Endpoint::new("http://127.0.0.1:9", Duration::from_millis(500)),
            Endpoint::new("http://127.0.0.1:9", Duration::from_millis(500)),
        );
        let err = client.list_keys("pilot:").await.unwrap_err();
        assert!(err.is_transport());
    }
}
