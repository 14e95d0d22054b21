use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;

/// Logical row pushed to the external knowledge base for one approved application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRow {
    pub title: String,
    /// Logical field name to value. Translation to external field ids happens
    /// inside the client, where schema churn belongs.
    pub fields: BTreeMap<String, String>,
}

/// One-shot push of an approved application to the external knowledge base.
///
/// Implementations never let transport or parsing errors escape: every failure
/// is logged and reported as `false`. No retry, no backoff; re-sync happens
/// out-of-band via the backlog command.
pub trait KnowledgeBaseSync: Send + Sync {
    fn push(&self, row: &SyncRow) -> bool;
}

/// Maps logical field names to external field ids.
///
/// The external schema has drifted between deployments, so the mapping is
/// injected configuration, never hard-coded. An empty mapping passes logical
/// names through unchanged.
#[derive(Debug, Clone, Default)]
pub struct FieldMapping {
    entries: BTreeMap<String, String>,
}

impl FieldMapping {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    /// Translates a logical row into the external id space. With a non-empty
    /// mapping, unmapped logical fields are dropped.
    pub fn translate(&self, fields: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        if self.entries.is_empty() {
            return fields.clone();
        }

        let mut translated = BTreeMap::new();
        for (logical, value) in fields {
            match self.entries.get(logical) {
                Some(external) => {
                    translated.insert(external.clone(), value.clone());
                }
                None => {
                    debug!(field = %logical, "no external field id configured; dropping");
                }
            }
        }
        translated
    }
}

/// Internal error taxonomy for the HTTP client; converted to `false` at the
/// trait boundary.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("service did not report ok")]
    NotOk,
}

/// HTTP knowledge-base client speaking the versioned rows schema:
/// `POST {base}/v1/rows` with a bearer token, body
/// `{"collectionId", "title", "values"}`, success = HTTP 200/201 plus
/// `"ok": true` in the response body.
pub struct HttpKnowledgeBase {
    endpoint: Option<Endpoint>,
}

struct Endpoint {
    base_url: String,
    api_token: String,
    collection_id: String,
    mapping: FieldMapping,
    timeout: Duration,
}

impl HttpKnowledgeBase {
    /// Builds the client from optional configuration. When sync is not
    /// configured every push logs a warning and reports failure, matching the
    /// degraded-success contract.
    pub fn from_config(config: Option<&SyncConfig>) -> Self {
        let endpoint = config.map(|config| Endpoint {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            collection_id: config.collection_id.clone(),
            mapping: FieldMapping::new(config.field_map.clone()),
            timeout: Duration::from_secs(30),
        });
        Self { endpoint }
    }

    fn try_push(endpoint: &Endpoint, row: &SyncRow) -> Result<(), SyncError> {
        let payload = json!({
            "collectionId": endpoint.collection_id,
            "title": row.title,
            "values": endpoint.mapping.translate(&row.fields),
        });

        let client = reqwest::blocking::Client::builder()
            .timeout(endpoint.timeout)
            .build()?;
        let response = client
            .post(format!("{}/v1/rows", endpoint.base_url))
            .bearer_auth(&endpoint.api_token)
            .json(&payload)
            .send()?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            return Err(SyncError::Status(status));
        }

        let body: serde_json::Value = response.json()?;
        if body.get("ok").and_then(serde_json::Value::as_bool) != Some(true) {
            return Err(SyncError::NotOk);
        }
        Ok(())
    }
}

impl KnowledgeBaseSync for HttpKnowledgeBase {
    fn push(&self, row: &SyncRow) -> bool {
        let Some(endpoint) = &self.endpoint else {
            warn!(title = %row.title, "knowledge base sync not configured; skipping push");
            return false;
        };

        match Self::try_push(endpoint, row) {
            Ok(()) => {
                info!(title = %row.title, "knowledge base row created");
                true
            }
            Err(error) => {
                warn!(title = %row.title, %error, "knowledge base push failed");
                false
            }
        }
    }
}
