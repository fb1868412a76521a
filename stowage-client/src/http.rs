//! Storage backed by a remote STOWAGE server.
//!
//! Every operation is one `POST {endpoint}/{action}`. Any non-2xx answer or
//! connection failure becomes `StorageError::Transport` carrying the
//! server's error text. There is no retry.

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::Value;
use stowage_core::{
    from_payload, split_id, to_payload, Document, Filter, Record, RecordId, Storage, StorageAction,
    StorageError, StorageResult, ID_FIELD,
};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Error body sent by the server on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Body of a `read` response meaning "no such record".
fn is_absent(body: &str) -> bool {
    matches!(body.trim(), "" | "undefined" | "null")
}

fn transport(e: reqwest::Error) -> StorageError {
    StorageError::transport(e.status().map(|s| s.as_u16()), e.to_string())
}

/// HTTP client implementing [`Storage`].
pub struct HttpStorage<T> {
    client: reqwest::Client,
    endpoint: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for HttpStorage<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> HttpStorage<T> {
    /// Build a client from a validated configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self::with_client(client, config.endpoint()))
    }

    /// Use an existing reqwest client against `endpoint` (base URL + prefix).
    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            _marker: PhantomData,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one action and return the raw response body.
    async fn call(&self, action: StorageAction, body: String, json: bool) -> StorageResult<String> {
        let url = format!("{}/{}", self.endpoint, action);
        let content_type = if json { "application/json" } else { "text/plain" };
        debug!(%url, bytes = body.len(), "Storage request");

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let text = response.text().await.map_err(transport)?;
        if status.is_success() {
            return Ok(text);
        }

        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(error) => format!("{}: {}", error.code, error.message),
            Err(_) => text,
        };
        Err(StorageError::transport(Some(status.as_u16()), message))
    }

    async fn call_json<R: serde::de::DeserializeOwned>(
        &self,
        action: StorageAction,
        body: String,
        json: bool,
    ) -> StorageResult<R> {
        let text = self.call(action, body, json).await?;
        Ok(serde_json::from_str(&text)?)
    }
}

fn record_from_value<T: Document>(
    value: Value,
    fallback: Option<&RecordId>,
) -> StorageResult<Record<T>> {
    let (id, payload) = split_id(value)?;
    let id = id.or_else(|| fallback.cloned()).ok_or_else(|| StorageError::InvalidPayload {
        reason: "server returned a record without an id".to_string(),
    })?;
    from_payload(id, payload)
}

#[async_trait]
impl<T: Document> Storage<T> for HttpStorage<T> {
    async fn create(&self, data: T) -> StorageResult<RecordId> {
        let body = serde_json::to_string(&to_payload(&data)?)?;
        self.call_json(StorageAction::Create, body, true).await
    }

    async fn read(&self, id: &RecordId) -> StorageResult<Option<Record<T>>> {
        let text = self
            .call(StorageAction::Read, id.as_str().to_string(), false)
            .await?;
        if is_absent(&text) {
            return Ok(None);
        }
        let value: Value = serde_json::from_str(&text)?;
        record_from_value(value, Some(id)).map(Some)
    }

    async fn update(&self, id: &RecordId, data: T) -> StorageResult<()> {
        let mut payload = to_payload(&data)?;
        payload.insert(ID_FIELD.to_string(), Value::String(id.as_str().to_string()));
        let body = serde_json::to_string(&payload)?;
        self.call(StorageAction::Update, body, true).await?;
        Ok(())
    }

    async fn remove(&self, id: &RecordId) -> StorageResult<()> {
        self.call(StorageAction::Remove, id.as_str().to_string(), false)
            .await?;
        Ok(())
    }

    async fn list(&self) -> StorageResult<Vec<RecordId>> {
        self.call_json(StorageAction::List, String::new(), false).await
    }

    async fn get_all(&self) -> StorageResult<Vec<Record<T>>> {
        let values: Vec<Value> = self
            .call_json(StorageAction::GetAll, String::new(), false)
            .await?;
        values
            .into_iter()
            .map(|value| record_from_value(value, None))
            .collect()
    }

    /// The server has no filtered action, so filtering happens here.
    async fn find(&self, filter: &Filter) -> StorageResult<Vec<Record<T>>> {
        let values: Vec<Value> = self
            .call_json(StorageAction::GetAll, String::new(), false)
            .await?;

        let mut records = Vec::new();
        for value in values {
            let (id, payload) = split_id(value)?;
            if !filter.matches(&payload) {
                continue;
            }
            let id = id.ok_or_else(|| StorageError::InvalidPayload {
                reason: "server returned a record without an id".to_string(),
            })?;
            records.push(from_payload(id, payload)?);
        }
        Ok(records)
    }

    async fn count(&self) -> StorageResult<u64> {
        self.call_json(StorageAction::Count, String::new(), false)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_bodies() {
        assert!(is_absent(""));
        assert!(is_absent("  "));
        assert!(is_absent("undefined"));
        assert!(is_absent("null"));
        assert!(!is_absent("{}"));
    }

    #[test]
    fn test_record_from_value_prefers_server_id() {
        let record: Record<Value> =
            record_from_value(json!({"id": "server", "x": "1"}), Some(&RecordId::from("asked")))
                .unwrap();
        assert_eq!(record.id.as_str(), "server");
        assert_eq!(record.data, json!({"x": "1"}));
    }

    #[test]
    fn test_record_from_value_requires_an_id() {
        let result: StorageResult<Record<Value>> = record_from_value(json!({"x": "1"}), None);
        assert!(matches!(result, Err(StorageError::InvalidPayload { .. })));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = HttpStorage::<Value>::new(&ClientConfig::new("", 100));
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let config = ClientConfig::new("http://127.0.0.1:9", 500);
        let storage = HttpStorage::<Value>::new(&config).unwrap();
        let err = storage.count().await.unwrap_err();
        assert!(matches!(err, StorageError::Transport { status: None, .. }));
    }
}
