//! Transport-agnostic request router.
//!
//! Turns an `(action, body)` pair into one call on a [`Storage`] and
//! enforces the configured document limits. The HTTP glue lives in
//! [`crate::routes::storage`].

use serde_json::Value;
use stowage_core::{split_id, RecordId, Storage, StorageAction};
use tracing::debug;

use crate::config::RouterConfig;
use crate::error::{ApiError, ApiResult};

/// Dispatches storage actions with document limits applied.
#[derive(Debug, Clone, Default)]
pub struct StorageRouter {
    config: RouterConfig,
}

impl StorageRouter {
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Execute `action` against `storage`.
    ///
    /// `create` and `update` take a JSON payload body, `read` and `remove`
    /// take the raw id, the enumeration actions ignore the body. A `read`
    /// of an absent id yields `Value::Null`.
    pub async fn request<S>(&self, action: &str, body: &str, storage: &S) -> ApiResult<Value>
    where
        S: Storage<Value> + ?Sized,
    {
        let action: StorageAction = action
            .parse()
            .map_err(|_| ApiError::unknown_action(action))?;
        debug!(%action, bytes = body.len(), "Routing storage request");

        match action {
            StorageAction::Create => {
                self.check_documents_limit(storage).await?;
                self.check_document_size(body)?;
                let data: Value = serde_json::from_str(body)?;
                let id = storage.create(data).await?;
                Ok(Value::String(id.into_string()))
            }
            StorageAction::Read => {
                let id = parse_id(body)?;
                match storage.read(&id).await? {
                    Some(record) => Ok(serde_json::to_value(record)?),
                    None => Ok(Value::Null),
                }
            }
            StorageAction::Update => {
                self.check_document_size(body)?;
                let (id, payload) = split_id(serde_json::from_str(body)?)?;
                let id = id.filter(|id| !id.is_empty()).ok_or_else(|| {
                    ApiError::invalid_input("update requires a string \"id\" field")
                })?;
                if self.config.documents_limit != 0 && storage.read(&id).await?.is_none() {
                    self.check_documents_limit(storage).await?;
                }
                storage.update(&id, Value::Object(payload)).await?;
                Ok(Value::Null)
            }
            StorageAction::Remove => {
                let id = parse_id(body)?;
                storage.remove(&id).await?;
                Ok(Value::Null)
            }
            StorageAction::List => Ok(serde_json::to_value(storage.list().await?)?),
            StorageAction::GetAll => Ok(serde_json::to_value(storage.get_all().await?)?),
            StorageAction::Count => Ok(Value::from(storage.count().await?)),
        }
    }

    async fn check_documents_limit<S>(&self, storage: &S) -> ApiResult<()>
    where
        S: Storage<Value> + ?Sized,
    {
        let limit = self.config.documents_limit;
        if limit != 0 && storage.count().await? >= limit {
            return Err(ApiError::documents_limit_exceeded());
        }
        Ok(())
    }

    fn check_document_size(&self, body: &str) -> ApiResult<()> {
        let limit = self.config.maximum_document_size;
        if limit != 0 && body.len() > limit {
            return Err(ApiError::document_too_large());
        }
        Ok(())
    }
}

fn parse_id(body: &str) -> ApiResult<RecordId> {
    let id = body.trim();
    if id.is_empty() {
        return Err(ApiError::invalid_input("request body must be a record id"));
    }
    Ok(RecordId::from(id))
}
