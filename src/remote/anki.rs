//! AnkiConnect JSON-RPC client.
//!
//! Every call is a blocking `POST` of `{action, version, params}`; the reply
//! is `{result, error}`. A non-null `error` becomes [`SyncError::Remote`],
//! anything below that (refused connection, timeout, undecodable body)
//! becomes [`SyncError::Http`].

use super::{CardStore, ItemInfo, NewItem};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, trace, warn};

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    action: &'a str,
    version: u32,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

/// Blocking AnkiConnect client.
#[derive(Debug, Clone)]
pub struct AnkiConnect {
    client: Client,
    health_client: Client,
    endpoint: String,
    version: u32,
}

impl AnkiConnect {
    /// Build a client from resolved settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let health_client = Client::builder().timeout(config.health_timeout).build()?;
        Ok(Self {
            client,
            health_client,
            endpoint: config.endpoint.clone(),
            version: config.api_version,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Plain `GET` against the endpoint; only a 200 counts as reachable.
    #[must_use]
    pub fn health_check(&self) -> bool {
        match self.health_client.get(&self.endpoint).send() {
            Ok(response) => {
                debug!(status = %response.status(), "AnkiConnect health check");
                response.status() == StatusCode::OK
            }
            Err(err) => {
                debug!(error = %err, "AnkiConnect health check failed");
                false
            }
        }
    }

    /// Fail with [`SyncError::Unreachable`] unless the health check passes.
    ///
    /// # Errors
    ///
    /// Returns an error when the endpoint does not answer with 200.
    pub fn ensure_reachable(&self) -> Result<()> {
        if self.health_check() {
            Ok(())
        } else {
            Err(SyncError::Unreachable {
                endpoint: self.endpoint.clone(),
            })
        }
    }

    fn invoke<T: DeserializeOwned>(&self, action: &str, params: Value) -> Result<Option<T>> {
        let request = RpcRequest {
            action,
            version: self.version,
            params,
        };
        trace!(action, params = %request.params, "AnkiConnect request");

        let response: RpcResponse<T> = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()?
            .error_for_status()?
            .json()?;

        if let Some(message) = response.error {
            warn!(action, error = %message, "AnkiConnect reported an error");
            return Err(SyncError::remote(action, message));
        }
        debug!(action, "AnkiConnect call succeeded");
        Ok(response.result)
    }
}

impl CardStore for AnkiConnect {
    fn create_collection(&self, name: &str) -> Result<()> {
        self.invoke::<Value>("createDeck", json!({ "deck": name }))?;
        Ok(())
    }

    fn item_type_names(&self) -> Result<Vec<String>> {
        Ok(self
            .invoke::<Vec<String>>("modelNames", json!({}))?
            .unwrap_or_default())
    }

    fn find_items(&self, query: &str) -> Result<Vec<i64>> {
        Ok(self
            .invoke::<Vec<i64>>("findNotes", json!({ "query": query }))?
            .unwrap_or_default())
    }

    fn items_info(&self, ids: &[i64]) -> Result<Vec<ItemInfo>> {
        Ok(self
            .invoke::<Vec<ItemInfo>>("notesInfo", json!({ "notes": ids }))?
            .unwrap_or_default())
    }

    fn add_item(&self, item: &NewItem) -> Result<i64> {
        self.invoke::<i64>("addNote", json!({ "note": item }))?
            .ok_or_else(|| SyncError::remote("addNote", "no note id returned"))
    }

    fn delete_items(&self, ids: &[i64]) -> Result<()> {
        self.invoke::<Value>("deleteNotes", json!({ "notes": ids }))?;
        Ok(())
    }
}
