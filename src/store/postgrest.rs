//! PostgREST (Supabase) backend.
//!
//! Rows are written with `POST /rest/v1/<table>` and `Prefer:
//! return=representation` so the generated id comes back in the reply, and read
//! with an `ilike` filter on `content`. Every request carries the service key
//! both as `apikey` and as a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Deserialize;

use super::{contains_pattern, ItemStore, StoreError};
use crate::config::StoreConfig;
use crate::item::types::{Item, NewItem};

/// Error body returned by PostgREST and the Supabase gateway.
#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// Item store backed by a remote PostgREST endpoint.
pub struct PostgrestStore {
    client: Client,
    base_url: String,
    service_key: String,
    table: String,
}

impl PostgrestStore {
    pub fn new(config: &StoreConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
            table: config.table.clone(),
        })
    }

    fn table_url(&self) -> Result<Url, StoreError> {
        if self.base_url.is_empty() {
            return Err(StoreError::Config("store url is not configured".into()));
        }
        let raw = format!("{}/rest/v1/{}", self.base_url, self.table);
        Url::parse(&raw).map_err(|e| StoreError::Config(format!("invalid store url {raw}: {e}")))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn read_rows(response: Response) -> Result<Vec<Item>, StoreError> {
        let response = check_status(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

/// Turn a non-2xx reply into [`StoreError::Rejected`], keeping the store's
/// own message where one is present.
async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<PostgrestErrorBody>(&body) {
        Ok(PostgrestErrorBody {
            message: Some(message),
            details,
        }) => {
            if let Some(details) = details {
                tracing::debug!(%status, %details, "store error details");
            }
            message
        }
        _ if !body.trim().is_empty() => body,
        _ => format!("store responded with HTTP {status}"),
    };

    Err(StoreError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ItemStore for PostgrestStore {
    async fn insert(&self, item: &NewItem) -> Result<Option<Item>, StoreError> {
        let url = self.table_url()?;
        let response = self
            .authorized(self.client.post(url))
            .header("Prefer", "return=representation")
            .json(item)
            .send()
            .await?;

        let rows = Self::read_rows(response).await?;
        Ok(rows.into_iter().next())
    }

    async fn search_content(&self, needle: &str, limit: usize) -> Result<Vec<Item>, StoreError> {
        let mut url = self.table_url()?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("content", &format!("ilike.{}", contains_pattern(needle)))
            .append_pair("limit", &limit.to_string());

        let response = self.authorized(self.client.get(url)).send().await?;
        Self::read_rows(response).await
    }

    async fn probe(&self) -> Result<(), StoreError> {
        let mut url = self.table_url()?;
        url.query_pairs_mut()
            .append_pair("select", "id")
            .append_pair("limit", "1");

        let response = self.authorized(self.client.get(url)).send().await?;
        check_status(response).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgrest"
    }
}
