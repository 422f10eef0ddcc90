//! `capture`: persist a caller-supplied record as an item.

use serde::{Deserialize, Serialize};

use super::parse_body;
use crate::error::ApiError;
use crate::item::types::{ItemId, Metadata, NewItem};
use crate::store::ItemStore;

#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub content: Option<String>,
    pub source: Option<String>,
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CaptureResponse {
    pub success: bool,
    /// Omitted when the store did not hand the row back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ItemId>,
}

impl CaptureRequest {
    /// Validate and fill in defaults.
    pub fn into_item(self) -> Result<NewItem, ApiError> {
        let content = match self.content {
            Some(content) if !content.is_empty() => content,
            _ => return Err(ApiError::BadRequest("content is required".into())),
        };
        Ok(NewItem::capture(
            self.item_type,
            content,
            self.source,
            self.metadata,
        ))
    }
}

pub async fn capture(store: &dyn ItemStore, body: &[u8]) -> Result<CaptureResponse, ApiError> {
    let request: CaptureRequest = parse_body(body)?;
    let item = request.into_item()?;

    tracing::info!(
        content_len = item.content.len(),
        item_type = %item.item_type,
        source = %item.source,
        "capture called"
    );

    let stored = store.insert(&item).await?;
    let item_id = stored.and_then(|row| row.id);

    match &item_id {
        Some(id) => tracing::info!(%id, "item captured"),
        None => tracing::warn!("store accepted the item but returned no row"),
    }

    Ok(CaptureResponse {
        success: true,
        item_id,
    })
}
