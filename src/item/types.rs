//! Item record definitions.
//!
//! [`Item`] is a row read back from the `items` table, [`NewItem`] is the row
//! shape written by the handlers, and [`ItemId`] is the store-generated key.

use serde::{Deserialize, Deserializer, Serialize};

/// Open key-value mapping attached to an item.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Type tag used when a capture does not name one.
pub const DEFAULT_CAPTURE_TYPE: &str = "I";
/// Source tag used when a capture does not name one.
pub const DEFAULT_CAPTURE_SOURCE: &str = "api";
/// Fixed importance of captured items.
pub const CAPTURE_IMPORTANCE: f64 = 0.5;

/// Type tag of prompts recorded by the enhance endpoint.
pub const CONVERSATION_TYPE: &str = "conversation";
/// Source tag of prompts recorded by the enhance endpoint.
pub const CONVERSATION_SOURCE: &str = "jarvis_claude";
/// Fixed importance of recorded prompts.
pub const CONVERSATION_IMPORTANCE: f64 = 0.6;
/// Session used when the caller does not supply one.
pub const DEFAULT_SESSION: &str = "default";

/// Store-generated identifier. Serial tables hand back integers, UUID-keyed
/// tables hand back strings; both are passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A row of the `items` table. Columns this crate does not know about
/// (`created_at`, ...) are ignored when decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub id: Option<ItemId>,
    #[serde(rename = "type", default)]
    pub item_type: Option<String>,
    pub content: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub importance_score: Option<f64>,
    /// Older rows may hold a non-object value here; those read back as `None`.
    #[serde(default, deserialize_with = "object_or_none")]
    pub metadata: Option<Metadata>,
}

fn object_or_none<'de, D>(deserializer: D) -> Result<Option<Metadata>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::Object(map)) => Ok(Some(map)),
        _ => Ok(None),
    }
}

/// A row to insert. `None` fields are left out of the payload so the store
/// applies its column defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewItem {
    #[serde(rename = "type")]
    pub item_type: String,
    pub content: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub importance_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl NewItem {
    /// A caller-supplied record, with the capture defaults filled in.
    pub fn capture(
        item_type: Option<String>,
        content: String,
        source: Option<String>,
        metadata: Option<Metadata>,
    ) -> Self {
        Self {
            item_type: non_empty(item_type).unwrap_or_else(|| DEFAULT_CAPTURE_TYPE.into()),
            content,
            source: non_empty(source).unwrap_or_else(|| DEFAULT_CAPTURE_SOURCE.into()),
            session_id: None,
            importance_score: CAPTURE_IMPORTANCE,
            metadata: Some(metadata.unwrap_or_default()),
        }
    }

    /// A prompt recorded as a conversational item.
    pub fn conversation(prompt: &str, session_id: Option<String>) -> Self {
        Self {
            item_type: CONVERSATION_TYPE.into(),
            content: prompt.to_string(),
            source: CONVERSATION_SOURCE.into(),
            session_id: Some(non_empty(session_id).unwrap_or_else(|| DEFAULT_SESSION.into())),
            importance_score: CONVERSATION_IMPORTANCE,
            metadata: None,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn capture_defaults_serialize_to_expected_row() {
        let row = NewItem::capture(None, "hello".into(), None, None);
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            json!({
                "type": "I",
                "content": "hello",
                "source": "api",
                "importance_score": 0.5,
                "metadata": {}
            })
        );
    }

    #[test]
    fn capture_treats_empty_strings_as_absent() {
        let row = NewItem::capture(Some(String::new()), "x".into(), Some(String::new()), None);
        assert_eq!(row.item_type, "I");
        assert_eq!(row.source, "api");
    }

    #[test]
    fn conversation_row_has_session_and_no_metadata() {
        let row = NewItem::conversation("what is X", None);
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["type"], "conversation");
        assert_eq!(value["source"], "jarvis_claude");
        assert_eq!(value["session_id"], "default");
        assert_eq!(value["importance_score"], 0.6);
        assert!(value.get("metadata").is_none());
    }

    #[test]
    fn item_id_accepts_numbers_and_strings() {
        let item: Item = serde_json::from_value(json!({"id": 42, "content": "a"})).unwrap();
        assert_eq!(item.id, Some(ItemId::Int(42)));

        let item: Item =
            serde_json::from_value(json!({"id": "0190-abc", "content": "a", "created_at": "now"}))
                .unwrap();
        assert_eq!(item.id, Some(ItemId::Text("0190-abc".into())));
        assert_eq!(serde_json::to_value(ItemId::Int(7)).unwrap(), json!(7));
    }

    #[test]
    fn non_object_metadata_reads_back_as_none() {
        let items: Vec<Item> = serde_json::from_value(json!([
            {"id": 1, "content": "what is X", "metadata": "tag"},
            {"id": 2, "content": "what is Y", "metadata": ["a", "b"]},
            {"id": 3, "content": "what is Z", "metadata": {"k": 1}}
        ]))
        .unwrap();
        assert_eq!(items[0].metadata, None);
        assert_eq!(items[1].metadata, None);
        assert_eq!(items[2].metadata.as_ref().unwrap()["k"], 1);
    }
}
