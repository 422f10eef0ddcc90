//! `enhance-prompt`: record the prompt, then prepend related prior items.
//!
//! The prompt is stored as a `conversation` item first. The first
//! [`MATCH_PREFIX_CHARS`] characters of the prompt are then searched for in
//! earlier content, and up to [`MAX_CONTEXT_ITEMS`] hits are rendered as a
//! bulleted context block above the question:
//!
//! ```text
//! # CONTEXTE NEXUS:
//! - <first 200 chars of a matching item>...
//!
//! # QUESTION:
//! <prompt>
//! ```
//!
//! Because the search runs after the write, a successfully recorded prompt
//! always finds at least itself.

use serde::{Deserialize, Serialize};

use super::parse_body;
use crate::config::CapturePolicy;
use crate::error::ApiError;
use crate::item::char_prefix;
use crate::item::types::{Item, NewItem};
use crate::store::ItemStore;

pub const MATCH_PREFIX_CHARS: usize = 50;
pub const MAX_CONTEXT_ITEMS: usize = 5;
pub const PREVIEW_CHARS: usize = 200;

const CONTEXT_HEADER: &str = "# CONTEXTE NEXUS:\n";
const QUESTION_HEADER: &str = "# QUESTION:\n";

#[derive(Debug, Deserialize)]
pub struct EnhanceRequest {
    pub prompt: Option<String>,
    pub session_id: Option<String>,
    /// Accepted for client compatibility; not stored or used for scoping.
    pub device_id: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct EnhanceResponse {
    pub enhanced_prompt: String,
    pub context_count: usize,
}

pub async fn enhance(
    store: &dyn ItemStore,
    body: &[u8],
    policy: CapturePolicy,
) -> Result<EnhanceResponse, ApiError> {
    let request: EnhanceRequest = parse_body(body)?;
    let prompt = match request.prompt {
        Some(prompt) if !prompt.is_empty() => prompt,
        _ => return Err(ApiError::BadRequest("prompt is required".into())),
    };

    tracing::info!(prompt_len = prompt.len(), "enhance_prompt called");
    if let Some(device_id) = &request.device_id {
        tracing::debug!(%device_id, "device_id supplied; not persisted");
    }

    // 1. Record the prompt
    let item = NewItem::conversation(&prompt, request.session_id);
    match store.insert(&item).await {
        Ok(stored) => {
            tracing::debug!(id = ?stored.and_then(|row| row.id), "prompt recorded");
        }
        Err(e) => match policy {
            CapturePolicy::Continue => {
                tracing::warn!(error = %e, "failed to record prompt; continuing without it");
            }
            CapturePolicy::Abort => return Err(e.into()),
        },
    }

    // 2. Look up related items
    let needle = char_prefix(&prompt, MATCH_PREFIX_CHARS);
    let context = store.search_content(needle, MAX_CONTEXT_ITEMS).await?;
    tracing::info!(context_count = context.len(), "context retrieved");

    Ok(EnhanceResponse {
        enhanced_prompt: compose_enhanced_prompt(&prompt, &context),
        context_count: context.len(),
    })
}

/// Render the context block (if any) followed by the question.
pub fn compose_enhanced_prompt(prompt: &str, context: &[Item]) -> String {
    let mut enhanced = String::new();

    if !context.is_empty() {
        enhanced.push_str(CONTEXT_HEADER);
        for item in context {
            enhanced.push_str("- ");
            enhanced.push_str(char_prefix(&item.content, PREVIEW_CHARS));
            enhanced.push_str("...\n");
        }
        enhanced.push('\n');
    }

    enhanced.push_str(QUESTION_HEADER);
    enhanced.push_str(prompt);
    enhanced
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(content: &str) -> Item {
        Item {
            id: None,
            item_type: None,
            content: content.to_string(),
            source: None,
            session_id: None,
            importance_score: None,
            metadata: None,
        }
    }

    #[test]
    fn no_context_yields_bare_question() {
        assert_eq!(
            compose_enhanced_prompt("what is X", &[]),
            "# QUESTION:\nwhat is X"
        );
    }

    #[test]
    fn context_lines_precede_question() {
        let out = compose_enhanced_prompt("what is X", &[item("X is a letter"), item("X marks")]);
        assert_eq!(
            out,
            "# CONTEXTE NEXUS:\n- X is a letter...\n- X marks...\n\n# QUESTION:\nwhat is X"
        );
    }

    #[test]
    fn previews_are_cut_at_200_chars() {
        let long = "é".repeat(300);
        let out = compose_enhanced_prompt("q", &[item(&long)]);
        let line = out.lines().nth(1).unwrap();
        assert_eq!(line, format!("- {}...", "é".repeat(200)));
    }
}
