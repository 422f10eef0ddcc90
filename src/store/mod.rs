//! Persistence client for the `items` table.
//!
//! [`ItemStore`] is the seam between the HTTP handlers and the data store.
//! [`postgrest::PostgrestStore`] talks to a PostgREST (Supabase) endpoint and
//! is what the server runs against; [`sqlite::SqliteStore`] keeps the same
//! contract on a local SQLite file for offline use and tests.

pub mod postgrest;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{StoreBackend, StoreConfig};
use crate::item::types::{Item, NewItem};

/// Errors raised by a store backend. Messages are surfaced to API callers
/// verbatim.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store answered but refused the request.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    /// The request never got an answer (connect, timeout, TLS...).
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid store response: {0}")]
    Decode(String),
    /// The store is not usable with the current configuration.
    #[error("{0}")]
    Config(String),
    #[error("{0}")]
    Database(#[from] rusqlite::Error),
    #[error("store task failed: {0}")]
    Task(String),
}

/// Insert and substring lookup over `items`.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Insert one row and return it as stored, when the backend reports it.
    async fn insert(&self, item: &NewItem) -> Result<Option<Item>, StoreError>;

    /// Rows whose `content` contains `needle`, case-insensitively. At most
    /// `limit` rows, in no particular order.
    async fn search_content(&self, needle: &str, limit: usize) -> Result<Vec<Item>, StoreError>;

    /// Cheap round trip proving the store is reachable and the table exists.
    async fn probe(&self) -> Result<(), StoreError>;

    /// Short backend name for logs and diagnostics.
    fn backend(&self) -> &'static str;
}

/// Build the store selected by `config.backend`.
pub fn create_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn ItemStore>> {
    match config.backend {
        StoreBackend::Postgrest => {
            if config.url.is_empty() || config.service_key.is_empty() {
                tracing::warn!(
                    "store url or service key is empty; requests touching the store will fail"
                );
            }
            Ok(Arc::new(postgrest::PostgrestStore::new(config)?))
        }
        StoreBackend::Sqlite => {
            let path = config.resolved_db_path();
            Ok(Arc::new(sqlite::SqliteStore::open(&path)?))
        }
    }
}

/// `LIKE`/`ILIKE` pattern matching `needle` anywhere, with the wildcard
/// characters in `needle` escaped by a backslash.
pub fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_wraps_needle() {
        assert_eq!(contains_pattern("what is X"), "%what is X%");
        assert_eq!(contains_pattern(""), "%%");
    }

    #[test]
    fn pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn rejected_error_displays_store_message() {
        let err = StoreError::Rejected {
            status: 409,
            message: "duplicate key value".into(),
        };
        assert_eq!(err.to_string(), "duplicate key value");
    }
}
