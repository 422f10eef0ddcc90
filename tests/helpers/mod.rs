#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use nexus_cloud::config::NexusConfig;
use nexus_cloud::item::types::{Item, NewItem};
use nexus_cloud::server::{router, AppState};
use nexus_cloud::store::sqlite::SqliteStore;
use nexus_cloud::store::{ItemStore, StoreError};

/// Fresh in-memory item store.
pub fn test_store() -> SqliteStore {
    SqliteStore::open_in_memory().unwrap()
}

/// Serve the app on an ephemeral port and return its base URL.
pub async fn spawn_app(store: Arc<dyn ItemStore>, config: NexusConfig) -> String {
    let app = router(AppState::new(store, config));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// POST a raw body and return `(status, parsed JSON body)`.
pub async fn post_raw(url: &str, body: &str) -> (u16, serde_json::Value) {
    let response = reqwest::Client::new()
        .post(url)
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    let json = response.json().await.unwrap();
    (status, json)
}

pub async fn post_json(url: &str, body: serde_json::Value) -> (u16, serde_json::Value) {
    post_raw(url, &body.to_string()).await
}

/// Store wrapper that counts inserts and can be told to fail either call.
pub struct FlakyStore {
    pub inner: SqliteStore,
    pub fail_insert: bool,
    pub fail_search: bool,
    pub insert_attempts: AtomicUsize,
}

impl FlakyStore {
    pub fn new(fail_insert: bool, fail_search: bool) -> Self {
        Self {
            inner: test_store(),
            fail_insert,
            fail_search,
            insert_attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.insert_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ItemStore for FlakyStore {
    async fn insert(&self, item: &NewItem) -> Result<Option<Item>, StoreError> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_insert {
            return Err(StoreError::Rejected {
                status: 500,
                message: "insert rejected".into(),
            });
        }
        self.inner.insert(item).await
    }

    async fn search_content(&self, needle: &str, limit: usize) -> Result<Vec<Item>, StoreError> {
        if self.fail_search {
            return Err(StoreError::Rejected {
                status: 500,
                message: "search rejected".into(),
            });
        }
        self.inner.search_content(needle, limit).await
    }

    async fn probe(&self) -> Result<(), StoreError> {
        self.inner.probe().await
    }

    fn backend(&self) -> &'static str {
        "flaky"
    }
}

/// Store whose every call panics, standing in for a handler bug.
pub struct PanickingStore;

#[async_trait]
impl ItemStore for PanickingStore {
    async fn insert(&self, _item: &NewItem) -> Result<Option<Item>, StoreError> {
        panic!("insert exploded")
    }

    async fn search_content(&self, _needle: &str, _limit: usize) -> Result<Vec<Item>, StoreError> {
        panic!("search exploded")
    }

    async fn probe(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "panicking"
    }
}
