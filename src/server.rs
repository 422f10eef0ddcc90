//! HTTP entry point.
//!
//! Every path is served by a single dispatcher that routes on the last path
//! segment, so the API works the same when mounted under a prefix such as
//! `/functions/v1/nexus-cloud-api/`.
//!
//! | Method | Last segment | Response |
//! |--------|--------------|----------|
//! | `OPTIONS` | any | `200`, empty body |
//! | any | `enhance-prompt` | `{enhanced_prompt, context_count}` |
//! | any | `capture` | `{success, item_id}` |
//! | any | `test` | `{message, timestamp}` |
//! | any | anything else | discovery payload |
//!
//! Handler failures become `{"error": "..."}`; see [`crate::error`]. This
//! includes unreadable or oversized bodies and handler panics.
//!
//! # CORS
//!
//! Every response, including errors and preflights, carries
//! `Access-Control-Allow-Origin: *` and the allowed request headers used by
//! Supabase clients.

use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::{ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN};
use axum::http::{HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use chrono::SecondsFormat;
use serde::Serialize;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::{ErrorStatusMode, NexusConfig};
use crate::error::{panic_response, ApiError};
use crate::handlers;
use crate::store::{self, ItemStore};

pub const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
pub const API_VERSION: &str = "2.0";

/// Shared state handed to the dispatcher.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ItemStore>,
    pub config: Arc<NexusConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn ItemStore>, config: NexusConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

#[derive(Debug, Serialize)]
struct TestResponse {
    message: &'static str,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct DiscoveryResponse {
    message: &'static str,
    version: &'static str,
    status: &'static str,
    endpoints: [&'static str; 3],
}

const DISCOVERY: DiscoveryResponse = DiscoveryResponse {
    message: "🧠 NEXUS Cloud API",
    version: API_VERSION,
    status: "active",
    endpoints: [
        "/test - Test endpoint",
        "/enhance-prompt - Enrich a prompt with related context",
        "/capture - Capture an item",
    ],
};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.server.max_body_bytes;
    Router::new()
        .route("/", any(dispatch))
        .route("/{*path}", any(dispatch))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .with_state(state)
}

/// Open the configured store and serve until ctrl-c.
pub async fn serve(config: NexusConfig) -> Result<()> {
    let bind_addr = config.bind_addr();
    let store = store::create_store(&config.store)?;
    tracing::info!(backend = store.backend(), table = %config.store.table, "store ready");

    let app = router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "NEXUS Cloud API listening on http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}

/// Last `/`-separated segment of `path`; empty for `/` or a trailing slash.
pub fn route_key(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or_default()
}

async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    let key = route_key(uri.path());
    tracing::debug!(%method, path = %uri.path(), route = key, "dispatching");

    let mode = state.config.server.error_status;
    match key {
        "enhance-prompt" => {
            let policy = state.config.enhance.on_capture_error;
            let result = async {
                let body = read_body(body)?;
                handlers::enhance::enhance(state.store.as_ref(), &body, policy).await
            }
            .await;
            respond(result, mode)
        }
        "capture" => {
            let result = async {
                let body = read_body(body)?;
                handlers::capture::capture(state.store.as_ref(), &body).await
            }
            .await;
            respond(result, mode)
        }
        "test" => Json(TestResponse {
            message: "NEXUS Test OK",
            timestamp: chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        })
        .into_response(),
        _ => Json(DISCOVERY).into_response(),
    }
}

/// A body that could not be buffered (too large, connection cut) is a client
/// error like any malformed payload.
fn read_body(body: Result<Bytes, BytesRejection>) -> Result<Bytes, ApiError> {
    body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn respond<T: Serialize>(result: Result<T, ApiError>, mode: ErrorStatusMode) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => e.into_response_with(mode),
    }
}
