//! NEXUS Cloud API: capture items and enrich prompts with related prior context.
//!
//! A small HTTP service in front of a single `items` table. Callers can store
//! arbitrary records (`capture`) or send a prompt (`enhance-prompt`), which is
//! recorded and returned with up to five earlier items that mention it.
//!
//! # Architecture
//!
//! - **Storage**: a PostgREST / Supabase endpoint in production, or a local
//!   SQLite file, behind the [`store::ItemStore`] trait
//! - **Routing**: one axum dispatcher keyed on the last path segment
//! - **Errors**: typed [`error::ApiError`] mapped to 400 / 502 / 500, or to a
//!   flat 500 in legacy mode
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`item`] — The item record and its defaults
//! - [`store`] — Persistence client: PostgREST and SQLite backends
//! - [`handlers`] — `capture` and `enhance-prompt` endpoint logic
//! - [`server`] — HTTP router, CORS headers and serve loop

pub mod config;
pub mod error;
pub mod handlers;
pub mod item;
pub mod server;
pub mod store;
