//! Endpoint logic, independent of the HTTP layer.
//!
//! Each handler takes the raw request body and a store, and returns a
//! serializable response or an [`ApiError`](crate::error::ApiError).

pub mod capture;
pub mod enhance;

use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Decode a JSON request body. An empty body is a parse error, like any other
/// malformed payload.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    Ok(serde_json::from_slice(body)?)
}
