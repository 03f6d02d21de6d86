//! Liveness endpoint.
//!
//! `GET /health` does not touch dependencies; it answers as long as the
//! process serves HTTP.

use crate::extractors::Json;
use serde::Serialize;

/// Health response body.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Always `"ok"`
    pub status: &'static str,
}

/// Liveness check.
#[allow(clippy::unused_async)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
