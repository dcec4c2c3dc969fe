//! Health check endpoint

use axum::{routing::get, Router};
use serde::Serialize;

use crate::http::envelope::Envelope;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /health
async fn health() -> Envelope<HealthResponse> {
    Envelope::data(
        "success",
        HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

/// Health routes
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_returns_ok() {
        let body = health().await;
        assert!(!body.error);
        assert_eq!(body.data.map(|d| d.status), Some("ok"));
    }
}
