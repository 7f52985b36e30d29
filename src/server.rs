use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

const ROOT_TEXT: &str = "replybot is running";

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Liveness routes for uptime checks and the self-ping loop.
///
/// Stateless by construction: nothing here touches the posting pipeline.
pub fn liveness_router() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/ping", get(ping))
        .route("/health", get(health))
}

async fn root() -> &'static str {
    ROOT_TEXT
}

async fn ping() -> &'static str {
    "pong"
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn serve_liveness(bind_addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind liveness server to {}", bind_addr))?;
    tracing::info!("Liveness server listening on http://{}", bind_addr);
    axum::serve(listener, liveness_router())
        .await
        .context("Liveness server failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn get_text(uri: &str) -> (StatusCode, String) {
        let response = liveness_router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn root_returns_fixed_text() {
        assert_eq!(get_text("/").await, (StatusCode::OK, ROOT_TEXT.to_string()));
    }

    #[tokio::test]
    async fn ping_returns_pong() {
        assert_eq!(get_text("/ping").await, (StatusCode::OK, "pong".to_string()));
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = get_text("/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (status, _) = get_text("/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
