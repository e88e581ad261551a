//! Metrics HTTP endpoint for streamvault
//!
//! Exposes the aggregate counters as JSON for monitoring tools.

use axum::{extract::State, routing::get, Json, Router};
use std::net::SocketAddr;
use thiserror::Error;

use crate::metrics::{MetricsSnapshot, SharedMetrics};

/// Errors that can occur when running the metrics server
#[derive(Debug, Error)]
pub enum MetricsServerError {
    #[error("Failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),
}

/// Handler for GET /metrics endpoint
/// Returns the current MetricsSnapshot as JSON
async fn get_metrics(State(metrics): State<SharedMetrics>) -> Json<MetricsSnapshot> {
    let snapshot = metrics.read().await.clone();
    Json(snapshot)
}

/// Creates the axum Router with metrics endpoint
pub fn create_metrics_router(metrics: SharedMetrics) -> Router {
    Router::new()
        .route("/metrics", get(get_metrics))
        .with_state(metrics)
}

/// Runs the metrics HTTP server on `127.0.0.1:<port>`
pub async fn run_metrics_server(
    metrics: SharedMetrics,
    port: u16,
) -> Result<(), MetricsServerError> {
    let app = create_metrics_router(metrics);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::new_shared_metrics;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_get_metrics_returns_json() {
        let metrics = new_shared_metrics();
        {
            let mut snapshot = metrics.write().await;
            snapshot.catalog_size = 15;
            snapshot.sessions_handled = 7;
            snapshot.listings_served = 5;
            snapshot.streams_started = 2;
            snapshot.active_streams = 1;
        }

        let app = create_metrics_router(metrics.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let content_type = response
            .headers()
            .get("content-type")
            .expect("should have content-type header");
        assert!(content_type.to_str().unwrap().contains("application/json"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let snapshot: MetricsSnapshot =
            serde_json::from_slice(&body).expect("should deserialize to MetricsSnapshot");

        assert_eq!(snapshot.catalog_size, 15);
        assert_eq!(snapshot.sessions_handled, 7);
        assert_eq!(snapshot.listings_served, 5);
        assert_eq!(snapshot.streams_started, 2);
        assert_eq!(snapshot.active_streams, 1);
    }

    #[tokio::test]
    async fn test_get_metrics_empty_snapshot() {
        let metrics = new_shared_metrics();

        let app = create_metrics_router(metrics);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let snapshot: MetricsSnapshot = serde_json::from_slice(&body).unwrap();

        assert_eq!(snapshot, MetricsSnapshot::default());
    }
}
