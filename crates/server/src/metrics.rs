//! Metrics state for streamvault
//!
//! Aggregate counters shared between the accept loop and the metrics
//! endpoint, with JSON serialization support.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Aggregate server counters
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetricsSnapshot {
    /// Assets in the catalog after the startup scan
    pub catalog_size: usize,
    /// Connections accepted since startup
    pub sessions_handled: u64,
    /// Listing queries answered
    pub listings_served: u64,
    /// Emitter processes started
    pub streams_started: u64,
    /// Emitters currently live (0 or 1 under the sequential loop)
    pub active_streams: usize,
}

/// Thread-safe shared metrics state
pub type SharedMetrics = Arc<RwLock<MetricsSnapshot>>;

/// Create a new shared metrics instance with default values
pub fn new_shared_metrics() -> SharedMetrics {
    Arc::new(RwLock::new(MetricsSnapshot::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_defaults_to_zero() {
        let snapshot = MetricsSnapshot::default();
        assert_eq!(snapshot.catalog_size, 0);
        assert_eq!(snapshot.sessions_handled, 0);
        assert_eq!(snapshot.listings_served, 0);
        assert_eq!(snapshot.streams_started, 0);
        assert_eq!(snapshot.active_streams, 0);
    }

    #[tokio::test]
    async fn test_shared_metrics_updates_visible() {
        let metrics = new_shared_metrics();
        {
            let mut snapshot = metrics.write().await;
            snapshot.catalog_size = 15;
            snapshot.sessions_handled = 3;
        }
        let snapshot = metrics.read().await;
        assert_eq!(snapshot.catalog_size, 15);
        assert_eq!(snapshot.sessions_handled, 3);
    }

    #[test]
    fn test_snapshot_serializes_field_names() {
        let json = serde_json::to_string(&MetricsSnapshot::default()).unwrap();
        assert!(json.contains("catalog_size"));
        assert!(json.contains("sessions_handled"));
        assert!(json.contains("listings_served"));
        assert!(json.contains("streams_started"));
        assert!(json.contains("active_streams"));
    }
}
