//! Downstream bandwidth probe.
//!
//! A single timed partial download of a public test file. The figure feeds
//! the listing request as the claimed bitrate; the server takes it at face
//! value.

use std::time::Instant;
use tracing::info;

/// Estimate downstream bandwidth in Mbps by downloading at most `max_bytes`
/// from `url`, rounded to two decimals.
pub async fn measure_download_mbps(url: &str, max_bytes: u64) -> Result<f64, reqwest::Error> {
    info!(%url, "starting download speed test");
    let start = Instant::now();

    let mut response = reqwest::get(url).await?.error_for_status()?;
    let mut total: u64 = 0;
    while let Some(chunk) = response.chunk().await? {
        total += chunk.len() as u64;
        if total >= max_bytes {
            break;
        }
    }

    let seconds = start.elapsed().as_secs_f64().max(f64::EPSILON);
    let mbits = (total as f64 * 8.0) / 1_000_000.0;
    let mbps = (mbits / seconds * 100.0).round() / 100.0;
    info!(mbps, "download speed test completed");
    Ok(mbps)
}
