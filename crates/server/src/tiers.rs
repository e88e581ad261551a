//! Bitrate-tier selector.
//!
//! Filters the catalog against a static capacity table: an asset qualifies
//! when its format matches the request exactly and the client's claimed
//! bandwidth covers the minimum its tier demands.

use crate::asset::{ResolutionTier, VideoAsset};
use crate::catalog::Catalog;

/// Minimum bandwidth (Mbps) each resolution tier requires.
///
/// A tier absent from the table requires unbounded bandwidth, so it never
/// qualifies.
#[derive(Debug, Clone, PartialEq)]
pub struct BitrateTable {
    entries: Vec<(ResolutionTier, f64)>,
}

impl BitrateTable {
    pub fn new(entries: Vec<(ResolutionTier, f64)>) -> Self {
        Self { entries }
    }

    /// Minimum Mbps for a tier, or None if the tier is not listed.
    pub fn minimum_for(&self, tier: ResolutionTier) -> Option<f64> {
        self.entries
            .iter()
            .find(|(t, _)| *t == tier)
            .map(|(_, mbps)| *mbps)
    }
}

impl Default for BitrateTable {
    fn default() -> Self {
        Self::new(vec![
            (ResolutionTier::R240, 0.5),
            (ResolutionTier::R360, 1.0),
            (ResolutionTier::R480, 2.5),
            (ResolutionTier::R720, 5.0),
            (ResolutionTier::R1080, 8.0),
        ])
    }
}

/// Select every catalog asset matching `format` whose tier the claimed
/// bandwidth can sustain.
///
/// Pure; the result preserves catalog iteration order, not quality order.
pub fn select_assets<'a>(
    catalog: &'a Catalog,
    format: &str,
    claimed_mbps: f64,
    table: &BitrateTable,
) -> Vec<&'a VideoAsset> {
    catalog
        .iter()
        .filter(|asset| asset.format == format)
        .filter(|asset| {
            table
                .minimum_for(asset.tier)
                .is_some_and(|required| claimed_mbps >= required)
        })
        .collect()
}
