//! Asset naming convention for the video library.
//!
//! Every file in the library is named `<title>-<tier>.<format>`, e.g.
//! `movie-720p.mkv`. This module provides the parsing and formatting of that
//! convention plus the ordered resolution ladder it is built on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Formats the ladder repair generates. Files in other formats are cataloged
/// as-is but never produced by transcoding.
pub const ALLOWED_FORMATS: &[&str] = &["mp4", "avi", "mkv"];

/// One level of the resolution ladder, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResolutionTier {
    #[serde(rename = "240p")]
    R240,
    #[serde(rename = "360p")]
    R360,
    #[serde(rename = "480p")]
    R480,
    #[serde(rename = "720p")]
    R720,
    #[serde(rename = "1080p")]
    R1080,
}

impl ResolutionTier {
    /// All tiers in ascending quality order.
    pub const ALL: [ResolutionTier; 5] = [
        ResolutionTier::R240,
        ResolutionTier::R360,
        ResolutionTier::R480,
        ResolutionTier::R720,
        ResolutionTier::R1080,
    ];

    /// Canonical name as it appears in filenames and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionTier::R240 => "240p",
            ResolutionTier::R360 => "360p",
            ResolutionTier::R480 => "480p",
            ResolutionTier::R720 => "720p",
            ResolutionTier::R1080 => "1080p",
        }
    }

    /// Parse a tier name; returns None for anything outside the ladder.
    pub fn parse(s: &str) -> Option<ResolutionTier> {
        match s {
            "240p" => Some(ResolutionTier::R240),
            "360p" => Some(ResolutionTier::R360),
            "480p" => Some(ResolutionTier::R480),
            "720p" => Some(ResolutionTier::R720),
            "1080p" => Some(ResolutionTier::R1080),
            _ => None,
        }
    }

    /// Output height in pixels, used for the ffmpeg scale filter.
    pub fn height(&self) -> u32 {
        match self {
            ResolutionTier::R240 => 240,
            ResolutionTier::R360 => 360,
            ResolutionTier::R480 => 480,
            ResolutionTier::R720 => 720,
            ResolutionTier::R1080 => 1080,
        }
    }
}

impl fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cataloged video file. Identity is the full triple; the struct is
/// immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoAsset {
    pub title: String,
    pub tier: ResolutionTier,
    pub format: String,
}

impl VideoAsset {
    pub fn new(title: impl Into<String>, tier: ResolutionTier, format: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            tier,
            format: format.into(),
        }
    }

    /// Canonical filename: `title-tier.format`.
    pub fn filename(&self) -> String {
        format!("{}-{}.{}", self.title, self.tier, self.format)
    }

    /// Parse a filename of the shape `<title>-<tier>.<format>`.
    ///
    /// The tier token must be one of the five ladder tiers; title and format
    /// must be non-empty. Anything else does not match the convention and
    /// returns None (callers skip it silently).
    pub fn parse_filename(name: &str) -> Option<VideoAsset> {
        let (stem, format) = name.rsplit_once('.')?;
        let (title, tier_token) = stem.rsplit_once('-')?;
        let tier = ResolutionTier::parse(tier_token)?;
        if title.is_empty() || format.is_empty() {
            return None;
        }
        Some(VideoAsset::new(title, tier, format))
    }

    /// Whether this asset's format is one the ladder repair produces.
    pub fn has_allowed_format(&self) -> bool {
        ALLOWED_FORMATS.contains(&self.format.as_str())
    }
}

impl fmt::Display for VideoAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filename())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tier_order_is_ascending() {
        assert!(ResolutionTier::R240 < ResolutionTier::R360);
        assert!(ResolutionTier::R360 < ResolutionTier::R480);
        assert!(ResolutionTier::R480 < ResolutionTier::R720);
        assert!(ResolutionTier::R720 < ResolutionTier::R1080);
        assert_eq!(ResolutionTier::ALL.len(), 5);
        let mut sorted = ResolutionTier::ALL;
        sorted.sort();
        assert_eq!(sorted, ResolutionTier::ALL);
    }

    #[test]
    fn test_tier_parse_roundtrip() {
        for tier in ResolutionTier::ALL {
            assert_eq!(ResolutionTier::parse(tier.as_str()), Some(tier));
        }
        assert_eq!(ResolutionTier::parse("4k"), None);
        assert_eq!(ResolutionTier::parse("1080"), None);
        assert_eq!(ResolutionTier::parse(""), None);
    }

    #[test]
    fn test_parse_filename_well_formed() {
        let asset = VideoAsset::parse_filename("movie-1080p.mp4").unwrap();
        assert_eq!(asset.title, "movie");
        assert_eq!(asset.tier, ResolutionTier::R1080);
        assert_eq!(asset.format, "mp4");
        assert_eq!(asset.filename(), "movie-1080p.mp4");
    }

    #[test]
    fn test_parse_filename_title_with_dashes() {
        // Only the last '-' separates title from tier
        let asset = VideoAsset::parse_filename("the-big-film-480p.avi").unwrap();
        assert_eq!(asset.title, "the-big-film");
        assert_eq!(asset.tier, ResolutionTier::R480);
    }

    #[test]
    fn test_parse_filename_rejects_non_matching() {
        assert_eq!(VideoAsset::parse_filename("notes.txt"), None);
        assert_eq!(VideoAsset::parse_filename("movie.mp4"), None); // no tier
        assert_eq!(VideoAsset::parse_filename("movie-4k.mp4"), None); // unknown tier
        assert_eq!(VideoAsset::parse_filename("-240p.mp4"), None); // empty title
        assert_eq!(VideoAsset::parse_filename("movie-240p"), None); // no format
        assert_eq!(VideoAsset::parse_filename(""), None);
    }

    #[test]
    fn test_out_of_list_format_still_parses() {
        // Cataloged as-is, but never a repair target
        let asset = VideoAsset::parse_filename("movie-360p.webm").unwrap();
        assert_eq!(asset.format, "webm");
        assert!(!asset.has_allowed_format());
        assert!(VideoAsset::parse_filename("movie-360p.mkv")
            .unwrap()
            .has_allowed_format());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        // *For any* title/tier/format triple, formatting then parsing the
        // canonical filename recovers the same asset.
        #[test]
        fn prop_filename_roundtrip(
            title in "[a-zA-Z0-9_]{1,20}",
            tier_idx in 0usize..5,
            format in "[a-z0-9]{1,6}",
        ) {
            let tier = ResolutionTier::ALL[tier_idx];
            let asset = VideoAsset::new(title, tier, format);
            let parsed = VideoAsset::parse_filename(&asset.filename());
            prop_assert_eq!(parsed, Some(asset));
        }

        // *For any* filename without a tier token, parsing fails.
        #[test]
        fn prop_no_tier_token_never_parses(
            stem in "[a-zA-Z0-9_]{1,20}",
            format in "[a-z0-9]{1,6}",
        ) {
            let name = format!("{}.{}", stem, format);
            prop_assert_eq!(VideoAsset::parse_filename(&name), None);
        }
    }
}
