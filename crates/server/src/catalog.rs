//! Catalog builder: library scan and resolution-ladder repair.
//!
//! Scans the flat video directory once at startup, reconciles what it finds
//! against the expected tier/format ladder, and invokes the transcoding
//! collaborator for every missing entry. The resulting catalog is read-only
//! for the rest of the process lifetime.

use crate::asset::{ResolutionTier, VideoAsset, ALLOWED_FORMATS};
use crate::transcode::Transcoder;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// The in-memory catalog: every asset available for listing and playback.
///
/// Append-only during ladder repair, immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    assets: Vec<VideoAsset>,
}

impl Catalog {
    pub fn iter(&self) -> impl Iterator<Item = &VideoAsset> {
        self.assets.iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn contains(&self, asset: &VideoAsset) -> bool {
        self.assets.contains(asset)
    }

    /// Look up an asset by its identity triple.
    pub fn find(&self, title: &str, tier: ResolutionTier, format: &str) -> Option<&VideoAsset> {
        self.assets
            .iter()
            .find(|a| a.title == title && a.tier == tier && a.format == format)
    }

    #[cfg(test)]
    pub(crate) fn from_assets(assets: Vec<VideoAsset>) -> Self {
        Self { assets }
    }
}

/// One gap in a title's ladder, filled by a single transcoder invocation.
///
/// Ephemeral: created and consumed during the scan, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeJob {
    /// Existing asset the conversion reads from (the title's max-tier source)
    pub source: VideoAsset,
    pub target_tier: ResolutionTier,
    pub target_format: String,
}

impl TranscodeJob {
    /// The asset this job produces on success.
    pub fn target_asset(&self) -> VideoAsset {
        VideoAsset::new(
            self.source.title.clone(),
            self.target_tier,
            self.target_format.clone(),
        )
    }
}

/// Compute the ladder-repair jobs for a set of discovered assets.
///
/// For each title: every (tier, allowed format) pair from the lowest tier up
/// to the title's maximum observed tier that is not already present becomes a
/// job. The source is the first discovered asset of that title at the maximum
/// tier, whatever its format. Tiers above the maximum are never targets, so
/// the ladder is only ever filled downward from the best source quality.
///
/// Pure function; job order is deterministic (titles lexically, tiers
/// ascending, formats in `ALLOWED_FORMATS` order).
pub fn plan_repairs(discovered: &[VideoAsset]) -> Vec<TranscodeJob> {
    let mut by_title: BTreeMap<&str, Vec<&VideoAsset>> = BTreeMap::new();
    for asset in discovered {
        by_title.entry(asset.title.as_str()).or_default().push(asset);
    }

    let mut jobs = Vec::new();
    for (_, assets) in by_title {
        let Some(max_tier) = assets.iter().map(|a| a.tier).max() else {
            continue;
        };
        let Some(source) = assets.iter().find(|a| a.tier == max_tier) else {
            continue;
        };

        for tier in ResolutionTier::ALL {
            if tier > max_tier {
                break;
            }
            for format in ALLOWED_FORMATS {
                let present = assets
                    .iter()
                    .any(|a| a.tier == tier && a.format == *format);
                if !present {
                    jobs.push(TranscodeJob {
                        source: (*source).clone(),
                        target_tier: tier,
                        target_format: (*format).to_string(),
                    });
                }
            }
        }
    }
    jobs
}

/// Scan `dir` and build the catalog, repairing each title's ladder.
///
/// Files that do not match the naming convention are skipped silently.
/// Transcode failures are logged and leave that ladder entry missing; they
/// never abort the build. A missing or unreadable directory is logged and
/// yields an empty catalog so the server can still come up.
pub fn build_catalog(dir: &Path, transcoder: &dyn Transcoder) -> Catalog {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "video directory unavailable, starting with empty catalog");
            return Catalog::default();
        }
    };

    // Sorted so catalog order (and therefore listing order) is deterministic
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| e.file_name().to_str().map(String::from))
        .collect();
    names.sort();

    let mut assets: Vec<VideoAsset> = names
        .iter()
        .filter_map(|name| VideoAsset::parse_filename(name))
        .collect();
    info!(dir = %dir.display(), count = assets.len(), "library scan complete");

    let jobs = plan_repairs(&assets);
    if !jobs.is_empty() {
        info!(count = jobs.len(), "repairing resolution ladder");
    }

    for job in jobs {
        let target = job.target_asset();
        let input = dir.join(job.source.filename());
        let output = dir.join(target.filename());
        info!(output = %output.display(), "creating ladder entry");

        match transcoder.convert(&input, &output, job.target_tier) {
            Ok(()) => assets.push(target),
            Err(e) => {
                warn!(output = %output.display(), error = %e, "transcode failed, entry stays missing");
            }
        }
    }

    Catalog { assets }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcode::TranscodeError;
    use std::fs::File;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Test transcoder that creates empty target files, optionally failing.
    struct FakeTranscoder {
        fail: bool,
        converted: Mutex<Vec<(PathBuf, PathBuf, ResolutionTier)>>,
    }

    impl FakeTranscoder {
        fn new() -> Self {
            Self {
                fail: false,
                converted: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                converted: Mutex::new(Vec::new()),
            }
        }
    }

    impl Transcoder for FakeTranscoder {
        fn convert(
            &self,
            input: &Path,
            output: &Path,
            target: ResolutionTier,
        ) -> Result<(), TranscodeError> {
            if self.fail {
                return Err(TranscodeError::FfmpegFailed(1));
            }
            File::create(output)?;
            self.converted.lock().unwrap().push((
                input.to_path_buf(),
                output.to_path_buf(),
                target,
            ));
            Ok(())
        }
    }

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name)).unwrap();
    }

    fn sorted_filenames(catalog: &Catalog) -> Vec<String> {
        let mut names: Vec<String> = catalog.iter().map(|a| a.filename()).collect();
        names.sort();
        names
    }

    // Scenario A: one 1080p source expands to the full 15-entry ladder,
    // all generated from that source.
    #[test]
    fn test_single_source_fills_full_ladder() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "movie-1080p.mp4");

        let transcoder = FakeTranscoder::new();
        let catalog = build_catalog(tmp.path(), &transcoder);

        assert_eq!(catalog.len(), 15);
        for tier in ResolutionTier::ALL {
            for format in ALLOWED_FORMATS {
                assert!(
                    catalog.find("movie", tier, format).is_some(),
                    "missing movie-{}.{}",
                    tier,
                    format
                );
            }
        }

        // 14 conversions, every one reading the 1080p source
        let converted = transcoder.converted.lock().unwrap();
        assert_eq!(converted.len(), 14);
        for (input, _, _) in converted.iter() {
            assert_eq!(*input, tmp.path().join("movie-1080p.mp4"));
        }
    }

    // The ladder never goes above the title's maximum observed tier.
    #[test]
    fn test_repair_never_upscales() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "clip-480p.avi");

        let catalog = build_catalog(tmp.path(), &FakeTranscoder::new());

        assert_eq!(catalog.len(), 9); // 3 tiers x 3 formats
        assert!(catalog.iter().all(|a| a.tier <= ResolutionTier::R480));
        for tier in [ResolutionTier::R240, ResolutionTier::R360, ResolutionTier::R480] {
            for format in ALLOWED_FORMATS {
                assert!(catalog.find("clip", tier, format).is_some());
            }
        }
    }

    // Rebuilding an already-complete ladder is a no-op.
    #[test]
    fn test_rebuild_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "movie-720p.mkv");

        let first = build_catalog(tmp.path(), &FakeTranscoder::new());

        let second_transcoder = FakeTranscoder::new();
        let second = build_catalog(tmp.path(), &second_transcoder);

        assert_eq!(sorted_filenames(&first), sorted_filenames(&second));
        assert!(second_transcoder.converted.lock().unwrap().is_empty());
    }

    // Scenario E: files outside the naming convention are skipped, not errors.
    #[test]
    fn test_non_matching_files_are_ignored() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "notes.txt");
        touch(tmp.path(), "thumbnail.jpg");

        let catalog = build_catalog(tmp.path(), &FakeTranscoder::new());
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_missing_directory_yields_empty_catalog() {
        let catalog = build_catalog(
            Path::new("/nonexistent/streamvault-test-videos"),
            &FakeTranscoder::new(),
        );
        assert!(catalog.is_empty());
    }

    // Transcode failure leaves the entry missing and continues with the rest.
    #[test]
    fn test_transcode_failure_is_not_fatal() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "movie-240p.mp4");

        let catalog = build_catalog(tmp.path(), &FakeTranscoder::failing());

        // Only the discovered file survives; the avi/mkv 240p entries failed
        assert_eq!(catalog.len(), 1);
        assert!(catalog.find("movie", ResolutionTier::R240, "mp4").is_some());
    }

    // Out-of-list formats are cataloged but never regenerated.
    #[test]
    fn test_passthrough_format_not_regenerated() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "movie-240p.webm");

        let transcoder = FakeTranscoder::new();
        let catalog = build_catalog(tmp.path(), &transcoder);

        assert!(catalog.find("movie", ResolutionTier::R240, "webm").is_some());
        // webm is a valid ladder source: the three allowed formats get built
        assert_eq!(catalog.len(), 4);
        assert_eq!(transcoder.converted.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_plan_repairs_empty_input() {
        assert!(plan_repairs(&[]).is_empty());
    }

    #[test]
    fn test_plan_repairs_orders_jobs_deterministically() {
        let discovered = vec![
            VideoAsset::new("zeta", ResolutionTier::R360, "mp4"),
            VideoAsset::new("alpha", ResolutionTier::R240, "mkv"),
        ];
        let jobs = plan_repairs(&discovered);

        // alpha first (lexical), tiers ascending within each title
        assert_eq!(jobs.first().unwrap().source.title, "alpha");
        assert_eq!(jobs.last().unwrap().source.title, "zeta");
        let alpha_tiers: Vec<ResolutionTier> = jobs
            .iter()
            .filter(|j| j.source.title == "alpha")
            .map(|j| j.target_tier)
            .collect();
        let mut sorted = alpha_tiers.clone();
        sorted.sort();
        assert_eq!(alpha_tiers, sorted);
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(50))]

        // *For any* discovered set, no planned job targets a tier above its
        // title's maximum, and no job duplicates a present (tier, format) pair.
        #[test]
        fn prop_plan_respects_ladder_bounds(
            seeds in proptest::collection::vec(
                (0usize..3, 0usize..5, 0usize..3),
                1..12,
            ),
        ) {
            let titles = ["one", "two", "three"];
            let discovered: Vec<VideoAsset> = seeds
                .iter()
                .map(|(t, tier, f)| {
                    VideoAsset::new(
                        titles[*t],
                        ResolutionTier::ALL[*tier],
                        ALLOWED_FORMATS[*f],
                    )
                })
                .collect();

            let jobs = plan_repairs(&discovered);

            for job in &jobs {
                let max_tier = discovered
                    .iter()
                    .filter(|a| a.title == job.source.title)
                    .map(|a| a.tier)
                    .max()
                    .unwrap();
                proptest::prop_assert!(job.target_tier <= max_tier);
                let already_exists = discovered.iter().any(|a| {
                    a.title == job.source.title
                        && a.tier == job.target_tier
                        && a.format == job.target_format
                });
                proptest::prop_assert!(!already_exists);
            }
        }
    }
}
