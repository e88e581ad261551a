//! streamvault
//!
//! Video catalog server: scans a library, repairs each title's resolution
//! ladder through an external transcoding engine, and serves a one-command
//! session protocol for listing assets by bandwidth and streaming them
//! through supervised emitter processes.

pub mod asset;
pub mod catalog;
pub mod emitter;
pub mod metrics;
pub mod metrics_server;
pub mod protocol;
pub mod server;
pub mod session;
pub mod startup;
pub mod tiers;
pub mod transcode;

pub use streamvault_config as config;
pub use streamvault_config::Config;

pub use asset::{ResolutionTier, VideoAsset, ALLOWED_FORMATS};
pub use catalog::{build_catalog, plan_repairs, Catalog, TranscodeJob};
pub use emitter::{
    build_emitter_command, EmitterCommandBuilder, EmitterError, EmitterHandle, StreamSupervisor,
};
pub use metrics::{new_shared_metrics, MetricsSnapshot, SharedMetrics};
pub use metrics_server::{create_metrics_router, run_metrics_server, MetricsServerError};
pub use protocol::{
    resolve_protocol, AssetDescriptor, ListRequest, PlayRequest, ProtocolError, Request,
    TransportProtocol, AUTO_PROTOCOL, PLAY_COMMAND,
};
pub use server::serve;
pub use session::{handle_connection, SessionContext, SessionError};
pub use startup::{check_ffmpeg_available, run_startup_checks, StartupError};
pub use tiers::{select_assets, BitrateTable};
pub use transcode::{build_ffmpeg_command, FfmpegTranscoder, TranscodeError, Transcoder};
