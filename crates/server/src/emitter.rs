//! Streaming supervisor: ownership of the external emitter processes.
//!
//! Each playback session owns exactly one emitter subprocess. The supervisor
//! keeps a registry of live handles keyed by session id so teardown is always
//! explicit, and guarantees the central resource contract: no emitter process
//! outlives the client connection that requested it.

use crate::asset::VideoAsset;
use crate::protocol::TransportProtocol;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use streamvault_config::TransportConfig;
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Error type for emitter operations
#[derive(Debug, Error)]
pub enum EmitterError {
    /// Emitter process failed to spawn
    #[error("failed to spawn emitter: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Registry entry describing one live emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveStream {
    pub filename: String,
    pub protocol: TransportProtocol,
}

/// Exclusive ownership of one emitter process.
///
/// Obtained from [`StreamSupervisor::start_streaming`] and returned to
/// [`StreamSupervisor::stop`]; the child is additionally `kill_on_drop` as a
/// last-resort backstop against leaking past a panic.
pub struct EmitterHandle {
    id: Uuid,
    child: Child,
}

impl EmitterHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the emitter to exit on its own. Used as one arm of the
    /// session's supervision select; the other arm is client disconnect.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }
}

/// Build the ffmpeg emitter invocation for one transport.
///
/// TCP listens for the single inbound player connection; UDP pushes a muxed
/// datagram stream; RTP_UDP re-encodes video and audio into two separate RTP
/// streams and writes the session description the player consumes.
pub fn build_emitter_command(
    input: &Path,
    protocol: TransportProtocol,
    transport: &TransportConfig,
) -> Command {
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-re");
    cmd.arg("-i").arg(input);

    match protocol {
        TransportProtocol::Tcp => {
            cmd.arg("-c").arg("copy");
            cmd.arg("-f").arg("mpegts");
            cmd.arg(format!("tcp://0.0.0.0:{}?listen", transport.tcp_port));
        }
        TransportProtocol::Udp => {
            cmd.arg("-c").arg("copy");
            cmd.arg("-f").arg("mpegts");
            cmd.arg(format!(
                "udp://{}:{}",
                transport.client_host, transport.udp_port
            ));
        }
        TransportProtocol::RtpUdp => {
            cmd.arg("-sdp_file").arg(&transport.sdp_path);
            cmd.arg("-map").arg("0:v");
            cmd.arg("-c:v").arg("libx264");
            cmd.arg("-f").arg("rtp");
            cmd.arg(format!(
                "rtp://{}:{}",
                transport.client_host, transport.rtp_video_port
            ));
            cmd.arg("-map").arg("0:a");
            cmd.arg("-c:a").arg("aac");
            cmd.arg("-f").arg("rtp");
            cmd.arg(format!(
                "rtp://{}:{}",
                transport.client_host, transport.rtp_audio_port
            ));
        }
    }

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::null());
    cmd.kill_on_drop(true);
    cmd
}

/// Builds the emitter invocation for one transport. Swappable so supervision
/// can be driven by a stand-in process where no real emitter is wanted.
pub type EmitterCommandBuilder = fn(&Path, TransportProtocol, &TransportConfig) -> Command;

/// Supervisor owning every live emitter process.
pub struct StreamSupervisor {
    video_dir: PathBuf,
    transport: TransportConfig,
    build_command: EmitterCommandBuilder,
    live: Mutex<HashMap<Uuid, LiveStream>>,
}

impl StreamSupervisor {
    pub fn new(video_dir: PathBuf, transport: TransportConfig) -> Self {
        Self::with_command_builder(video_dir, transport, build_emitter_command)
    }

    /// Supervisor whose emitter invocation is replaced by `build_command`.
    pub fn with_command_builder(
        video_dir: PathBuf,
        transport: TransportConfig,
        build_command: EmitterCommandBuilder,
    ) -> Self {
        Self {
            video_dir,
            transport,
            build_command,
            live: Mutex::new(HashMap::new()),
        }
    }

    /// Spawn the emitter for `asset` over `protocol` and register the handle.
    pub async fn start_streaming(
        &self,
        asset: &VideoAsset,
        protocol: TransportProtocol,
    ) -> Result<EmitterHandle, EmitterError> {
        let input = self.video_dir.join(asset.filename());
        let cmd = (self.build_command)(&input, protocol, &self.transport);
        let entry = LiveStream {
            filename: asset.filename(),
            protocol,
        };
        let handle = self.register_spawn(cmd, entry).await?;
        info!(
            session = %handle.id,
            file = %asset.filename(),
            %protocol,
            "emitter started"
        );
        Ok(handle)
    }

    /// Terminate the emitter if it is still running, reap it and release the
    /// registry entry. Always called on session teardown, whether the client
    /// disconnected cleanly or the dispatcher hit an error.
    pub async fn stop(&self, mut handle: EmitterHandle) {
        match handle.child.try_wait() {
            Ok(Some(status)) => {
                info!(session = %handle.id, %status, "emitter already exited");
            }
            Ok(None) => {
                if let Err(e) = handle.child.kill().await {
                    warn!(session = %handle.id, error = %e, "failed to kill emitter");
                } else {
                    info!(session = %handle.id, "emitter terminated");
                }
            }
            Err(e) => {
                warn!(session = %handle.id, error = %e, "failed to query emitter state");
            }
        }
        self.live.lock().await.remove(&handle.id);
    }

    /// Number of live registry entries.
    pub async fn live_count(&self) -> usize {
        self.live.lock().await.len()
    }

    async fn register_spawn(
        &self,
        mut cmd: Command,
        entry: LiveStream,
    ) -> Result<EmitterHandle, EmitterError> {
        let child = cmd.spawn()?;
        let id = Uuid::new_v4();
        self.live.lock().await.insert(id, entry);
        Ok(EmitterHandle { id, child })
    }
}
