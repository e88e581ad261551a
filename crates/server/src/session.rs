//! Per-connection session dispatcher.
//!
//! Each accepted connection carries exactly one command. A listing query is
//! answered and the connection closes; a play request starts an emitter and
//! holds the connection open, with the next read acting purely as the
//! disconnect signal that tears the emitter down.

use crate::catalog::Catalog;
use crate::emitter::{EmitterError, StreamSupervisor};
use crate::metrics::SharedMetrics;
use crate::protocol::{
    resolve_protocol, AssetDescriptor, PlayRequest, ProtocolError, Request, PLAY_COMMAND,
};
use crate::tiers::{select_assets, BitrateTable};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{info, warn};

/// Error type for session handling. Every variant is logged by the accept
/// loop and abandons only the offending connection, never the server.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Connection read/write failure
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The request line matched neither command shape. Deliberately silent on
    /// the wire; the named variant leaves room to answer it in a future
    /// protocol revision.
    #[error("unknown or malformed command: {0}")]
    UnknownCommand(String),

    /// Response could not be encoded
    #[error("failed to encode response: {0}")]
    Encode(serde_json::Error),

    /// Play request named a transport that does not exist
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Play request named an asset the catalog does not hold
    #[error("asset not in catalog: {0}")]
    AssetNotFound(String),

    /// Emitter failed to start
    #[error(transparent)]
    Emitter(#[from] EmitterError),
}

/// Everything a session needs, shared by reference across the accept loop.
/// The catalog is built once at startup and read-only here.
pub struct SessionContext {
    pub catalog: Catalog,
    pub bitrates: BitrateTable,
    pub supervisor: Arc<StreamSupervisor>,
    pub metrics: SharedMetrics,
}

/// Handle one connection from command read to teardown.
pub async fn handle_connection(
    stream: TcpStream,
    ctx: &SessionContext,
) -> Result<(), SessionError> {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();

    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        // Client connected and left without a command
        return Ok(());
    }

    let request: Request = serde_json::from_str(line.trim_end())
        .map_err(|e| SessionError::UnknownCommand(e.to_string()))?;

    match request {
        // The play marker is never a format name. A marker whose body failed
        // the play shape lands here as a listing query and must be rejected,
        // not answered as a listing for the literal token.
        Request::List(list) if list.command == PLAY_COMMAND => Err(
            SessionError::UnknownCommand(format!("{} without a play body", PLAY_COMMAND)),
        ),
        Request::List(list) => {
            let selected = select_assets(
                &ctx.catalog,
                &list.command,
                list.bitrate_mbps,
                &ctx.bitrates,
            );
            let descriptors: Vec<AssetDescriptor> =
                selected.into_iter().map(AssetDescriptor::from).collect();
            info!(
                format = %list.command,
                bitrate_mbps = list.bitrate_mbps,
                count = descriptors.len(),
                "listing served"
            );

            let mut payload =
                serde_json::to_string(&descriptors).map_err(SessionError::Encode)?;
            payload.push('\n');
            reader.get_mut().write_all(payload.as_bytes()).await?;
            reader.get_mut().flush().await?;

            ctx.metrics.write().await.listings_served += 1;
            Ok(())
        }
        Request::Play(play) => handle_play(reader, play, ctx).await,
    }
}

/// Outcome of racing client disconnect against emitter exit.
enum StreamEvent {
    Disconnected(std::io::Result<usize>),
    EmitterExited(std::io::Result<std::process::ExitStatus>),
}

async fn handle_play(
    mut reader: BufReader<TcpStream>,
    play: PlayRequest,
    ctx: &SessionContext,
) -> Result<(), SessionError> {
    let descriptor = &play.asset;
    let tier = descriptor
        .tier()
        .ok_or_else(|| SessionError::AssetNotFound(format!(
            "{}-{}.{}",
            descriptor.title, descriptor.resolution_tier, descriptor.format
        )))?;
    let asset = ctx
        .catalog
        .find(&descriptor.title, tier, &descriptor.format)
        .cloned()
        .ok_or_else(|| SessionError::AssetNotFound(format!(
            "{}-{}.{}",
            descriptor.title, descriptor.resolution_tier, descriptor.format
        )))?;

    let transport = resolve_protocol(&play.protocol, tier)?;
    let mut handle = ctx.supervisor.start_streaming(&asset, transport).await?;
    {
        let mut metrics = ctx.metrics.write().await;
        metrics.streams_started += 1;
        metrics.active_streams += 1;
    }

    // The socket carries no further protocol data; any byte, EOF or error on
    // this read means the client is gone and the stream must end.
    let mut scratch = [0u8; 1];
    let event = tokio::select! {
        read = reader.read(&mut scratch) => StreamEvent::Disconnected(read),
        exit = handle.wait() => StreamEvent::EmitterExited(exit),
    };

    let read_result = match event {
        StreamEvent::Disconnected(read) => read,
        StreamEvent::EmitterExited(exit) => {
            match exit {
                Ok(status) => info!(session = %handle.id(), %status, "emitter finished"),
                Err(e) => warn!(session = %handle.id(), error = %e, "emitter wait failed"),
            }
            // The session still lasts until the client ends the connection
            reader.read(&mut scratch).await
        }
    };

    ctx.supervisor.stop(handle).await;
    {
        let mut metrics = ctx.metrics.write().await;
        metrics.active_streams = metrics.active_streams.saturating_sub(1);
    }

    read_result?;
    Ok(())
}
