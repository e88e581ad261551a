//! Protocol client for the `list` and `play` subcommands.
//!
//! Speaks the newline-delimited JSON session protocol and builds the
//! player-collaborator invocation for each transport.

use streamvault::protocol::{
    AssetDescriptor, ListRequest, PlayMarker, PlayRequest, Request, TransportProtocol,
};
use streamvault_config::TransportConfig;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::process::Command;

/// Error type for client operations
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wire encoding error: {0}")]
    Wire(#[from] serde_json::Error),

    #[error("server closed the connection without a response")]
    ConnectionClosed,
}

async fn send_request(stream: &mut TcpStream, request: &Request) -> Result<(), ClientError> {
    let mut line = serde_json::to_string(request)?;
    line.push('\n');
    stream.write_all(line.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

/// Send a listing query and collect the response.
pub async fn request_listing(
    addr: &str,
    format: &str,
    bitrate_mbps: f64,
) -> Result<Vec<AssetDescriptor>, ClientError> {
    let mut stream = TcpStream::connect(addr).await?;
    let request = Request::List(ListRequest {
        command: format.to_string(),
        bitrate_mbps,
    });
    send_request(&mut stream, &request).await?;

    let mut reader = BufReader::new(stream);
    let mut response = String::new();
    let n = reader.read_line(&mut response).await?;
    if n == 0 {
        return Err(ClientError::ConnectionClosed);
    }
    Ok(serde_json::from_str(response.trim_end())?)
}

/// Send a play request and hand the open connection back to the caller.
///
/// The stream carries no further data; the server keeps emitting until this
/// connection closes, so the caller holds it for the playback duration and
/// drops it to stop the stream.
pub async fn request_play(
    addr: &str,
    asset: AssetDescriptor,
    protocol_name: &str,
) -> Result<TcpStream, ClientError> {
    let mut stream = TcpStream::connect(addr).await?;
    let request = Request::Play(PlayRequest {
        command: PlayMarker::PlayRequest,
        asset,
        protocol: protocol_name.to_string(),
    });
    send_request(&mut stream, &request).await?;
    Ok(stream)
}

/// Build the ffplay player-collaborator invocation for a transport.
///
/// The rendezvous ports and SDP path mirror the emitter's side of the same
/// transport configuration.
pub fn build_player_command(
    protocol: TransportProtocol,
    server_host: &str,
    transport: &TransportConfig,
) -> Command {
    let mut cmd = Command::new("ffplay");
    match protocol {
        TransportProtocol::Tcp => {
            cmd.arg(format!("tcp://{}:{}", server_host, transport.tcp_port));
        }
        TransportProtocol::Udp => {
            cmd.arg(format!("udp://@:{}", transport.udp_port));
        }
        TransportProtocol::RtpUdp => {
            cmd.arg("-protocol_whitelist").arg("file,rtp,udp");
            cmd.arg(&transport.sdp_path);
        }
    }
    cmd.kill_on_drop(true);
    cmd
}
