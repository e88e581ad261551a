//! Session wire protocol.
//!
//! Requests and responses are newline-delimited JSON objects with camelCase
//! fields. A connection carries exactly one request: either a listing query
//! (`command` is a format name) or a play request (`command` is the literal
//! `play_request`).

use crate::asset::{ResolutionTier, VideoAsset};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Command token marking a play request.
pub const PLAY_COMMAND: &str = "play_request";

/// Protocol name asking the server to pick a transport from the default
/// policy. Matched case-insensitively.
pub const AUTO_PROTOCOL: &str = "Auto";

/// Error type for protocol resolution
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown transport protocol: {0}")]
    UnknownProtocol(String),
}

/// Transport the emitter pushes the stream over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportProtocol {
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "UDP")]
    Udp,
    #[serde(rename = "RTP_UDP")]
    RtpUdp,
}

impl TransportProtocol {
    /// Wire/display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportProtocol::Tcp => "TCP",
            TransportProtocol::Udp => "UDP",
            TransportProtocol::RtpUdp => "RTP_UDP",
        }
    }

    /// Parse an explicit wire name.
    pub fn from_name(name: &str) -> Option<TransportProtocol> {
        match name {
            "TCP" => Some(TransportProtocol::Tcp),
            "UDP" => Some(TransportProtocol::Udp),
            "RTP_UDP" => Some(TransportProtocol::RtpUdp),
            _ => None,
        }
    }

    /// Default transport for a resolution tier, used when the client sends
    /// the auto marker instead of a protocol name.
    pub fn default_for(tier: ResolutionTier) -> TransportProtocol {
        match tier {
            ResolutionTier::R240 => TransportProtocol::Tcp,
            ResolutionTier::R360 | ResolutionTier::R480 => TransportProtocol::Udp,
            ResolutionTier::R720 | ResolutionTier::R1080 => TransportProtocol::RtpUdp,
        }
    }
}

impl fmt::Display for TransportProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve the transport for a play request: an explicit name, or the
/// tier-based default when the client sent the auto marker.
pub fn resolve_protocol(
    name: &str,
    tier: ResolutionTier,
) -> Result<TransportProtocol, ProtocolError> {
    if name.eq_ignore_ascii_case(AUTO_PROTOCOL) {
        return Ok(TransportProtocol::default_for(tier));
    }
    TransportProtocol::from_name(name)
        .ok_or_else(|| ProtocolError::UnknownProtocol(name.to_string()))
}

/// Asset identity as it crosses the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDescriptor {
    pub title: String,
    pub format: String,
    pub resolution_tier: String,
}

impl AssetDescriptor {
    /// The descriptor's tier, if it names one on the ladder.
    pub fn tier(&self) -> Option<ResolutionTier> {
        ResolutionTier::parse(&self.resolution_tier)
    }
}

impl From<&VideoAsset> for AssetDescriptor {
    fn from(asset: &VideoAsset) -> Self {
        Self {
            title: asset.title.clone(),
            format: asset.format.clone(),
            resolution_tier: asset.tier.as_str().to_string(),
        }
    }
}

/// Play request: emit `asset` over `protocol` for the lifetime of this
/// connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayRequest {
    pub command: PlayMarker,
    pub asset: AssetDescriptor,
    pub protocol: String,
}

/// The literal `play_request` token. A dedicated type so the untagged
/// `Request` union only takes the play branch for that exact command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayMarker {
    #[serde(rename = "play_request")]
    PlayRequest,
}

/// Listing query: `command` is the format name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    pub command: String,
    pub bitrate_mbps: f64,
}

/// One request line. Play is tried first so `play_request` is never mistaken
/// for a format name; every other command token is a listing query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Request {
    Play(PlayRequest),
    List(ListRequest),
}
