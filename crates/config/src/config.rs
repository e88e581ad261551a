//! Core configuration structures and loading logic

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file
    Io(std::io::Error),
    /// TOML parsing error
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Video library configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibraryConfig {
    /// Directory holding the `<title>-<tier>.<format>` video files
    #[serde(default = "default_video_dir")]
    pub video_dir: PathBuf,
}

fn default_video_dir() -> PathBuf {
    PathBuf::from("videos")
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            video_dir: default_video_dir(),
        }
    }
}

/// Session listener configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Port the session protocol listens on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Port the localhost metrics endpoint listens on
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_port() -> u16 {
    9090
}

fn default_metrics_port() -> u16 {
    9091
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            metrics_port: default_metrics_port(),
        }
    }
}

/// Media transport rendezvous configuration
///
/// The emitter and player collaborators meet on these fixed ports; they are
/// configuration rather than literals so both sides can be pointed elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransportConfig {
    /// Host the UDP and RTP emitters push to
    #[serde(default = "default_client_host")]
    pub client_host: String,
    /// Port the TCP emitter listens on
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,
    /// Port the UDP emitter pushes to
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,
    /// Port the RTP video stream is pushed to
    #[serde(default = "default_rtp_video_port")]
    pub rtp_video_port: u16,
    /// Port the RTP audio stream is pushed to
    #[serde(default = "default_rtp_audio_port")]
    pub rtp_audio_port: u16,
    /// Path the RTP session description artifact is written to
    #[serde(default = "default_sdp_path")]
    pub sdp_path: PathBuf,
}

fn default_client_host() -> String {
    "127.0.0.1".to_string()
}

fn default_tcp_port() -> u16 {
    8090
}

fn default_udp_port() -> u16 {
    8091
}

fn default_rtp_video_port() -> u16 {
    5004
}

fn default_rtp_audio_port() -> u16 {
    5006
}

fn default_sdp_path() -> PathBuf {
    PathBuf::from("stream.sdp")
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            client_host: default_client_host(),
            tcp_port: default_tcp_port(),
            udp_port: default_udp_port(),
            rtp_video_port: default_rtp_video_port(),
            rtp_audio_port: default_rtp_audio_port(),
            sdp_path: default_sdp_path(),
        }
    }
}

/// Bandwidth probe configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeConfig {
    /// Public file downloaded (partially) to estimate downstream bandwidth
    #[serde(default = "default_probe_url")]
    pub url: String,
    /// Cap on how many bytes the probe downloads
    #[serde(default = "default_probe_max_bytes")]
    pub max_bytes: u64,
}

fn default_probe_url() -> String {
    "http://nbg1-speed.hetzner.com/100MB.bin".to_string()
}

fn default_probe_max_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            url: default_probe_url(),
            max_bytes: default_probe_max_bytes(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Parses the config.toml file and handles missing optional fields with defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Overrides the following values if environment variables are set:
    /// - STREAMVAULT_VIDEO_DIR -> library.video_dir
    /// - STREAMVAULT_PORT -> server.port
    /// - STREAMVAULT_METRICS_PORT -> server.metrics_port
    /// - STREAMVAULT_CLIENT_HOST -> transport.client_host
    /// - STREAMVAULT_PROBE_URL -> probe.url
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("STREAMVAULT_VIDEO_DIR") {
            if !val.is_empty() {
                self.library.video_dir = PathBuf::from(val);
            }
        }

        if let Ok(val) = env::var("STREAMVAULT_PORT") {
            if let Ok(port) = val.parse::<u16>() {
                self.server.port = port;
            }
        }

        if let Ok(val) = env::var("STREAMVAULT_METRICS_PORT") {
            if let Ok(port) = val.parse::<u16>() {
                self.server.metrics_port = port;
            }
        }

        if let Ok(val) = env::var("STREAMVAULT_CLIENT_HOST") {
            if !val.is_empty() {
                self.transport.client_host = val;
            }
        }

        if let Ok(val) = env::var("STREAMVAULT_PROBE_URL") {
            if !val.is_empty() {
                self.probe.url = val;
            }
        }
    }

    /// Load configuration from file and apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }
}
