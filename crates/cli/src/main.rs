//! CLI entry point for streamvault
//!
//! `serve` runs the catalog server; `list`, `play` and `probe` are the
//! client-side counterparts recovered from the original desktop client.

mod client;
mod probe;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use streamvault::asset::ResolutionTier;
use streamvault::catalog::{build_catalog, Catalog};
use streamvault::emitter::StreamSupervisor;
use streamvault::metrics::new_shared_metrics;
use streamvault::protocol::{resolve_protocol, AssetDescriptor};
use streamvault::session::SessionContext;
use streamvault::tiers::BitrateTable;
use streamvault::transcode::FfmpegTranscoder;
use streamvault::Config;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// streamvault - video catalog server with ladder repair and supervised streaming
#[derive(Parser, Debug)]
#[command(name = "streamvault")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (config.toml)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan the library, repair the ladder and serve the session protocol
    Serve {
        /// Skip startup checks (ffmpeg availability). For testing only.
        #[arg(long, default_value = "false")]
        skip_checks: bool,

        /// Skip the library scan and ladder repair; serve an empty catalog
        #[arg(long, default_value = "false")]
        skip_scan: bool,
    },
    /// Ask the server which assets fit a format and bandwidth
    List {
        /// Container format to list (e.g. mp4)
        format: String,

        /// Claimed bandwidth in Mbps; measured with the probe when omitted
        #[arg(long)]
        bitrate: Option<f64>,

        /// Server address (defaults to 127.0.0.1:<configured port>)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Request playback of one asset and hold the session open
    Play {
        /// Asset title
        title: String,

        /// Resolution tier (240p, 360p, 480p, 720p, 1080p)
        tier: String,

        /// Container format
        format: String,

        /// Transport protocol: TCP, UDP, RTP_UDP or Auto
        #[arg(long, default_value = "Auto")]
        protocol: String,

        /// Server address (defaults to 127.0.0.1:<configured port>)
        #[arg(long)]
        addr: Option<String>,

        /// Also launch the ffplay player collaborator for the transport
        #[arg(long, default_value = "false")]
        player: bool,
    },
    /// Measure downstream bandwidth with a timed partial download
    Probe,
}

fn load_config(path: &PathBuf) -> Result<Config, streamvault_config::ConfigError> {
    if path.exists() {
        Config::load(path)
    } else {
        let mut config = Config::default();
        config.apply_env_overrides();
        Ok(config)
    }
}

fn server_addr(explicit: Option<String>, config: &Config) -> String {
    explicit.unwrap_or_else(|| format!("127.0.0.1:{}", config.server.port))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Serve {
            skip_checks,
            skip_scan,
        } => run_serve(config, skip_checks, skip_scan).await,
        Commands::List {
            format,
            bitrate,
            addr,
        } => run_list(config, format, bitrate, addr).await,
        Commands::Play {
            title,
            tier,
            format,
            protocol,
            addr,
            player,
        } => run_play(config, title, tier, format, protocol, addr, player).await,
        Commands::Probe => run_probe(config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_serve(config: Config, skip_checks: bool, skip_scan: bool) -> Result<(), String> {
    if skip_checks {
        println!("WARNING: Skipping startup checks (--skip-checks enabled)");
    } else {
        streamvault::startup::run_startup_checks()
            .map_err(|e| format!("Startup check failed: {}", e))?;
    }

    let catalog = if skip_scan {
        Catalog::default()
    } else {
        let dir = config.library.video_dir.clone();
        tokio::task::spawn_blocking(move || build_catalog(&dir, &FfmpegTranscoder))
            .await
            .map_err(|e| format!("Library scan task failed: {}", e))?
    };
    println!("Catalog ready with {} assets", catalog.len());

    let metrics = new_shared_metrics();
    metrics.write().await.catalog_size = catalog.len();

    let metrics_port = config.server.metrics_port;
    let metrics_state = metrics.clone();
    tokio::spawn(async move {
        if let Err(e) = streamvault::run_metrics_server(metrics_state, metrics_port).await {
            tracing::error!(error = %e, "metrics server error");
        }
    });
    println!(
        "Metrics endpoint on http://127.0.0.1:{}/metrics",
        metrics_port
    );

    let ctx = SessionContext {
        catalog,
        bitrates: BitrateTable::default(),
        supervisor: Arc::new(StreamSupervisor::new(
            config.library.video_dir.clone(),
            config.transport.clone(),
        )),
        metrics,
    };

    let listener = TcpListener::bind(("0.0.0.0", config.server.port))
        .await
        .map_err(|e| format!("Failed to bind port {}: {}", config.server.port, e))?;
    println!("Listening on port {}", config.server.port);

    streamvault::serve(listener, ctx).await;
    Ok(())
}

async fn run_list(
    config: Config,
    format: String,
    bitrate: Option<f64>,
    addr: Option<String>,
) -> Result<(), String> {
    let bitrate_mbps = match bitrate {
        Some(mbps) => mbps,
        None => probe::measure_download_mbps(&config.probe.url, config.probe.max_bytes)
            .await
            .unwrap_or_else(|e| {
                eprintln!("Speed test error: {}; assuming 1.0 Mbps", e);
                1.0
            }),
    };
    println!("Claimed bandwidth: {:.2} Mbps", bitrate_mbps);

    let addr = server_addr(addr, &config);
    let assets = client::request_listing(&addr, &format, bitrate_mbps)
        .await
        .map_err(|e| format!("Listing failed: {}", e))?;

    if assets.is_empty() {
        println!("No video available.");
    } else {
        println!("Videos available:");
        for asset in assets {
            println!(" - {}-{}.{}", asset.title, asset.resolution_tier, asset.format);
        }
    }
    Ok(())
}

async fn run_play(
    config: Config,
    title: String,
    tier: String,
    format: String,
    protocol: String,
    addr: Option<String>,
    player: bool,
) -> Result<(), String> {
    let parsed_tier = ResolutionTier::parse(&tier)
        .ok_or_else(|| format!("Unknown resolution tier: {}", tier))?;
    let transport = resolve_protocol(&protocol, parsed_tier).map_err(|e| e.to_string())?;

    let descriptor = AssetDescriptor {
        title,
        format,
        resolution_tier: parsed_tier.as_str().to_string(),
    };
    let filename = format!(
        "{}-{}.{}",
        descriptor.title, descriptor.resolution_tier, descriptor.format
    );

    let addr = server_addr(addr, &config);
    let stream = client::request_play(&addr, descriptor, &protocol)
        .await
        .map_err(|e| format!("Play request failed: {}", e))?;
    println!("Streaming {} over {} (Ctrl-C to stop)", filename, transport);

    if player {
        let host = addr.rsplit_once(':').map(|(h, _)| h).unwrap_or("127.0.0.1");
        let mut child = client::build_player_command(transport, host, &config.transport)
            .spawn()
            .map_err(|e| format!("Failed to launch player: {}", e))?;

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                let _ = child.kill().await;
            }
            status = child.wait() => {
                if let Ok(status) = status {
                    println!("Player exited: {}", status);
                }
            }
        }
    } else {
        let _ = tokio::signal::ctrl_c().await;
    }

    // Closing the connection is the stop signal the server acts on
    drop(stream);
    Ok(())
}

async fn run_probe(config: Config) -> Result<(), String> {
    let mbps = probe::measure_download_mbps(&config.probe.url, config.probe.max_bytes)
        .await
        .map_err(|e| format!("Speed test error: {}", e))?;
    println!("Estimated downstream bandwidth: {:.2} Mbps", mbps);
    Ok(())
}
