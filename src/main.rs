//! InkDrape - tattoo preview warp service
//!
//! Hosts the warp engine behind a JSON API for the preview UI, or runs a
//! one-shot point detection on an image file.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use inkdrape::config::Config;
use inkdrape::detect::{decode_image, detect, DetectOptions, PixelBuffer};
use inkdrape::server::{run_server, AppState};

/// InkDrape - preview tattoo designs draped over body photos
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Web server host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Web server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Configuration file path
    #[arg(short, long, default_value = "inkdrape.toml")]
    config: PathBuf,

    /// Detect warp points in an image, print them as JSON and exit
    #[arg(long, value_name = "IMAGE")]
    detect: Option<PathBuf>,

    /// Maximum points for --detect (defaults to the config value)
    #[arg(long)]
    max_points: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stderr keeps stdout clean for --detect output
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    info!("InkDrape v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load_or_create(&args.config)?;

    if let Some(path) = &args.detect {
        return detect_file(path, &config, args.max_points);
    }

    let host = args.host.clone().unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    info!(
        "Warp strength {}% ({}), mesh grid {}",
        config.warp.strength,
        config.warp.mode.as_str(),
        config.warp.mesh_grid_size
    );

    let state = Arc::new(AppState::new(config, args.config.clone()));

    let addr = format!("{}:{}", host, port);
    info!("Starting web server at http://{}", addr);

    tokio::select! {
        result = run_server(&addr, state) => {
            match result {
                Ok(()) => info!("Server exited normally"),
                Err(e) => tracing::error!("Server error: {}", e),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}

/// One-shot detection: decode, detect, print JSON to stdout
fn detect_file(path: &Path, config: &Config, max_points: Option<usize>) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read image {:?}", path))?;
    let image = decode_image(&bytes).with_context(|| format!("Failed to decode image {:?}", path))?;
    let pixels = PixelBuffer::from_image(&image);

    let options = DetectOptions {
        max_points: max_points.unwrap_or(config.warp.detect_max_points),
        edge_threshold: config.warp.edge_threshold,
    };
    let detection = detect(&pixels, &options);
    info!(
        "Detected {} points in {}x{} image via {:?}",
        detection.points.len(),
        pixels.width(),
        pixels.height(),
        detection.strategy
    );

    let json = serde_json::to_string_pretty(&detection).context("Failed to serialize detection")?;
    println!("{}", json);
    Ok(())
}
