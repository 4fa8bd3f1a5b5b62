// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use decklink_media::backends::BackendKind;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "decklink-media")]
#[command(about = "SDI capture from DeckLink cards as a tick-driven media source")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available capture devices
    List {
        /// Backend to enumerate: simulator or decklink
        #[arg(short, long)]
        backend: Option<BackendKind>,
    },

    /// Capture from a device and print live statistics
    Capture {
        /// Device ordinal to open (default: the configured device, else 1)
        #[arg(short, long)]
        device: Option<usize>,

        /// Open by URL instead (e.g. sdi://device/1)
        #[arg(short, long, conflicts_with_all = ["device", "mode"])]
        url: Option<String>,

        /// Signal mode shorthand (e.g. 1080p29.97); default negotiates
        #[arg(short, long)]
        mode: Option<String>,

        /// Capture duration in seconds (default: run until Ctrl+C)
        #[arg(short = 't', long)]
        duration: Option<u64>,

        /// Backend to use: simulator or decklink
        #[arg(short, long)]
        backend: Option<BackendKind>,

        /// Config file to load instead of the default location
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Grab a single frame and save it as a PNG
    Snapshot {
        /// Device ordinal to open (default: the configured device, else 1)
        #[arg(short, long)]
        device: Option<usize>,

        /// Signal mode shorthand (e.g. 1080p29.97); default negotiates
        #[arg(short, long)]
        mode: Option<String>,

        /// Output file path (default: ~/Pictures/DeckLink/frame_TIMESTAMP.png)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Backend to use: simulator or decklink
        #[arg(short, long)]
        backend: Option<BackendKind>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=decklink_media=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List { backend } => cli::list_devices(backend),
        Commands::Capture {
            device,
            url,
            mode,
            duration,
            backend,
            config,
        } => cli::run_capture(device, url, mode, duration, backend, config),
        Commands::Snapshot {
            device,
            mode,
            output,
            backend,
        } => cli::save_snapshot(device, mode, output, backend),
    }
}
