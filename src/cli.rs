// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for capture operations
//!
//! This module provides command-line functionality for:
//! - Listing capture devices and the signal modes they accept
//! - Running a capture session with live statistics
//! - Grabbing a single frame to a PNG file

use chrono::Local;
use decklink_media::backends::simulator::SimulatorBackend;
use decklink_media::backends::{BackendKind, CaptureBackend, create_backend};
use decklink_media::capture::{DeviceEnumerator, SignalMode};
use decklink_media::config::Config;
use decklink_media::constants::timing::{STATS_PRINT_INTERVAL, TICK_INTERVAL};
use decklink_media::media::{MediaEvent, MediaSource, TargetFormat, TextureTarget};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// List all devices the selected backend can see
pub fn list_devices(backend: Option<BackendKind>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(None);
    let backend = build_backend(&config, backend)?;
    let enumerator = DeviceEnumerator::new(backend);

    let devices = enumerator.enumerate()?;
    if devices.is_empty() {
        println!("No capture devices found.");
        return Ok(());
    }

    println!("Available capture devices ({}):", enumerator.backend_name());
    println!();
    for (index, device) in devices.iter().enumerate() {
        println!("  [{}] {} ({})", index + 1, device.display_name, device.id);

        // Group modes by raster and show the rates each one accepts
        let mut rasters: Vec<(u32, u32, bool, Vec<String>)> = Vec::new();
        for mode in &device.modes {
            if let Some(existing) = rasters
                .iter_mut()
                .find(|(w, h, i, _)| *w == mode.width && *h == mode.height && *i == mode.interlaced)
            {
                existing.3.push(mode.fps.to_string());
            } else {
                rasters.push((
                    mode.width,
                    mode.height,
                    mode.interlaced,
                    vec![mode.fps.to_string()],
                ));
            }
        }
        for (width, height, interlaced, rates) in &rasters {
            let scan = if *interlaced { 'i' } else { 'p' };
            println!(
                "      {}x{}{} @ {} fps",
                width,
                height,
                scan,
                rates.join(", ")
            );
        }

        let encodings: Vec<String> = device.encodings.iter().map(|e| e.to_string()).collect();
        println!("      Encodings: {}", encodings.join(", "));
        if device.supports_format_detection {
            println!("      Input format detection: yes");
        }
        println!();
    }

    Ok(())
}

/// Capture from a device, printing live statistics until the duration
/// elapses or Ctrl+C is pressed
pub fn run_capture(
    device: Option<usize>,
    url: Option<String>,
    mode: Option<String>,
    duration: Option<u64>,
    backend: Option<BackendKind>,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config.as_deref());
    let backend = build_backend(&config, backend)?;
    let mut source = MediaSource::new(backend, config.session_options());

    open_source(&mut source, device, url, mode, &config)?;

    let format = source
        .video_format()
        .ok_or("Device opened without a signal mode")?;
    println!("Capturing at {}", format);
    let mut target = TextureTarget::new(TargetFormat::Bgra8, format.width, format.height);

    // Ctrl+C requests a clean close instead of killing the process
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_handle = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_handle.store(true, Ordering::SeqCst);
    })?;
    match duration {
        Some(secs) => println!("Running for {} seconds (Ctrl+C to stop early)...", secs),
        None => println!("Running until Ctrl+C..."),
    }

    let start = Instant::now();
    let deadline = duration.map(|secs| start + Duration::from_secs(secs));
    let mut next_stats = start + STATS_PRINT_INTERVAL;
    let mut rendered: u64 = 0;
    let result = loop {
        if stop_flag.load(Ordering::SeqCst) {
            println!();
            println!("Stopping...");
            break Ok(());
        }
        if let Some(deadline) = deadline
            && Instant::now() >= deadline
        {
            println!();
            break Ok(());
        }

        match source.tick(&mut target) {
            Ok(Some(_)) => rendered += 1,
            Ok(None) => {}
            Err(e) => {
                println!();
                break Err(e);
            }
        }

        for event in source.poll_events() {
            if let MediaEvent::FormatChanged(mode) = event {
                println!();
                println!("Input format changed to {}", mode);
                target.resize(mode.width, mode.height);
            }
        }

        if Instant::now() >= next_stats {
            next_stats += STATS_PRINT_INTERVAL;
            let stats = source.stats()?;
            let elapsed = start.elapsed().as_secs();
            print!(
                "\r{:02}:{:02}  rendered {}  delivered {}  dropped {}  no-signal {}",
                elapsed / 60,
                elapsed % 60,
                rendered,
                stats.delivered,
                stats.dropped,
                stats.no_signal
            );
            std::io::Write::flush(&mut std::io::stdout())?;
        }

        std::thread::sleep(TICK_INTERVAL);
    };

    let stats = source.stats();
    source.close();
    if let Ok(stats) = stats {
        println!(
            "Session totals: rendered {}, delivered {}, dropped {}, no-signal {}",
            rendered, stats.delivered, stats.dropped, stats.no_signal
        );
    }
    result.map_err(Into::into)
}

/// Grab a single frame from a device and save it as a PNG
pub fn save_snapshot(
    device: Option<usize>,
    mode: Option<String>,
    output: Option<PathBuf>,
    backend: Option<BackendKind>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(None);
    let backend = build_backend(&config, backend)?;
    let mut source = MediaSource::new(backend, config.session_options());

    open_source(&mut source, device, None, mode, &config)?;

    let format = source
        .video_format()
        .ok_or("Device opened without a signal mode")?;
    println!("Capturing at {}", format);

    // The image crate wants RGBA ordering
    let mut target = TextureTarget::new(TargetFormat::Rgba8, format.width, format.height);

    // Wait for the first delivered frame; a healthy input produces one
    // within a frame interval, so five seconds means no usable signal
    let start = Instant::now();
    let timeout = Duration::from_secs(5);
    let frame = loop {
        match source.tick(&mut target)? {
            Some(info) => break info,
            None => {
                if start.elapsed() >= timeout {
                    source.close();
                    return Err("No frame received within 5 seconds".into());
                }
                std::thread::sleep(TICK_INTERVAL);
            }
        }
    };
    source.close();

    let output_path = resolve_snapshot_path(output)?;
    let image =
        image::RgbaImage::from_raw(target.width(), target.height(), target.data().to_vec())
            .ok_or("Rendered frame has the wrong size for its geometry")?;
    image.save(&output_path)?;

    println!(
        "Saved frame {} ({} @ {:.3}s) to {}",
        frame.sequence,
        frame.mode.shorthand(),
        frame.pts_ns as f64 / 1_000_000_000.0,
        output_path.display()
    );
    Ok(())
}

/// Load configuration, preferring an explicit file over the default path
fn load_config(path: Option<&Path>) -> Config {
    match path {
        Some(path) => Config::load_or_default(path),
        None => match Config::default_path() {
            Some(path) => Config::load_or_default(&path),
            None => Config::default(),
        },
    }
}

/// Build the capture backend, letting a CLI flag override the configured one
fn build_backend(
    config: &Config,
    requested: Option<BackendKind>,
) -> Result<Arc<dyn CaptureBackend>, Box<dyn std::error::Error>> {
    let kind = requested.unwrap_or(config.backend);
    let backend = match kind {
        // The simulator honors the configured device count and pattern
        BackendKind::Simulator => {
            Arc::new(SimulatorBackend::new(config.simulator.options())) as Arc<dyn CaptureBackend>
        }
        other => create_backend(other)?,
    };
    Ok(backend)
}

/// Open the source from CLI selectors: a URL wins over a device ordinal,
/// an explicit ordinal over the configured device id, and an explicit
/// mode over the configured one
fn open_source(
    source: &mut MediaSource,
    device: Option<usize>,
    url: Option<String>,
    mode: Option<String>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(url) = url {
        source.open_url(&url)?;
        return Ok(());
    }

    let mode = match mode {
        Some(shorthand) => Some(SignalMode::from_shorthand(&shorthand).ok_or_else(|| {
            format!(
                "Unknown mode '{}' (expected a shorthand like 1080p29.97 or 2160p25)",
                shorthand
            )
        })?),
        None => config.requested_mode(),
    };

    let enumerator = DeviceEnumerator::new(source.backend());
    let descriptor = match (device, &config.device) {
        (Some(ordinal), _) => enumerator.by_ordinal(ordinal)?,
        (None, Some(id)) => enumerator.find(id)?,
        (None, None) => enumerator.by_ordinal(1)?,
    };
    source.open(&descriptor.id, mode)?;
    Ok(())
}

/// Default folder name for saved frames
const DEFAULT_SAVE_FOLDER: &str = "DeckLink";

/// Resolve the snapshot output path, timestamping the default filename
fn resolve_snapshot_path(output: Option<PathBuf>) -> std::io::Result<PathBuf> {
    let path = match output {
        Some(path) if path.is_dir() => path.join(default_snapshot_name()),
        Some(path) => path,
        None => default_snapshot_dir().join(default_snapshot_name()),
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(path)
}

fn default_snapshot_name() -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    format!("frame_{}.png", timestamp)
}

fn default_snapshot_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(DEFAULT_SAVE_FOLDER)
}
