// SPDX-License-Identifier: GPL-3.0-only

//! On-disk configuration
//!
//! A single JSON file holding the capture defaults: which backend and
//! device to open, the requested signal mode, queue and pool tuning, and
//! the simulator fleet settings. Unknown or missing fields fall back to
//! defaults so older files keep loading.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::backends::BackendKind;
use crate::backends::simulator::{SimulatorOptions, TestPattern};
use crate::capture::types::{DeviceId, Framerate, SessionOptions, SignalMode};
use crate::constants::{pool, queue, simulator, timing};

/// Requested capture mode as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeConfig {
    /// Resolution width
    pub width: u32,
    /// Resolution height
    pub height: u32,
    /// Framerate numerator (30000 for 29.97)
    pub fps_num: u32,
    /// Framerate denominator (1001 for 29.97)
    pub fps_denom: u32,
    /// FourCC-style encoding name ("UYVY", "v210", "BGRA")
    pub encoding: String,
    /// Interlaced fields rather than progressive frames
    pub interlaced: bool,
}

impl ModeConfig {
    pub fn to_mode(&self) -> Result<SignalMode, String> {
        let encoding = self.encoding.parse()?;
        Ok(SignalMode {
            width: self.width,
            height: self.height,
            fps: Framerate::new(self.fps_num, self.fps_denom),
            encoding,
            interlaced: self.interlaced,
        })
    }

    pub fn from_mode(mode: &SignalMode) -> Self {
        Self {
            width: mode.width,
            height: mode.height,
            fps_num: mode.fps.num,
            fps_denom: mode.fps.denom,
            encoding: mode.encoding.fourcc().to_string(),
            interlaced: mode.interlaced,
        }
    }
}

/// Simulator backend settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// How many virtual cards to expose
    pub devices: usize,
    /// Pattern content the cards deliver (bars or gradient)
    pub pattern: TestPattern,
    /// Deliver this many frames, then fail like a dying card
    pub fail_after_frames: Option<u64>,
    /// Every Nth frame interval arrives without an input signal
    pub signal_loss_cycle: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            devices: simulator::DEFAULT_DEVICE_COUNT,
            pattern: TestPattern::default(),
            fail_after_frames: None,
            signal_loss_cycle: None,
        }
    }
}

impl SimulatorConfig {
    pub fn options(&self) -> SimulatorOptions {
        SimulatorOptions {
            device_count: self.devices,
            pattern: self.pattern,
            fail_after_frames: self.fail_after_frames,
            signal_loss_cycle: self.signal_loss_cycle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Driver layer to capture with
    pub backend: BackendKind,
    /// Device id to open by default (e.g., "simulator:0")
    pub device: Option<DeviceId>,
    /// Requested signal mode; omitted means the device's preferred mode
    pub mode: Option<ModeConfig>,
    /// Frames the delivery queue holds before dropping the oldest
    pub queue_capacity: usize,
    /// Buffers the frame pool retains for reuse
    pub pool_retention: usize,
    /// Bounded wait when closing a session, in milliseconds
    pub close_grace_ms: u64,
    /// Simulator backend settings
    pub simulator: SimulatorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(), // Simulator unless asked otherwise
            device: None,
            mode: None,
            queue_capacity: queue::DEFAULT_CAPACITY,
            pool_retention: pool::DEFAULT_RETENTION,
            close_grace_ms: timing::CLOSE_GRACE.as_millis() as u64,
            simulator: SimulatorConfig::default(),
        }
    }
}

impl Config {
    /// Load from `path`, falling back to defaults when the file is
    /// missing or malformed
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(config) => {
                    debug!(path = %path.display(), "Loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Malformed configuration, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "No configuration file, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, raw)
    }

    /// Default location under the user configuration directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("decklink-media").join("config.json"))
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            queue_capacity: self.queue_capacity,
            pool_retention: self.pool_retention,
            close_grace: Duration::from_millis(self.close_grace_ms),
        }
    }

    /// The configured mode, if present and well formed
    pub fn requested_mode(&self) -> Option<SignalMode> {
        let mode_config = self.mode.as_ref()?;
        match mode_config.to_mode() {
            Ok(mode) => Some(mode),
            Err(e) => {
                warn!(error = %e, "Ignoring configured mode");
                None
            }
        }
    }
}
