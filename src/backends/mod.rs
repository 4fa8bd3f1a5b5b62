// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for SDI capture hardware
//!
//! A backend owns the driver layer for one family of capture cards. It
//! enumerates devices and turns an (device, mode) request into a running
//! delivery stream feeding a session's frame sink.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            MediaSource facade                │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │            CaptureSession                    │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │           CaptureBackend trait               │
//! │  ┌──────────────┐      ┌────────────────┐   │
//! │  │  Simulator   │      │    DeckLink    │   │
//! │  │   (always)   │      │ (feature gate) │   │
//! │  └──────────────┘      └────────────────┘   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`delivery`]: thread lifecycle for delivery loops
//! - [`simulator`]: pure-software signal generator backend
//! - `decklink`: DeckLink hardware backend (feature `decklink`, Linux only)

pub mod delivery;
pub mod simulator;

#[cfg(all(feature = "decklink", target_os = "linux"))]
pub mod decklink;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::capture::sink::FrameSink;
use crate::capture::types::{DeviceDescriptor, DeviceId, SignalMode};
use crate::errors::{CaptureError, CaptureResult};

/// Which driver layer to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Software signal generator, available in every build
    #[default]
    Simulator,
    /// DeckLink capture cards via the Desktop Video driver
    Decklink,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Simulator => write!(f, "simulator"),
            BackendKind::Decklink => write!(f, "decklink"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulator" | "sim" => Ok(BackendKind::Simulator),
            "decklink" => Ok(BackendKind::Decklink),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// Driver layer for one family of capture devices
///
/// Implementations enforce hardware exclusivity: a device with a running
/// stream rejects further [`open_stream`](CaptureBackend::open_stream)
/// calls with [`CaptureError::DeviceBusy`] until that stream stops.
pub trait CaptureBackend: Send + Sync {
    /// Short backend name used in device ids and logs
    fn name(&self) -> &'static str;

    /// Check that the driver layer behind this backend is reachable
    ///
    /// Fails with [`CaptureError::HardwareUnavailable`] otherwise. The
    /// default asks for an enumeration pass and discards the result.
    fn probe(&self) -> CaptureResult<()> {
        self.enumerate().map(|_| ())
    }

    /// Snapshot the devices currently attached to this backend
    ///
    /// Fails with [`CaptureError::HardwareUnavailable`] when the driver
    /// layer itself cannot be reached.
    fn enumerate(&self) -> CaptureResult<Vec<DeviceDescriptor>>;

    /// Start delivering frames for `mode` from `device` into `sink`
    ///
    /// On success the returned stream is already running. Negotiation
    /// failures map onto the capture error taxonomy: unknown id is
    /// `DeviceNotFound`, a held device is `DeviceBusy`, a rejected mode is
    /// `ModeUnsupported`, and a driver fault is `HardwareError`. A failed
    /// open leaves the device unclaimed.
    fn open_stream(
        &self,
        device: &DeviceId,
        mode: &SignalMode,
        sink: Arc<FrameSink>,
    ) -> CaptureResult<Box<dyn DeviceStream>>;
}

/// A running frame delivery for one device
pub trait DeviceStream: Send {
    /// Stop delivery, waiting at most `grace` for the delivery side to
    /// acknowledge; releases the device claim
    fn stop(&mut self, grace: Duration);
}

/// Construct the backend for `kind` with default settings
///
/// Probes the driver layer before handing the backend out, so a missing
/// driver fails here rather than on first use. In builds without the
/// `decklink` feature (or off Linux) the DeckLink backend reports
/// `HardwareUnavailable` instead of existing.
pub fn create_backend(kind: BackendKind) -> CaptureResult<Arc<dyn CaptureBackend>> {
    let backend: Arc<dyn CaptureBackend> = match kind {
        BackendKind::Simulator => Arc::new(simulator::SimulatorBackend::default()),
        BackendKind::Decklink => {
            #[cfg(all(feature = "decklink", target_os = "linux"))]
            {
                Arc::new(decklink::DeckLinkBackend::new())
            }
            #[cfg(not(all(feature = "decklink", target_os = "linux")))]
            {
                return Err(CaptureError::HardwareUnavailable(
                    "this build has no DeckLink driver support (enable the `decklink` feature on Linux)"
                        .into(),
                ));
            }
        }
    };
    backend.probe()?;
    Ok(backend)
}

/// Registry of devices currently held by a running stream
///
/// One per backend. Claims are RAII: the guard returned by
/// [`claim`](DeviceClaims::claim) releases the device when dropped, so a
/// stream that stops (or panics) always frees its device.
pub(crate) struct DeviceClaims {
    held: Mutex<HashSet<DeviceId>>,
}

impl DeviceClaims {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            held: Mutex::new(HashSet::new()),
        })
    }

    /// Claim exclusive use of a device
    pub fn claim(self: &Arc<Self>, id: &DeviceId) -> CaptureResult<DeviceClaim> {
        let mut held = self.held.lock().unwrap();
        if !held.insert(id.clone()) {
            return Err(CaptureError::DeviceBusy(id.clone()));
        }
        Ok(DeviceClaim {
            registry: Arc::clone(self),
            id: id.clone(),
        })
    }

    /// Whether a device is currently claimed
    pub fn is_held(&self, id: &DeviceId) -> bool {
        self.held.lock().unwrap().contains(id)
    }
}

/// RAII guard for one claimed device
pub(crate) struct DeviceClaim {
    registry: Arc<DeviceClaims>,
    id: DeviceId,
}

impl Drop for DeviceClaim {
    fn drop(&mut self) {
        if let Ok(mut held) = self.registry.held.lock() {
            held.remove(&self.id);
        }
    }
}
