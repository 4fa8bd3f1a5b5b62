// SPDX-License-Identifier: GPL-3.0-only

//! Software signal generator backend
//!
//! Presents a configurable number of virtual capture cards that deliver
//! test pattern frames at real mode cadence from a dedicated thread. Every
//! build carries this backend; it is the default target for the CLI and
//! the whole integration test suite, and its fault injection drives the
//! error paths real hardware only produces by pulling cables.

pub mod pattern;

pub use pattern::TestPattern;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::backends::delivery::{DeliveryAction, DeliveryLoop};
use crate::backends::{CaptureBackend, DeviceClaim, DeviceClaims, DeviceStream};
use crate::capture::sink::FrameSink;
use crate::capture::types::{
    DeviceDescriptor, DeviceId, PixelEncoding, STANDARD_MODES, SignalMode,
};
use crate::constants::simulator::{DEFAULT_DEVICE_COUNT, DEVICE_NAME_PREFIX};
use crate::errors::{CaptureError, CaptureResult};

/// Tunables for the simulated card fleet
#[derive(Debug, Clone)]
pub struct SimulatorOptions {
    /// How many virtual cards to expose
    pub device_count: usize,
    /// Pattern content every card delivers
    pub pattern: TestPattern,
    /// Deliver this many frames, then fail like a dying card
    pub fail_after_frames: Option<u64>,
    /// Every Nth frame interval arrives without an input signal
    pub signal_loss_cycle: Option<u64>,
}

impl Default for SimulatorOptions {
    fn default() -> Self {
        Self {
            device_count: DEFAULT_DEVICE_COUNT,
            pattern: TestPattern::default(),
            fail_after_frames: None,
            signal_loss_cycle: None,
        }
    }
}

/// Backend exposing virtual capture cards
pub struct SimulatorBackend {
    options: SimulatorOptions,
    claims: Arc<DeviceClaims>,
}

impl SimulatorBackend {
    pub fn new(options: SimulatorOptions) -> Self {
        Self {
            options,
            claims: DeviceClaims::new(),
        }
    }
}

impl Default for SimulatorBackend {
    fn default() -> Self {
        Self::new(SimulatorOptions::default())
    }
}

impl CaptureBackend for SimulatorBackend {
    fn name(&self) -> &'static str {
        "simulator"
    }

    fn enumerate(&self) -> CaptureResult<Vec<DeviceDescriptor>> {
        let devices = (0..self.options.device_count)
            .map(|index| DeviceDescriptor {
                id: DeviceId::new(self.name(), index as u32),
                display_name: format!("{} {}", DEVICE_NAME_PREFIX, index + 1),
                backend: self.name().to_string(),
                modes: STANDARD_MODES.to_vec(),
                encodings: vec![
                    PixelEncoding::Uyvy8,
                    PixelEncoding::Yuv10,
                    PixelEncoding::Bgra8,
                    PixelEncoding::Raw12,
                ],
                supports_format_detection: true,
            })
            .collect();
        Ok(devices)
    }

    fn open_stream(
        &self,
        device: &DeviceId,
        mode: &SignalMode,
        sink: Arc<FrameSink>,
    ) -> CaptureResult<Box<dyn DeviceStream>> {
        let descriptor = self
            .enumerate()?
            .into_iter()
            .find(|d| &d.id == device)
            .ok_or_else(|| CaptureError::DeviceNotFound(device.clone()))?;

        if !descriptor.supports(mode) {
            return Err(CaptureError::ModeUnsupported {
                device: device.clone(),
                mode: mode.to_string(),
            });
        }

        let claim = self.claims.claim(device)?;

        info!(device = %device, mode = %mode, "Starting simulated capture");
        let delivery = spawn_generator(device, *mode, self.options.clone(), sink);

        Ok(Box::new(SimulatorStream {
            delivery,
            claim: Some(claim),
        }))
    }
}

/// Spawn the generator thread delivering pattern frames at mode cadence
fn spawn_generator(
    device: &DeviceId,
    mode: SignalMode,
    options: SimulatorOptions,
    sink: Arc<FrameSink>,
) -> DeliveryLoop {
    let interval = mode.frame_interval();
    let interval_ns = interval.as_nanos() as u64;
    let loop_name = format!("sim-{}", device);

    let mut next_deadline = Instant::now() + interval;
    let mut tick: u64 = 0;
    let mut delivered: u64 = 0;

    DeliveryLoop::spawn(&loop_name, move || {
        if sink.is_closed() {
            return DeliveryAction::Stop;
        }

        // Hold the mode cadence
        let now = Instant::now();
        if next_deadline > now {
            thread::sleep(next_deadline - now);
        }
        next_deadline += interval;

        let pts_ns = tick * interval_ns;
        tick += 1;

        if let Some(limit) = options.fail_after_frames
            && delivered >= limit
        {
            sink.report_fault(CaptureError::HardwareError(
                "simulated capture fault".into(),
            ));
            return DeliveryAction::Stop;
        }

        if let Some(cycle) = options.signal_loss_cycle
            && tick % cycle == 0
        {
            sink.mark_no_signal();
            return DeliveryAction::Continue;
        }

        let mut buffer = sink.acquire_buffer();
        pattern::fill_frame(options.pattern, &mode, buffer.as_mut_slice(), tick - 1);
        sink.deliver(buffer, pts_ns);
        delivered += 1;

        DeliveryAction::Continue
    })
}

/// A running simulated delivery
struct SimulatorStream {
    delivery: DeliveryLoop,
    claim: Option<DeviceClaim>,
}

impl DeviceStream for SimulatorStream {
    fn stop(&mut self, grace: Duration) {
        self.delivery.stop_within(grace);
        // Release the device as soon as delivery is down
        if self.claim.take().is_some() {
            debug!("Simulated device released");
        }
    }
}
