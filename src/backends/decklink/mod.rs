// SPDX-License-Identifier: GPL-3.0-only

//! Blackmagic DeckLink capture backend
//!
//! Talks to real hardware through the `decklink_capture` shim library
//! (link wiring in `build.rs`). Built only with the `decklink` feature on
//! Linux; every other configuration sees `HardwareUnavailable` from the
//! backend factory. The delivery thread polls the shim and copies each
//! completed frame into a pooled buffer before the shim reclaims the
//! frame memory.

mod ffi;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::backends::delivery::{DeliveryAction, DeliveryLoop};
use crate::backends::{CaptureBackend, DeviceClaim, DeviceClaims, DeviceStream};
use crate::capture::sink::FrameSink;
use crate::capture::types::{
    DeviceDescriptor, DeviceId, PixelEncoding, STANDARD_MODES, SignalMode,
};
use crate::errors::{CaptureError, CaptureResult};

use ffi::{CaptureHandle, OpenRefused, Polled};

/// Pause between polls when the shim has nothing new
const POLL_INTERVAL: Duration = Duration::from_millis(1);

pub struct DeckLinkBackend {
    claims: Arc<DeviceClaims>,
}

impl DeckLinkBackend {
    pub fn new() -> Self {
        Self {
            claims: DeviceClaims::new(),
        }
    }
}

impl Default for DeckLinkBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for DeckLinkBackend {
    fn name(&self) -> &'static str {
        "decklink"
    }

    fn probe(&self) -> CaptureResult<()> {
        if ffi::driver_present() {
            Ok(())
        } else {
            Err(CaptureError::HardwareUnavailable(
                "the Desktop Video driver is not reachable".into(),
            ))
        }
    }

    fn enumerate(&self) -> CaptureResult<Vec<DeviceDescriptor>> {
        let devices = (0..ffi::device_count())
            .map(|index| {
                let display_name = ffi::device_name(index as u32)
                    .unwrap_or_else(|| format!("DeckLink {}", index + 1));
                DeviceDescriptor {
                    id: DeviceId::new(self.name(), index as u32),
                    display_name,
                    backend: self.name().to_string(),
                    modes: STANDARD_MODES.to_vec(),
                    encodings: vec![PixelEncoding::Uyvy8, PixelEncoding::Yuv10],
                    supports_format_detection: true,
                }
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
        let index = device
            .sub_device()
            .ok_or_else(|| CaptureError::DeviceNotFound(device.clone()))?;
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

        let handle = CaptureHandle::open(index, mode).map_err(|refused| match refused {
            OpenRefused::NotFound => CaptureError::DeviceNotFound(device.clone()),
            OpenRefused::Busy => CaptureError::DeviceBusy(device.clone()),
            OpenRefused::ModeRejected => CaptureError::ModeUnsupported {
                device: device.clone(),
                mode: mode.to_string(),
            },
            OpenRefused::Failed(status) => {
                CaptureError::HardwareError(format!("open failed with shim status {}", status))
            }
        })?;

        info!(device = %device, mode = %mode, "Starting DeckLink capture");
        let delivery = spawn_copier(device, *mode, handle, sink);

        Ok(Box::new(DeckLinkStream {
            delivery,
            claim: Some(claim),
        }))
    }
}

/// Spawn the delivery thread that polls the shim and feeds the sink
fn spawn_copier(
    device: &DeviceId,
    mode: SignalMode,
    mut handle: CaptureHandle,
    sink: Arc<FrameSink>,
) -> DeliveryLoop {
    let loop_name = format!("decklink-{}", device);
    let mode_row = mode.row_bytes();
    let mut stream_epoch_ns: Option<u64> = None;

    DeliveryLoop::spawn(&loop_name, move || {
        if sink.is_closed() {
            handle.close();
            return DeliveryAction::Stop;
        }

        match handle.poll() {
            Ok(Polled::Frame(raw)) => {
                let src_row = raw.row_bytes as usize;
                if raw.width as u32 != mode.width
                    || raw.height as u32 != mode.height
                    || src_row < mode_row
                {
                    sink.report_fault(CaptureError::HardwareError(format!(
                        "frame geometry {}x{} ({} bytes/row) does not match {}",
                        raw.width, raw.height, src_row, mode
                    )));
                    handle.close();
                    return DeliveryAction::Stop;
                }

                // Presentation time counts from the first frame of the stream
                let epoch = *stream_epoch_ns.get_or_insert(raw.hardware_time_ns);
                let pts_ns = raw.hardware_time_ns.saturating_sub(epoch);

                // Shim memory is only valid until the next poll; copy rows
                // out now, dropping any driver row padding
                let src =
                    unsafe { std::slice::from_raw_parts(raw.data, src_row * raw.height as usize) };
                let mut buffer = sink.acquire_buffer();
                let rows = src
                    .chunks_exact(src_row)
                    .zip(buffer.as_mut_slice().chunks_exact_mut(mode_row));
                for (src_row, dst_row) in rows {
                    dst_row.copy_from_slice(&src_row[..mode_row]);
                }

                sink.deliver(buffer, pts_ns);
                DeliveryAction::Continue
            }
            Ok(Polled::NoSignal(_)) => {
                sink.mark_no_signal();
                DeliveryAction::Continue
            }
            Ok(Polled::Pending) => {
                thread::sleep(POLL_INTERVAL);
                DeliveryAction::Continue
            }
            Err(e) => {
                sink.report_fault(e);
                handle.close();
                DeliveryAction::Stop
            }
        }
    })
}

/// A running hardware capture
struct DeckLinkStream {
    delivery: DeliveryLoop,
    claim: Option<DeviceClaim>,
}

impl DeviceStream for DeckLinkStream {
    fn stop(&mut self, grace: Duration) {
        self.delivery.stop_within(grace);
        // The thread closes the shim capture on its way out
        if self.claim.take().is_some() {
            debug!("DeckLink device released");
        }
    }
}
