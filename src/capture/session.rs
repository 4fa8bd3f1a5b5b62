// SPDX-License-Identifier: GPL-3.0-only

//! Capture session lifecycle
//!
//! A session is the exclusive claim on one device: opening validates the
//! request, claims the hardware and starts delivery; the returned value
//! IS the claim. Consumers pull frames with [`CaptureSession::poll_frame`]
//! at their own pace while the delivery thread keeps the bounded queue
//! fresh. Closing (explicitly or by drop) refuses further frames, stops
//! delivery within a bounded grace and releases the device.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::backends::{CaptureBackend, DeviceStream};
use crate::capture::sink::FrameSink;
use crate::capture::types::{
    CaptureStats, CapturedFrame, DeviceId, SessionOptions, SessionState, SignalMode,
};
use crate::errors::{CaptureError, CaptureResult};

pub struct CaptureSession {
    device: DeviceId,
    mode: SignalMode,
    sink: Arc<FrameSink>,
    stream: Option<Box<dyn DeviceStream>>,
    close_grace: Duration,
}

impl CaptureSession {
    /// Open a device and start streaming
    ///
    /// `mode: None` negotiates the device's preferred mode. Requests are
    /// validated against the device's capabilities before the hardware is
    /// claimed, so a rejected open leaves the device free.
    pub fn open(
        backend: Arc<dyn CaptureBackend>,
        device: &DeviceId,
        mode: Option<SignalMode>,
        options: SessionOptions,
    ) -> CaptureResult<Self> {
        let descriptor = backend
            .enumerate()?
            .into_iter()
            .find(|d| &d.id == device)
            .ok_or_else(|| CaptureError::DeviceNotFound(device.clone()))?;

        let mode = match mode {
            Some(requested) => {
                if !descriptor.supports(&requested) {
                    return Err(CaptureError::ModeUnsupported {
                        device: device.clone(),
                        mode: requested.to_string(),
                    });
                }
                requested
            }
            None => descriptor
                .preferred_mode()
                .ok_or_else(|| CaptureError::ModeUnsupported {
                    device: device.clone(),
                    mode: "no modes offered".to_string(),
                })?,
        };

        info!(device = %device, mode = %mode, "Opening capture session");

        let sink = Arc::new(FrameSink::new(
            mode,
            options.queue_capacity,
            options.pool_retention,
        ));
        let stream = backend.open_stream(device, &mode, Arc::clone(&sink))?;

        Ok(Self {
            device: device.clone(),
            mode,
            sink,
            stream: Some(stream),
            close_grace: options.close_grace,
        })
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device
    }

    /// The negotiated signal mode frames arrive in
    pub fn mode(&self) -> SignalMode {
        self.mode
    }

    pub fn state(&self) -> SessionState {
        if self.stream.is_none() {
            SessionState::Closed
        } else if self.sink.fault().is_some() {
            SessionState::Error
        } else if self.sink.is_closed() {
            SessionState::Closing
        } else {
            SessionState::Streaming
        }
    }

    /// Take the oldest queued frame, if any
    ///
    /// Non-blocking; returns `None` when the consumer has caught up with
    /// delivery (or the input has no signal).
    pub fn poll_frame(&self) -> Option<CapturedFrame> {
        self.sink.poll_frame()
    }

    /// The fault that moved the session to [`SessionState::Error`], if any
    pub fn fault(&self) -> Option<CaptureError> {
        self.sink.fault()
    }

    pub fn stats(&self) -> CaptureStats {
        self.sink.stats()
    }

    /// Stop delivery and release the device
    ///
    /// Already-queued frames are discarded. Waits at most the configured
    /// close grace for the delivery side to acknowledge.
    pub fn close(mut self) {
        self.close_impl();
    }

    fn close_impl(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };

        // Refuse new frames before stopping so delivery cannot race the stop
        self.sink.close();
        stream.stop(self.close_grace);
        self.sink.clear_queue();

        let stats = self.sink.stats();
        info!(
            device = %self.device,
            delivered = stats.delivered,
            dropped = stats.dropped,
            no_signal = stats.no_signal,
            "Capture session closed"
        );
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.close_impl();
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CaptureSession({}, {}, {:?})",
            self.device,
            self.mode,
            self.state()
        )
    }
}
