// SPDX-License-Identifier: GPL-3.0-only

//! Tick-driven media source over one capture session
//!
//! [`MediaSource`] adapts the capture core to a host player: the host
//! opens a device (directly or through an `sdi://` URL), then calls
//! [`MediaSource::tick`] at its own cadence with a texture target to
//! fill. Live SDI has no timeline, so there is no seeking and the only
//! rates are paused and real time.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backends::CaptureBackend;
use crate::capture::enumeration::DeviceEnumerator;
use crate::capture::session::CaptureSession;
use crate::capture::types::{
    CaptureStats, DeviceDescriptor, DeviceId, SessionOptions, SignalMode,
};
use crate::constants::url::{DEVICE_HOST, SDI_SCHEME};
use crate::errors::{MediaError, MediaResult};
use crate::media::convert::convert_frame;
use crate::media::texture::TextureTarget;

/// Host-visible playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No device held
    Closed,
    /// Inside an open call, negotiating with the device
    Opening,
    /// Frames flow on tick
    Playing,
    /// Open, but tick consumes nothing (rate 0)
    Paused,
    /// The device faulted; close and reopen to recover
    Error,
}

/// Lifecycle notifications for the host, drained via [`MediaSource::poll_events`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    Opened,
    Closed,
    /// The incoming signal changed geometry or rate; resize targets
    FormatChanged(SignalMode),
    EnteredError,
}

/// What a tick rendered into the target
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo {
    pub sequence: u64,
    pub pts_ns: u64,
    pub mode: SignalMode,
}

pub struct MediaSource {
    backend: Arc<dyn CaptureBackend>,
    options: SessionOptions,
    session: Option<CaptureSession>,
    descriptor: Option<DeviceDescriptor>,
    video_format: Option<SignalMode>,
    rate: f64,
    entered_error: bool,
    events: VecDeque<MediaEvent>,
}

impl MediaSource {
    pub fn new(backend: Arc<dyn CaptureBackend>, options: SessionOptions) -> Self {
        Self {
            backend,
            options,
            session: None,
            descriptor: None,
            video_format: None,
            rate: 1.0,
            entered_error: false,
            events: VecDeque::new(),
        }
    }

    /// The backend this source opens devices on
    pub fn backend(&self) -> Arc<dyn CaptureBackend> {
        Arc::clone(&self.backend)
    }

    /// Open a device and start playing
    ///
    /// `mode: None` takes the device's preferred mode. An already-open
    /// source closes its current device first.
    pub fn open(&mut self, device: &DeviceId, mode: Option<SignalMode>) -> MediaResult<()> {
        if self.session.is_some() {
            self.close();
        }

        let enumerator = DeviceEnumerator::new(Arc::clone(&self.backend));
        let descriptor = enumerator.find(device)?;
        let session = CaptureSession::open(
            Arc::clone(&self.backend),
            device,
            mode,
            self.options.clone(),
        )?;

        info!(device = %device, mode = %session.mode(), "Media source opened");
        self.video_format = Some(session.mode());
        self.descriptor = Some(descriptor);
        self.session = Some(session);
        self.rate = 1.0;
        self.entered_error = false;
        self.events.push_back(MediaEvent::Opened);
        Ok(())
    }

    /// Open the Nth enumerated device from an `sdi://device/N` URL (1-based)
    pub fn open_url(&mut self, url: &str) -> MediaResult<()> {
        let ordinal = parse_device_url(url)?;
        let enumerator = DeviceEnumerator::new(Arc::clone(&self.backend));
        let descriptor = enumerator.by_ordinal(ordinal)?;
        self.open(&descriptor.id, None)
    }

    /// Release the device; safe in any state
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
            self.events.push_back(MediaEvent::Closed);
        }
        self.descriptor = None;
        self.video_format = None;
        self.rate = 1.0;
        self.entered_error = false;
    }

    /// Render at most one frame into the target
    ///
    /// Never blocks on hardware. `Ok(None)` means nothing new this tick:
    /// paused, no signal, or the consumer has caught up with delivery.
    pub fn tick(&mut self, target: &mut TextureTarget) -> MediaResult<Option<FrameInfo>> {
        let Some(session) = &self.session else {
            return Err(MediaError::NotOpen);
        };

        if let Some(fault) = session.fault() {
            if !self.entered_error {
                self.entered_error = true;
                self.events.push_back(MediaEvent::EnteredError);
                warn!(error = %fault, "Media source entered error state");
            }
            return Err(fault.into());
        }

        if self.rate == 0.0 {
            return Ok(None);
        }

        let Some(frame) = session.poll_frame() else {
            return Ok(None);
        };

        if self.video_format != Some(frame.mode) {
            debug!(mode = %frame.mode, "Video format changed");
            self.video_format = Some(frame.mode);
            self.events.push_back(MediaEvent::FormatChanged(frame.mode));
        }

        convert_frame(&frame, target)?;
        Ok(Some(FrameInfo {
            sequence: frame.sequence,
            pts_ns: frame.pts_ns,
            mode: frame.mode,
        }))
    }

    pub fn state(&self) -> PlaybackState {
        match &self.session {
            None => PlaybackState::Closed,
            Some(session) => {
                if self.entered_error || session.fault().is_some() {
                    PlaybackState::Error
                } else if self.rate == 0.0 {
                    PlaybackState::Paused
                } else {
                    PlaybackState::Playing
                }
            }
        }
    }

    /// Set the playback rate; live sources accept only 0.0 and 1.0
    ///
    /// Returns whether the rate was accepted.
    pub fn set_rate(&mut self, rate: f64) -> bool {
        if rate != 0.0 && rate != 1.0 {
            return false;
        }
        self.rate = rate;
        true
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn pause(&mut self) {
        self.set_rate(0.0);
    }

    pub fn resume(&mut self) {
        self.set_rate(1.0);
    }

    /// Modes the open device supports
    pub fn capabilities(&self) -> MediaResult<Vec<SignalMode>> {
        self.descriptor
            .as_ref()
            .map(|d| d.modes.clone())
            .ok_or(MediaError::NotOpen)
    }

    /// The format frames currently arrive in, for sizing texture targets
    pub fn video_format(&self) -> Option<SignalMode> {
        self.video_format
    }

    pub fn stats(&self) -> MediaResult<CaptureStats> {
        self.session
            .as_ref()
            .map(|s| s.stats())
            .ok_or(MediaError::NotOpen)
    }

    /// Drain pending lifecycle events in arrival order
    pub fn poll_events(&mut self) -> Vec<MediaEvent> {
        self.events.drain(..).collect()
    }
}

impl std::fmt::Debug for MediaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MediaSource({}, {:?})",
            self.backend.name(),
            self.state()
        )
    }
}

/// Parse `sdi://device/N` into the 1-based device ordinal
fn parse_device_url(url: &str) -> MediaResult<usize> {
    let rest = url
        .strip_prefix(SDI_SCHEME)
        .ok_or_else(|| MediaError::InvalidUrl(url.to_string()))?;

    let (host, ordinal) = rest
        .split_once('/')
        .ok_or_else(|| MediaError::InvalidUrl(url.to_string()))?;
    if host != DEVICE_HOST {
        return Err(MediaError::InvalidUrl(url.to_string()));
    }

    match ordinal.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(MediaError::InvalidUrl(url.to_string())),
    }
}
