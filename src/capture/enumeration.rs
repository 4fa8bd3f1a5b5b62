// SPDX-License-Identifier: GPL-3.0-only

//! Device discovery over a capture backend
//!
//! Enumeration is a point-in-time snapshot. Hot-plug is handled by
//! enumerating again; callers hold on to [`DeviceId`]s, never to list
//! positions, so a reshuffled result cannot redirect an open to the
//! wrong card.

use std::sync::Arc;

use tracing::debug;

use crate::backends::CaptureBackend;
use crate::capture::types::{DeviceDescriptor, DeviceId};
use crate::errors::{CaptureError, CaptureResult};

pub struct DeviceEnumerator {
    backend: Arc<dyn CaptureBackend>,
}

impl DeviceEnumerator {
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// List the devices the backend can currently see
    pub fn enumerate(&self) -> CaptureResult<Vec<DeviceDescriptor>> {
        let devices = self.backend.enumerate()?;
        debug!(
            backend = self.backend.name(),
            count = devices.len(),
            "Enumerated capture devices"
        );
        Ok(devices)
    }

    /// Resolve a device by its stable identifier
    pub fn find(&self, id: &DeviceId) -> CaptureResult<DeviceDescriptor> {
        self.enumerate()?
            .into_iter()
            .find(|d| &d.id == id)
            .ok_or_else(|| CaptureError::DeviceNotFound(id.clone()))
    }

    /// Resolve a device by its 1-based position in the current enumeration
    ///
    /// Positions are a convenience for URLs and CLI flags; they are only
    /// meaningful against the enumeration pass that produced them.
    pub fn by_ordinal(&self, ordinal: usize) -> CaptureResult<DeviceDescriptor> {
        let devices = self.enumerate()?;
        ordinal
            .checked_sub(1)
            .and_then(|index| devices.get(index).cloned())
            .ok_or_else(|| {
                CaptureError::DeviceNotFound(DeviceId::new(
                    self.backend.name(),
                    ordinal.saturating_sub(1) as u32,
                ))
            })
    }
}

impl std::fmt::Debug for DeviceEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeviceEnumerator({})", self.backend.name())
    }
}
