// SPDX-License-Identifier: GPL-3.0-only

//! Crate-wide constants

use std::time::Duration;

/// Frame queue constants
pub mod queue {
    /// Default bounded queue depth between the delivery thread and the
    /// consumer. Small on purpose: a deep queue only adds latency for a
    /// live signal, and anything the consumer cannot keep up with is
    /// dropped oldest-first anyway.
    pub const DEFAULT_CAPACITY: usize = 3;
}

/// Frame buffer pool constants
pub mod pool {
    /// Buffers retained for reuse once released. Queue depth plus one
    /// in-flight on the delivery side, one at the consumer, and slack for
    /// frames dropped while still owned downstream.
    pub const DEFAULT_RETENTION: usize = 8;
}

/// Timing constants
pub mod timing {
    use super::Duration;

    /// Bounded wait for the delivery thread to acknowledge a close before
    /// queued buffers are force-released. Two NTSC frame times above the
    /// slowest supported mode (23.98 fps ≈ 41.7 ms).
    pub const CLOSE_GRACE: Duration = Duration::from_millis(200);

    /// Frame counter modulo for periodic delivery-side logging; once a
    /// second at 60 fps
    pub const FRAME_LOG_INTERVAL: u64 = 60;

    /// How often the CLI capture loop prints session stats
    pub const STATS_PRINT_INTERVAL: Duration = Duration::from_secs(1);

    /// Poll sleep in the CLI capture loop between ticks
    pub const TICK_INTERVAL: Duration = Duration::from_millis(4);
}

/// Simulator backend defaults
pub mod simulator {
    /// Virtual cards exposed when no explicit count is configured
    pub const DEFAULT_DEVICE_COUNT: usize = 2;

    /// Display-name prefix for virtual cards
    pub const DEVICE_NAME_PREFIX: &str = "DeckLink Sim";
}

/// Source URL constants
pub mod url {
    /// Scheme prefix accepted by the media source facade
    pub const SDI_SCHEME: &str = "sdi://";

    /// Host component addressing a capture device by ordinal
    pub const DEVICE_HOST: &str = "device";
}
