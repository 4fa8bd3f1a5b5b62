// SPDX-License-Identifier: GPL-3.0-only

//! Delivery-side frame intake shared with the backend thread
//!
//! The backend's delivery thread (or hardware callback) does exactly four
//! things per frame: acquire a pooled buffer, fill it, stamp it, and hand it
//! to [`FrameSink::deliver`]. Everything here is non-blocking; a slow
//! consumer costs evicted frames, never a stalled delivery thread.
//!
//! The sink also carries the closed flag that makes a close racing an
//! in-flight delivery safe: deliveries observing the flag quietly recycle
//! their buffer and do nothing else.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use tracing::{debug, warn};

use crate::capture::pool::{FramePool, PooledBuffer};
use crate::capture::queue::FrameQueue;
use crate::capture::types::{CaptureStats, CapturedFrame, SignalMode};
use crate::constants::timing;
use crate::errors::CaptureError;

/// Frame intake for one capture session
pub struct FrameSink {
    mode: SignalMode,
    queue: FrameQueue,
    pool: FramePool,
    closed: AtomicBool,
    next_sequence: AtomicU64,
    delivered: AtomicU64,
    no_signal: AtomicU64,
    fault: Mutex<Option<CaptureError>>,
}

impl FrameSink {
    pub fn new(mode: SignalMode, queue_capacity: usize, pool_retention: usize) -> Self {
        Self {
            mode,
            queue: FrameQueue::new(queue_capacity),
            pool: FramePool::new(mode.frame_bytes(), pool_retention),
            closed: AtomicBool::new(false),
            next_sequence: AtomicU64::new(1),
            delivered: AtomicU64::new(0),
            no_signal: AtomicU64::new(0),
            fault: Mutex::new(None),
        }
    }

    /// The signal mode every delivered frame must match
    pub fn mode(&self) -> SignalMode {
        self.mode
    }

    /// Borrow a frame-sized buffer from the session pool
    pub fn acquire_buffer(&self) -> PooledBuffer {
        self.pool.acquire()
    }

    /// Stamp and queue a filled buffer
    ///
    /// Assigns the next sequence number, records the arrival time, and
    /// pushes to the bounded queue. `pts_ns` is the backend's hardware
    /// clock reading, nanoseconds from stream start. After a close this is
    /// a no-op and the buffer recycles.
    pub fn deliver(&self, buffer: PooledBuffer, pts_ns: u64) {
        let frame_start = Instant::now();
        if self.closed.load(Ordering::SeqCst) {
            return;
        }

        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let evicted = self.queue.push(CapturedFrame {
            mode: self.mode,
            buffer,
            sequence,
            pts_ns,
            captured_at: frame_start,
        });
        self.delivered.fetch_add(1, Ordering::Relaxed);

        if evicted && sequence % timing::FRAME_LOG_INTERVAL == 0 {
            debug!(
                frame = sequence,
                dropped = self.queue.dropped(),
                "Frame dropped (queue full)"
            );
        }
    }

    /// Record a delivery skipped because the input carried no signal
    ///
    /// No-signal frames take no sequence number and never reach the queue.
    pub fn mark_no_signal(&self) {
        let skipped = self.no_signal.fetch_add(1, Ordering::Relaxed) + 1;
        if skipped % timing::FRAME_LOG_INTERVAL == 1 {
            debug!(skipped, "No input signal, frame skipped");
        }
    }

    /// Take the oldest queued frame, if any
    pub fn poll_frame(&self) -> Option<CapturedFrame> {
        self.queue.pop()
    }

    /// Stop accepting deliveries; idempotent
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Report an unrecoverable backend fault; the first one wins
    ///
    /// Also closes the sink so delivery stops immediately.
    pub fn report_fault(&self, error: CaptureError) {
        let mut fault = self.fault.lock().unwrap();
        if fault.is_none() {
            warn!(%error, "Capture fault reported, stopping delivery");
            *fault = Some(error);
        }
        drop(fault);
        self.close();
    }

    /// The recorded fault, if delivery has failed mid-stream
    pub fn fault(&self) -> Option<CaptureError> {
        self.fault.lock().unwrap().clone()
    }

    /// Release every queued frame back to the pool
    pub fn clear_queue(&self) {
        self.queue.clear();
    }

    pub fn stats(&self) -> CaptureStats {
        let delivered = self.delivered.load(Ordering::Relaxed);
        CaptureStats {
            delivered,
            dropped: self.queue.dropped(),
            no_signal: self.no_signal.load(Ordering::Relaxed),
            last_sequence: (delivered > 0).then(|| self.next_sequence.load(Ordering::Relaxed) - 1),
            queue_depth: self.queue.len(),
        }
    }
}

impl std::fmt::Debug for FrameSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSink")
            .field("mode", &self.mode.shorthand())
            .field("closed", &self.is_closed())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::types::Framerate;

    fn sink() -> FrameSink {
        let mode = SignalMode::progressive(8, 2, Framerate::from_int(30));
        FrameSink::new(mode, 3, 8)
    }

    fn deliver_one(sink: &FrameSink, pts_ns: u64) {
        let buffer = sink.acquire_buffer();
        sink.deliver(buffer, pts_ns);
    }

    #[test]
    fn sequences_are_strictly_increasing_from_one() {
        let sink = sink();
        for i in 0..3 {
            deliver_one(&sink, i * 1_000);
        }

        let seqs: Vec<u64> = std::iter::from_fn(|| sink.poll_frame())
            .map(|f| f.sequence)
            .collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(sink.stats().last_sequence, Some(3));
    }

    #[test]
    fn consumer_gap_equals_drop_counter_delta() {
        let sink = sink();

        // Ten deliveries into a 3-deep queue with no consumer
        for i in 0..10 {
            deliver_one(&sink, i);
        }

        let consumed: Vec<u64> = std::iter::from_fn(|| sink.poll_frame())
            .map(|f| f.sequence)
            .collect();
        assert_eq!(consumed, vec![8, 9, 10]);

        let stats = sink.stats();
        assert_eq!(stats.delivered, 10);
        assert_eq!(stats.dropped, 7);

        // Sequence span minus frames seen equals frames dropped
        let span = *consumed.last().unwrap();
        assert_eq!(span - consumed.len() as u64, stats.dropped);
    }

    #[test]
    fn delivery_after_close_is_a_noop() {
        let sink = sink();
        deliver_one(&sink, 0);
        sink.close();
        deliver_one(&sink, 1);

        let stats = sink.stats();
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.last_sequence, Some(1));
        assert!(sink.poll_frame().is_some());
        assert!(sink.poll_frame().is_none());
    }

    #[test]
    fn no_signal_frames_take_no_sequence_number() {
        let sink = sink();
        deliver_one(&sink, 0);
        sink.mark_no_signal();
        sink.mark_no_signal();
        deliver_one(&sink, 1);

        let stats = sink.stats();
        assert_eq!(stats.no_signal, 2);
        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.last_sequence, Some(2));
    }

    #[test]
    fn first_fault_wins_and_closes_the_sink() {
        let sink = sink();
        sink.report_fault(CaptureError::HardwareError("link lost".into()));
        sink.report_fault(CaptureError::HardwareError("second fault".into()));

        assert!(sink.is_closed());
        assert_eq!(
            sink.fault(),
            Some(CaptureError::HardwareError("link lost".into()))
        );
    }
}
