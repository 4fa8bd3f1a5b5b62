// SPDX-License-Identifier: GPL-3.0-only

//! Bounded drop-oldest queue between the delivery thread and the consumer
//!
//! The queue is the only point where the two threads meet. Push never waits
//! for space: when the consumer falls behind, the oldest queued frame is
//! evicted and counted, so a stalled consumer always finds the newest frames
//! waiting rather than a stale backlog. The lock is held only for the deque
//! operation itself.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::capture::types::CapturedFrame;

/// Bounded FIFO of captured frames with drop-oldest overflow
pub struct FrameQueue {
    frames: Mutex<VecDeque<CapturedFrame>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl FrameQueue {
    /// Create a queue holding at most `capacity` frames (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Append a frame, evicting the oldest when full
    ///
    /// Returns true when an eviction happened. The evicted frame's buffer
    /// recycles into the session pool as it drops here.
    pub fn push(&self, frame: CapturedFrame) -> bool {
        let evicted = {
            let mut frames = self.frames.lock().unwrap();
            let evicted = if frames.len() == self.capacity {
                frames.pop_front()
            } else {
                None
            };
            frames.push_back(frame);
            evicted
        };
        if evicted.is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Take the oldest queued frame; never waits for one to arrive
    pub fn pop(&self) -> Option<CapturedFrame> {
        self.frames.lock().unwrap().pop_front()
    }

    /// Release every queued frame back to the pool
    pub fn clear(&self) {
        self.frames.lock().unwrap().clear();
    }

    /// Frames currently queued
    pub fn len(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total frames evicted since the queue was created; monotonic
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FrameQueue({}/{}, {} dropped)",
            self.len(),
            self.capacity,
            self.dropped()
        )
    }
}
