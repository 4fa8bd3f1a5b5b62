// SPDX-License-Identifier: GPL-3.0-only

//! Recycling pool for frame-sized pixel buffers
//!
//! Capture delivers a full frame every 16-40 ms; allocating each one fresh
//! churns the allocator at video rate. The pool keeps a bounded free list of
//! released buffers and hands them back out on the next acquire. A
//! [`PooledBuffer`] is owned by exactly one holder at a time and returns to
//! the pool when dropped.

use std::sync::{Arc, Mutex, Weak};

/// Shared recycle list for fixed-size pixel buffers
///
/// Cloning is cheap; clones share the same free list.
#[derive(Clone)]
pub struct FramePool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    free: Mutex<Vec<Vec<u8>>>,
    buffer_len: usize,
    retention: usize,
}

impl FramePool {
    /// Create a pool handing out buffers of `buffer_len` bytes, retaining at
    /// most `retention` released buffers for reuse
    pub fn new(buffer_len: usize, retention: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                free: Mutex::new(Vec::with_capacity(retention)),
                buffer_len,
                retention,
            }),
        }
    }

    /// Take a buffer from the free list, or allocate when the list is empty
    ///
    /// Never blocks beyond the free-list lock and never fails.
    pub fn acquire(&self) -> PooledBuffer {
        let recycled = self.inner.free.lock().unwrap().pop();
        let data = recycled.unwrap_or_else(|| vec![0u8; self.inner.buffer_len]);
        PooledBuffer {
            data: Some(data),
            pool: Arc::downgrade(&self.inner),
        }
    }

    /// Size of every buffer this pool hands out
    pub fn buffer_len(&self) -> usize {
        self.inner.buffer_len
    }

    /// Buffers currently waiting on the free list
    pub fn free_count(&self) -> usize {
        self.inner.free.lock().unwrap().len()
    }
}

impl std::fmt::Debug for FramePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FramePool({} bytes, {} free)",
            self.inner.buffer_len,
            self.free_count()
        )
    }
}

/// A pixel buffer on loan from a [`FramePool`]
///
/// Dropping it returns the allocation to the pool's free list; once the
/// retention bound is reached, further returns are plain deallocations. A
/// buffer outliving its pool deallocates normally.
pub struct PooledBuffer {
    data: Option<Vec<u8>>,
    pool: Weak<PoolInner>,
}

impl PooledBuffer {
    pub fn as_slice(&self) -> &[u8] {
        self.data.as_deref().unwrap_or(&[])
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.data.as_deref_mut().unwrap_or(&mut [])
    }

    pub fn len(&self) -> usize {
        self.data.as_ref().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let Some(data) = self.data.take() else {
            return;
        };
        if let Some(pool) = self.pool.upgrade()
            && let Ok(mut free) = pool.free.lock()
            && free.len() < pool.retention
            && data.len() == pool.buffer_len
        {
            free.push(data);
        }
    }
}

impl std::fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PooledBuffer({} bytes)", self.len())
    }
}

impl AsRef<[u8]> for PooledBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}
