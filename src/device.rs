//! Shared in-memory device.
//!
//! A fixed-capacity, append-only byte buffer shared by every connection:
//! - Appends copy data at the write cursor and keep a NUL terminator after it
//! - Reads copy a range out so no lock is held while the caller sends it
//! - A reset zeroes the buffer and rewinds the cursor
//!
//! Every operation takes the single mutex for its whole duration, so all
//! operations are totally ordered and no partial append is ever observable.

use bytes::Bytes;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, trace};

/// Device operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// Append would leave no room for the trailing terminator
    Overflow,
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceError::Overflow => write!(f, "overflow"),
        }
    }
}

impl std::error::Error for DeviceError {}

/// Point-in-time view used by STATUS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSnapshot {
    /// End of valid data
    pub cursor: usize,
    /// Length of the NUL-terminated run starting at offset 0
    pub content_len: usize,
}

struct DeviceInner {
    bytes: Vec<u8>,
    cursor: usize,
}

/// Thread-safe shared byte device
pub struct Device {
    inner: Mutex<DeviceInner>,
    capacity: usize,
}

impl Device {
    /// Create a zero-filled device with the given capacity
    pub fn new(capacity: usize) -> Arc<Self> {
        info!(capacity, "Initializing device");
        Arc::new(Self {
            inner: Mutex::new(DeviceInner {
                bytes: vec![0; capacity],
                cursor: 0,
            }),
            capacity,
        })
    }

    // A panic while holding the lock cannot leave the buffer half-written:
    // every mutation is a bounds-checked copy followed by a cursor store.
    fn lock(&self) -> MutexGuard<'_, DeviceInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current write cursor
    pub fn cursor(&self) -> usize {
        self.lock().cursor
    }

    /// Append data at the cursor, returning the new cursor.
    ///
    /// Rejects the append when `cursor + data.len() >= capacity`, so at least
    /// one byte always remains after the data for the terminator.
    pub fn append(&self, data: &[u8]) -> Result<usize, DeviceError> {
        let mut inner = self.lock();
        let start = inner.cursor;
        let end = match start.checked_add(data.len()) {
            Some(end) if end < self.capacity => end,
            _ => {
                trace!(cursor = start, len = data.len(), "Append rejected");
                return Err(DeviceError::Overflow);
            }
        };

        inner.bytes[start..end].copy_from_slice(data);
        inner.bytes[end] = 0;
        inner.cursor = end;

        trace!(from = start, to = end, "Appended");
        Ok(end)
    }

    /// Copy out `bytes[position..cursor]`, empty when position is at or past the cursor
    pub fn read_from(&self, position: usize) -> Bytes {
        let inner = self.lock();
        if position >= inner.cursor {
            return Bytes::new();
        }
        Bytes::copy_from_slice(&inner.bytes[position..inner.cursor])
    }

    /// Zero the buffer and rewind the cursor
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.bytes.fill(0);
        inner.cursor = 0;
        trace!("Device reset");
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        let inner = self.lock();
        let content_len = inner
            .bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(inner.bytes.len());
        DeviceSnapshot {
            cursor: inner.cursor,
            content_len,
        }
    }
}
