//! The decoded output and the sliding window that back references read from.

use alloc::vec::Vec;

use crate::error::{DecodeError, Result, StreamError, bail};

/// Decoded bytes, of which the most recent ones double as the sliding window.
#[derive(Debug, Clone, Default)]
pub(crate) struct OutputWindow {
    buf: Vec<u8>,
    /// Bytes that were dropped from the front of `buf`.
    dropped: usize,
    /// Start of the bytes in `buf` that were not handed out yet.
    pending: usize,
    /// How far back references may reach, once the window size is known.
    max_distance: usize,
    limit: Option<usize>,
}

impl OutputWindow {
    pub(crate) fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub(crate) fn set_window_bits(&mut self, window_bits: u8) {
        self.max_distance = (1 << window_bits) - 16;
    }

    /// The total number of bytes produced.
    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.dropped + self.buf.len()
    }

    /// The largest distance that refers to earlier output rather than to the
    /// static dictionary.
    #[inline(always)]
    pub(crate) fn max_distance(&self) -> usize {
        self.max_distance.min(self.len())
    }

    /// The last byte and the byte before it, or zero where there is none.
    #[inline(always)]
    pub(crate) fn last_two(&self) -> (u8, u8) {
        match self.buf.as_slice() {
            [.., p2, p1] => (*p1, *p2),
            [p1] => (*p1, 0),
            [] => (0, 0),
        }
    }

    fn reserve(&mut self, additional: usize) -> Result<()> {
        if let Some(limit) = self.limit {
            if self.len() + additional > limit {
                bail!(DecodeError::OutputLimit);
            }
        }

        self.buf.reserve(additional);

        Ok(())
    }

    #[inline(always)]
    pub(crate) fn push(&mut self, byte: u8) -> Result<()> {
        self.reserve(1)?;
        self.buf.push(byte);

        Ok(())
    }

    pub(crate) fn extend(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve(bytes.len())?;
        self.buf.extend_from_slice(bytes);

        Ok(())
    }

    /// Append `len` bytes copied from `distance` bytes back. The source may
    /// overlap the bytes being written, which repeats the last `distance`
    /// bytes.
    pub(crate) fn copy(&mut self, distance: usize, len: usize) -> Result<()> {
        if distance == 0 || distance > self.buf.len() {
            bail!(StreamError::InvalidDistance);
        }

        self.reserve(len)?;

        let start = self.buf.len() - distance;

        if distance >= len {
            self.buf.extend_from_within(start..start + len);
        } else {
            for i in start..start + len {
                let byte = self.buf[i];
                self.buf.push(byte);
            }
        }

        Ok(())
    }

    /// The bytes that were produced but not taken yet.
    pub(crate) fn pending(&self) -> &[u8] {
        &self.buf[self.pending..]
    }

    /// Hand out the pending bytes, keeping only as much history as back
    /// references can still reach.
    pub(crate) fn take(&mut self) -> Vec<u8> {
        let taken = self.buf[self.pending..].to_vec();
        self.pending = self.buf.len();

        // Compact only once the stale prefix outgrows the window.
        let excess = self.buf.len().saturating_sub(self.max_distance);

        if excess > self.max_distance.max(1 << 16) {
            self.buf.drain(..excess);
            self.dropped += excess;
            self.pending -= excess;
        }

        taken
    }

    pub(crate) fn into_pending(mut self) -> Vec<u8> {
        self.buf.drain(..self.pending);

        self.buf
    }
}
