//! Growable byte buffer
//!
//! Backs the binary upload field and response assembly. Capacity grows by
//! 3/2 of the larger of the current capacity and the required size, so the
//! copy cost stays amortised O(1) per appended byte.

use std::collections::TryReserveError;

/// Byte buffer with a geometric growth policy.
///
/// `capacity()` is the logical capacity chosen by the growth policy and
/// `len()` the number of bytes written. `len() <= capacity()` always holds.
#[derive(Debug, Default)]
pub struct GrowBuf {
    data: Vec<u8>,
    capacity: usize,
}

impl GrowBuf {
    /// Creates an empty buffer without allocating.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)?;
        Ok(Self { data, capacity })
    }

    /// Number of bytes written.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Logical capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Makes room for `extra` more bytes.
    ///
    /// When `len + extra` exceeds the capacity, the new capacity is
    /// `max(capacity, len + extra) * 3 / 2 + 1`. Written bytes are kept.
    pub fn ensure(&mut self, extra: usize) -> Result<(), TryReserveError> {
        let need = self.data.len() + extra;
        if need <= self.capacity {
            return Ok(());
        }
        let grown = self.capacity.max(need) * 3 / 2 + 1;
        self.data.try_reserve_exact(grown - self.data.len())?;
        self.capacity = grown;
        Ok(())
    }

    /// Appends `bytes` after the written region.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), TryReserveError> {
        self.ensure(bytes.len())?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Inserts `header` in front of the written bytes.
    ///
    /// The body is moved forward in one block and the header copied into the
    /// freed prefix.
    pub fn prepend(&mut self, header: &[u8]) -> Result<(), TryReserveError> {
        self.ensure(header.len())?;
        let body_len = self.data.len();
        self.data.resize(body_len + header.len(), 0);
        self.data.copy_within(0..body_len, header.len());
        self.data[..header.len()].copy_from_slice(header);
        Ok(())
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}
