use crate::{ModelError, Result};
use std::ops::Deref;

/// Byte array backing an emulated memory chip.
///
/// The capacity is fixed at construction. Reads wrap around the capacity the
/// way a chip ignores address bits above its size.
#[derive(Clone)]
pub struct FlashMemory {
    data: Vec<u8>,
}

impl Deref for FlashMemory {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl FlashMemory {
    /// Erased memory, reading back as `0xFF` like a blank NOR chip.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);

        Self {
            data: vec![0xFF; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Fold `address` into the array.
    pub fn wrap(&self, address: u32) -> u32 {
        (address as u64 % self.data.len() as u64) as u32
    }

    pub fn read_u8(&self, address: u32) -> u8 {
        self.data[self.wrap(address) as usize]
    }

    /// Copy `bytes` to `offset`, dropping whatever does not fit. Returns the
    /// number of bytes written.
    pub fn write_slice(&mut self, offset: usize, bytes: &[u8]) -> Result<usize> {
        if offset >= self.data.len() {
            return Err(ModelError::OutOfRange {
                offset,
                capacity: self.data.len(),
            });
        }

        let len = bytes.len().min(self.data.len() - offset);
        if len < bytes.len() {
            log::warn!(
                "Image truncated: {} of {} bytes fit at offset {:#X}",
                len,
                bytes.len(),
                offset
            );
        }

        self.data[offset..offset + len].copy_from_slice(&bytes[..len]);
        Ok(len)
    }
}
