//! Common types and constants used in the library.

pub const KB: usize = 1 << 10;
pub const MB: usize = KB << 10;

/// Capacity of the emulated serial flash.
pub const FLASH_SIZE: usize = 16 * MB;

/// Addresses the flash protocol can express.
pub const FLASH_ADDRESS_MASK: u32 = 0x00FF_FFFF;

/// Wishbone word address to byte address (32 bit data, 8 bit granularity).
pub const BUS_GRANULARITY_SHIFT: u32 = 2;

/// Upper bound on evaluate rounds before a half step is committed anyway.
pub const MAX_SETTLE_ITERATIONS: usize = 64;
