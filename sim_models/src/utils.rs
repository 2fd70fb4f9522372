//! Bit helpers shared by the signal types.

use num_traits::{AsPrimitive, PrimInt};

/// All ones in the lowest `width` bits.
pub const fn mask(width: u32) -> u64 {
    match 1u64.checked_shl(width) {
        Some(v) => v - 1,
        None => u64::MAX,
    }
}

pub fn extract_bit<T>(bits: T, bit: u32) -> T
where
    T: PrimInt + AsPrimitive<u64>,
    u64: AsPrimitive<T>,
{
    extract_bits(bits, bit..=bit)
}

pub fn extract_bits<T>(bits: T, range: std::ops::RangeInclusive<u32>) -> T
where
    T: PrimInt + AsPrimitive<u64>,
    u64: AsPrimitive<T>,
{
    let lsb = *range.start();
    let msb = *range.end();
    let bits: u64 = bits.as_();

    let result = (bits & mask(msb + 1)) >> lsb;

    result.as_()
}
