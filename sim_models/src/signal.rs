/**
 * @file signal.rs
 * @date 19/10/2026
 * @brief Bit-vector values and model-driven wires
 */
use crate::utils::{extract_bit, extract_bits, mask};
use num_traits::AsPrimitive;
use std::fmt;

/// A fixed width bit-vector, up to 64 bits wide.
///
/// Bits above the width are always zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Value {
    width: u32,
    bits: u64,
}

impl Value {
    pub const MAX_WIDTH: u32 = 64;

    pub const fn new(width: u32) -> Self {
        assert!(width <= Self::MAX_WIDTH);
        Self { width, bits: 0 }
    }

    pub const fn from_u64(width: u32, value: u64) -> Self {
        assert!(width <= Self::MAX_WIDTH);
        Self {
            width,
            bits: value & mask(width),
        }
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub fn bit(&self, index: u32) -> bool {
        assert!(index < self.width, "bit {index} of a {} bit value", self.width);
        extract_bit(self.bits, index) == 1
    }

    pub fn set_bit(&mut self, index: u32, value: bool) {
        assert!(index < self.width, "bit {index} of a {} bit value", self.width);
        if value {
            self.bits |= 1u64 << index;
        } else {
            self.bits &= !(1u64 << index);
        }
    }

    /// Unsigned value of `range`, as a plain integer.
    pub fn slice(&self, range: std::ops::RangeInclusive<u32>) -> u64 {
        assert!(*range.end() < self.width);
        extract_bits(self.bits, range)
    }

    /// Extract the value as an unsigned integer, truncating to `T`.
    pub fn get<T>(&self) -> T
    where
        T: Copy + 'static,
        u64: AsPrimitive<T>,
    {
        self.bits.as_()
    }

    /// Replace the value; bits above the width are dropped.
    pub fn set(&mut self, value: impl Into<u64>) {
        self.bits = value.into() & mask(self.width);
    }

    pub fn is_zero(&self) -> bool {
        self.bits == 0
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}'h{:x}", self.width, self.bits)
    }
}

/// An output driven by a model.
///
/// Evaluation writes the pending value, the circuit only ever observes the
/// committed one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Wire {
    curr: Value,
    next: Value,
}

impl Wire {
    pub const fn new(width: u32) -> Self {
        Self {
            curr: Value::new(width),
            next: Value::new(width),
        }
    }

    /// The committed value, visible to the circuit.
    pub fn curr(&self) -> &Value {
        &self.curr
    }

    /// The value that takes effect on the next commit.
    pub fn next(&self) -> &Value {
        &self.next
    }

    /// Set the pending value. Returns whether it differs from the pending
    /// value of the previous evaluation.
    pub fn drive(&mut self, value: impl Into<u64>) -> bool {
        let last = self.next;
        self.next.set(value);
        last != self.next
    }

    /// Keep the committed value for the next half step.
    pub fn hold(&mut self) -> bool {
        let last = self.next;
        self.next = self.curr;
        last != self.next
    }

    pub fn is_changing(&self) -> bool {
        self.curr != self.next
    }

    pub fn commit(&mut self) -> bool {
        let changed = self.is_changing();
        self.curr = self.next;
        changed
    }

    pub fn reset(&mut self) {
        let width = self.curr.width();
        *self = Self::new(width);
    }
}
