//! Edge detection over a single sampled level.
//!
//! The history only advances on [`EdgeDetector::commit`], so every evaluation
//! of the same half step observes the same transition, and the transition is
//! gone once the half step is committed.

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EdgeDetector {
    prev: bool,
    curr: bool,
}

impl EdgeDetector {
    pub const fn new(level: bool) -> Self {
        Self {
            prev: level,
            curr: level,
        }
    }

    /// Record the level seen on entry to the current evaluation.
    pub fn sample(&mut self, level: bool) {
        self.curr = level;
    }

    pub fn level(&self) -> bool {
        self.curr
    }

    pub fn rising(&self) -> bool {
        !self.prev && self.curr
    }

    pub fn falling(&self) -> bool {
        self.prev && !self.curr
    }

    /// Accept the current sample as history. Returns whether it was an edge.
    pub fn commit(&mut self) -> bool {
        let edge = self.prev != self.curr;
        self.prev = self.curr;
        edge
    }

    /// Forget any pending transition, e.g. at power on.
    pub fn reset(&mut self, level: bool) {
        *self = Self::new(level);
    }
}
