/**
 * @file pin.rs
 * @date 19/10/2026
 * @brief Black-box pin as seen by the generated circuit
 */
use crate::edge::EdgeDetector;
use crate::signal::{Value, Wire};

/// A black-box pin.
///
/// `i` is driven by the model towards the circuit, `o` and `oeb` are driven
/// by the circuit towards the model. Edge sensitive pins additionally track
/// bit 0 of `o`.
#[derive(Debug, Clone)]
pub struct Pin {
    pub name: &'static str,
    pub i: Wire,
    pub o: Value,
    pub oeb: Value,
    edge: Option<EdgeDetector>,
}

impl Pin {
    pub fn new(name: &'static str, width: u32) -> Self {
        Self {
            name,
            i: Wire::new(width),
            o: Value::new(width),
            oeb: Value::new(width),
            edge: None,
        }
    }

    /// A single bit pin with edge detection.
    pub fn edge(name: &'static str) -> Self {
        Self {
            edge: Some(EdgeDetector::default()),
            ..Self::new(name, 1)
        }
    }

    pub fn width(&self) -> u32 {
        self.o.width()
    }

    /// Level of bit 0 as driven by the circuit.
    pub fn level(&self) -> bool {
        self.o.bit(0)
    }

    /// Drive the circuit side of the pin, as the kernel does.
    pub fn set(&mut self, value: impl Into<u64>) {
        self.o.set(value);
    }

    /// Sample the circuit side for edge detection; call once on entry to
    /// evaluation.
    pub fn sample(&mut self) {
        let level = self.level();
        if let Some(edge) = self.edge.as_mut() {
            edge.sample(level);
        }
    }

    pub fn posedge(&self) -> bool {
        self.edge.is_some_and(|edge| edge.rising())
    }

    pub fn negedge(&self) -> bool {
        self.edge.is_some_and(|edge| edge.falling())
    }

    /// Commit the model-driven value and the edge history.
    pub fn commit(&mut self) -> bool {
        if let Some(edge) = self.edge.as_mut() {
            edge.commit();
        }
        self.i.commit()
    }

    pub fn reset(&mut self) {
        self.i.reset();
        let level = self.level();
        if let Some(edge) = self.edge.as_mut() {
            edge.reset(level);
        }
    }
}
