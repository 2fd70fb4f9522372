//! External HyperRAM stub.
//!
//! Terminates the pins and watches the clock so the edge discipline matches
//! the other models, but answers no transactions.

use crate::model::{log_unused_metadata, MetadataMap, Model, ModelFactory};
use crate::pin::Pin;

pub struct HyperRamModel {
    name: String,
    pub clk: Pin,
    pub rwds: Pin,
    pub csn: Pin,
    pub d: Pin,
}

impl ModelFactory for HyperRamModel {
    fn create(name: &str, parameters: &MetadataMap, attributes: &MetadataMap) -> Self {
        log_unused_metadata(name, parameters, attributes);
        Self {
            name: name.to_string(),
            clk: Pin::edge("clk"),
            rwds: Pin::edge("rwds"),
            csn: Pin::edge("csn"),
            d: Pin::new("d", 8),
        }
    }
}

impl Model for HyperRamModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&mut self) -> bool {
        self.clk.sample();
        self.rwds.sample();
        self.csn.sample();

        let mut changed = false;
        for pin in [&mut self.clk, &mut self.rwds, &mut self.csn, &mut self.d] {
            changed |= pin.i.hold();
        }
        changed
    }

    fn commit(&mut self) -> bool {
        let mut changed = false;
        for pin in [&mut self.clk, &mut self.rwds, &mut self.csn, &mut self.d] {
            changed |= pin.commit();
        }
        changed
    }

    fn reset(&mut self) {
        for pin in [&mut self.clk, &mut self.rwds, &mut self.csn, &mut self.d] {
            pin.reset();
        }
    }
}
