//! General purpose I/O pads. The model only terminates the pins.

use crate::model::{log_unused_metadata, MetadataMap, Model, ModelFactory};
use crate::pin::Pin;

pub struct GpioModel {
    name: String,
    pub periph: Pin,
}

impl ModelFactory for GpioModel {
    fn create(name: &str, parameters: &MetadataMap, attributes: &MetadataMap) -> Self {
        log_unused_metadata(name, parameters, attributes);
        Self {
            name: name.to_string(),
            periph: Pin::new("periph", 8),
        }
    }
}

impl Model for GpioModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&mut self) -> bool {
        self.periph.i.hold()
    }

    fn commit(&mut self) -> bool {
        self.periph.commit()
    }

    fn reset(&mut self) {
        self.periph.reset();
    }
}
