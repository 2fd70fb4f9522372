//! UART transceiver stub.

use crate::model::{log_unused_metadata, MetadataMap, Model, ModelFactory};
use crate::pin::Pin;

pub struct UartModel {
    name: String,
    pub tx: Pin,
    pub rx: Pin,
}

impl ModelFactory for UartModel {
    fn create(name: &str, parameters: &MetadataMap, attributes: &MetadataMap) -> Self {
        log_unused_metadata(name, parameters, attributes);
        Self {
            name: name.to_string(),
            tx: Pin::new("tx", 1),
            rx: Pin::new("rx", 1),
        }
    }
}

impl Model for UartModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&mut self) -> bool {
        let tx = self.tx.i.hold();
        let rx = self.rx.i.hold();
        tx || rx
    }

    fn commit(&mut self) -> bool {
        let tx = self.tx.commit();
        let rx = self.rx.commit();
        tx || rx
    }

    fn reset(&mut self) {
        self.tx.reset();
        self.rx.reset();
    }
}
