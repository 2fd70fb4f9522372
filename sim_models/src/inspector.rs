use crate::models::BusTransaction;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectionEvent {
    SpiByte {
        index: u64,
        value: u8,
    },
    SpiSessionEnd {
        bytes: u64,
    },
    FlashPowerUp,
    FlashUnmodeledCommand(u8),
    FlashRead {
        address: u32,
        value: u8,
    },
    FlashLoaded {
        offset: usize,
        len: usize,
    },

    BusTransaction(BusTransaction),
    MonitorWriteFailed,
}

pub trait Inspector {
    fn handle_event(&self, event: InspectionEvent);
}

/// Diagnostic sink handed to every model at construction.
#[derive(Clone)]
pub struct InspectorRef {
    inspector: Rc<dyn Inspector>,
}

impl Default for InspectorRef {
    fn default() -> Self {
        Self {
            inspector: Rc::new(DummyInspector),
        }
    }
}

impl Inspector for InspectorRef {
    fn handle_event(&self, event: InspectionEvent) {
        self.inspector.handle_event(event);
    }
}

impl InspectorRef {
    pub fn new(inspector: Rc<dyn Inspector>) -> Self {
        Self { inspector }
    }

    pub fn set_inspector(&mut self, inspector: Rc<dyn Inspector>) {
        self.inspector = inspector;
    }

    pub fn raise(&self, event: InspectionEvent) {
        self.inspector.handle_event(event);
    }
}

/// Forwards every event to the `log` facade.
pub struct DummyInspector;

impl Inspector for DummyInspector {
    fn handle_event(&self, event: InspectionEvent) {
        match event {
            InspectionEvent::SpiByte { index, value } => {
                log::debug!("SPI: {value:#04x} (byte {index})");
            }

            InspectionEvent::SpiSessionEnd { bytes } => {
                log::debug!("SPI: end after {bytes} bytes");
            }

            InspectionEvent::FlashPowerUp => {
                log::info!("Flash: power up");
            }

            InspectionEvent::FlashUnmodeledCommand(command) => {
                log::debug!("Flash: unmodeled command {command:#04x}");
            }

            InspectionEvent::FlashRead { address, value } => {
                log::trace!("Flash: read {value:#04x} at {address:#08x}");
            }

            InspectionEvent::FlashLoaded { offset, len } => {
                log::info!("Flash: loaded {len} bytes at {offset:#x}");
            }

            InspectionEvent::BusTransaction(transaction) => {
                log::debug!("Bus: {transaction}");
            }

            InspectionEvent::MonitorWriteFailed => {
                log::warn!("Bus: transaction dropped by the monitor output");
            }
        }
    }
}

/// Keeps every event, for tests and tooling.
#[derive(Default)]
pub struct RecordingInspector {
    events: RefCell<Vec<InspectionEvent>>,
}

impl Inspector for RecordingInspector {
    fn handle_event(&self, event: InspectionEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl RecordingInspector {
    pub fn events(&self) -> Vec<InspectionEvent> {
        self.events.borrow().clone()
    }

    pub fn take(&self) -> Vec<InspectionEvent> {
        self.events.take()
    }
}
