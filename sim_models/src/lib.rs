/**
 * @file lib.rs
 * @date 19/10/2026
 * @brief Black-box peripheral models for an edge-driven SoC simulation
 */
pub mod common;
pub mod edge;
pub mod error;
pub mod inspector;
pub mod kernel;
pub mod memory;
pub mod model;
pub mod models;
pub mod pin;
pub mod signal;

mod utils;

pub use edge::EdgeDetector;
pub use error::Error as ModelError;
pub use inspector::{InspectionEvent, Inspector, InspectorRef};
pub use kernel::{Kernel, Settle};
pub use model::{Metadata, MetadataMap, Model, ModelFactory, ModelRef};
pub use models::{BusMonitor, BusTransaction, GpioModel, HyperRamModel, SpiFlash, UartModel};
pub use pin::Pin;
pub use signal::{Value, Wire};

pub type Result<T> = core::result::Result<T, ModelError>;
