/**
 * @file models.rs
 * @date 19/10/2026
 * @brief Peripheral models attached to the simulated SoC
 */
pub mod gpio;
pub mod hyperram;
pub mod spiflash;
pub mod uart;
pub mod wb_mon;

pub use gpio::GpioModel;
pub use hyperram::HyperRamModel;
pub use spiflash::{FlashStats, Session, SpiFlash};
pub use uart::UartModel;
pub use wb_mon::{BusMonitor, BusTransaction, Direction};
