/**
 * @file soc.rs
 * @date 19/10/2026
 * @brief Black-box models wired around the fetch master
 */
use crate::xip::XipMaster;
use sim_models::{
    BusMonitor, GpioModel, HyperRamModel, Kernel, MetadataMap, ModelFactory, ModelRef, Pin,
    Settle, SpiFlash, UartModel,
};
use std::cell::RefCell;
use std::rc::Rc;

pub struct SimSoc {
    kernel: Kernel,
    master: XipMaster,
    fetch_address: u32,
    cycles: u64,

    pub flash: ModelRef<SpiFlash>,
    pub monitor: ModelRef<BusMonitor>,
}

fn create<T: ModelFactory>(name: &str) -> ModelRef<T> {
    let metadata = MetadataMap::new();
    Rc::new(RefCell::new(T::create(name, &metadata, &metadata)))
}

/// Drive the circuit side of `pin`, reporting whether it changed.
fn drive(pin: &mut Pin, value: impl Into<u64>) -> bool {
    let last = pin.o;
    pin.set(value);
    last != pin.o
}

/// Copy the master's outputs onto the model inputs.
fn propagate(master: &XipMaster, clk: bool, flash: &ModelRef<SpiFlash>, monitor: &ModelRef<BusMonitor>) -> bool {
    let mut changed = false;

    let mut flash = flash.borrow_mut();
    changed |= drive(&mut flash.clk, master.spi_clk);
    changed |= drive(&mut flash.csn, master.csn);
    changed |= drive(&mut flash.d, master.mosi);

    let mut monitor = monitor.borrow_mut();
    let cycle = master.bus.unwrap_or_default();
    let active = master.bus.is_some();

    changed |= drive(&mut monitor.clk, clk);
    changed |= drive(&mut monitor.adr, cycle.adr);
    changed |= drive(&mut monitor.dat_r, cycle.dat_r);
    changed |= drive(&mut monitor.dat_w, 0u32);
    changed |= drive(&mut monitor.sel, cycle.sel);
    changed |= drive(&mut monitor.we, false);
    changed |= drive(&mut monitor.cyc, active);
    changed |= drive(&mut monitor.stb, active);
    changed |= drive(&mut monitor.ack, active);

    changed
}

impl SimSoc {
    pub fn new(fetch_address: u32) -> Self {
        let flash = create::<SpiFlash>("spiflash");
        let monitor = create::<BusMonitor>("wb_mon");

        let mut kernel = Kernel::new();
        kernel.attach(&flash);
        kernel.attach(&monitor);

        // pads only, nothing configures them after construction
        kernel.attach(&create::<GpioModel>("gpio"));
        kernel.attach(&create::<UartModel>("uart"));
        kernel.attach(&create::<HyperRamModel>("hyperram"));

        Self {
            kernel,
            master: XipMaster::new(fetch_address),
            fetch_address,
            cycles: 0,
            flash,
            monitor,
        }
    }

    /// Power-on state with the clock low and the flash deselected.
    pub fn reset(&mut self) {
        self.master.reset(self.fetch_address);
        propagate(&self.master, false, &self.flash, &self.monitor);
        self.kernel.reset();
        self.cycles = 0;
    }

    pub fn half_step(&mut self, level: bool) -> Settle {
        let miso = self.flash.borrow().data_out();
        self.master.tick(level, miso);

        let master = &self.master;
        let flash = &self.flash;
        let monitor = &self.monitor;
        self.kernel.step(|| propagate(master, level, flash, monitor))
    }

    pub fn cycle(&mut self) {
        self.half_step(false);
        self.half_step(true);
        self.cycles += 1;
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn fetched(&self) -> u64 {
        self.master.fetched()
    }
}
