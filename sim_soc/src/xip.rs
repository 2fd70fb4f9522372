//! Execute-in-place fetch master
//!
//! Plays the part of the SoC's flash controller: reads consecutive words with
//! the plain read command and presents each one on the Wishbone bus as an
//! acknowledged read. One SPI bit per system clock cycle, mode 0.

use sim_models::common::FLASH_ADDRESS_MASK;
use sim_models::models::spiflash::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    /// Bit of the 64 bit frame being transferred.
    Shift(u32),
    Done,
    Ack,
}

/// Wishbone read presented to the bus for one cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BusCycle {
    /// Word address.
    pub adr: u32,
    pub dat_r: u32,
    pub sel: u8,
}

const FRAME_BITS: u32 = 64;
const HEADER_BITS: u32 = 32;

#[derive(Debug)]
pub struct XipMaster {
    state: State,
    address: u32,
    shift_out: u64,
    shift_in: u32,
    fetched: u64,

    pub spi_clk: bool,
    pub csn: bool,
    pub mosi: bool,
    pub bus: Option<BusCycle>,
}

impl XipMaster {
    pub fn new(address: u32) -> Self {
        Self {
            state: State::Idle,
            address,
            shift_out: 0,
            shift_in: 0,
            fetched: 0,
            spi_clk: false,
            csn: true,
            mosi: false,
            bus: None,
        }
    }

    pub fn reset(&mut self, address: u32) {
        *self = Self::new(address);
    }

    /// Next flash address to fetch.
    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn fetched(&self) -> u64 {
        self.fetched
    }

    /// Advance on a system clock transition to `level`. `miso` is the flash
    /// data out as committed by the previous half step.
    pub fn tick(&mut self, level: bool, miso: bool) {
        if level {
            self.rising(miso);
        } else {
            self.falling();
        }
    }

    fn falling(&mut self) {
        self.spi_clk = false;

        match self.state {
            State::Idle => {
                let header = ((Command::Read as u32) << 24) | (self.address & FLASH_ADDRESS_MASK);
                self.shift_out = (header as u64) << HEADER_BITS;
                self.shift_in = 0;
                self.csn = false;
                self.mosi = self.frame_bit(0);
                self.state = State::Shift(0);
            }

            State::Shift(bit) => {
                self.mosi = self.frame_bit(bit);
            }

            State::Done => {
                self.csn = true;
                self.mosi = false;

                // first byte on the wire is the lowest byte of the word
                self.bus = Some(BusCycle {
                    adr: self.address >> 2,
                    dat_r: self.shift_in.swap_bytes(),
                    sel: 0xF,
                });
                self.state = State::Ack;
            }

            State::Ack => {
                self.bus = None;
                self.fetched += 1;
                self.address = self.address.wrapping_add(4);
                self.state = State::Idle;
            }
        }
    }

    fn rising(&mut self, miso: bool) {
        let State::Shift(bit) = self.state else {
            return;
        };

        self.spi_clk = true;
        if bit >= HEADER_BITS {
            self.shift_in = (self.shift_in << 1) | miso as u32;
        }

        self.state = if bit + 1 == FRAME_BITS {
            State::Done
        } else {
            State::Shift(bit + 1)
        };
    }

    fn frame_bit(&self, bit: u32) -> bool {
        (self.shift_out >> (FRAME_BITS - 1 - bit)) & 0x1 == 1
    }
}
