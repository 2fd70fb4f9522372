//! Wishbone transaction monitor
//!
//! Records one line per acknowledged bus cycle:
//! `AAAAAAAA,W,B3B2B1B0` where a byte lane is either two hex digits or `__`
//! when its select line is low.

use crate::common::BUS_GRANULARITY_SHIFT;
use crate::inspector::{InspectionEvent, InspectorRef};
use crate::model::{log_unused_metadata, MetadataMap, Model, ModelFactory};
use crate::pin::Pin;
use crate::{ModelError, Result};
use std::fmt;
use std::fs::File;
use std::io::{LineWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Read => write!(f, "R"),
            Direction::Write => write!(f, "W"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusTransaction {
    /// Byte address.
    pub address: u32,
    pub direction: Direction,
    /// Byte lane select, bit 0 is the least significant lane.
    pub sel: u8,
    pub data: u32,
}

impl BusTransaction {
    pub fn is_write(&self) -> bool {
        self.direction == Direction::Write
    }
}

impl fmt::Display for BusTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x},{},", self.address, self.direction)?;

        for lane in (0..4).rev() {
            if (self.sel >> lane) & 0x1 == 1 {
                write!(f, "{:02x}", (self.data >> (lane * 8)) & 0xFF)?;
            } else {
                write!(f, "__")?;
            }
        }

        Ok(())
    }
}

pub struct BusMonitor {
    name: String,
    pub clk: Pin,
    pub adr: Pin,
    pub dat_r: Pin,
    pub dat_w: Pin,
    pub sel: Pin,
    pub cyc: Pin,
    pub stb: Pin,
    pub we: Pin,
    pub ack: Pin,

    output: Option<Box<dyn Write>>,
    pending: Option<BusTransaction>,
    transactions: u64,
    write_errors: u64,
    inspector: InspectorRef,
}

impl ModelFactory for BusMonitor {
    fn create(name: &str, parameters: &MetadataMap, attributes: &MetadataMap) -> Self {
        log_unused_metadata(name, parameters, attributes);
        Self::new(name)
    }
}

impl BusMonitor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            clk: Pin::edge("clk"),
            adr: Pin::new("adr", 30),
            dat_r: Pin::new("dat_r", 32),
            dat_w: Pin::new("dat_w", 32),
            sel: Pin::new("sel", 4),
            cyc: Pin::new("cyc", 1),
            stb: Pin::new("stb", 1),
            we: Pin::new("we", 1),
            ack: Pin::new("ack", 1),
            output: None,
            pending: None,
            transactions: 0,
            write_errors: 0,
            inspector: InspectorRef::default(),
        }
    }

    /// Record transactions into a newly created file, one flushed line each.
    pub fn set_output(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| ModelError::Output {
            path: path.display().to_string(),
            source,
        })?;

        log::info!("{}: recording transactions to {}", self.name, path.display());
        self.set_writer(LineWriter::new(file));
        Ok(())
    }

    pub fn set_writer(&mut self, writer: impl Write + 'static) {
        self.output = Some(Box::new(writer));
    }

    pub fn set_inspector(&mut self, inspector: InspectorRef) {
        self.inspector = inspector;
    }

    /// Transactions recorded so far.
    pub fn transactions(&self) -> u64 {
        self.transactions
    }

    pub fn write_errors(&self) -> u64 {
        self.write_errors
    }

    /// Transaction seen by the last evaluation, if any.
    pub fn pending(&self) -> Option<&BusTransaction> {
        self.pending.as_ref()
    }

    fn qualified(&self) -> bool {
        self.stb.level() && self.cyc.level() && self.ack.level()
    }

    fn capture(&self) -> BusTransaction {
        let direction = if self.we.level() {
            Direction::Write
        } else {
            Direction::Read
        };

        let data = match direction {
            Direction::Write => self.dat_w.o.get::<u32>(),
            Direction::Read => self.dat_r.o.get::<u32>(),
        };

        BusTransaction {
            address: self.adr.o.get::<u32>() << BUS_GRANULARITY_SHIFT,
            direction,
            sel: self.sel.o.get::<u8>(),
            data,
        }
    }

    fn record(&mut self, transaction: BusTransaction) {
        self.transactions += 1;

        if let Some(output) = self.output.as_mut() {
            let written = writeln!(output, "{transaction}").and_then(|_| output.flush());
            if let Err(err) = written {
                self.write_errors += 1;
                log::error!("{}: failed to record {transaction}: {err}", self.name);
                self.inspector.raise(InspectionEvent::MonitorWriteFailed);
            }
        }

        self.inspector
            .raise(InspectionEvent::BusTransaction(transaction));
    }
}

impl Model for BusMonitor {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&mut self) -> bool {
        self.clk.sample();

        self.pending = if self.clk.posedge() && self.qualified() {
            Some(self.capture())
        } else {
            None
        };

        // drives nothing
        false
    }

    fn commit(&mut self) -> bool {
        self.clk.commit();

        match self.pending.take() {
            Some(transaction) => {
                self.record(transaction);
                true
            }
            None => false,
        }
    }

    fn reset(&mut self) {
        self.clk.reset();
        self.pending = None;
    }
}
