//! Serial NOR flash
//!
//! Single bit SPI: data in on `d_o[0]`, data out on `d_i[1]`. Only the
//! plain read command touches the memory array; the release from power down
//! command is recognised for diagnostics and everything else is ignored.

use crate::common::{FLASH_ADDRESS_MASK, FLASH_SIZE};
use crate::inspector::{InspectionEvent, InspectorRef};
use crate::memory::FlashMemory;
use crate::model::{log_unused_metadata, MetadataMap, Model, ModelFactory};
use crate::pin::Pin;
use crate::{ModelError, Result};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum Command {
    Read = 0x03,
    ReleasePowerDown = 0xAB,
}

/// Protocol state of one chip select session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    /// Bits of the current byte received so far (0..=7).
    pub bit_count: u8,
    /// Complete bytes received since chip select went low.
    pub byte_count: u64,
    pub command: u8,
    pub address: u32,
    pub curr_byte: u8,
    /// Byte being shifted out, MSB first.
    pub out_buffer: u8,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlashStats {
    pub sessions: u64,
    pub bytes: u64,
    pub posedges: u64,
    pub negedges: u64,
}

pub struct SpiFlash {
    name: String,
    pub clk: Pin,
    pub csn: Pin,
    pub d: Pin,

    memory: FlashMemory,
    state: Session,
    state_next: Session,
    stats: FlashStats,
    stats_next: FlashStats,

    // raised on commit
    events: Vec<InspectionEvent>,
    inspector: InspectorRef,
}

impl ModelFactory for SpiFlash {
    fn create(name: &str, parameters: &MetadataMap, attributes: &MetadataMap) -> Self {
        log_unused_metadata(name, parameters, attributes);
        Self::with_capacity(name, FLASH_SIZE)
    }
}

impl SpiFlash {
    pub fn with_capacity(name: &str, capacity: usize) -> Self {
        Self {
            name: name.to_string(),
            clk: Pin::edge("clk"),
            csn: Pin::edge("csn"),
            d: Pin::new("d", 4),
            memory: FlashMemory::new(capacity),
            state: Session::default(),
            state_next: Session::default(),
            stats: FlashStats::default(),
            stats_next: FlashStats::default(),
            events: Vec::new(),
            inspector: InspectorRef::default(),
        }
    }

    pub fn set_inspector(&mut self, inspector: InspectorRef) {
        self.inspector = inspector;
    }

    pub fn memory(&self) -> &FlashMemory {
        &self.memory
    }

    pub fn capacity(&self) -> usize {
        self.memory.capacity()
    }

    /// Committed session state.
    pub fn state(&self) -> &Session {
        &self.state
    }

    /// Session state computed by the last evaluation.
    pub fn next_state(&self) -> &Session {
        &self.state_next
    }

    pub fn stats(&self) -> &FlashStats {
        &self.stats
    }

    pub fn command(&self) -> u8 {
        self.state.command
    }

    pub fn byte_count(&self) -> u64 {
        self.state.byte_count
    }

    /// Level currently driven on the data out line.
    pub fn data_out(&self) -> bool {
        self.d.i.curr().bit(1)
    }

    /// Copy an image from `source` into the array at `offset`.
    ///
    /// The source is read completely before the array is touched, so a read
    /// error leaves the memory as it was. Bytes past the end of the array are
    /// dropped. Returns the number of bytes written.
    pub fn load<R: Read>(&mut self, mut source: R, offset: usize) -> Result<usize> {
        self.check_offset(offset)?;

        let mut staged = Vec::new();
        source.read_to_end(&mut staged)?;

        let len = self.memory.write_slice(offset, &staged)?;
        self.inspector
            .raise(InspectionEvent::FlashLoaded { offset, len });
        Ok(len)
    }

    pub fn load_bytes(&mut self, bytes: &[u8], offset: usize) -> Result<usize> {
        self.load(bytes, offset)
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>, offset: usize) -> Result<usize> {
        self.check_offset(offset)?;
        let file = File::open(path)?;
        self.load(BufReader::new(file), offset)
    }

    /// Load a raw binary or a UF2 container. UF2 blocks are placed at their
    /// target address minus `base`, relative to `offset`.
    pub fn load_image(&mut self, path: impl AsRef<Path>, offset: usize, base: u32) -> Result<usize> {
        self.check_offset(offset)?;
        let data = std::fs::read(path)?;
        let segments = flash_image::segments(&data, base)?;

        // refuse the whole image rather than load a part of it
        for segment in segments.iter() {
            self.check_offset(offset + segment.offset)?;
        }

        let mut total = 0;
        for segment in segments.iter() {
            let len = self.memory.write_slice(offset + segment.offset, &segment.data)?;
            self.inspector.raise(InspectionEvent::FlashLoaded {
                offset: offset + segment.offset,
                len,
            });
            total += len;
        }

        Ok(total)
    }

    fn check_offset(&self, offset: usize) -> Result<()> {
        if offset >= self.memory.capacity() {
            return Err(ModelError::OutOfRange {
                offset,
                capacity: self.memory.capacity(),
            });
        }
        Ok(())
    }

    fn process_byte(memory: &FlashMemory, s: &mut Session, events: &mut Vec<InspectionEvent>) {
        let byte = s.curr_byte;
        events.push(InspectionEvent::SpiByte {
            index: s.byte_count,
            value: byte,
        });

        s.out_buffer = 0;

        if s.byte_count == 0 {
            s.command = byte;
            s.address = 0;

            match Command::from_u8(byte) {
                Some(Command::ReleasePowerDown) => events.push(InspectionEvent::FlashPowerUp),
                Some(Command::Read) => {}
                None => events.push(InspectionEvent::FlashUnmodeledCommand(byte)),
            }
            return;
        }

        if Command::from_u8(s.command) != Some(Command::Read) {
            return;
        }

        if s.byte_count <= 3 {
            s.address |= (byte as u32) << ((3 - s.byte_count) * 8);
        }

        if s.byte_count >= 3 {
            let address = memory.wrap(s.address & FLASH_ADDRESS_MASK);
            let value = memory.read_u8(address);
            events.push(InspectionEvent::FlashRead { address, value });

            s.out_buffer = value;
            s.address = memory.wrap(address + 1);
        }
    }
}

impl Model for SpiFlash {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&mut self) -> bool {
        self.clk.sample();
        self.csn.sample();
        self.events.clear();

        let mut next = self.state;
        let mut stats = self.stats;
        let selected = !self.csn.level();

        if self.clk.posedge() {
            stats.posedges += 1;
        }
        if self.clk.negedge() {
            stats.negedges += 1;
        }

        let mut data_out = None;

        if self.csn.posedge() {
            self.events.push(InspectionEvent::SpiSessionEnd {
                bytes: next.byte_count,
            });
            stats.sessions += 1;
            next = Session::default();
            // output released while deselected
            data_out = Some(0);
        } else if self.clk.posedge() && selected {
            next.curr_byte = (next.curr_byte << 1) | self.d.o.bit(0) as u8;
            next.out_buffer <<= 1;
            next.bit_count += 1;

            if next.bit_count == 8 {
                Self::process_byte(&self.memory, &mut next, &mut self.events);
                next.byte_count += 1;
                next.bit_count = 0;
                stats.bytes += 1;
            }
        } else if self.clk.negedge() && selected {
            // set up half a cycle ahead of the sampling edge
            data_out = Some(((next.out_buffer >> 7) & 0x1) << 1);
        }

        self.state_next = next;
        self.stats_next = stats;

        match data_out {
            Some(value) => self.d.i.drive(value),
            None => self.d.i.hold(),
        }
    }

    fn commit(&mut self) -> bool {
        let mut changed = self.state != self.state_next;
        self.state = self.state_next;
        self.stats = self.stats_next;

        changed |= self.clk.commit();
        changed |= self.csn.commit();
        changed |= self.d.commit();

        for event in self.events.drain(..) {
            self.inspector.raise(event);
        }

        changed
    }

    fn reset(&mut self) {
        self.clk.reset();
        self.csn.reset();
        self.d.reset();
        self.state = Session::default();
        self.state_next = Session::default();
        self.stats = FlashStats::default();
        self.stats_next = FlashStats::default();
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspector::RecordingInspector;
    use std::io;
    use std::rc::Rc;

    /// Bit-bangs the flash the way a controller would, one half step at a
    /// time.
    struct SpiMaster {
        flash: SpiFlash,
    }

    impl SpiMaster {
        fn new(flash: SpiFlash) -> Self {
            let mut master = Self { flash };
            master.flash.csn.set(1u8);
            master.flash.reset();
            master
        }

        fn half_step(&mut self) {
            self.flash.evaluate();
            self.flash.commit();
        }

        fn select(&mut self) {
            self.flash.clk.set(0u8);
            self.flash.csn.set(0u8);
            self.half_step();
        }

        fn deselect(&mut self) {
            self.flash.clk.set(0u8);
            self.flash.csn.set(1u8);
            self.half_step();
        }

        fn clock_bit(&mut self, bit: bool) -> bool {
            self.flash.clk.set(0u8);
            self.flash.d.set(bit as u8);
            self.half_step();
            let sampled = self.flash.data_out();

            self.flash.clk.set(1u8);
            self.half_step();
            sampled
        }

        fn transfer(&mut self, byte: u8) -> u8 {
            (0..8).rev().fold(0, |received, bit| {
                (received << 1) | self.clock_bit((byte >> bit) & 1 == 1) as u8
            })
        }

        fn read(&mut self, address: u32, len: usize) -> Vec<u8> {
            self.select();
            self.transfer(Command::Read as u8);
            self.transfer((address >> 16) as u8);
            self.transfer((address >> 8) as u8);
            self.transfer(address as u8);
            let data = (0..len).map(|_| self.transfer(0x00)).collect();
            self.deselect();
            data
        }
    }

    fn flash_with(capacity: usize, offset: usize, image: &[u8]) -> SpiFlash {
        let mut flash = SpiFlash::with_capacity("spiflash", capacity);
        flash.load_bytes(image, offset).unwrap();
        flash
    }

    #[test]
    fn test_read_command() {
        let flash = flash_with(64 * 1024, 0x1000, &[0xDE, 0xAD, 0xBE, 0xEF, 0x01]);
        let mut master = SpiMaster::new(flash);

        master.select();
        for byte in [0x03, 0x00, 0x10, 0x00] {
            master.transfer(byte);
        }
        assert_eq!(master.flash.command(), 0x03);
        assert_eq!(master.flash.state().address, 0x1001);

        let data: Vec<u8> = (0..4).map(|_| master.transfer(0xFF)).collect();
        assert_eq!(data, vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(master.flash.state().address, 0x1005);
        assert_eq!(master.flash.byte_count(), 8);
    }

    #[test]
    fn test_read_wraps_around() {
        let mut flash = flash_with(256, 0xFE, &[0x11, 0x22]);
        flash.load_bytes(&[0x33], 0).unwrap();
        let mut master = SpiMaster::new(flash);

        assert_eq!(master.read(0x0000FE, 3), vec![0x11, 0x22, 0x33]);
    }

    #[test]
    fn test_read_full_address_space() {
        let flash = flash_with(FLASH_SIZE, FLASH_SIZE - 1, &[0x5A]);
        let mut master = SpiMaster::new(flash);

        assert_eq!(master.read(0xFF_FFFF, 2), vec![0x5A, 0xFF]);
    }

    #[test]
    fn test_session_reset() {
        let flash = SpiFlash::with_capacity("spiflash", 256);
        let mut master = SpiMaster::new(flash);

        master.select();
        master.transfer(0x03);
        master.transfer(0x12);
        master.clock_bit(true);
        master.clock_bit(false);
        assert_eq!(master.flash.state().bit_count, 2);
        assert_eq!(master.flash.byte_count(), 2);

        master.deselect();
        assert_eq!(master.flash.state().bit_count, 0);
        assert_eq!(master.flash.byte_count(), 0);

        // select and deselect without clocking
        master.select();
        master.deselect();
        assert_eq!(master.flash.state().bit_count, 0);
        assert_eq!(master.flash.byte_count(), 0);
        assert_eq!(master.flash.stats().sessions, 2);
    }

    #[test]
    fn test_next_command_after_reset() {
        let flash = flash_with(256, 0x20, &[0x77]);
        let mut master = SpiMaster::new(flash);

        master.select();
        master.transfer(0xFF);
        master.transfer(0x00);
        master.deselect();

        assert_eq!(master.read(0x000020, 1), vec![0x77]);
    }

    #[test]
    fn test_deselect_clears_output() {
        let flash = flash_with(256, 0x10, &[0xFF]);
        let mut master = SpiMaster::new(flash);

        master.select();
        for byte in [0x03, 0x00, 0x00, 0x10] {
            master.transfer(byte);
        }
        assert!(master.clock_bit(false));
        assert!(master.clock_bit(false));
        master.deselect();

        assert_eq!(master.flash.state(), &Session::default());
        assert!(!master.flash.data_out());

        master.select();
        assert_eq!(master.transfer(0x00), 0x00);
        assert_eq!(master.flash.state().curr_byte, 0x00);
    }

    #[test]
    fn test_long_session_byte_count() {
        let flash = SpiFlash::with_capacity("spiflash", 256);
        let mut master = SpiMaster::new(flash);

        master.select();
        master.transfer(0x03);
        master.flash.state.byte_count = u32::MAX as u64;
        master.transfer(0x00);

        assert_eq!(master.flash.byte_count(), u32::MAX as u64 + 1);
    }

    #[test]
    fn test_unrecognized_command() {
        let image: Vec<u8> = (0..=255).collect();
        let flash = flash_with(256, 0, &image);
        let mut master = SpiMaster::new(flash);

        master.select();
        master.transfer(0xFF);
        for byte in [0x00, 0x00, 0x10] {
            master.transfer(byte);
        }

        for _ in 0..8 {
            assert_eq!(master.transfer(0xA5), 0x00);
            assert_eq!(master.flash.state().out_buffer, 0x00);
        }
        assert_eq!(master.flash.command(), 0xFF);
        master.deselect();

        assert_eq!(&master.flash.memory()[..], &image[..]);
    }

    #[test]
    fn test_data_out_changes_on_falling_edge() {
        let flash = flash_with(256, 0x10, &[0x80]);
        let mut master = SpiMaster::new(flash);

        master.select();
        for byte in [0x03, 0x00, 0x00, 0x10] {
            master.transfer(byte);
        }
        assert_eq!(master.flash.state().out_buffer, 0x80);
        assert!(!master.flash.data_out());

        master.flash.clk.set(0u8);
        master.half_step();
        assert!(master.flash.data_out());

        // the buffer shifts on the rising edge but the line holds
        master.flash.clk.set(1u8);
        master.half_step();
        assert_eq!(master.flash.state().out_buffer, 0x00);
        assert!(master.flash.data_out());

        master.flash.clk.set(0u8);
        master.half_step();
        assert!(!master.flash.data_out());
    }

    #[test]
    fn test_idempotent_evaluate() {
        let flash = flash_with(256, 0, &[0x42]);
        let mut master = SpiMaster::new(flash);

        master.select();
        for byte in [0x03, 0x00, 0x00] {
            master.transfer(byte);
        }
        for _ in 0..7 {
            master.clock_bit(false);
        }

        master.flash.clk.set(0u8);
        master.half_step();
        master.flash.clk.set(1u8);

        master.flash.evaluate();
        let first = *master.flash.next_state();
        master.flash.evaluate();
        let second = *master.flash.next_state();

        assert_eq!(first, second);
        assert_eq!(first.byte_count, 4);
        assert_eq!(first.out_buffer, 0x42);
        assert_eq!(master.flash.state().byte_count, 3);

        assert!(master.flash.commit());
        assert_eq!(master.flash.state(), &second);
        assert_eq!(master.flash.stats().bytes, 4);
    }

    #[test]
    fn test_diagnostics() {
        let recorder = Rc::new(RecordingInspector::default());
        let mut flash = SpiFlash::with_capacity("spiflash", 256);
        flash.set_inspector(InspectorRef::new(recorder.clone()));
        let mut master = SpiMaster::new(flash);

        recorder.take();
        master.select();
        master.transfer(Command::ReleasePowerDown as u8);
        master.flash.evaluate();
        master.flash.evaluate();
        master.flash.commit();
        master.deselect();
        master.select();
        master.transfer(0x9F);
        master.deselect();

        assert_eq!(
            recorder.events(),
            vec![
                InspectionEvent::SpiByte {
                    index: 0,
                    value: 0xAB
                },
                InspectionEvent::FlashPowerUp,
                InspectionEvent::SpiSessionEnd { bytes: 1 },
                InspectionEvent::SpiByte {
                    index: 0,
                    value: 0x9F
                },
                InspectionEvent::FlashUnmodeledCommand(0x9F),
                InspectionEvent::SpiSessionEnd { bytes: 1 },
            ]
        );
    }

    #[test]
    fn test_load_bounds() {
        let mut flash = SpiFlash::with_capacity("spiflash", 16);

        assert!(matches!(
            flash.load_bytes(&[0x01, 0x02], 16),
            Err(ModelError::OutOfRange {
                offset: 16,
                capacity: 16
            })
        ));

        assert_eq!(flash.load_bytes(&[0x01, 0x02], 15).unwrap(), 1);
        assert_eq!(flash.memory()[15], 0x01);
        assert_eq!(flash.memory()[14], 0xFF);
    }

    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disconnected"))
        }
    }

    #[test]
    fn test_load_read_errors() {
        let mut flash = SpiFlash::with_capacity("spiflash", 16);

        assert!(matches!(
            flash.load(BrokenReader, 0),
            Err(ModelError::Read(_))
        ));
        assert!(flash.memory().iter().all(|&byte| byte == 0xFF));

        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            flash.load_file(dir.path().join("missing.bin"), 0),
            Err(ModelError::Read(_))
        ));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("firmware.bin");
        std::fs::write(&path, [0x13, 0x00, 0x00, 0x00]).unwrap();

        let mut flash = SpiFlash::with_capacity("spiflash", 1024);
        assert_eq!(flash.load_file(&path, 0x100).unwrap(), 4);
        assert_eq!(&flash.memory()[0x100..0x104], &[0x13, 0x00, 0x00, 0x00]);

        assert_eq!(flash.load_image(&path, 0x200, 0).unwrap(), 4);
        assert_eq!(&flash.memory()[0x200..0x204], &[0x13, 0x00, 0x00, 0x00]);
    }

    fn uf2_block(target_addr: u32, payload: &[u8]) -> Vec<u8> {
        let mut block = vec![0u8; flash_image::UF2_BLOCK_SIZE];
        for (offset, value) in [
            (0, 0x0A32_4655u32),
            (4, 0x9E5D_5157),
            (12, target_addr),
            (16, payload.len() as u32),
            (508, 0x0AB1_6F30),
        ] {
            block[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }
        block[32..32 + payload.len()].copy_from_slice(payload);
        block
    }

    #[test]
    fn test_load_uf2_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("firmware.uf2");
        let mut image = uf2_block(0x0010_0000, &[1, 2]);
        image.extend(uf2_block(0x0010_0100, &[3]));
        std::fs::write(&path, &image).unwrap();

        let mut flash = SpiFlash::with_capacity("spiflash", 1024);
        assert_eq!(flash.load_image(&path, 0x10, 0x0010_0000).unwrap(), 3);
        assert_eq!(&flash.memory()[0x10..0x12], &[1, 2]);
        assert_eq!(flash.memory()[0x110], 3);

        // the second block would land past the end
        let mut small = SpiFlash::with_capacity("spiflash", 0x100);
        assert!(matches!(
            small.load_image(&path, 0x10, 0x0010_0000),
            Err(ModelError::OutOfRange { offset: 0x110, .. })
        ));
        assert!(small.memory().iter().all(|&byte| byte == 0xFF));
    }
}
