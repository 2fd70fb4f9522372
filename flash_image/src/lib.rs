//! Flash image containers
//!
//! A firmware image is either a raw binary, placed verbatim at the requested
//! flash offset, or a UF2 container whose 512 byte blocks carry their own
//! target addresses.
//!

use thiserror::Error;

pub const UF2_BLOCK_SIZE: usize = 512;
pub const UF2_MAX_PAYLOAD: usize = 476;

const UF2_MAGIC_START0: u32 = 0x0A32_4655;
const UF2_MAGIC_START1: u32 = 0x9E5D_5157;
const UF2_MAGIC_END: u32 = 0x0AB1_6F30;

const UF2_FLAG_NOT_MAIN_FLASH: u32 = 0x0000_0001;
const UF2_FLAG_FAMILY_ID: u32 = 0x0000_2000;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("UF2 image length {0} is not a multiple of the block size")]
    InvalidLength(usize),

    #[error("UF2 block {block_no} declares a {size} byte payload")]
    PayloadTooLarge { block_no: u32, size: u32 },

    #[error("UF2 block targets {addr:#010X}, below the image base {base:#010X}")]
    BelowBase { addr: u32, base: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Raw,
    Uf2,
}

/// Guess the container format from the first block.
pub fn detect(data: &[u8]) -> Format {
    if data.len() >= UF2_BLOCK_SIZE
        && read_u32(data, 0) == UF2_MAGIC_START0
        && read_u32(data, 4) == UF2_MAGIC_START1
    {
        Format::Uf2
    } else {
        Format::Raw
    }
}

#[derive(Debug, Clone)]
pub struct Uf2Block {
    pub flags: u32,
    pub target_addr: u32,
    pub block_no: u32,
    pub num_blocks: u32,
    pub family_id: Option<u32>,
    pub data: Vec<u8>,
}

impl Uf2Block {
    /// Blocks flagged "not main flash" are metadata and must not be written.
    pub fn is_flashable(&self) -> bool {
        self.flags & UF2_FLAG_NOT_MAIN_FLASH == 0
    }
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn parse_block(block: &[u8]) -> Option<Result<Uf2Block, Error>> {
    let magic = (read_u32(block, 0), read_u32(block, 4), read_u32(block, 508));
    if magic != (UF2_MAGIC_START0, UF2_MAGIC_START1, UF2_MAGIC_END) {
        return None;
    }

    let flags = read_u32(block, 8);
    let target_addr = read_u32(block, 12);
    let payload_size = read_u32(block, 16);
    let block_no = read_u32(block, 20);
    let num_blocks = read_u32(block, 24);

    if payload_size as usize > UF2_MAX_PAYLOAD {
        return Some(Err(Error::PayloadTooLarge {
            block_no,
            size: payload_size,
        }));
    }

    let family_id = (flags & UF2_FLAG_FAMILY_ID != 0).then(|| read_u32(block, 28));

    Some(Ok(Uf2Block {
        flags,
        target_addr,
        block_no,
        num_blocks,
        family_id,
        data: block[32..32 + payload_size as usize].to_vec(),
    }))
}

/// Iterate over the valid blocks of a UF2 container. Blocks with a broken
/// magic are skipped, as a bootloader would.
pub fn read_uf2(data: &[u8]) -> Result<impl Iterator<Item = Result<Uf2Block, Error>>, Error> {
    if data.len() % UF2_BLOCK_SIZE != 0 {
        return Err(Error::InvalidLength(data.len()));
    }

    Ok(data.chunks_exact(UF2_BLOCK_SIZE).filter_map(parse_block))
}

/// A contiguous run of bytes destined for `offset` bytes into the flash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub offset: usize,
    pub data: Vec<u8>,
}

/// Split an image into flash segments. Raw images become a single segment
/// at offset 0; UF2 block addresses are made relative to `base`.
pub fn segments(data: &[u8], base: u32) -> Result<Vec<Segment>, Error> {
    match detect(data) {
        Format::Raw => Ok(vec![Segment {
            offset: 0,
            data: data.to_vec(),
        }]),

        Format::Uf2 => {
            let mut result = Vec::new();
            for block in read_uf2(data)? {
                let block = block?;
                if !block.is_flashable() {
                    continue;
                }

                let Some(offset) = block.target_addr.checked_sub(base) else {
                    return Err(Error::BelowBase {
                        addr: block.target_addr,
                        base,
                    });
                };

                result.push(Segment {
                    offset: offset as usize,
                    data: block.data,
                });
            }
            Ok(result)
        }
    }
}
