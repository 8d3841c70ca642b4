use std::io::{Read, Write};
use std::path::Path;

use crate::engine::errors::TableError;
use crate::engine::table::frame::{FRAME_PREFIX_LEN, compute_crc32};

pub const TABLE_FILE_MAGIC: [u8; 8] = *b"D3PDTRE\0";

/// Bumped whenever the frame layout changes.
pub const TABLE_FORMAT_VERSION: u16 = 1;

/// How baskets are laid out after the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BasketOrder {
    /// As the writer flushed them.
    #[default]
    Filled,
    ByEntry,
    ByBranch,
}

impl BasketOrder {
    fn flags(self) -> u16 {
        match self {
            BasketOrder::Filled => 0,
            BasketOrder::ByEntry => 1,
            BasketOrder::ByBranch => 2,
        }
    }

    fn from_flags(flags: u16) -> Option<Self> {
        match flags {
            0 => Some(BasketOrder::Filled),
            1 => Some(BasketOrder::ByEntry),
            2 => Some(BasketOrder::ByBranch),
            _ => None,
        }
    }
}

/// `magic | version u16 | basket order u16 | frame prefix len u32 | crc32`,
/// little endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableHeader {
    pub version: u16,
    pub order: BasketOrder,
}

impl TableHeader {
    pub const LEN: u64 = 8 + 2 + 2 + 4 + 4;

    pub fn new(order: BasketOrder) -> Self {
        Self {
            version: TABLE_FORMAT_VERSION,
            order,
        }
    }

    fn body(&self) -> [u8; 16] {
        let mut body = [0u8; 16];
        body[..8].copy_from_slice(&TABLE_FILE_MAGIC);
        body[8..10].copy_from_slice(&self.version.to_le_bytes());
        body[10..12].copy_from_slice(&self.order.flags().to_le_bytes());
        body[12..16].copy_from_slice(&(FRAME_PREFIX_LEN as u32).to_le_bytes());
        body
    }

    /// Returns the number of bytes written.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<u64, TableError> {
        let body = self.body();
        w.write_all(&body)?;
        w.write_all(&compute_crc32(&body).to_le_bytes())?;
        Ok(Self::LEN)
    }

    pub fn read_from<R: Read>(r: &mut R, path: &Path) -> Result<Self, TableError> {
        let corrupted = |reason: String| TableError::Corrupted {
            path: path.to_path_buf(),
            reason,
        };

        let mut body = [0u8; 16];
        let mut crc = [0u8; 4];
        r.read_exact(&mut body)
            .and_then(|_| r.read_exact(&mut crc))
            .map_err(|e| corrupted(format!("truncated header: {}", e)))?;

        if body[..8] != TABLE_FILE_MAGIC {
            return Err(corrupted("invalid magic".into()));
        }
        if compute_crc32(&body) != u32::from_le_bytes(crc) {
            return Err(corrupted("header CRC mismatch".into()));
        }

        let version = u16::from_le_bytes([body[8], body[9]]);
        if version != TABLE_FORMAT_VERSION {
            return Err(corrupted(format!("unsupported format version {}", version)));
        }
        let prefix = u32::from_le_bytes([body[12], body[13], body[14], body[15]]);
        if prefix as u64 != FRAME_PREFIX_LEN {
            return Err(corrupted(format!("unexpected frame prefix length {}", prefix)));
        }
        let flags = u16::from_le_bytes([body[10], body[11]]);
        let order = BasketOrder::from_flags(flags)
            .ok_or_else(|| corrupted(format!("unknown basket order flags {:#06x}", flags)))?;

        Ok(Self { version, order })
    }
}
