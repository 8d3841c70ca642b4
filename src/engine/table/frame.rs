use crc32fast::Hasher as Crc32Hasher;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

use crate::engine::errors::TableError;
use crate::engine::table::schema::ColumnSpec;
use crate::engine::table::value::Value;

/// Frames larger than this are treated as corruption.
pub const MAX_FRAME_LEN_BYTES: u32 = 1 << 30;

/// Bytes preceding every frame payload: length and CRC32.
pub const FRAME_PREFIX_LEN: u64 = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Frame {
    Schema {
        table: String,
        columns: Vec<ColumnSpec>,
    },
    Basket {
        table: String,
        column: u32,
        first_entry: u64,
        values: Vec<Value>,
    },
    Footer {
        table: String,
        entries: u64,
        column_bytes: Vec<u64>,
    },
}

pub fn compute_crc32(data: &[u8]) -> u32 {
    let mut hasher = Crc32Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Writes one frame and returns the number of bytes it took on disk.
pub fn write_frame<W: Write>(w: &mut W, frame: &Frame) -> Result<u64, TableError> {
    let encoded = bincode::serialize(frame)?;
    w.write_all(&(encoded.len() as u32).to_le_bytes())?;
    w.write_all(&compute_crc32(&encoded).to_le_bytes())?;
    w.write_all(&encoded)?;
    Ok(FRAME_PREFIX_LEN + encoded.len() as u64)
}

/// Reads the next frame, `Ok(None)` on a clean end of file.
pub fn read_frame<R: Read>(r: &mut R, path: &Path) -> Result<Option<Frame>, TableError> {
    let corrupted = |reason: String| TableError::Corrupted {
        path: path.to_path_buf(),
        reason,
    };

    let mut len_buf = [0u8; 4];
    match read_full(r, &mut len_buf)? {
        0 => return Ok(None),
        4 => {}
        n => return Err(corrupted(format!("truncated frame length ({} bytes)", n))),
    }
    let len = u32::from_le_bytes(len_buf);
    if len > MAX_FRAME_LEN_BYTES {
        return Err(corrupted(format!("frame length too large: {} bytes", len)));
    }

    let mut crc_buf = [0u8; 4];
    if read_full(r, &mut crc_buf)? != 4 {
        return Err(corrupted("truncated frame checksum".into()));
    }
    let expected_crc = u32::from_le_bytes(crc_buf);

    let mut payload = vec![0u8; len as usize];
    if read_full(r, &mut payload)? != payload.len() {
        return Err(corrupted("truncated frame payload".into()));
    }

    let actual_crc = compute_crc32(&payload);
    if actual_crc != expected_crc {
        return Err(corrupted(format!(
            "CRC mismatch (expected {}, got {})",
            expected_crc, actual_crc
        )));
    }

    bincode::deserialize(&payload)
        .map(Some)
        .map_err(|e| corrupted(format!("failed to deserialize frame: {}", e)))
}

// Like read_exact, but reports how much was read before EOF.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<usize, TableError> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TableError::Io(e)),
        }
    }
    Ok(filled)
}
