//! On-disk key and value layout.
//!
//! ```text
//! key   = row_key_len (u32 BE) | row_key | qualifier
//! value = timestamp_micros (i64 BE) | cell bytes
//! ```
//!
//! The length prefix keeps row `a` from sharing a key prefix with row `ab`,
//! so a prefix scan over `row_prefix(key)` sees exactly one row, with its
//! qualifiers in byte order.

use anyhow::Result;

use crate::row::{Cell, TimestampMicros};

const LEN_WIDTH: usize = 4;
const TS_WIDTH: usize = 8;

/// Prefix shared by every stored cell of `row_key`.
pub fn row_prefix(row_key: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(row_key.len())
        .map_err(|_| anyhow::anyhow!("row key too long: {} bytes", row_key.len()))?;
    let mut prefix = Vec::with_capacity(LEN_WIDTH + row_key.len());
    prefix.extend_from_slice(&len.to_be_bytes());
    prefix.extend_from_slice(row_key);
    Ok(prefix)
}

pub fn cell_key(row_key: &[u8], qualifier: &[u8]) -> Result<Vec<u8>> {
    let mut key = row_prefix(row_key)?;
    key.extend_from_slice(qualifier);
    Ok(key)
}

/// Split a stored key into `(row_key, qualifier)`.
pub fn split_cell_key(key: &[u8]) -> Option<(&[u8], &[u8])> {
    if key.len() < LEN_WIDTH {
        return None;
    }
    let (len, rest) = key.split_at(LEN_WIDTH);
    let len = u32::from_be_bytes(len.try_into().ok()?) as usize;
    (rest.len() >= len).then(|| rest.split_at(len))
}

pub fn encode_cell_value(cell: &Cell) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(TS_WIDTH + cell.value.len());
    bytes.extend_from_slice(&cell.timestamp.as_micros().to_be_bytes());
    bytes.extend_from_slice(&cell.value);
    bytes
}

pub fn decode_cell_value(bytes: &[u8]) -> Result<Cell> {
    if bytes.len() < TS_WIDTH {
        anyhow::bail!("stored cell shorter than its timestamp: {} bytes", bytes.len());
    }
    let (ts, value) = bytes.split_at(TS_WIDTH);
    let ts = i64::from_be_bytes(ts.try_into()?);
    Ok(Cell::new(value.to_vec(), TimestampMicros(ts)))
}
