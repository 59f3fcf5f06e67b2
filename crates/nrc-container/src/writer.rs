//! Fragment container writer.

use alloc::format;
use alloc::vec::Vec;

use nrc_core::{Error, Result};

use crate::{crc32, END_MARKER, FRAGMENT_SIZE, FRAG_DATA_SIZE, START_MARKER};

/// Build one 47-byte fragment. `data` holds at most 31 bytes and is
/// zero-padded on the right.
pub fn write_fragment(chunk_num: u16, total_chunks: u16, data: &[u8]) -> [u8; FRAGMENT_SIZE] {
    debug_assert!(data.len() <= FRAG_DATA_SIZE);
    let mut padded = [0u8; FRAG_DATA_SIZE];
    padded[..data.len()].copy_from_slice(data);

    let mut frag = [0u8; FRAGMENT_SIZE];
    frag[0..4].copy_from_slice(&START_MARKER);
    frag[4..6].copy_from_slice(&chunk_num.to_le_bytes());
    frag[6..8].copy_from_slice(&total_chunks.to_le_bytes());
    frag[8..12].copy_from_slice(&crc32(&padded).to_le_bytes());
    frag[12..43].copy_from_slice(&padded);
    frag[43..47].copy_from_slice(&END_MARKER);
    frag
}

/// Split a byte stream into 31-byte windows and emit the concatenated
/// fragment stream. There is no container-level header; the reader relies
/// on markers, CRCs and the redundant total count.
pub fn write_container(data: &[u8]) -> Result<Vec<u8>> {
    let total = (data.len() + FRAG_DATA_SIZE - 1) / FRAG_DATA_SIZE;
    if total > u16::MAX as usize {
        return Err(Error::InvalidParameter(format!(
            "{} bytes need {total} fragments; the chunk counter is 16-bit",
            data.len()
        )));
    }
    let mut out = Vec::with_capacity(total * FRAGMENT_SIZE);
    for (i, window) in data.chunks(FRAG_DATA_SIZE).enumerate() {
        out.extend_from_slice(&write_fragment(i as u16, total as u16, window));
    }
    Ok(out)
}
