//! Noise-tolerant fragment scanner.
//!
//! The input buffer may hold arbitrary garbage before, between and after
//! fragments: partial markers, corrupted copies, truncated tails. The
//! scanner trusts nothing but the full validation chain (start marker,
//! CRC32 over the data field, end marker) and reassembles by the chunk
//! number carried inside each valid fragment, not by physical order.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use log::{debug, info, warn};

use nrc_core::{Error, Result};

use crate::{crc32, END_MARKER, FRAGMENT_SIZE, FRAG_DATA_SIZE, START_MARKER};

/// Scanner tunables.
#[derive(Debug, Clone, Copy)]
pub struct ScanConfig {
    /// Abort the primary pass after this many consecutive positions that
    /// looked like a fragment start but failed validation.
    pub max_consecutive_failures: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 1000,
        }
    }
}

/// Outcome of a scan. `missing` is empty on full recovery; partial results
/// are still returned so the caller can decide what a gappy file is worth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Reassembled payload, chunk order, gaps omitted.
    pub data: Vec<u8>,
    /// Chunk count settled by plurality vote over the redundant field.
    pub total: usize,
    /// Distinct valid chunks recovered.
    pub found: usize,
    /// Chunk numbers never recovered.
    pub missing: Vec<u16>,
}

impl ScanReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// One validated fragment at buffer position `pos`.
fn parse_fragment_at(buf: &[u8], pos: usize) -> Option<(u16, u16, &[u8])> {
    if pos + FRAGMENT_SIZE > buf.len() {
        return None;
    }
    let frag = &buf[pos..pos + FRAGMENT_SIZE];
    if frag[43..47] != END_MARKER {
        return None;
    }
    let chunk_num = u16::from_le_bytes([frag[4], frag[5]]);
    let total_chunks = u16::from_le_bytes([frag[6], frag[7]]);
    let crc = u32::from_le_bytes([frag[8], frag[9], frag[10], frag[11]]);
    let data = &frag[12..43];
    if crc32(data) != crc {
        return None;
    }
    Some((chunk_num, total_chunks, data))
}

/// Next start-marker occurrence at or after `from`.
fn find_marker(buf: &[u8], from: usize) -> Option<usize> {
    if from >= buf.len() {
        return None;
    }
    buf[from..]
        .windows(START_MARKER.len())
        .position(|w| w == START_MARKER)
        .map(|i| i + from)
}

pub fn scan(buf: &[u8]) -> Result<ScanReport> {
    scan_with(buf, &ScanConfig::default())
}

pub fn scan_with(buf: &[u8], config: &ScanConfig) -> Result<ScanReport> {
    let first = find_marker(buf, 0).ok_or(Error::ContainerEmpty)?;

    let mut chunks: BTreeMap<u16, Vec<u8>> = BTreeMap::new();
    let mut votes: BTreeMap<u16, u32> = BTreeMap::new();

    // Primary pass: hop from marker to marker, one byte forward on any
    // validation failure so a spurious marker cannot hide a real fragment
    // starting inside its span.
    let mut pos = first;
    let mut failures: u32 = 0;
    while let Some(p) = find_marker(buf, pos) {
        match parse_fragment_at(buf, p) {
            Some((chunk_num, total_chunks, data)) => {
                if let Some(prev) = chunks.get(&chunk_num) {
                    if prev != data {
                        debug!("chunk {chunk_num}: conflicting duplicate, keeping latest");
                    }
                }
                chunks.insert(chunk_num, data.to_vec());
                if total_chunks != 0 {
                    *votes.entry(total_chunks).or_insert(0) += 1;
                }
                pos = p + FRAGMENT_SIZE;
                failures = 0;
            }
            None => {
                pos = p + 1;
                failures += 1;
                if failures > config.max_consecutive_failures {
                    warn!(
                        "aborting primary pass after {failures} consecutive bad candidates"
                    );
                    break;
                }
            }
        }
    }

    // Settle the chunk count: plurality over the redundant field, smallest
    // value on a tie; fall back to the highest chunk number seen.
    let mut winner: Option<(u16, u32)> = None;
    for (&value, &count) in &votes {
        if winner.map_or(true, |(_, best)| count > best) {
            winner = Some((value, count));
        }
    }
    let total = winner
        .map(|(value, _)| value as usize)
        .unwrap_or_else(|| chunks.keys().next_back().map_or(0, |&n| n as usize + 1));

    // Targeted rescan: a fragment skipped because an earlier spurious
    // marker swallowed its start is still findable by searching for its
    // chunk number from the top.
    for missing_num in 0..total as u16 {
        if chunks.contains_key(&missing_num) {
            continue;
        }
        let mut p = 0;
        while let Some(m) = find_marker(buf, p) {
            if let Some((chunk_num, _, data)) = parse_fragment_at(buf, m) {
                if chunk_num == missing_num {
                    debug!("targeted rescan recovered chunk {chunk_num}");
                    chunks.insert(chunk_num, data.to_vec());
                    break;
                }
            }
            p = m + 1;
        }
    }

    // Assemble in chunk order; strip the zero padding from the final chunk.
    let mut data = Vec::with_capacity(total * FRAG_DATA_SIZE);
    let mut missing = Vec::new();
    for num in 0..total as u16 {
        match chunks.get(&num) {
            Some(chunk) => {
                if num as usize == total - 1 {
                    let tail = chunk.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                    data.extend_from_slice(&chunk[..tail]);
                } else {
                    data.extend_from_slice(chunk);
                }
            }
            None => missing.push(num),
        }
    }

    let found = total - missing.len();
    if missing.is_empty() {
        info!("container scan complete: {found}/{total} chunks");
    } else {
        warn!("container scan partial: {found}/{total} chunks, missing {missing:?}");
    }

    Ok(ScanReport {
        data,
        total,
        found,
        missing,
    })
}
